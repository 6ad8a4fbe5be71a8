//! Command-line interface running one analysis step per subcommand

use crate::analysis::behavior::{BehaviorTable, get_behav_data_movie};
use crate::analysis::similarity::SimilarityModel;
use crate::analysis::timeseries::compute_averaged_roi_ts;
use crate::io::configuration::StudyConfig;
use crate::io::discovery::create_parent_dir;
use crate::io::error::{Result, WithPath};
use crate::io::matfile::{MatValue, write_mat};
use crate::io::progress::ProgressManager;
use crate::spatial::mask::compute_groupmasks;
use clap::{Parser, Subcommand};
use ndarray::Array2;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "neuroconn")]
#[command(
    author,
    version,
    about = "Group masks, ROI time series and behavioral similarity matrices"
)]
/// Command-line arguments of the analysis tool
pub struct Cli {
    /// Study configuration file (TOML); built-in defaults otherwise
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log debug messages
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress progress output and informational messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Analysis step to run
    #[command(subcommand)]
    pub command: Command,
}

/// Analysis steps
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Compute group brain masks and mask an atlas with them
    GroupMask {
        /// Output directory for masks and masked atlas
        #[arg(long)]
        conn: PathBuf,
        /// fMRIPrep derivatives directory
        #[arg(long)]
        fmriprep: PathBuf,
        /// Task whose brain masks are combined
        #[arg(long)]
        task: String,
        /// Atlas name from the configuration (e.g. seitzman-set1)
        #[arg(long)]
        atlas: String,
        /// Volume shape, overriding the configuration (e.g. 91,109,91)
        #[arg(long, value_delimiter = ',')]
        vol_size: Option<Vec<usize>>,
    },

    /// Extract z-scored ROI time series of denoised scans
    RoiTimeseries {
        /// Directory of denoised scans
        #[arg(long)]
        nii: PathBuf,
        /// Output directory
        #[arg(long)]
        conn: PathBuf,
        /// Task of the scans
        #[arg(long)]
        task: String,
        /// Denoising strategy suffix of the scans
        #[arg(long)]
        strategy: String,
        /// Masked atlas produced by group-mask
        #[arg(long)]
        group_atlas: PathBuf,
    },

    /// Merge behavioral exports and keep the days before each scan
    Behavior {
        /// Directory of behavioral exports
        #[arg(long)]
        behav: PathBuf,
        /// Days between behavior and scan, negative for days after the scan
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        lag: i64,
        /// Output CSV file
        #[arg(long)]
        output: PathBuf,
    },

    /// Build a similarity matrix from a behavior table
    Similarity {
        /// Behavior table written by the behavior step
        #[arg(long)]
        input: PathBuf,
        /// Similarity model: nn or ak
        #[arg(long, default_value = "nn")]
        model: SimilarityModel,
        /// Output file; `.mat` writes a MAT-file, anything else CSV
        #[arg(long)]
        output: PathBuf,
    },
}

impl Cli {
    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }
}

/// Runs the selected analysis step
pub struct StudyProcessor {
    cli: Cli,
    config: StudyConfig,
    progress_manager: Option<ProgressManager>,
}

impl StudyProcessor {
    /// Create a processor, loading the configuration file if one was given
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the volume
    /// shape override is invalid
    pub fn new(cli: Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => StudyConfig::from_toml_file(path)?,
            None => StudyConfig::default(),
        };

        if let Command::GroupMask {
            vol_size: Some(shape),
            ..
        } = &cli.command
        {
            config.volume_shape.clone_from(shape);
            config.validate()?;
        }

        let progress_manager = cli.should_show_progress().then(ProgressManager::new);

        Ok(Self {
            cli,
            config,
            progress_manager,
        })
    }

    /// Effective study configuration
    pub const fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// Run the selected step
    ///
    /// # Errors
    ///
    /// Propagates the errors of the step
    pub fn process(&mut self) -> Result<()> {
        let progress = self.progress_manager.as_mut();

        match &self.cli.command {
            Command::GroupMask {
                conn,
                fmriprep,
                task,
                atlas,
                ..
            } => {
                let masked = compute_groupmasks(conn, fmriprep, task, atlas, &self.config, progress)?;
                tracing::info!("Masked atlas: {}", masked.display());
            }
            Command::RoiTimeseries {
                nii,
                conn,
                task,
                strategy,
                group_atlas,
            } => {
                let output = compute_averaged_roi_ts(nii, conn, task, strategy, group_atlas, progress)?;
                tracing::info!("ROI time series: {}", output.display());
            }
            Command::Behavior { behav, lag, output } => {
                let table = get_behav_data_movie(behav, *lag, &self.config)?;
                table.write_csv(output)?;
                tracing::info!("Behavior table ({} days): {}", table.len(), output.display());
            }
            Command::Similarity {
                input,
                model,
                output,
            } => {
                let table = BehaviorTable::read_csv(input)?;
                let matrix = model.compute(table.values())?;
                write_similarity(output, *model, &matrix)?;
                tracing::info!(
                    "{model} similarity of {} observations: {}",
                    matrix.nrows(),
                    output.display()
                );
            }
        }

        Ok(())
    }
}

/// Save a similarity matrix as MAT-file (variable named after the model) or CSV
///
/// # Errors
///
/// Returns an error if the file cannot be written
pub fn write_similarity(path: &Path, model: SimilarityModel, matrix: &Array2<f64>) -> Result<()> {
    if path.extension().and_then(|s| s.to_str()) == Some("mat") {
        return write_mat(path, &[(model.short_name(), &MatValue::Double(matrix.clone()))]);
    }

    create_parent_dir(path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_path(path)?;
    for row in matrix.rows() {
        let record: Vec<String> = row.iter().map(ToString::to_string).collect();
        writer.write_record(&record).with_path(path)?;
    }
    writer.flush().with_operation(path, "write CSV")?;
    Ok(())
}
