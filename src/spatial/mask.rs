//! Group brain masks and atlas masking

use crate::io::configuration::{
    BRAIN_MASK_SUFFIX, FUNCTIONAL_DIR, GROUP_MASK_MULT_FILENAME, GROUP_MASK_SUM_FILENAME,
    MASKED_ATLAS_PREFIX, StudyConfig, TEMPLATE_SPACE,
};
use crate::io::discovery::{FilePattern, find_files, subject_id};
use crate::io::error::{AnalysisError, Result, invalid_source};
use crate::io::progress::ProgressManager;
use crate::io::volume::Volume;
use ndarray::{ArrayD, IxDyn};
use nifti::NiftiHeader;
use std::path::{Path, PathBuf};

/// Locations of the two group masks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMaskPaths {
    /// Voxels present in every subject mask
    pub intersection: PathBuf,
    /// Voxels present in at least the threshold fraction of the maximum overlap
    pub coverage: PathBuf,
}

impl GroupMaskPaths {
    /// Standard file names inside `conn_path`
    pub fn in_directory(conn_path: &Path) -> Self {
        Self {
            intersection: conn_path.join(GROUP_MASK_MULT_FILENAME),
            coverage: conn_path.join(GROUP_MASK_SUM_FILENAME),
        }
    }

    /// Whether both masks were already computed
    pub fn exist(&self) -> bool {
        self.intersection.exists() && self.coverage.exists()
    }
}

/// fMRIPrep brain mask of `subject` for `task`
pub fn brain_mask_path(fmriprep_path: &Path, subject: &str, task: &str) -> PathBuf {
    fmriprep_path
        .join(subject)
        .join(FUNCTIONAL_DIR)
        .join(format!(
            "{subject}_task-{task}_{TEMPLATE_SPACE}_{BRAIN_MASK_SUFFIX}"
        ))
}

/// Running product and sum of subject brain masks
#[derive(Debug, Clone)]
pub struct GroupMaskAccumulator {
    shape: Vec<usize>,
    product: ArrayD<f64>,
    sum: ArrayD<f64>,
    count: usize,
    header: Option<NiftiHeader>,
}

impl GroupMaskAccumulator {
    /// Start from an all-ones product and an all-zeros sum of `shape`
    pub fn new(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            product: ArrayD::ones(IxDyn(shape)),
            sum: ArrayD::zeros(IxDyn(shape)),
            count: 0,
            header: None,
        }
    }

    /// Fold one subject mask into the group masks
    ///
    /// The header of the last added mask is kept for saving.
    ///
    /// # Errors
    ///
    /// Returns a shape mismatch if the mask does not have the group shape
    /// (trailing singleton axes are tolerated)
    pub fn add(&mut self, mask: &Volume, origin: &Path) -> Result<()> {
        let data = mask.conformed(&self.shape, origin)?;
        self.product *= &data;
        self.sum += &data;
        self.count += 1;
        self.header = Some(mask.header().clone());
        Ok(())
    }

    /// Number of masks added so far
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Produce the intersection and thresholded coverage volumes
    ///
    /// # Errors
    ///
    /// Returns an error if no mask was added
    pub fn finish(self, threshold_ratio: f64) -> Result<(Volume, Volume)> {
        let header = self
            .header
            .ok_or_else(|| invalid_source(&"no subject brain masks were found"))?;
        let coverage = threshold_coverage(&self.sum, threshold_ratio);
        Ok((
            Volume::from_parts(self.product, header.clone()),
            Volume::from_parts(coverage, header),
        ))
    }
}

/// Binarize a mask sum: voxels reaching `ratio * max(sum)` become 1, others 0
pub fn threshold_coverage(sum: &ArrayD<f64>, ratio: f64) -> ArrayD<f64> {
    let max = sum.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let threshold = max * ratio;
    sum.mapv(|v| {
        let kept = if v < threshold { 0.0 } else { v };
        if kept > 0.0 { 1.0 } else { kept }
    })
}

/// Compute and save the intersection and 95 % coverage masks of all subjects
///
/// Subject masks are discovered under `fmriprep_path` as
/// `**/func/*{task}_*mask.nii`. For each one the subject's brain mask for
/// `task` is loaded, unless the configuration substitutes another task's
/// mask for that subject. Existing outputs are returned without recomputing.
///
/// # Errors
///
/// Returns an error if discovery fails, no mask is found, a mask cannot be
/// read or has the wrong shape, or the outputs cannot be written
pub fn compute_group_masks(
    conn_path: &Path,
    fmriprep_path: &Path,
    task: &str,
    config: &StudyConfig,
    mut progress: Option<&mut ProgressManager>,
) -> Result<GroupMaskPaths> {
    let paths = GroupMaskPaths::in_directory(conn_path);
    if paths.exist() {
        tracing::info!(
            "Group masks already present in {}, skipping",
            conn_path.display()
        );
        return Ok(paths);
    }

    let files = find_files(fmriprep_path, &FilePattern::brain_masks(task)?)?;
    if files.is_empty() {
        return Err(invalid_source(&format!(
            "no brain masks for task '{task}' under {}",
            fmriprep_path.display()
        )));
    }

    if let Some(pm) = progress.as_deref_mut() {
        pm.initialize("Brain masks", files.len());
    }

    let mut accumulator = GroupMaskAccumulator::new(&config.volume_shape);
    for file in &files {
        if let Some(pm) = progress.as_deref_mut() {
            pm.start_file(file);
        }

        let subject = subject_id(file).ok_or_else(|| {
            invalid_source(&format!("no subject id in file name {}", file.display()))
        })?;
        let mask_task = config.mask_task_for(subject, task);
        if mask_task != task {
            tracing::warn!("{subject}: using the {mask_task} brain mask instead of {task}");
        }

        let mask_path = brain_mask_path(fmriprep_path, subject, mask_task);
        tracing::debug!("Adding {} to group mask", mask_path.display());
        let mask = Volume::load(&mask_path)?;
        accumulator.add(&mask, &mask_path)?;

        if let Some(pm) = progress.as_deref_mut() {
            pm.complete_file();
        }
    }

    if let Some(pm) = progress.as_deref_mut() {
        pm.finish();
    }

    let count = accumulator.count();
    let (intersection, coverage) = accumulator.finish(config.mask_threshold_ratio)?;
    intersection.save(&paths.intersection)?;
    coverage.save(&paths.coverage)?;
    tracing::info!("Group mask computed for {count} files");

    Ok(paths)
}

/// File name of `atlas_name` masked with the group mask
pub fn masked_atlas_path(conn_path: &Path, atlas_name: &str) -> PathBuf {
    conn_path.join(format!("{MASKED_ATLAS_PREFIX}{atlas_name}.nii"))
}

/// Multiply an atlas by the intersection group mask and save it
///
/// The atlas is reshaped to the configured volume shape and saved with its
/// own header. An existing output is returned without recomputing.
///
/// # Errors
///
/// Returns an error if the atlas is unknown, a volume cannot be read, the
/// element counts differ, or the output cannot be written
pub fn mask_atlas(conn_path: &Path, atlas_name: &str, config: &StudyConfig) -> Result<PathBuf> {
    let atlas_path = config.atlas_path(atlas_name)?;
    let output = masked_atlas_path(conn_path, atlas_name);
    if output.exists() {
        return Ok(output);
    }

    let mask_path = conn_path.join(GROUP_MASK_MULT_FILENAME);
    let group_mask = Volume::load(&mask_path)?;
    let mask_data = group_mask.reshaped(&config.volume_shape, &mask_path)?;

    let atlas = Volume::load(atlas_path)?;
    let atlas_data = atlas.reshaped(&config.volume_shape, atlas_path)?;

    if mask_data.shape() != atlas_data.shape() {
        return Err(AnalysisError::ShapeMismatch {
            path: atlas_path.to_path_buf(),
            expected: mask_data.shape().to_vec(),
            found: atlas_data.shape().to_vec(),
        });
    }

    let masked = atlas.with_data(&mask_data * &atlas_data);
    masked.save(&output)?;
    tracing::info!("Masked {atlas_name} atlas with group mask");

    Ok(output)
}

/// Group masks followed by atlas masking; returns the masked atlas
///
/// # Errors
///
/// Propagates the errors of [`compute_group_masks`] and [`mask_atlas`]
pub fn compute_groupmasks(
    conn_path: &Path,
    fmriprep_path: &Path,
    task: &str,
    atlas_name: &str,
    config: &StudyConfig,
    progress: Option<&mut ProgressManager>,
) -> Result<PathBuf> {
    // Unknown atlas names are rejected before any mask is read
    config.atlas_path(atlas_name)?;
    compute_group_masks(conn_path, fmriprep_path, task, config, progress)?;
    mask_atlas(conn_path, atlas_name, config)
}
