//! Region-averaged time series of denoised scans

use crate::io::configuration::{ROI_TIMESERIES_PREFIX, ROI_TIMESERIES_VARIABLE};
use crate::io::discovery::{FilePattern, find_files};
use crate::io::error::{AnalysisError, Result, computation_error, invalid_parameter, invalid_source};
use crate::io::matfile::{MatValue, read_mat, write_mat};
use crate::io::progress::ProgressManager;
use crate::io::volume::Volume;
use crate::math::normalization::zscore_columns;
use crate::spatial::atlas::{LabelAtlas, atlas_name_from_path};
use ndarray::{Array2, Order};
use std::path::{Path, PathBuf};

/// Averages scan voxels within each atlas region, then z-scores each region
#[derive(Debug, Clone)]
pub struct RoiMasker {
    atlas: LabelAtlas,
    standardize: bool,
}

impl RoiMasker {
    /// Masker over the regions of a label volume, standardizing its output
    pub fn new(atlas: LabelAtlas) -> Self {
        Self {
            atlas,
            standardize: true,
        }
    }

    /// Load the label volume at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the atlas cannot be read or has no region
    pub fn from_atlas_file(path: &Path) -> Result<Self> {
        let atlas = LabelAtlas::from_volume(&Volume::load(path)?);
        if atlas.is_empty() {
            return Err(invalid_source(&format!(
                "atlas {} has no labelled region",
                path.display()
            )));
        }
        Ok(Self::new(atlas))
    }

    /// Keep raw averages instead of z-scored ones
    #[must_use]
    pub const fn without_standardization(mut self) -> Self {
        self.standardize = false;
        self
    }

    /// Region labels, in output column order
    pub fn labels(&self) -> Vec<i64> {
        self.atlas.labels()
    }

    /// Time series of every region (`time × region`)
    ///
    /// A 3-D scan is a single time point. Its spatial shape must match the
    /// atlas.
    ///
    /// # Errors
    ///
    /// Returns a shape mismatch if the spatial axes differ from the atlas
    pub fn transform(&self, scan: &Volume, origin: &Path) -> Result<Array2<f64>> {
        let spatial = self.atlas.shape();
        let shape = scan.shape();
        let spatial_matches = shape.get(..spatial.len()) == Some(spatial)
            && shape.len() <= spatial.len() + 1;
        if !spatial_matches {
            return Err(AnalysisError::ShapeMismatch {
                path: origin.to_path_buf(),
                expected: spatial.to_vec(),
                found: shape.to_vec(),
            });
        }

        let voxels = self.atlas.voxel_count();
        let timepoints = shape.get(spatial.len()).copied().unwrap_or(1);
        let by_voxel = scan
            .data()
            .to_shape(((voxels, timepoints), Order::RowMajor))
            .map_err(|e| computation_error("flatten scan", &e))?;

        let mut series = Array2::zeros((timepoints, self.atlas.len()));
        for (column, (_, region)) in self.atlas.regions().enumerate() {
            let weight = 1.0 / region.len() as f64;
            for &voxel in region {
                for t in 0..timepoints {
                    if let (Some(out), Some(value)) =
                        (series.get_mut((t, column)), by_voxel.get((voxel, t)))
                    {
                        *out += value * weight;
                    }
                }
            }
        }

        if self.standardize {
            zscore_columns(&mut series);
        }

        Ok(series)
    }
}

/// MAT-file holding the time series of `strategy` for the atlas of `group_atlas`
///
/// # Errors
///
/// Returns an error if no atlas name can be read from the file name
pub fn roi_timeseries_path(conn_path: &Path, strategy: &str, group_atlas: &Path) -> Result<PathBuf> {
    let atlas_name = atlas_name_from_path(group_atlas).ok_or_else(|| {
        invalid_parameter(
            "group_atlas",
            &group_atlas.display(),
            &"file name carries no atlas name",
        )
    })?;
    Ok(conn_path
        .join(strategy)
        .join(format!("{ROI_TIMESERIES_PREFIX}_{strategy}_{atlas_name}.mat")))
}

/// Extract region-averaged, z-scored time series of every denoised scan
///
/// Scans are discovered under `nii_path` as `**/*{task}_*{strategy}.nii` and
/// processed in path order. All matrices are saved as one cell array named
/// `rs_ts`. An existing output is returned without recomputing.
///
/// # Errors
///
/// Returns an error if discovery fails, a volume cannot be read or does not
/// match the atlas, or the MAT-file cannot be written
pub fn compute_averaged_roi_ts(
    nii_path: &Path,
    conn_path: &Path,
    task: &str,
    strategy: &str,
    group_atlas: &Path,
    mut progress: Option<&mut ProgressManager>,
) -> Result<PathBuf> {
    let output = roi_timeseries_path(conn_path, strategy, group_atlas)?;
    if output.exists() {
        tracing::info!("{} already present, skipping", output.display());
        return Ok(output);
    }

    let files = find_files(nii_path, &FilePattern::denoised_scans(task, strategy)?)?;
    if files.is_empty() {
        tracing::warn!(
            "No {task} scans denoised with {strategy} under {}",
            nii_path.display()
        );
    }

    let masker = RoiMasker::from_atlas_file(group_atlas)?;

    if let Some(pm) = progress.as_deref_mut() {
        pm.initialize("Scans", files.len());
    }

    let mut all_series = Vec::with_capacity(files.len());
    for file in &files {
        if let Some(pm) = progress.as_deref_mut() {
            pm.start_file(file);
        }
        tracing::debug!("Creating node time series for {}", file.display());

        let scan = Volume::load(file)?;
        all_series.push(masker.transform(&scan, file)?);

        if let Some(pm) = progress.as_deref_mut() {
            pm.complete_file();
        }
    }

    if let Some(pm) = progress.as_deref_mut() {
        pm.finish();
    }

    let value = MatValue::cell_of_matrices(all_series);
    write_mat(&output, &[(ROI_TIMESERIES_VARIABLE, &value)])?;
    tracing::info!(
        "Saved {} time series over {} regions to {}",
        files.len(),
        masker.labels().len(),
        output.display()
    );

    Ok(output)
}

/// Read back the matrices saved by [`compute_averaged_roi_ts`]
///
/// # Errors
///
/// Returns an error if the file cannot be decoded or has no `rs_ts` cell
/// array of matrices
pub fn load_averaged_roi_ts(path: &Path) -> Result<Vec<Array2<f64>>> {
    read_mat(path)?
        .into_iter()
        .find(|(name, _)| name == ROI_TIMESERIES_VARIABLE)
        .and_then(|(_, value)| value.into_matrices())
        .ok_or_else(|| AnalysisError::MatFile {
            path: path.to_path_buf(),
            reason: format!("no '{ROI_TIMESERIES_VARIABLE}' cell array of matrices"),
        })
}
