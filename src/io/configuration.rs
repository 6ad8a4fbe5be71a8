//! Study constants and runtime configuration defaults

use crate::io::error::{AnalysisError, Result, WithPath, invalid_parameter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// Group mask construction
/// Fraction of the maximum mask overlap a voxel needs to stay in the sum mask
pub const MASK_SUM_THRESHOLD_RATIO: f64 = 0.95;
/// File name of the intersection (product) group mask
pub const GROUP_MASK_MULT_FILENAME: &str = "group_mask_mult.nii";
/// File name of the thresholded sum group mask
pub const GROUP_MASK_SUM_FILENAME: &str = "group_mask_sum95.nii";
/// Prefix of the atlas masked with the group mask
pub const MASKED_ATLAS_PREFIX: &str = "group_mask_";
/// Template space and resolution tag of the fMRIPrep brain masks
pub const TEMPLATE_SPACE: &str = "space-MNI152NLin6Asym_res-2";
/// Trailing part of an fMRIPrep brain mask file name
pub const BRAIN_MASK_SUFFIX: &str = "desc-brain_mask.nii";
/// Subject identifiers are the leading characters of a file name (`sub-NN`)
pub const SUBJECT_ID_LENGTH: usize = 6;
/// Directory holding functional derivatives of a subject
pub const FUNCTIONAL_DIR: &str = "func";
/// MNI152 2 mm grid
pub const DEFAULT_VOLUME_SHAPE: [usize; 3] = [91, 109, 91];

// Some subject masks are cut; those subjects were denoised with another task's mask
/// (subject, task, task whose mask replaces it)
pub const MASK_SUBSTITUTIONS: &[(&str, &str, &str)] = &[
    ("sub-09", "resting", "pvt"),
    ("sub-25", "nback", "resting"),
];

/// Atlases available to `mask_atlas` by default
pub const DEFAULT_ATLASES: &[(&str, &str)] = &[
    (
        "seitzman-set1",
        "/m/cs/scratch/networks-pm/atlas/300_ROI_Set/seitzman_set1.nii",
    ),
    (
        "seitzman-set2",
        "/m/cs/scratch/networks-pm/atlas/300_ROI_Set/seitzman_set2.nii",
    ),
];

// ROI time series
/// Variable name of the cell array in the time series MAT-file
pub const ROI_TIMESERIES_VARIABLE: &str = "rs_ts";
/// Prefix of the time series MAT-file name
pub const ROI_TIMESERIES_PREFIX: &str = "averaged_roits";
/// Standard deviations below this are treated as 1 when z-scoring
pub const STANDARDIZE_EPSILON: f64 = f64::EPSILON;

// Behavioral data
/// Subject the behavioral recordings belong to
pub const DEFAULT_SUBJECT: &str = "sub-01";
/// Name of the date column in every behavioral table
pub const DATE_COLUMN: &str = "date";
/// Sleep ring export, one row per night
pub const SLEEP_DEVICE: &str = "oura";
/// Wristband physiology export
pub const PHYSIOLOGY_DEVICE: &str = "embraceplus";
/// Ecological momentary assessment answers
pub const MOOD_DEVICE: &str = "smartphone_sensor-ema";
/// Scan calendar
pub const MRI_DEVICE: &str = "mri";
/// Directory of the scan calendar, relative to the behavioral root
pub const MRI_DIR: &str = "mri";
/// Date format of the sleep table
pub const SLEEP_DATE_FORMAT: &str = "%d-%m-%Y";
/// Date format of the mood table
pub const MOOD_DATE_FORMAT: &str = "%Y-%m-%d";
/// Date format of the scan calendar
pub const SCAN_DATE_FORMAT: &str = "%d/%m/%y";

/// Sleep features kept for the analysis
pub const SLEEP_COLUMNS: &[&str] = &[
    "Total Sleep Duration",
    "Awake Time",
    "Restless Sleep",
    "Sleep Efficiency",
    "Sleep Latency",
];

/// Respiration and pulse-rate variability features kept for the analysis
pub const PHYSIOLOGY_COLUMNS: &[&str] = &[
    "mean_respiratory_rate_brpm",
    "min_respiratory_rate_brpm",
    "max_respiratory_rate_brpm",
    "median_respiratory_rate_brpm",
    "std_respiratory_rate_brpm",
    "mean_prv_rmssd_ms",
    "min_prv_rmssd_ms",
    "max_prv_rmssd_ms",
    "median_prv_rmssd_ms",
    "std_prv_rmssd_ms",
];

/// Positive affect, negative affect, stress and pain summaries
pub const MOOD_COLUMNS: &[&str] = &[
    "pa_mean",
    "pa_median",
    "pa_min",
    "pa_max",
    "pa_std",
    "na_mean",
    "na_median",
    "na_min",
    "na_max",
    "na_std",
    "stress_mean",
    "stress_median",
    "stress_min",
    "stress_max",
    "stress_std",
    "pain_mean",
    "pain_median",
    "pain_min",
    "pain_max",
    "pain_std",
];

// Progress bar display settings
/// Threshold for switching to batch progress mode
pub const MAX_INDIVIDUAL_PROGRESS_BARS: usize = 5;
/// Width of progress bars in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;

/// Replaces one task's brain mask by another's for a given subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskSubstitution {
    /// Subject identifier (`sub-NN`)
    pub subject: String,
    /// Task being processed
    pub task: String,
    /// Task whose brain mask is loaded instead
    pub replacement_task: String,
}

/// Runtime configuration of the study layout
///
/// Every field falls back to the constants of this module when absent from
/// the TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Subject whose behavioral recordings are analysed
    pub subject: String,
    /// Expected spatial shape of every mask and atlas
    pub volume_shape: Vec<usize>,
    /// Fraction of the maximum overlap kept by the sum mask
    pub mask_threshold_ratio: f64,
    /// Atlas name to file mapping
    pub atlases: BTreeMap<String, PathBuf>,
    /// Subjects whose brain mask comes from another task
    pub mask_substitutions: Vec<MaskSubstitution>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            subject: DEFAULT_SUBJECT.to_string(),
            volume_shape: DEFAULT_VOLUME_SHAPE.to_vec(),
            mask_threshold_ratio: MASK_SUM_THRESHOLD_RATIO,
            atlases: DEFAULT_ATLASES
                .iter()
                .map(|(name, path)| ((*name).to_string(), PathBuf::from(path)))
                .collect(),
            mask_substitutions: MASK_SUBSTITUTIONS
                .iter()
                .map(|(subject, task, replacement)| MaskSubstitution {
                    subject: (*subject).to_string(),
                    task: (*task).to_string(),
                    replacement_task: (*replacement).to_string(),
                })
                .collect(),
        }
    }
}

impl StudyConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// holds values that fail [`StudyConfig::validate`]
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_operation(path, "read configuration")?;
        let config = Self::from_toml_str(&content).map_err(|source| AnalysisError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the text does not describe a configuration
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Check value ranges that serde cannot express
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold ratio is outside (0, 1] or the
    /// volume shape is empty or contains a zero
    pub fn validate(&self) -> Result<()> {
        if !(self.mask_threshold_ratio > 0.0 && self.mask_threshold_ratio <= 1.0) {
            return Err(invalid_parameter(
                "mask_threshold_ratio",
                &self.mask_threshold_ratio,
                &"must be in (0, 1]",
            ));
        }
        if self.volume_shape.is_empty() || self.volume_shape.contains(&0) {
            return Err(invalid_parameter(
                "volume_shape",
                &format!("{:?}", self.volume_shape),
                &"must be non-empty with positive extents",
            ));
        }
        Ok(())
    }

    /// Task whose brain mask should be loaded for `subject` while processing `task`
    pub fn mask_task_for<'a>(&'a self, subject: &str, task: &'a str) -> &'a str {
        self.mask_substitutions
            .iter()
            .find(|s| s.subject == subject && s.task == task)
            .map_or(task, |s| s.replacement_task.as_str())
    }

    /// Resolve an atlas name to its file
    ///
    /// # Errors
    ///
    /// Returns an error if the atlas is not configured
    pub fn atlas_path(&self, atlas_name: &str) -> Result<&Path> {
        self.atlases
            .get(atlas_name)
            .map(PathBuf::as_path)
            .ok_or_else(|| {
                invalid_parameter(
                    "atlas",
                    &atlas_name,
                    &format!(
                        "unknown atlas, expected one of: {}",
                        self.atlases.keys().cloned().collect::<Vec<_>>().join(", ")
                    ),
                )
            })
    }

    /// Behavioral CSV exported by `device` for the configured subject
    pub fn device_file(&self, device: &str) -> String {
        format!("{}_day-all_device-{device}.csv", self.subject)
    }
}
