//! Labelled atlases and their region voxel sets

use crate::io::volume::Volume;
use std::collections::BTreeMap;
use std::path::Path;

/// Atlas name encoded in a masked atlas file name
///
/// The name is the last `_`-separated token before `.nii`, so
/// `group_mask_seitzman-set1.nii` yields `seitzman-set1`.
pub fn atlas_name_from_path(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let last_token = file_name.rsplit('_').next()?;
    let name = last_token.split(".nii").next()?;
    (!name.is_empty()).then(|| name.to_string())
}

/// Voxel sets of every region of a label image
///
/// Voxels are addressed by their row-major flat index over the spatial axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelAtlas {
    shape: Vec<usize>,
    regions: BTreeMap<i64, Vec<usize>>,
}

impl LabelAtlas {
    /// Collect the non-zero labels of an atlas volume
    ///
    /// Label values are rounded to the nearest integer. Background (0) and
    /// NaN voxels belong to no region. Trailing singleton axes past the third
    /// are dropped from the shape.
    pub fn from_volume(volume: &Volume) -> Self {
        let mut shape = volume.shape().to_vec();
        while shape.len() > 3 && shape.last() == Some(&1) {
            shape.pop();
        }

        let mut regions: BTreeMap<i64, Vec<usize>> = BTreeMap::new();

        for (index, &value) in volume.data().iter().enumerate() {
            if value.is_nan() {
                continue;
            }
            let label = value.round() as i64;
            if label != 0 {
                regions.entry(label).or_default().push(index);
            }
        }

        Self { shape, regions }
    }

    /// Spatial shape of the atlas
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of spatial voxels
    pub fn voxel_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Region labels in ascending order
    pub fn labels(&self) -> Vec<i64> {
        self.regions.keys().copied().collect()
    }

    /// Number of regions
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the atlas has no region at all
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Regions as (label, voxel indices), ascending by label
    pub fn regions(&self) -> impl Iterator<Item = (i64, &[usize])> {
        self.regions
            .iter()
            .map(|(label, voxels)| (*label, voxels.as_slice()))
    }
}
