//! NIfTI volume loading and export

use crate::io::discovery::create_parent_dir;
use crate::io::error::{AnalysisError, Result, computation_error};
use ndarray::{ArrayD, IxDyn};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::path::Path;

/// Dense voxel data together with the header it was read with
///
/// Data is indexed in NIfTI axis order (x, y, z[, t]). The header is reused as
/// reference when saving so that the affine and voxel sizes are preserved.
#[derive(Debug, Clone)]
pub struct Volume {
    data: ArrayD<f64>,
    header: NiftiHeader,
}

impl Volume {
    /// Wrap existing data with a header
    pub const fn from_parts(data: ArrayD<f64>, header: NiftiHeader) -> Self {
        Self { data, header }
    }

    /// Read a `.nii` or `.nii.gz` file, applying the header intensity scaling
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or decoded
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |source| AnalysisError::VolumeLoad {
            path: path.to_path_buf(),
            source,
        };

        let object = ReaderOptions::new().read_file(path).map_err(load_error)?;
        let mut header = object.header().clone();
        let data = object
            .into_volume()
            .into_ndarray::<f64>()
            .map_err(load_error)?;

        // Scaling is already applied to the data
        header.scl_slope = 1.0;
        header.scl_inter = 0.0;

        Ok(Self { data, header })
    }

    /// Write the volume, creating parent directories as needed
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// volume cannot be encoded
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        create_parent_dir(path)?;

        WriterOptions::new(path)
            .reference_header(&self.header)
            .write_nifti(&self.data)
            .map_err(|source| AnalysisError::VolumeExport {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Voxel data
    pub const fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    /// Take ownership of the voxel data
    pub fn into_data(self) -> ArrayD<f64> {
        self.data
    }

    /// Header the volume was read with
    pub const fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// Array shape
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// New volume with `data` and this volume's header
    pub fn with_data(&self, data: ArrayD<f64>) -> Self {
        Self {
            data,
            header: self.header.clone(),
        }
    }

    /// Reinterpret the data with another shape of the same element count
    ///
    /// Elements are taken in logical row-major order, so a trailing singleton
    /// axis can be dropped or added without moving any voxel.
    ///
    /// # Errors
    ///
    /// Returns a shape mismatch if the element counts differ
    pub fn reshaped(&self, shape: &[usize], origin: &Path) -> Result<ArrayD<f64>> {
        if self.data.shape() == shape {
            return Ok(self.data.clone());
        }

        let expected: usize = shape.iter().product();
        if expected != self.data.len() {
            return Err(AnalysisError::ShapeMismatch {
                path: origin.to_path_buf(),
                expected: shape.to_vec(),
                found: self.data.shape().to_vec(),
            });
        }

        let values: Vec<f64> = self.data.iter().copied().collect();
        ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|e| {
            computation_error("reshape volume", &e)
        })
    }

    /// Data with trailing singleton axes beyond `shape` removed
    ///
    /// # Errors
    ///
    /// Returns a shape mismatch unless the volume has exactly `shape`
    /// followed by zero or more axes of length one
    pub fn conformed(&self, shape: &[usize], origin: &Path) -> Result<ArrayD<f64>> {
        let own = self.data.shape();
        let compatible = own.len() >= shape.len()
            && own.get(..shape.len()) == Some(shape)
            && own.get(shape.len()..).is_some_and(|rest| rest.iter().all(|&d| d == 1));

        if compatible {
            self.reshaped(shape, origin)
        } else {
            Err(AnalysisError::ShapeMismatch {
                path: origin.to_path_buf(),
                expected: shape.to_vec(),
                found: own.to_vec(),
            })
        }
    }
}
