//! Brain masks and atlases on the template grid

/// Labelled atlases and their region voxel sets
pub mod atlas;
/// Group brain masks and atlas masking
pub mod mask;
