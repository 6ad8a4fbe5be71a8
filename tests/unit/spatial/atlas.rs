//! Tests for atlas names and label voxel sets

#[cfg(test)]
mod tests {
    use ndarray::{ArrayD, IxDyn};
    use neuroconn::io::volume::Volume;
    use neuroconn::spatial::atlas::{LabelAtlas, atlas_name_from_path};
    use nifti::NiftiHeader;
    use std::path::Path;

    fn volume(shape: &[usize], values: Vec<f64>) -> Volume {
        Volume::from_parts(
            ArrayD::from_shape_vec(IxDyn(shape), values).unwrap(),
            NiftiHeader::default(),
        )
    }

    // Tests the name is the last underscore token before the extension
    // Verified by taking the first token instead
    #[test]
    fn test_atlas_name_from_path() {
        assert_eq!(
            atlas_name_from_path(Path::new("/conn/group_mask_seitzman-set1.nii")).as_deref(),
            Some("seitzman-set1")
        );
        assert_eq!(
            atlas_name_from_path(Path::new("group_mask_seitzman-set2.nii.gz")).as_deref(),
            Some("seitzman-set2")
        );
        assert_eq!(
            atlas_name_from_path(Path::new("aal.nii")).as_deref(),
            Some("aal")
        );
    }

    #[test]
    fn test_atlas_name_empty() {
        assert_eq!(atlas_name_from_path(Path::new("group_mask_.nii")), None);
    }

    // Tests labels are sorted and voxels grouped per label
    // Verified by keeping background voxels
    #[test]
    fn test_label_atlas_regions() {
        let atlas = LabelAtlas::from_volume(&volume(
            &[2, 2, 2],
            vec![3.0, 0.0, 1.0, 1.0, 0.0, 3.0, 2.0, 0.0],
        ));

        assert_eq!(atlas.labels(), vec![1, 2, 3]);
        assert_eq!(atlas.len(), 3);
        assert!(!atlas.is_empty());
        assert_eq!(atlas.voxel_count(), 8);

        let regions: Vec<(i64, Vec<usize>)> =
            atlas.regions().map(|(l, v)| (l, v.to_vec())).collect();
        assert_eq!(
            regions,
            vec![(1, vec![2, 3]), (2, vec![6]), (3, vec![0, 5])]
        );
    }

    // Tests float labels are rounded and NaN ignored
    #[test]
    fn test_label_atlas_rounding() {
        let atlas = LabelAtlas::from_volume(&volume(&[4, 1, 1], vec![0.9999, f64::NAN, 2.0001, 0.2]));
        assert_eq!(atlas.labels(), vec![1, 2]);
    }

    // Tests a trailing singleton axis is not part of the spatial shape
    #[test]
    fn test_label_atlas_drops_singleton_axis() {
        let atlas = LabelAtlas::from_volume(&volume(&[2, 1, 2, 1], vec![1.0, 0.0, 0.0, 1.0]));
        assert_eq!(atlas.shape(), &[2, 1, 2]);
        assert_eq!(atlas.voxel_count(), 4);
    }

    #[test]
    fn test_label_atlas_empty() {
        let atlas = LabelAtlas::from_volume(&volume(&[2, 2, 1], vec![0.0; 4]));
        assert!(atlas.is_empty());
        assert!(atlas.labels().is_empty());
    }
}
