//! Scalar-to-volume mapping
//!
//! Maps a table of (label, value) pairs onto a labeled template volume:
//! every voxel whose label matches a row takes the row's value, unmatched
//! voxels stay zero. Rendering the resulting volume to an image is an
//! external concern and not handled here.

use ndarray::{Array3, Zip};

/// One (parcellation label, scalar value) pair to paint onto the template
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelValue {
    pub label: f64,
    pub value: f64,
}

/// Replace every voxel of `labels` matching a row's label with the row's
/// value; unmatched voxels remain 0.0.
///
/// Label matching is exact equality. Rows with the same label overwrite
/// in iteration order, so the last occurrence wins.
pub fn map_table_to_volume(rows: &[LabelValue], labels: &Array3<f64>) -> Array3<f64> {
    let mut volume = Array3::zeros(labels.raw_dim());
    for row in rows {
        Zip::from(&mut volume).and(labels).for_each(|voxel, &label| {
            if label == row.label {
                *voxel = row.value;
            }
        });
    }
    volume
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr3;

    fn template() -> Array3<f64> {
        arr3(&[[[1.0, 2.0], [2.0, 3.0]], [[3.0, 0.0], [1.0, 2.0]]])
    }

    #[test]
    fn test_labels_replaced_by_values() {
        let rows = [
            LabelValue { label: 1.0, value: 0.5 },
            LabelValue { label: 2.0, value: 0.7 },
        ];
        let volume = map_table_to_volume(&rows, &template());

        assert_eq!(volume[[0, 0, 0]], 0.5);
        assert_eq!(volume[[0, 0, 1]], 0.7);
        assert_eq!(volume[[0, 1, 0]], 0.7);
        assert_eq!(volume[[1, 1, 0]], 0.5);
    }

    #[test]
    fn test_unmatched_voxels_stay_zero() {
        let rows = [LabelValue { label: 1.0, value: 0.5 }];
        let volume = map_table_to_volume(&rows, &template());

        // Label 3 has no row; background (0) stays untouched
        assert_eq!(volume[[1, 0, 0]], 0.0);
        assert_eq!(volume[[1, 0, 1]], 0.0);
    }

    #[test]
    fn test_duplicate_labels_last_wins() {
        let rows = [
            LabelValue { label: 2.0, value: 0.1 },
            LabelValue { label: 2.0, value: 0.9 },
        ];
        let volume = map_table_to_volume(&rows, &template());

        assert_eq!(volume[[0, 0, 1]], 0.9);
        assert_eq!(volume[[0, 1, 0]], 0.9);
    }
}
