//! Voxel-to-world transforms for the NIfTI exports.

use nalgebra::{Matrix3, Matrix4, Vector3};

/// A 4x4 voxel-to-world matrix.
pub type Affine4 = Matrix4<f64>;

/// Separate a 4x4 affine into its 3x3 linear part and translation.
pub fn split_affine(affine: &Affine4) -> (Matrix3<f64>, Vector3<f64>) {
    let linear = affine.fixed_view::<3, 3>(0, 0).into_owned();
    let translation = Vector3::new(affine[(0, 3)], affine[(1, 3)], affine[(2, 3)]);
    (linear, translation)
}

/// Affine implied by a shape and voxel spacing: axis-aligned, with voxel
/// `dims / 2` (integer halving) at the world origin.
#[rustfmt::skip]
pub fn centred_affine(dims: [usize; 3], spacing: [f64; 3]) -> Affine4 {
    let origin = Vector3::new(
        (dims[0] / 2) as f64,
        (dims[1] / 2) as f64,
        (dims[2] / 2) as f64,
    );
    Affine4::new(
        spacing[0], 0.0, 0.0, -origin[0] * spacing[0],
        0.0, spacing[1], 0.0, -origin[1] * spacing[1],
        0.0, 0.0, spacing[2], -origin[2] * spacing[2],
        0.0, 0.0, 0.0, 1.0,
    )
}

/// The first three rows of an affine, as stored in the `srow_*` header fields.
pub fn srows(affine: &Affine4) -> [[f32; 4]; 3] {
    let mut rows = [[0f32; 4]; 3];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = affine[(r, c)] as f32;
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centred() {
        let affine = centred_affine([10, 4, 3], [0.5, 2., 1.]);
        let (linear, translation) = split_affine(&affine);
        assert_eq!(linear, Matrix3::from_diagonal(&Vector3::new(0.5, 2., 1.)));
        assert_eq!(translation, Vector3::new(-2.5, -4., -1.));
        assert_eq!(affine[(3, 3)], 1.);
    }

    #[test]
    fn rows() {
        let rows = srows(&centred_affine([2, 2, 2], [1., 1., 3.]));
        assert_eq!(rows[0], [1., 0., 0., -1.]);
        assert_eq!(rows[2], [0., 0., 3., -3.]);
    }
}
