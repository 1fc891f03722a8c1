//! Conversions between the logical grid order and the on-disk storage order,
//! plus the geometry helpers shared by the format adapters.
//!
//! MHA payloads list values with the last header axis varying slowest and
//! the channel components in reverse order. Given a grid of shape
//! `(d0, d1, d2, c)`, the stored sequence is the row-major traversal of the
//! array transposed to `(d2, d1, d0, c)` with its channel axis reversed. The
//! transform is its own inverse.
//!
//! FLD payloads are the plain row-major traversal of the grid, and list the
//! axes in reverse order in their header.

use ndarray::{Array, Array4, ArrayView4, Axis};

use crate::error::{FlowError, Result};

/// View a logical `(d0, d1, d2, c)` array in storage order. Iterating the
/// returned view yields values in the order they are written to disk.
pub fn storage_view<'a>(voxels: ArrayView4<'a, f32>) -> ArrayView4<'a, f32> {
    let mut view = voxels.permuted_axes([2, 1, 0, 3]);
    view.invert_axis(Axis(3));
    view
}

/// Flatten a logical array into the storage sequence.
pub fn to_storage(voxels: ArrayView4<f32>) -> Vec<f32> {
    storage_view(voxels).iter().cloned().collect()
}

/// Rebuild a logical array from a storage sequence. `dims` are the logical
/// grid dimensions, i.e. the header `DimSize`.
pub fn from_storage(values: Vec<f32>, dims: [usize; 3], channels: usize) -> Result<Array4<f32>> {
    let expected = dims.iter().product::<usize>() * channels;
    if values.len() != expected {
        return Err(FlowError::IncompatibleLength(values.len(), expected));
    }
    let stored = Array::from_shape_vec((dims[2], dims[1], dims[0], channels), values)
        .map_err(|_| FlowError::IncompatibleLength(expected, expected))?;
    let logical = storage_view(stored.view());
    Array::from_shape_vec(logical.raw_dim(), logical.iter().cloned().collect())
        .map_err(|_| FlowError::IncompatibleLength(expected, expected))
}

/// Reverse the order of the three axes of a per-axis quantity.
pub fn reversed<T: Copy>(v: [T; 3]) -> [T; 3] {
    [v[2], v[1], v[0]]
}

/// Number of payload bytes of `f32` values for a grid, or an error when the
/// count does not fit in memory addresses.
pub fn payload_len(dims: [usize; 3], channels: usize) -> Result<usize> {
    dims.iter()
        .try_fold(channels * 4, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| {
            FlowError::InvalidGeometry(format!(
                "{} x {} x {} x {} values overflow the address space",
                dims[0], dims[1], dims[2], channels
            ))
        })
}

/// Offset placing the grid in the LPI convention: the first two axes are
/// centred on the origin with positive sign, the third with negative sign.
/// Halving is done on the integer dimension.
pub fn lpi_offset(dims: [usize; 3], spacing: [f64; 3]) -> [f64; 3] {
    [
        (dims[0] / 2) as f64 * spacing[0],
        (dims[1] / 2) as f64 * spacing[1],
        -((dims[2] / 2) as f64) * spacing[2],
    ]
}

/// Spacing of a uniform grid spanning `[min, max]` with `dims` samples per axis.
pub fn spacing_from_extents(dims: [usize; 3], min: [f64; 3], max: [f64; 3]) -> Result<[f64; 3]> {
    let mut spacing = [0.; 3];
    for i in 0..3 {
        if dims[i] < 2 {
            return Err(FlowError::InvalidGeometry(format!(
                "cannot derive spacing of axis {} from {} sample(s)",
                i, dims[i]
            )));
        }
        spacing[i] = (max[i] - min[i]) / (dims[i] - 1) as f64;
    }
    Ok(spacing)
}

/// Midpoint of the extents on each axis.
pub fn midpoint(min: [f64; 3], max: [f64; 3]) -> [f64; 3] {
    [
        (min[0] + max[0]) / 2.,
        (min[1] + max[1]) / 2.,
        (min[2] + max[2]) / 2.,
    ]
}

/// Extents of a grid whose centre sits at `centre`.
pub fn centred_extents(dims: [usize; 3], spacing: [f64; 3], centre: [f64; 3]) -> ([f64; 3], [f64; 3]) {
    let mut min = [0.; 3];
    let mut max = [0.; 3];
    for i in 0..3 {
        let half = dims[i].saturating_sub(1) as f64 * spacing[i] / 2.;
        min[i] = centre[i] - half;
        max[i] = centre[i] + half;
    }
    (min, max)
}
