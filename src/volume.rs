//! The in-memory volume grid shared by every format.
//!
//! A [`VolumeGrid`] is a dense 3-D grid of single precision values with one
//! (scalar) or three (vector) channels per voxel. The voxels are held in a
//! 4-D array of shape `(d0, d1, d2, channels)`; `dims[i]` and `spacing[i]`
//! always describe the same axis.

use ndarray::{Array, Array3, Array4, ArrayView4, ArrayViewMut4, Axis, Ix4};

use crate::error::{FlowError, Result};

/// A uniformly spaced scalar or vector field.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeGrid {
    spacing: [f64; 3],
    offset: [f64; 3],
    voxels: Array4<f32>,
}

fn check_channels(channels: usize) -> Result<()> {
    if channels == 1 || channels == 3 {
        Ok(())
    } else {
        Err(FlowError::UnsupportedChannels(channels))
    }
}

fn check_geometry(dims: &[usize], spacing: &[f64; 3]) -> Result<()> {
    if let Some(d) = dims.iter().position(|&d| d == 0) {
        return Err(FlowError::InvalidGeometry(format!(
            "dimension {} has zero length",
            d
        )));
    }
    if let Some(s) = spacing.iter().find(|s| !(s.is_finite() && **s > 0.)) {
        return Err(FlowError::InvalidGeometry(format!(
            "spacing must be positive, found {}",
            s
        )));
    }
    Ok(())
}

impl VolumeGrid {
    /// Wrap an array of shape `(d0, d1, d2, channels)`.
    pub fn new(voxels: Array4<f32>, spacing: [f64; 3], offset: [f64; 3]) -> Result<Self> {
        check_channels(voxels.len_of(Axis(3)))?;
        check_geometry(&voxels.shape()[..3], &spacing)?;
        Ok(VolumeGrid {
            spacing,
            offset,
            voxels,
        })
    }

    /// Build a grid from values listed in row-major order of
    /// `(d0, d1, d2, channels)`.
    pub fn from_shape_vec(
        dims: [usize; 3],
        channels: usize,
        values: Vec<f32>,
        spacing: [f64; 3],
        offset: [f64; 3],
    ) -> Result<Self> {
        check_channels(channels)?;
        let expected = dims.iter().product::<usize>() * channels;
        if values.len() != expected {
            return Err(FlowError::IncompatibleLength(values.len(), expected));
        }
        let voxels = Array::from_shape_vec((dims[0], dims[1], dims[2], channels), values)
            .map_err(|_| FlowError::IncompatibleLength(expected, expected))?;
        Self::new(voxels, spacing, offset)
    }

    /// A grid of zeros with unit spacing and zero offset.
    pub fn zeros(dims: [usize; 3], channels: usize) -> Result<Self> {
        check_channels(channels)?;
        Self::new(
            Array4::zeros((dims[0], dims[1], dims[2], channels)),
            [1.; 3],
            [0.; 3],
        )
    }

    /// Wrap a single-channel volume.
    pub fn from_scalar(values: Array3<f32>, spacing: [f64; 3], offset: [f64; 3]) -> Result<Self> {
        Self::new(values.insert_axis(Axis(3)), spacing, offset)
    }

    /// Number of voxels along each axis.
    pub fn dims(&self) -> [usize; 3] {
        let s = self.voxels.shape();
        [s[0], s[1], s[2]]
    }

    /// Values per voxel, 1 or 3.
    pub fn channels(&self) -> usize {
        self.voxels.len_of(Axis(3))
    }

    /// Physical distance between neighbouring voxel centres, per axis.
    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    /// Physical position of the grid origin.
    pub fn offset(&self) -> [f64; 3] {
        self.offset
    }

    /// Replace the grid origin.
    pub fn set_offset(&mut self, offset: [f64; 3]) {
        self.offset = offset;
    }

    /// Replace the spacing. Values must be positive.
    pub fn set_spacing(&mut self, spacing: [f64; 3]) -> Result<()> {
        check_geometry(&self.voxels.shape()[..3], &spacing)?;
        self.spacing = spacing;
        Ok(())
    }

    /// Total number of stored values (voxels times channels).
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    /// Whether the grid holds no values. Never true for a validated grid.
    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// Size of the raw payload, in bytes.
    pub fn byte_len(&self) -> usize {
        self.len() * ::std::mem::size_of::<f32>()
    }

    /// View of the voxels, shaped `(d0, d1, d2, channels)`.
    pub fn voxels(&self) -> ArrayView4<f32> {
        self.voxels.view()
    }

    /// Mutable view of the voxels.
    pub fn voxels_mut(&mut self) -> ArrayViewMut4<f32> {
        self.voxels.view_mut()
    }

    /// Move the voxel array out of the grid.
    pub fn into_voxels(self) -> Array<f32, Ix4> {
        self.voxels
    }

    /// Multiply every value by `factor`, e.g. for a change of velocity unit.
    pub fn scale(&mut self, factor: f32) {
        self.voxels.mapv_inplace(|v| v * factor);
    }

    /// Copy of one channel as a 3-D volume.
    pub fn component(&self, channel: usize) -> Array3<f32> {
        self.voxels.index_axis(Axis(3), channel).to_owned()
    }

    /// Euclidean norm of each voxel. For scalar grids this is the absolute value.
    pub fn magnitude(&self) -> Array3<f32> {
        self.voxels
            .map_axis(Axis(3), |v| v.iter().map(|x| x * x).sum::<f32>().sqrt())
    }
}
