//! NIfTI-1 exports (`.nii.gz`), written with the `nifti` crate.

use std::path::{Path, PathBuf};

use ndarray::Array3;
use nifti::header::MAGIC_CODE_NIP1;
use nifti::writer::WriterOptions as NiftiWriterOptions;
use nifti::NiftiHeader;

use crate::affine::{centred_affine, split_affine, srows};
use crate::error::{FlowError, Result};
use crate::object::ReaderOptions;
use crate::util::sibling_path;

/// `xyzt_units` value for unknown units.
pub const UNITS_UNKNOWN: u8 = 0;
/// `xyzt_units` value for micrometres and seconds.
pub const UNITS_MICRON_SEC: u8 = 3 | 8;

/// Suffixes of the per-component files of a vector grid, by channel.
pub const COMPONENT_SUFFIXES: [&str; 3] = ["_X", "_Y", "_Z"];

/// Which of the two header transforms is marked as valid. The srows are
/// filled in either case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialCode {
    /// `sform_code = 1`, `qform_code = 0`
    Sform,
    /// `qform_code = 1`, `sform_code = 0`, with an identity rotation
    Qform,
}

/// Header for an axis-aligned volume centred on the origin.
pub fn nifti_header(
    dims: [usize; 3],
    spacing: [f64; 3],
    xyzt_units: u8,
    code: SpatialCode,
) -> NiftiHeader {
    let affine = centred_affine(dims, spacing);
    let (linear, translation) = split_affine(&affine);
    let [srow_x, srow_y, srow_z] = srows(&affine);
    let (sform_code, qform_code) = match code {
        SpatialCode::Sform => (1, 0),
        SpatialCode::Qform => (0, 1),
    };
    NiftiHeader {
        pixdim: [
            1.,
            linear[(0, 0)] as f32,
            linear[(1, 1)] as f32,
            linear[(2, 2)] as f32,
            1.,
            1.,
            1.,
            1.,
        ],
        xyzt_units,
        sform_code,
        qform_code,
        quatern_b: 0.,
        quatern_c: 0.,
        quatern_d: 0.,
        quatern_x: translation[0] as f32,
        quatern_y: translation[1] as f32,
        quatern_z: translation[2] as f32,
        srow_x,
        srow_y,
        srow_z,
        scl_slope: 1.,
        scl_inter: 0.,
        magic: *MAGIC_CODE_NIP1,
        ..NiftiHeader::default()
    }
}

fn external(e: nifti::NiftiError) -> FlowError {
    FlowError::External(format!("NIfTI write failed: {}", e))
}

fn dims_of<T>(data: &Array3<T>) -> [usize; 3] {
    let (a, b, c) = data.dim();
    [a, b, c]
}

/// Write a float volume.
pub fn write_f32<P: AsRef<Path>>(
    path: P,
    data: &Array3<f32>,
    spacing: [f64; 3],
    xyzt_units: u8,
    code: SpatialCode,
) -> Result<()> {
    let header = nifti_header(dims_of(data), spacing, xyzt_units, code);
    NiftiWriterOptions::new(path.as_ref())
        .reference_header(&header)
        .write_nifti(data)
        .map_err(external)?;
    log::info!("wrote {}", path.as_ref().display());
    Ok(())
}

/// Write a 16 bit integer volume, e.g. a mask.
pub fn write_i16<P: AsRef<Path>>(
    path: P,
    data: &Array3<i16>,
    spacing: [f64; 3],
    xyzt_units: u8,
    code: SpatialCode,
) -> Result<()> {
    let header = nifti_header(dims_of(data), spacing, xyzt_units, code);
    NiftiWriterOptions::new(path.as_ref())
        .reference_header(&header)
        .write_nifti(data)
        .map_err(external)?;
    log::info!("wrote {}", path.as_ref().display());
    Ok(())
}

/// Export an MHA file as NIfTI next to it. Scalar grids give `<base>.nii.gz`;
/// vector grids give one file per channel (`_X`, `_Y`, `_Z`) plus the
/// magnitude (`_MAG`). Returns the paths written.
pub fn mha_to_nifti<P: AsRef<Path>>(input: P, reader: &ReaderOptions) -> Result<Vec<PathBuf>> {
    let input = input.as_ref();
    let grid = reader.read_file(input)?.into_grid();
    let spacing = grid.spacing();
    let write = |path: &Path, data: &Array3<f32>| {
        write_f32(path, data, spacing, UNITS_UNKNOWN, SpatialCode::Sform)
    };
    let mut written = Vec::new();
    if grid.channels() == 1 {
        let output = sibling_path(input, ".nii.gz");
        write(&output, &grid.component(0))?;
        written.push(output);
        return Ok(written);
    }
    for (channel, suffix) in COMPONENT_SUFFIXES.iter().enumerate() {
        let output = sibling_path(input, &format!("{}.nii.gz", suffix));
        write(&output, &grid.component(channel))?;
        written.push(output);
    }
    let output = sibling_path(input, "_MAG.nii.gz");
    write(&output, &grid.magnitude())?;
    written.push(output);
    Ok(written)
}
