//! Voxel-wise comparison of two vector fields on the same grid.
//!
//! For every voxel the relative magnitude deviation (in percent, each field
//! normalised by its mean magnitude) and the angle between the two vectors
//! (in degrees) are computed, together with their averages over the voxels
//! where at least one field is non-zero.

use std::path::{Path, PathBuf};

use ndarray::{Array3, Array4, Axis};

use crate::error::{DecodeWarning, FlowError, Result};
use crate::header::MhaHeader;
use crate::object::ReaderOptions;
use crate::util::base_name;
use crate::volume::VolumeGrid;
use crate::writer::{Encoding, WriterOptions};

/// What to do with the last slice along the first grid axis, which holds
/// artefacts in the simulation outputs this tool is used on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingSlice {
    /// Zero the slice in both deviation maps after the mean magnitudes are
    /// taken. Zeroed voxels still count towards the averages.
    AfterStatistics,
    /// Zero the slice in both inputs before anything is computed.
    BeforeStatistics,
    /// Leave the slice alone.
    Keep,
}

impl Default for TrailingSlice {
    fn default() -> Self {
        TrailingSlice::AfterStatistics
    }
}

/// Options for a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompareOptions {
    /// Treatment of the last slice
    pub trailing_slice: TrailingSlice,
}

/// Result of comparing two grids.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Normalised magnitude deviation, in percent
    pub magnitude_deviation: Array3<f32>,
    /// Angle between the vectors, in degrees
    pub angular_deviation: Array3<f32>,
    /// Mean absolute magnitude deviation, `None` if both fields are zero
    pub average_magnitude_deviation: Option<f64>,
    /// Mean angular deviation, `None` if both fields are zero
    pub average_angular_deviation: Option<f64>,
}

/// Names of the core header fields on which two headers disagree.
pub fn header_differences(a: &MhaHeader, b: &MhaHeader) -> Vec<&'static str> {
    let mut diff = Vec::new();
    if a.object_type != b.object_type {
        diff.push("ObjectType");
    }
    if a.ndims != b.ndims {
        diff.push("NDims");
    }
    if a.binary_data != b.binary_data {
        diff.push("BinaryData");
    }
    if a.byte_order_msb != b.byte_order_msb {
        diff.push("BinaryDataByteOrderMSB");
    }
    if a.element_spacing != b.element_spacing {
        diff.push("ElementSpacing");
    }
    if a.dim_size != b.dim_size {
        diff.push("DimSize");
    }
    if a.channels != b.channels {
        diff.push("ElementNumberOfChannels");
    }
    if a.element_type != b.element_type {
        diff.push("ElementType");
    }
    if a.element_data_file != b.element_data_file {
        diff.push("ElementDataFile");
    }
    diff
}

fn mean(values: &Array3<f32>) -> f64 {
    values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64
}

fn masked_mean(values: &Array3<f32>, mask: &Array3<bool>) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .zip(mask.iter())
        .filter(|(_, m)| **m)
        .fold((0f64, 0usize), |(s, n), (&v, _)| (s + f64::from(v).abs(), n + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

fn zero_last_slice<A: Clone + Default, D: ndarray::RemoveAxis>(array: &mut ndarray::Array<A, D>) {
    let last = array.len_of(Axis(0)) - 1;
    array.index_axis_mut(Axis(0), last).fill(A::default());
}

/// Compare two grids of identical shape.
pub fn compare_grids(a: &VolumeGrid, b: &VolumeGrid, options: &CompareOptions) -> Result<Comparison> {
    if a.voxels().shape() != b.voxels().shape() {
        return Err(FlowError::ShapeMismatch(
            a.voxels().shape().to_vec(),
            b.voxels().shape().to_vec(),
        ));
    }
    let mut va: Array4<f32> = a.voxels().to_owned();
    let mut vb: Array4<f32> = b.voxels().to_owned();
    if options.trailing_slice == TrailingSlice::BeforeStatistics {
        zero_last_slice(&mut va);
        zero_last_slice(&mut vb);
    }
    let norm = |v: ndarray::ArrayView1<f32>| v.iter().map(|x| x * x).sum::<f32>().sqrt();
    let m1 = va.map_axis(Axis(3), norm);
    let m2 = vb.map_axis(Axis(3), norm);
    let avg1 = mean(&m1);
    let avg2 = mean(&m2);

    let dims = m1.dim();
    let mut magnitude_deviation = Array3::<f32>::zeros(dims);
    let mut angular_deviation = Array3::<f32>::zeros(dims);
    let mut mask = Array3::from_elem(dims, false);
    for ((idx, &x), &y) in m1.indexed_iter().zip(m2.iter()) {
        if x + y != 0. {
            mask[idx] = true;
            let p = if x == 0. { 0. } else { f64::from(x) / avg1 };
            let q = if y == 0. { 0. } else { f64::from(y) / avg2 };
            magnitude_deviation[idx] = ((p - q) / ((p + q) / 2.) * 100.) as f32;
        }
        if x * y != 0. {
            let (i, j, k) = idx;
            let u = va.slice(ndarray::s![i, j, k, ..]);
            let w = vb.slice(ndarray::s![i, j, k, ..]);
            let cos: f32 = u.iter().zip(w.iter()).map(|(s, t)| (s / x) * (t / y)).sum();
            angular_deviation[idx] = f64::from(cos.max(-1.).min(1.)).acos().to_degrees() as f32;
        }
    }
    if options.trailing_slice == TrailingSlice::AfterStatistics {
        zero_last_slice(&mut magnitude_deviation);
        zero_last_slice(&mut angular_deviation);
    }

    Ok(Comparison {
        average_magnitude_deviation: masked_mean(&magnitude_deviation, &mask),
        average_angular_deviation: masked_mean(&angular_deviation, &mask),
        magnitude_deviation,
        angular_deviation,
    })
}

/// The result of comparing two files.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareReport {
    /// Deviation maps and averages
    pub comparison: Comparison,
    /// Header mismatches and decoding warnings of both inputs
    pub warnings: Vec<DecodeWarning>,
    /// Magnitude and angle deviation files written
    pub outputs: [PathBuf; 2],
}

/// `<dir of first>/<first>-<second>_MAGNT_DIFF.mha` and `..._ANGLE_DIFF.mha`.
pub fn output_paths(first: &Path, second: &Path) -> [PathBuf; 2] {
    let stem = format!("{}-{}", base_name(first), base_name(second));
    let dir = first.parent().unwrap_or_else(|| Path::new(""));
    [
        dir.join(format!("{}_MAGNT_DIFF.mha", stem)),
        dir.join(format!("{}_ANGLE_DIFF.mha", stem)),
    ]
}

/// Compare two vector MHA files and write the deviation maps next to the
/// first one. Geometry fields of the outputs are taken from the first header.
pub fn compare_files<P, Q>(
    first: P,
    second: Q,
    options: &CompareOptions,
    reader: &ReaderOptions,
    encoding: Encoding,
) -> Result<CompareReport>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (first, second) = (first.as_ref(), second.as_ref());
    let reader = reader.clone().expected_channels(3);
    let obj1 = reader.read_file(first)?;
    let obj2 = reader.read_file(second)?;

    let mut warnings: Vec<DecodeWarning> = obj1.warnings().to_vec();
    warnings.extend_from_slice(obj2.warnings());
    let diff = header_differences(obj1.header(), obj2.header());
    if !diff.is_empty() {
        warnings.push(DecodeWarning::HeaderMismatch(diff).logged());
    }

    let comparison = compare_grids(obj1.grid(), obj2.grid(), options)?;
    let show = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}", v));
    log::info!(
        "average magnitude deviation: {} %",
        show(comparison.average_magnitude_deviation)
    );
    log::info!(
        "average angular deviation: {} degrees",
        show(comparison.average_angular_deviation)
    );

    let outputs = output_paths(first, second);
    let grid = obj1.grid();
    let maps = [&comparison.magnitude_deviation, &comparison.angular_deviation];
    for (path, map) in outputs.iter().zip(maps.iter()) {
        let scalar = VolumeGrid::from_scalar((*map).clone(), grid.spacing(), grid.offset())?;
        WriterOptions::new(path)
            .encoding(encoding)
            .reference_header(obj1.header())
            .write_mha(&scalar)?;
    }

    Ok(CompareReport {
        comparison,
        warnings,
        outputs,
    })
}
