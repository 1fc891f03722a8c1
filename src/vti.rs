//! VTK XML image data (`.vti`): every point data array becomes one MHA file.
//!
//! VTK lists point values with x varying fastest and components interleaved,
//! which is exactly the MHA storage sequence of a grid with dimensions
//! `(nx, ny, nz)`. The grid channels are therefore the VTK components in
//! reverse order, and the third origin component changes sign to follow the
//! LPI transform matrix.

use std::path::{Path, PathBuf};

use crate::error::{DecodeWarning, FlowError, Result};
use crate::layout::from_storage;
use crate::volume::VolumeGrid;

/// One point data array.
#[derive(Debug, Clone, PartialEq)]
pub struct PointArray {
    /// Array name, used in the output file name
    pub name: String,
    /// Components per point
    pub components: usize,
    /// Values, x fastest, components interleaved
    pub values: Vec<f32>,
}

/// The parts of a VTK image this crate converts.
#[derive(Debug, Clone, PartialEq)]
pub struct VtiImage {
    /// Points along x, y and z
    pub dims: [usize; 3],
    /// Spacing along x, y and z
    pub spacing: [f64; 3],
    /// Origin, `(x, y, z)`
    pub origin: [f64; 3],
    /// Point data arrays
    pub point_arrays: Vec<PointArray>,
    /// Number of cell data arrays, which cannot be converted
    pub cell_arrays: usize,
}

impl VtiImage {
    /// Number of axes with more than one point.
    pub fn data_dimension(&self) -> usize {
        self.dims.iter().filter(|&&d| d > 1).count()
    }

    /// Turn each convertible array into a grid, in file order. Arrays with
    /// other than 1 or 3 components are skipped with a warning.
    pub fn into_grids(self) -> Result<(Vec<(String, VolumeGrid)>, Vec<DecodeWarning>)> {
        if self.data_dimension() != 3 {
            return Err(FlowError::UnsupportedStructure(format!(
                "only 3D images are supported, found {} dimension(s)",
                self.data_dimension()
            )));
        }
        if self.cell_arrays != 0 {
            return Err(FlowError::UnsupportedStructure(format!(
                "{} cell data array(s) present",
                self.cell_arrays
            )));
        }

        let [sx, sy, sz] = self.spacing;
        let [ox, oy, oz] = self.origin;
        let mut grids = Vec::new();
        let mut warnings = Vec::new();
        for array in self.point_arrays {
            if array.components != 1 && array.components != 3 {
                warnings.push(
                    DecodeWarning::SkippedArray {
                        name: array.name,
                        components: array.components,
                    }
                    .logged(),
                );
                continue;
            }
            let voxels = from_storage(array.values, self.dims, array.components)?;
            let grid = VolumeGrid::new(voxels, [sx, sy, sz], [ox, oy, -oz])?;
            grids.push((array.name, grid));
        }
        Ok((grids, warnings))
    }
}

#[cfg(feature = "vti")]
fn external(e: vtkio::Error) -> FlowError {
    FlowError::External(format!("VTK import failed: {:?}", e))
}

#[cfg(feature = "vti")]
impl VtiImage {
    /// Import a `.vti` file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<VtiImage> {
        use vtkio::model::{Attribute, DataArray, DataSet, Extent, Piece};

        let mut vtk = vtkio::Vtk::import(path.as_ref()).map_err(external)?;
        vtk.load_all_pieces()
            .map_err(|e| FlowError::External(format!("VTK piece load failed: {:?}", e)))?;
        let (extent, origin, spacing, pieces) = match vtk.data {
            DataSet::ImageData {
                extent,
                origin,
                spacing,
                pieces,
                ..
            } => (extent, origin, spacing, pieces),
            _ => {
                return Err(FlowError::UnsupportedStructure(
                    "not an image data set".to_string(),
                ))
            }
        };
        let dims = match extent {
            Extent::Dims(d) => [d[0] as usize, d[1] as usize, d[2] as usize],
            Extent::Ranges(r) => {
                let len = |i: usize| (*r[i].end() as i64 - *r[i].start() as i64 + 1) as usize;
                [len(0), len(1), len(2)]
            }
        };

        let mut point_arrays = Vec::new();
        let mut cell_arrays = 0;
        for piece in pieces {
            let piece = match piece {
                Piece::Inline(piece) => *piece,
                _ => {
                    return Err(FlowError::UnsupportedStructure(
                        "piece data could not be loaded".to_string(),
                    ))
                }
            };
            cell_arrays += piece.data.cell.len();
            for attribute in piece.data.point {
                match attribute {
                    Attribute::DataArray(array) => {
                        let DataArray { name, elem, data } = array;
                        let values = data.cast_into::<f32>().ok_or_else(|| {
                            FlowError::UnsupportedStructure(format!(
                                "array {} cannot be read as floats",
                                name
                            ))
                        })?;
                        point_arrays.push(PointArray {
                            components: elem.num_comp() as usize,
                            name,
                            values,
                        });
                    }
                    Attribute::Field { name, .. } => {
                        log::warn!("skipping field data {}", name);
                    }
                }
            }
        }

        Ok(VtiImage {
            dims,
            spacing: [f64::from(spacing[0]), f64::from(spacing[1]), f64::from(spacing[2])],
            origin: [f64::from(origin[0]), f64::from(origin[1]), f64::from(origin[2])],
            point_arrays,
            cell_arrays,
        })
    }
}

/// Convert each point array of a `.vti` file to `<base>_<array>.mha` next
/// to the input. Returns the paths written.
#[cfg(feature = "vti")]
pub fn vti_to_mha<P: AsRef<Path>>(input: P, encoding: crate::writer::Encoding) -> Result<Vec<PathBuf>> {
    let input = input.as_ref();
    let image = VtiImage::open(input)?;
    log::info!(
        "{}: {} x {} x {}, {} point array(s)",
        input.display(),
        image.dims[0],
        image.dims[1],
        image.dims[2],
        image.point_arrays.len()
    );
    let (grids, _) = image.into_grids()?;
    let mut written = Vec::with_capacity(grids.len());
    for (name, grid) in grids {
        let output = output_path(input, &name);
        crate::writer::WriterOptions::new(&output)
            .encoding(encoding)
            .write_mha(&grid)?;
        written.push(output);
    }
    Ok(written)
}

/// `<dir>/<base>_<array>.mha`
pub fn output_path(input: &Path, array: &str) -> PathBuf {
    crate::util::sibling_path(input, &format!("_{}.mha", array))
}
