//! AVS field files (`.fld`) with an embedded big endian payload, as read
//! and written by PerGeos.
//!
//! The header holds `#` comment lines and `key=value` lines and ends with
//! two form feed bytes (`0x0C 0x0C`), immediately followed by the payload.
//! The payload is the row-major traversal of the grid, so `dim1` is the last
//! grid axis and `dim3` the first. It may be followed by an opaque footer,
//! which is kept.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteordered::Endianness;
use ndarray::Array;

use crate::error::{FlowError, Result};
use crate::layout::{
    centred_extents, lpi_offset, midpoint, payload_len, reversed, spacing_from_extents,
};
use crate::object::{decode_values, ReaderOptions};
use crate::util::{format_triple, parse_scalar, parse_triple, sibling_path};
use crate::volume::VolumeGrid;
use crate::writer::{encode_values, Encoding, WriterOptions};

/// Micrometres per centimetre: FLD velocities are in µm/s, MHA in cm/s.
pub const VELOCITY_SCALE: f32 = 10_000.0;

/// Marks the end of the header.
pub const HEADER_END: [u8; 2] = [0x0C, 0x0C];

/// The header of an AVS field file.
#[derive(Debug, Clone, PartialEq)]
pub struct FldHeader {
    /// Always 3
    pub ndim: usize,
    /// `dim1`, `dim2` and `dim3`: the grid dimensions in reverse order
    pub dims: [usize; 3],
    /// Always 3
    pub nspace: usize,
    /// Values per voxel
    pub veclen: usize,
    /// Always `float`
    pub data: String,
    /// Always `uniform`
    pub field: String,
    /// Position of the first voxel centre
    pub min_ext: [f64; 3],
    /// Position of the last voxel centre
    pub max_ext: [f64; 3],
}

fn entry<'a>(map: &'a HashMap<&str, &str>, key: &'static str) -> Result<&'a str> {
    map.get(key).cloned().ok_or(FlowError::MissingKey(key))
}

fn int_entry(map: &HashMap<&str, &str>, key: &'static str) -> Result<usize> {
    let value = entry(map, key)?;
    match parse_scalar(value).as_int() {
        Some(v) if v >= 0 => Ok(v as usize),
        _ => Err(FlowError::ParseValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn expect_entry(map: &HashMap<&str, &str>, key: &'static str, expected: &'static str) -> Result<()> {
    let found = entry(map, key)?;
    if found == expected {
        Ok(())
    } else {
        Err(FlowError::InvalidValue {
            key,
            expected,
            found: found.to_string(),
        })
    }
}

impl FldHeader {
    /// Parse and validate the header text (everything before `0x0C 0x0C`).
    pub fn parse(text: &str) -> Result<FldHeader> {
        let mut map = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let eq = line
                .find('=')
                .ok_or_else(|| FlowError::MalformedLine(line.to_string()))?;
            let _ = map.insert(line[..eq].trim(), line[eq + 1..].trim());
        }

        let ndim = int_entry(&map, "ndim")?;
        if ndim != 3 {
            return Err(FlowError::InvalidValue {
                key: "ndim",
                expected: "3",
                found: ndim.to_string(),
            });
        }
        let dims = [
            int_entry(&map, "dim1")?,
            int_entry(&map, "dim2")?,
            int_entry(&map, "dim3")?,
        ];
        let nspace = int_entry(&map, "nspace")?;
        if nspace != 3 {
            return Err(FlowError::InvalidValue {
                key: "nspace",
                expected: "3",
                found: nspace.to_string(),
            });
        }
        let veclen = int_entry(&map, "veclen")?;
        if veclen != 1 && veclen != 3 {
            return Err(FlowError::UnsupportedChannels(veclen));
        }
        let _ = payload_len(dims, veclen)?;
        expect_entry(&map, "data", "float")?;
        expect_entry(&map, "field", "uniform")?;
        let min_ext = parse_triple("min_ext", entry(&map, "min_ext")?)?;
        let max_ext = parse_triple("max_ext", entry(&map, "max_ext")?)?;

        Ok(FldHeader {
            ndim,
            dims,
            nspace,
            veclen,
            data: "float".to_string(),
            field: "uniform".to_string(),
            min_ext,
            max_ext,
        })
    }

    /// Header describing `grid`, with extents centred on the grid offset.
    pub fn for_grid(grid: &VolumeGrid) -> FldHeader {
        let dims = reversed(grid.dims());
        let (min_ext, max_ext) =
            centred_extents(dims, reversed(grid.spacing()), reversed(grid.offset()));
        FldHeader {
            ndim: 3,
            dims,
            nspace: 3,
            veclen: grid.channels(),
            data: "float".to_string(),
            field: "uniform".to_string(),
            min_ext,
            max_ext,
        }
    }

    /// Voxel spacing implied by the extents, in header axis order.
    pub fn spacing(&self) -> Result<[f64; 3]> {
        spacing_from_extents(self.dims, self.min_ext, self.max_ext)
    }

    /// Physical centre of the grid, in header axis order.
    pub fn centre(&self) -> [f64; 3] {
        midpoint(self.min_ext, self.max_ext)
    }

    /// Grid dimensions `(dim3, dim2, dim1)`.
    pub fn grid_dims(&self) -> [usize; 3] {
        reversed(self.dims)
    }

    /// Number of payload bytes the grid requires.
    pub fn expected_payload_len(&self) -> usize {
        self.dims.iter().product::<usize>() * self.veclen * 4
    }
}

impl fmt::Display for FldHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("# AVS field file\n# written for PerGeos\n#\n")?;
        writeln!(f, "ndim={}", self.ndim)?;
        writeln!(f, "dim1={}", self.dims[0])?;
        writeln!(f, "dim2={}", self.dims[1])?;
        writeln!(f, "dim3={}", self.dims[2])?;
        writeln!(f, "nspace={}", self.nspace)?;
        writeln!(f, "veclen={}", self.veclen)?;
        writeln!(f, "data={}", self.data)?;
        writeln!(f, "field={}", self.field)?;
        writeln!(f, "min_ext={}", format_triple(&self.min_ext))?;
        writeln!(f, "max_ext={}", format_triple(&self.max_ext))
    }
}

/// A decoded field file.
#[derive(Debug, Clone, PartialEq)]
pub struct FldObject {
    header: FldHeader,
    grid: VolumeGrid,
    footer: Vec<u8>,
}

impl FldObject {
    /// The validated header.
    pub fn header(&self) -> &FldHeader {
        &self.header
    }

    /// The voxel grid. Its offset is the centre of the extents.
    pub fn grid(&self) -> &VolumeGrid {
        &self.grid
    }

    /// Bytes found after the payload.
    pub fn footer(&self) -> &[u8] {
        &self.footer
    }

    /// Move the grid out of the object.
    pub fn into_grid(self) -> VolumeGrid {
        self.grid
    }

    /// Encode the object again, footer included.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode_fld(&self.grid, &self.footer)
    }
}

/// Read a field file from the file system.
pub fn read_fld_file<P: AsRef<Path>>(path: P) -> Result<FldObject> {
    let mut bytes = Vec::new();
    let _ = File::open(path)?.read_to_end(&mut bytes)?;
    decode_fld(&bytes)
}

/// Decode a field file held in memory.
pub fn decode_fld(bytes: &[u8]) -> Result<FldObject> {
    let end = bytes
        .windows(2)
        .position(|w| w == &HEADER_END[..])
        .ok_or_else(|| FlowError::MalformedLine("header end marker 0x0C 0x0C not found".to_string()))?;
    let header = FldHeader::parse(&String::from_utf8_lossy(&bytes[..end]))?;
    let data = &bytes[end + HEADER_END.len()..];

    let expected = header.expected_payload_len();
    if data.len() < expected {
        return Err(FlowError::PayloadTooShort {
            expected,
            actual: data.len(),
        });
    }
    let footer = data[expected..].to_vec();
    if !footer.is_empty() {
        log::debug!("{} footer bytes after the payload", footer.len());
    }

    let values = decode_values(&data[..expected], Endianness::Big)?;
    let [d0, d1, d2] = header.grid_dims();
    let voxels = Array::from_shape_vec((d0, d1, d2, header.veclen), values)
        .map_err(|_| FlowError::IncompatibleLength(expected / 4, expected / 4))?;
    let grid = VolumeGrid::new(voxels, reversed(header.spacing()?), reversed(header.centre()))?;
    Ok(FldObject {
        header,
        grid,
        footer,
    })
}

/// Encode `grid` as a field file, followed by `footer`.
pub fn encode_fld(grid: &VolumeGrid, footer: &[u8]) -> Result<Vec<u8>> {
    let text = FldHeader::for_grid(grid).to_string();
    let payload = encode_values(grid.voxels().iter().cloned(), grid.byte_len(), Endianness::Big)?;
    let mut out = Vec::with_capacity(text.len() + 2 + payload.len() + footer.len());
    out.extend_from_slice(text.as_bytes());
    out.extend_from_slice(&HEADER_END);
    out.extend_from_slice(&payload);
    out.extend_from_slice(footer);
    Ok(out)
}

/// Write `grid` as a field file.
pub fn write_fld_file<P: AsRef<Path>>(path: P, grid: &VolumeGrid) -> Result<()> {
    let bytes = encode_fld(grid, &[])?;
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    writer.write_all(&bytes)?;
    writer.flush()?;
    log::info!("wrote {}", path.as_ref().display());
    Ok(())
}

/// Convert a PerGeos field file (µm/s) to MHA (cm/s) in the LPI convention.
/// Returns the path written.
pub fn fld_to_mha<P: AsRef<Path>>(
    input: P,
    output: Option<PathBuf>,
    encoding: Encoding,
) -> Result<PathBuf> {
    let input = input.as_ref();
    let object = read_fld_file(input)?;
    log::info!(
        "{}: {} x {} x {}, {} channel(s), centre {}",
        input.display(),
        object.header.dims[0],
        object.header.dims[1],
        object.header.dims[2],
        object.header.veclen,
        format_triple(&object.header.centre())
    );
    let mut grid = object.into_grid();
    grid.voxels_mut().mapv_inplace(|v| v / VELOCITY_SCALE);
    grid.set_offset(lpi_offset(grid.dims(), grid.spacing()));

    let output = output.unwrap_or_else(|| sibling_path(input, ".mha"));
    WriterOptions::new(&output).encoding(encoding).write_mha(&grid)?;
    Ok(output)
}

/// Convert an MHA file (cm/s) to a PerGeos field file (µm/s) centred on the
/// origin. Returns the path written.
pub fn mha_to_fld<P: AsRef<Path>>(
    input: P,
    output: Option<PathBuf>,
    reader: &ReaderOptions,
) -> Result<PathBuf> {
    let input = input.as_ref();
    let mut grid = reader.read_file(input)?.into_grid();
    grid.scale(VELOCITY_SCALE);
    grid.set_offset([0.; 3]);

    let output = output.unwrap_or_else(|| sibling_path(input, ".fld"));
    write_fld_file(&output, &grid)?;
    Ok(output)
}
