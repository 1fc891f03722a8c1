//! This module defines the `MhaHeader` struct, the text header of a
//! MetaImage (`.mha`) file with a local binary payload.
//!
//! The header is a sequence of `Key = Value` lines ending with the
//! `ElementDataFile` line. The voxel payload starts at the byte that
//! follows it.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{DecodeWarning, FlowError, Result};
use crate::layout::payload_len;
use crate::typedef::ElementType;
use crate::util::{format_triple, parse_scalar, parse_triple};
use crate::volume::VolumeGrid;

/// Orientation matrix written for the LPI convention.
pub const DEFAULT_TRANSFORM_MATRIX: &str = "-1 0 0 0 -1 0 0 0 1";
/// Rotation centre written by default.
pub const DEFAULT_CENTER_OF_ROTATION: &str = "0 0 0";
/// Anatomical orientation written by default.
pub const DEFAULT_ORIENTATION: &str = "LPI";

/// The MHA header data type.
///
/// The core fields are validated on read. `TransformMatrix`, `Offset`,
/// `CenterOfRotation`, `AnatomicalOrientation` and `CompressedDataSize`
/// are kept verbatim, since they are only passed through.
///
/// # Example
///
/// ```no_run
/// use flowvol::MhaHeader;
/// # use flowvol::Result;
///
/// # fn run() -> Result<()> {
/// let parsed = MhaHeader::from_file("flow.mha")?;
/// println!("{:?} x {}", parsed.header.dim_size, parsed.header.channels);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MhaHeader {
    /// Always `Image`
    pub object_type: String,
    /// Always 3
    pub ndims: usize,
    /// Always true
    pub binary_data: bool,
    /// Always false
    pub byte_order_msb: bool,
    /// Whether the payload is a zlib stream
    pub compressed: bool,
    /// Size of the compressed payload, as written
    pub compressed_data_size: Option<String>,
    /// Orientation matrix, as written
    pub transform_matrix: Option<String>,
    /// Grid origin, as written
    pub offset: Option<String>,
    /// Rotation centre, as written
    pub center_of_rotation: Option<String>,
    /// Orientation code, as written
    pub anatomical_orientation: Option<String>,
    /// Spacing per grid axis
    pub element_spacing: [f64; 3],
    /// Voxels per grid axis
    pub dim_size: [usize; 3],
    /// Values per voxel, 1 or 3
    pub channels: usize,
    /// Always `MET_FLOAT`
    pub element_type: ElementType,
    /// Always `LOCAL`
    pub element_data_file: String,
}

impl Default for MhaHeader {
    fn default() -> MhaHeader {
        MhaHeader {
            object_type: "Image".to_string(),
            ndims: 3,
            binary_data: true,
            byte_order_msb: false,
            compressed: false,
            compressed_data_size: None,
            transform_matrix: None,
            offset: None,
            center_of_rotation: None,
            anatomical_orientation: None,
            element_spacing: [1.; 3],
            dim_size: [1; 3],
            channels: 1,
            element_type: ElementType::MetFloat,
            element_data_file: "LOCAL".to_string(),
        }
    }
}

/// A header as read from a stream, with the position of the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedHeader {
    /// The validated header
    pub header: MhaHeader,
    /// Byte position right after the `ElementDataFile` line
    pub payload_offset: u64,
    /// Defaults assumed while parsing
    pub warnings: Vec<DecodeWarning>,
}

/// Read the header of an MHA stream. On success the stream is positioned at
/// the first payload byte, whose position is returned alongside the header.
pub fn read_header<R: BufRead>(input: R) -> Result<(MhaHeader, u64)> {
    let parsed = MhaHeader::from_reader(input)?;
    Ok((parsed.header, parsed.payload_offset))
}

/// Render the canonical header for `grid`.
pub fn write_header(grid: &VolumeGrid, compressed: bool, payload_size: usize) -> String {
    MhaHeader::for_grid(grid, compressed, payload_size).to_string()
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn split_entry(line: &str) -> Option<(String, String)> {
    let eq = line.find('=')?;
    let key = line[..eq].trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), line[eq + 1..].trim().to_string()))
}

/// Collect `key = value` pairs up to and including `ElementDataFile`.
fn read_entries<R: BufRead>(mut input: R) -> Result<(HashMap<String, String>, u64)> {
    let mut entries = HashMap::new();
    let mut offset = 0u64;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = input.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }
        offset += n as u64;
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = split_entry(line)
            .ok_or_else(|| FlowError::MalformedLine(line.chars().take(80).collect()))?;
        let last = key == "ElementDataFile";
        let _ = entries.insert(key, value);
        if last {
            break;
        }
    }
    Ok((entries, offset))
}

struct Entries {
    map: HashMap<String, String>,
}

impl Entries {
    fn get(&self, key: &'static str) -> Result<&str> {
        self.map
            .get(key)
            .map(String::as_str)
            .ok_or(FlowError::MissingKey(key))
    }

    fn expect(&self, key: &'static str, expected: &'static str) -> Result<()> {
        let found = self.get(key)?;
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

    fn int(&self, key: &'static str) -> Result<i64> {
        let value = self.get(key)?;
        parse_scalar(value).as_int().ok_or_else(|| FlowError::ParseValue {
            key,
            value: value.to_string(),
        })
    }

    fn flag(
        &self,
        key: &'static str,
        default: bool,
        warnings: &mut Vec<DecodeWarning>,
    ) -> Result<bool> {
        match self.map.get(key).map(String::as_str) {
            None => {
                warnings.push(
                    DecodeWarning::DefaultedKey {
                        key,
                        default: bool_text(default),
                    }
                    .logged(),
                );
                Ok(default)
            }
            Some("True") => Ok(true),
            Some("False") => Ok(false),
            Some(other) => Err(FlowError::InvalidValue {
                key,
                expected: "True or False",
                found: other.to_string(),
            }),
        }
    }

    fn verbatim(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }
}

impl MhaHeader {
    /// Read and validate the header of an MHA file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ParsedHeader> {
        let file = BufReader::new(File::open(path)?);
        MhaHeader::from_reader(file)
    }

    /// Read and validate a header from the given byte stream, which must be
    /// positioned at the start of the file.
    pub fn from_reader<R: BufRead>(input: R) -> Result<ParsedHeader> {
        let (map, payload_offset) = read_entries(input)?;
        log::debug!("{} header entries, payload at byte {}", map.len(), payload_offset);
        let entries = Entries { map };
        let mut warnings = Vec::new();

        entries.expect("ObjectType", "Image")?;
        let ndims = entries.int("NDims")?;
        if ndims != 3 {
            return Err(FlowError::InvalidValue {
                key: "NDims",
                expected: "3",
                found: ndims.to_string(),
            });
        }
        entries.expect("BinaryData", "True")?;
        let byte_order_msb = entries.flag("BinaryDataByteOrderMSB", false, &mut warnings)?;
        if byte_order_msb {
            return Err(FlowError::InvalidValue {
                key: "BinaryDataByteOrderMSB",
                expected: "False",
                found: "True".to_string(),
            });
        }
        let compressed = entries.flag("CompressedData", false, &mut warnings)?;
        let element_spacing: [f64; 3] =
            parse_triple("ElementSpacing", entries.get("ElementSpacing")?)?;
        let dim_size: [usize; 3] = parse_triple("DimSize", entries.get("DimSize")?)?;
        if dim_size.contains(&0) {
            return Err(FlowError::InvalidGeometry(format!(
                "DimSize {} has an empty axis",
                format_triple(&dim_size)
            )));
        }
        let channels = entries.int("ElementNumberOfChannels")?;
        if channels < 0 {
            return Err(FlowError::ParseValue {
                key: "ElementNumberOfChannels",
                value: entries.get("ElementNumberOfChannels")?.to_string(),
            });
        }
        let channels = channels as usize;
        if channels != 1 && channels != 3 {
            return Err(FlowError::UnsupportedChannels(channels));
        }
        let _ = payload_len(dim_size, channels)?;
        let element_type: ElementType = entries.get("ElementType")?.parse()?;
        if element_type != ElementType::MetFloat {
            return Err(FlowError::InvalidValue {
                key: "ElementType",
                expected: "MET_FLOAT",
                found: element_type.to_string(),
            });
        }
        entries.expect("ElementDataFile", "LOCAL")?;

        let header = MhaHeader {
            object_type: "Image".to_string(),
            ndims: 3,
            binary_data: true,
            byte_order_msb,
            compressed,
            compressed_data_size: entries.verbatim("CompressedDataSize"),
            transform_matrix: entries.verbatim("TransformMatrix"),
            offset: entries.verbatim("Offset"),
            center_of_rotation: entries.verbatim("CenterOfRotation"),
            anatomical_orientation: entries.verbatim("AnatomicalOrientation"),
            element_spacing,
            dim_size,
            channels,
            element_type,
            element_data_file: "LOCAL".to_string(),
        };
        Ok(ParsedHeader {
            header,
            payload_offset,
            warnings,
        })
    }

    /// The canonical header for a grid. `payload_size` is the size of the
    /// compressed payload and is only recorded when `compressed` is set.
    pub fn for_grid(grid: &VolumeGrid, compressed: bool, payload_size: usize) -> MhaHeader {
        MhaHeader {
            compressed,
            compressed_data_size: if compressed {
                Some(payload_size.to_string())
            } else {
                None
            },
            transform_matrix: Some(DEFAULT_TRANSFORM_MATRIX.to_string()),
            offset: Some(format_triple(&grid.offset())),
            center_of_rotation: Some(DEFAULT_CENTER_OF_ROTATION.to_string()),
            anatomical_orientation: Some(DEFAULT_ORIENTATION.to_string()),
            element_spacing: grid.spacing(),
            dim_size: grid.dims(),
            channels: grid.channels(),
            ..MhaHeader::default()
        }
    }

    /// Take the geometry fields (`TransformMatrix`, `Offset`,
    /// `CenterOfRotation` and `ElementSpacing`) from another header.
    pub fn with_geometry_of(mut self, reference: &MhaHeader) -> MhaHeader {
        if reference.transform_matrix.is_some() {
            self.transform_matrix = reference.transform_matrix.clone();
        }
        if reference.offset.is_some() {
            self.offset = reference.offset.clone();
        }
        if reference.center_of_rotation.is_some() {
            self.center_of_rotation = reference.center_of_rotation.clone();
        }
        self.element_spacing = reference.element_spacing;
        self
    }

    /// The grid origin, or zero when the header has none.
    pub fn offset_triple(&self) -> Result<[f64; 3]> {
        match &self.offset {
            Some(text) => parse_triple("Offset", text),
            None => Ok([0.; 3]),
        }
    }

    /// Number of payload bytes the grid requires once decompressed.
    pub fn expected_payload_len(&self) -> usize {
        self.dim_size.iter().product::<usize>() * self.channels * self.element_type.size_of()
    }
}

/// Writes the header in canonical order.
impl fmt::Display for MhaHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "ObjectType = {}", self.object_type)?;
        writeln!(f, "NDims = {}", self.ndims)?;
        writeln!(f, "BinaryData = {}", bool_text(self.binary_data))?;
        writeln!(f, "BinaryDataByteOrderMSB = {}", bool_text(self.byte_order_msb))?;
        writeln!(f, "CompressedData = {}", bool_text(self.compressed))?;
        if self.compressed {
            if let Some(size) = &self.compressed_data_size {
                writeln!(f, "CompressedDataSize = {}", size)?;
            }
        }
        if let Some(matrix) = &self.transform_matrix {
            writeln!(f, "TransformMatrix = {}", matrix)?;
        }
        if let Some(offset) = &self.offset {
            writeln!(f, "Offset = {}", offset)?;
        }
        if let Some(centre) = &self.center_of_rotation {
            writeln!(f, "CenterOfRotation = {}", centre)?;
        }
        if let Some(orientation) = &self.anatomical_orientation {
            writeln!(f, "AnatomicalOrientation = {}", orientation)?;
        }
        writeln!(f, "ElementSpacing = {}", format_triple(&self.element_spacing))?;
        writeln!(f, "DimSize = {}", format_triple(&self.dim_size))?;
        writeln!(f, "ElementNumberOfChannels = {}", self.channels)?;
        writeln!(f, "ElementType = {}", self.element_type)?;
        writeln!(f, "ElementDataFile = {}", self.element_data_file)
    }
}
