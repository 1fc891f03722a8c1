//! Module for reading complete MHA objects: the validated header and the
//! decoded voxel grid.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use byteordered::{ByteOrdered, Endianness};
use flate2::bufread::ZlibDecoder;

use crate::error::{DecodeWarning, FlowError, Result};
use crate::header::MhaHeader;
use crate::layout::from_storage;
use crate::volume::VolumeGrid;

/// Options and flags which can be used to configure how an MHA file is read.
///
/// # Example
///
/// ```no_run
/// use flowvol::ReaderOptions;
/// # use flowvol::Result;
///
/// # fn run() -> Result<()> {
/// let obj = ReaderOptions::new().expected_channels(3).read_file("flow.mha")?;
/// let grid = obj.into_grid();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderOptions {
    expected_channels: Option<usize>,
    endianness: Endianness,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            expected_channels: None,
            endianness: Endianness::Big,
        }
    }
}

impl ReaderOptions {
    /// Creates a blank new set of options ready for configuration.
    pub fn new() -> Self {
        ReaderOptions::default()
    }

    /// Fail unless the file holds this many channels per voxel.
    pub fn expected_channels(mut self, channels: usize) -> Self {
        self.expected_channels = Some(channels);
        self
    }

    /// Byte order of the payload values. Big endian by default.
    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Read an MHA file from the file system.
    pub fn read_file<P: AsRef<Path>>(&self, path: P) -> Result<MhaObject> {
        let file = BufReader::new(File::open(path)?);
        self.read_stream(file)
    }

    /// Read an MHA object from an in-memory buffer.
    pub fn read_bytes(&self, bytes: &[u8]) -> Result<MhaObject> {
        self.read_stream(bytes)
    }

    /// Read an MHA object from a byte stream positioned at the start of
    /// the header.
    pub fn read_stream<R: BufRead>(&self, mut input: R) -> Result<MhaObject> {
        let parsed = MhaHeader::from_reader(&mut input)?;
        let header = parsed.header;
        if let Some(expected) = self.expected_channels {
            if header.channels != expected {
                return Err(FlowError::UnexpectedChannels {
                    expected,
                    found: header.channels,
                });
            }
        }
        let (grid, payload_warnings) = read_payload(input, &header, self.endianness)?;
        let mut warnings = parsed.warnings;
        warnings.extend(payload_warnings);
        Ok(MhaObject {
            header,
            grid,
            warnings,
        })
    }
}

/// Data type for an MHA file held entirely in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MhaObject {
    header: MhaHeader,
    grid: VolumeGrid,
    warnings: Vec<DecodeWarning>,
}

impl MhaObject {
    /// Obtain a reference to the header.
    pub fn header(&self) -> &MhaHeader {
        &self.header
    }

    /// Obtain a reference to the voxel grid.
    pub fn grid(&self) -> &VolumeGrid {
        &self.grid
    }

    /// Non-fatal conditions met while decoding.
    pub fn warnings(&self) -> &[DecodeWarning] {
        &self.warnings
    }

    /// Move the grid out of the object, discarding the header.
    pub fn into_grid(self) -> VolumeGrid {
        self.grid
    }

    /// Split the object into header and grid.
    pub fn into_parts(self) -> (MhaHeader, VolumeGrid) {
        (self.header, self.grid)
    }
}

/// Decode an MHA file held in memory, with default options.
pub fn decode_mha(bytes: &[u8]) -> Result<MhaObject> {
    ReaderOptions::new().read_bytes(bytes)
}

/// Read the voxel payload that follows `header` in `input`.
///
/// A payload whose length is not a multiple of 4 bytes, or that is longer
/// than the grid requires, is truncated with a warning. A shorter payload
/// is an error.
pub fn read_payload<R: Read>(
    mut input: R,
    header: &MhaHeader,
    endianness: Endianness,
) -> Result<(VolumeGrid, Vec<DecodeWarning>)> {
    let mut raw = Vec::new();
    let _ = input.read_to_end(&mut raw)?;
    log::debug!(
        "payload: {} bytes ({}), {} expected after inflation",
        raw.len(),
        if header.compressed { "compressed" } else { "raw" },
        header.expected_payload_len()
    );
    let mut data = if header.compressed {
        let mut inflated = Vec::with_capacity(raw.len() * 4);
        let _ = ZlibDecoder::new(&raw[..])
            .read_to_end(&mut inflated)
            .map_err(FlowError::Decompress)?;
        inflated
    } else {
        raw
    };

    let mut warnings = Vec::new();
    let len = data.len();
    if len % 4 != 0 {
        warnings.push(DecodeWarning::UnalignedPayload { len }.logged());
        data.truncate(len - len % 4);
    }
    let expected = header.expected_payload_len();
    if data.len() < expected {
        return Err(FlowError::PayloadTooShort {
            expected,
            actual: data.len(),
        });
    }
    if data.len() > expected {
        warnings.push(
            DecodeWarning::OversizedPayload {
                len: data.len(),
                expected,
            }
            .logged(),
        );
        data.truncate(expected);
    }

    let values = decode_values(&data, endianness)?;
    let voxels = from_storage(values, header.dim_size, header.channels)?;
    let offset = header.offset_triple().unwrap_or_else(|e| {
        log::warn!("{}, using a zero offset", e);
        [0.; 3]
    });
    let grid = VolumeGrid::new(voxels, header.element_spacing, offset)?;
    Ok((grid, warnings))
}

/// Interpret a byte buffer as consecutive `f32` values.
pub(crate) fn decode_values(data: &[u8], endianness: Endianness) -> Result<Vec<f32>> {
    let count = data.len() / 4;
    let mut reader = ByteOrdered::runtime(data, endianness);
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(reader.read_f32()?);
    }
    Ok(values)
}
