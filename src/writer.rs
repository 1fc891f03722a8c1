//! Utility functions to write MHA files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteordered::{ByteOrdered, Endianness};
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::Result;
use crate::header::MhaHeader;
use crate::layout::storage_view;
use crate::volume::VolumeGrid;

/// How an MHA payload is encoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Encoding {
    /// Whether to zlib-compress the payload
    pub compress: bool,
    /// Byte order of the values
    pub endianness: Endianness,
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding {
            compress: true,
            endianness: Endianness::Big,
        }
    }
}

/// Options and flags which can be used to configure how an MHA file is written.
///
/// # Example
///
/// ```no_run
/// use flowvol::{VolumeGrid, WriterOptions};
/// # use flowvol::Result;
///
/// # fn run() -> Result<()> {
/// let grid = VolumeGrid::zeros([4, 4, 4], 3)?;
/// WriterOptions::new("zeros.mha").compress(false).write_mha(&grid)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WriterOptions<'a> {
    path: PathBuf,
    compress: bool,
    endianness: Endianness,
    reference: Option<&'a MhaHeader>,
}

impl<'a> WriterOptions<'a> {
    /// Write to `path`, zlib-compressed and big endian unless configured
    /// otherwise.
    pub fn new<P: AsRef<Path>>(path: P) -> WriterOptions<'a> {
        WriterOptions {
            path: path.as_ref().to_owned(),
            compress: true,
            endianness: Endianness::Big,
            reference: None,
        }
    }

    /// Whether to zlib-compress the payload.
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Byte order of the payload values.
    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Set compression and byte order at once.
    pub fn encoding(self, encoding: Encoding) -> Self {
        self.compress(encoding.compress).endianness(encoding.endianness)
    }

    /// Copy `TransformMatrix`, `Offset`, `CenterOfRotation` and
    /// `ElementSpacing` from `header` instead of deriving them from the grid.
    pub fn reference_header(mut self, header: &'a MhaHeader) -> Self {
        self.reference = Some(header);
        self
    }

    /// The destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encode the complete file in memory.
    pub fn to_bytes(&self, grid: &VolumeGrid) -> Result<Vec<u8>> {
        let (payload, compressed) = write_payload(grid, self.compress, self.endianness)?;
        let mut header = MhaHeader::for_grid(grid, compressed, payload.len());
        if let Some(reference) = self.reference {
            header = header.with_geometry_of(reference);
        }
        let text = header.to_string();
        let mut out = Vec::with_capacity(text.len() + payload.len());
        out.extend_from_slice(text.as_bytes());
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Write the grid to the configured path.
    pub fn write_mha(&self, grid: &VolumeGrid) -> Result<()> {
        let bytes = self.to_bytes(grid)?;
        let mut writer = BufWriter::new(File::create(&self.path)?);
        writer.write_all(&bytes)?;
        writer.flush()?;
        log::info!("wrote {}", self.path.display());
        Ok(())
    }
}

/// Encode a grid as a complete MHA file, big endian.
pub fn encode_mha(grid: &VolumeGrid, compress: bool) -> Result<Vec<u8>> {
    WriterOptions::new("").compress(compress).to_bytes(grid)
}

/// Serialize the voxels in storage order and optionally compress them.
/// Returns the payload and whether it is compressed.
pub fn write_payload(
    grid: &VolumeGrid,
    compress: bool,
    endianness: Endianness,
) -> Result<(Vec<u8>, bool)> {
    let voxels = grid.voxels();
    let raw = encode_values(storage_view(voxels).iter().cloned(), grid.byte_len(), endianness)?;
    if !compress {
        return Ok((raw, false));
    }
    let mut e = ZlibEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
    e.write_all(&raw)?;
    Ok((e.finish()?, true))
}

/// Serialize `f32` values back to back.
pub(crate) fn encode_values<I>(values: I, capacity: usize, endianness: Endianness) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = f32>,
{
    let mut writer = ByteOrdered::runtime(Vec::with_capacity(capacity), endianness);
    for v in values {
        writer.write_f32(v)?;
    }
    Ok(writer.into_inner())
}
