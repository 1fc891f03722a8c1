//! Codecs and converters for 3D flow-simulation volumes.
//!
//! The core of the crate reads and writes MetaImage (`.mha`) files holding
//! a scalar or a 3-component vector field of 32 bit floats, with optional
//! zlib compression of the voxel payload. Around it sit converters from and
//! to AVS field files (PerGeos), ComSol text exports and VTK image data,
//! NIfTI export, a voxel-wise comparison of two velocity fields and a
//! digital phantom generator.
//!
//! # Example
//!
//! ```no_run
//! use flowvol::{ReaderOptions, WriterOptions};
//! # use flowvol::Result;
//!
//! # fn run() -> Result<()> {
//! let obj = ReaderOptions::new().read_file("flow.mha")?;
//! let mut grid = obj.into_grid();
//! grid.scale(100.);
//! WriterOptions::new("flow_scaled.mha").write_mha(&grid)?;
//! # Ok(())
//! # }
//! ```
#![deny(missing_debug_implementations)]
#![warn(missing_docs, unused_extern_crates, trivial_casts)]

#[macro_use]
extern crate quick_error;

pub mod affine;
pub mod cli;
pub mod compare;
pub mod comsol;
pub mod error;
pub mod fld;
pub mod header;
pub mod layout;
#[cfg(feature = "nifti_output")]
pub mod nii;
pub mod object;
pub mod phantom;
pub mod typedef;
pub mod volume;
pub mod vti;
pub mod writer;
mod util;

pub use byteordered::Endianness;
pub use crate::compare::{compare_files, compare_grids, CompareOptions, Comparison, TrailingSlice};
pub use crate::comsol::{read_comsol, AxisOrder, ComsolOptions};
pub use crate::error::{DecodeWarning, FlowError, Result};
pub use crate::fld::{decode_fld, encode_fld, fld_to_mha, mha_to_fld, FldHeader, FldObject};
pub use crate::header::{read_header, write_header, MhaHeader, ParsedHeader};
pub use crate::object::{decode_mha, read_payload, MhaObject, ReaderOptions};
pub use crate::phantom::{generate, Phantom, PhantomParams};
pub use crate::typedef::ElementType;
pub use crate::util::{parse_scalar, HeaderValue};
pub use crate::volume::VolumeGrid;
pub use crate::writer::{encode_mha, write_payload, Encoding, WriterOptions};
