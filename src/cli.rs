//! Command line model of the `flowvol` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::compare::TrailingSlice;
use crate::comsol::AxisOrder;
use crate::writer::Encoding;
use crate::Endianness;

/// Convert, compare and generate 3D flow volumes (MHA, AVS FLD, ComSol, VTI, NIfTI)
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Payload byte order of MHA files read and written is little endian
    #[arg(long, global = true)]
    pub little_endian: bool,

    /// Write MHA payloads without zlib compression
    #[arg(long, global = true)]
    pub no_compress: bool,

    /// Log debug messages (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Operation to run
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Byte order selected on the command line.
    pub fn endianness(&self) -> Endianness {
        if self.little_endian {
            Endianness::Little
        } else {
            Endianness::Big
        }
    }

    /// MHA output encoding selected on the command line.
    pub fn encoding(&self) -> Encoding {
        Encoding {
            compress: !self.no_compress,
            endianness: self.endianness(),
        }
    }
}

/// Available operations.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Convert an MHA velocity field (cm/s) to a PerGeos field file (µm/s)
    Mha2fld {
        /// MHA input file(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Convert a PerGeos field file (µm/s) to MHA (cm/s)
    Fld2mha {
        /// FLD input file(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Convert a ComSol regular grid text export to MHA
    Txt2mha {
        /// ComSol text file(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// How the table rows map onto the grid axes
        #[arg(long, value_enum, default_value_t = AxisArg::Natural)]
        axis_order: AxisArg,

        /// Set the third spacing and offset to twice the second ones
        #[arg(long)]
        third_axis_quickfix: bool,
    },
    /// Convert each point data array of a VTK image file to MHA
    Vti2mha {
        /// VTI input file(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Export an MHA file to NIfTI (one file per component plus magnitude)
    Mha2nii {
        /// MHA input file(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Compare two MHA velocity fields voxel by voxel
    Compare {
        /// Reference field
        first: PathBuf,

        /// Field to compare against the reference
        second: PathBuf,

        /// When the last slice of the deviation maps is zeroed
        #[arg(long, value_enum, default_value_t = SliceArg::AfterStatistics)]
        trailing_slice: SliceArg,
    },
    /// Generate a tube phantom with laminar flow
    Phantom {
        /// Tube length in mm
        #[arg(short = 'L', long, default_value_t = 20.0, value_parser = positive)]
        length: f64,

        /// Tube diameter in mm
        #[arg(short = 'D', long, default_value_t = 1.5, value_parser = positive)]
        diameter: f64,

        /// Voxel size in µm
        #[arg(short = 'R', long, default_value_t = 100.0, value_parser = positive)]
        resolution: f64,

        /// Pressure drop along the tube in Pa
        #[arg(short = 'P', long, default_value_t = 20000.0, value_parser = positive)]
        pressure: f64,

        /// Directory to write the phantom files into
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Print the header of an MHA file
    Info {
        /// MHA input file(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
}

/// Axis policy for ComSol imports.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisArg {
    /// Keep the row order of the export
    Natural,
    /// Apply the MHA storage transform
    Reversed,
}

impl From<AxisArg> for AxisOrder {
    fn from(arg: AxisArg) -> Self {
        match arg {
            AxisArg::Natural => AxisOrder::Natural,
            AxisArg::Reversed => AxisOrder::Reversed,
        }
    }
}

/// Trailing slice policy for comparisons.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceArg {
    /// Zero the slice after computing the averages
    AfterStatistics,
    /// Zero the slice before computing the averages
    BeforeStatistics,
    /// Never zero it
    Keep,
}

impl From<SliceArg> for TrailingSlice {
    fn from(arg: SliceArg) -> Self {
        match arg {
            SliceArg::AfterStatistics => TrailingSlice::AfterStatistics,
            SliceArg::BeforeStatistics => TrailingSlice::BeforeStatistics,
            SliceArg::Keep => TrailingSlice::Keep,
        }
    }
}

fn positive(text: &str) -> Result<f64, String> {
    let value: f64 = text.parse().map_err(|_| format!("\"{}\" is not a number", text))?;
    if value.is_finite() && value > 0. {
        Ok(value)
    } else {
        Err(format!("{} is not a positive number", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn phantom_defaults() {
        let args = Args::try_parse_from(["flowvol", "phantom"]).unwrap();
        match args.command {
            Command::Phantom {
                length,
                diameter,
                resolution,
                pressure,
                ..
            } => {
                assert_eq!((length, diameter, resolution, pressure), (20., 1.5, 100., 20000.));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(args.encoding(), Encoding::default());
    }

    #[test]
    fn rejects_non_positive() {
        assert!(Args::try_parse_from(["flowvol", "phantom", "-L", "0"]).is_err());
        assert!(Args::try_parse_from(["flowvol", "phantom", "-D", "abc"]).is_err());
    }

    #[test]
    fn global_flags() {
        let args = Args::try_parse_from([
            "flowvol",
            "txt2mha",
            "a.txt",
            "--axis-order",
            "reversed",
            "--little-endian",
            "--no-compress",
        ])
        .unwrap();
        assert_eq!(args.endianness(), Endianness::Little);
        assert!(!args.encoding().compress);
        match args.command {
            Command::Txt2mha { axis_order, .. } => assert_eq!(axis_order, AxisArg::Reversed),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
