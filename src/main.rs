use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use flowvol::cli::{Args, Command};
use flowvol::comsol::{txt_to_mha, ComsolOptions};
use flowvol::compare::{compare_files, CompareOptions};
use flowvol::fld::{fld_to_mha, mha_to_fld};
use flowvol::header::MhaHeader;
use flowvol::phantom::{generate, PhantomParams};
use flowvol::ReaderOptions;

fn main() {
    let args = Args::parse();
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let encoding = args.encoding();
    let reader = ReaderOptions::new().endianness(args.endianness());

    match args.command {
        Command::Mha2fld { files } => {
            let reader = reader.expected_channels(3);
            for file in files {
                let _ = mha_to_fld(&file, None, &reader)
                    .with_context(|| format!("converting {}", file.display()))?;
            }
        }
        Command::Fld2mha { files } => {
            for file in files {
                let _ = fld_to_mha(&file, None, encoding)
                    .with_context(|| format!("converting {}", file.display()))?;
            }
        }
        Command::Txt2mha {
            files,
            axis_order,
            third_axis_quickfix,
        } => {
            let options = ComsolOptions {
                axis_order: axis_order.into(),
                third_axis_quickfix,
            };
            for file in files {
                let _ = txt_to_mha(&file, None, &options, encoding)
                    .with_context(|| format!("converting {}", file.display()))?;
            }
        }
        Command::Vti2mha { files } => vti2mha(&files, encoding)?,
        Command::Mha2nii { files } => mha2nii(&files, &reader)?,
        Command::Compare {
            first,
            second,
            trailing_slice,
        } => {
            let options = CompareOptions {
                trailing_slice: trailing_slice.into(),
            };
            let report = compare_files(&first, &second, &options, &reader, encoding)
                .with_context(|| {
                    format!("comparing {} with {}", first.display(), second.display())
                })?;
            for path in report.outputs.iter() {
                info!("wrote {}", path.display());
            }
        }
        Command::Phantom {
            length,
            diameter,
            resolution,
            pressure,
            output_dir,
        } => {
            let params = PhantomParams {
                length_mm: length,
                diameter_mm: diameter,
                resolution_um: resolution,
                pressure_pa: pressure,
            };
            let phantom = generate(&params).context("generating phantom")?;
            println!("{}", phantom.report);
            let _ = phantom
                .write_all(&output_dir, encoding)
                .with_context(|| format!("writing phantom to {}", output_dir.display()))?;
        }
        Command::Info { files } => {
            for file in files {
                let parsed = MhaHeader::from_file(&file)
                    .with_context(|| format!("reading {}", file.display()))?;
                println!("# {} (payload at byte {})", file.display(), parsed.payload_offset);
                print!("{}", parsed.header);
            }
        }
    }
    Ok(())
}

#[cfg(feature = "vti")]
fn vti2mha(files: &[std::path::PathBuf], encoding: flowvol::Encoding) -> Result<()> {
    for file in files {
        let _ = flowvol::vti::vti_to_mha(file, encoding)
            .with_context(|| format!("converting {}", file.display()))?;
    }
    Ok(())
}

#[cfg(not(feature = "vti"))]
fn vti2mha(_: &[std::path::PathBuf], _: flowvol::Encoding) -> Result<()> {
    anyhow::bail!("flowvol was built without the `vti` feature")
}

#[cfg(feature = "nifti_output")]
fn mha2nii(files: &[std::path::PathBuf], reader: &ReaderOptions) -> Result<()> {
    for file in files {
        let _ = flowvol::nii::mha_to_nifti(file, reader)
            .with_context(|| format!("converting {}", file.display()))?;
    }
    Ok(())
}

#[cfg(not(feature = "nifti_output"))]
fn mha2nii(_: &[std::path::PathBuf], _: &ReaderOptions) -> Result<()> {
    anyhow::bail!("flowvol was built without the `nifti_output` feature")
}
