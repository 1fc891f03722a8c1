//! ComSol text exports of a velocity field sampled on a regular grid.
//!
//! The file starts with `%` comment lines carrying `key: value` pairs
//! (`Dimension`, `Expressions`, `Nodes`, `Length unit`) and a column title
//! line from which the velocity units are taken. Each following row holds
//! `x y z vx vy vz`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use ndarray::Array4;

use crate::error::{DecodeWarning, FlowError, Result};
use crate::layout::{from_storage, lpi_offset, midpoint};
use crate::typedef::{LengthUnit, VelocityUnit};
use crate::util::{format_triple, round_auto, sibling_path};
use crate::volume::VolumeGrid;
use crate::writer::{Encoding, WriterOptions};

/// How the table is laid out as a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// Rows are reshaped in file order: the grid axes are `(z, y, x)` and
    /// the channels `(vx, vy, vz)`.
    Natural,
    /// The grid axes are `(x, y, z)` and the channels `(vz, vy, vx)`, the
    /// same convention as the FLD files.
    Reversed,
}

impl Default for AxisOrder {
    fn default() -> Self {
        AxisOrder::Natural
    }
}

/// Options for reading a ComSol export.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ComsolOptions {
    /// Grid axis convention
    pub axis_order: AxisOrder,
    /// Replace the third spacing and offset with twice the second. Only for
    /// exports known to carry a broken third axis.
    pub third_axis_quickfix: bool,
}

/// The validated comment header of an export.
#[derive(Debug, Clone, PartialEq)]
pub struct ComsolHeader {
    /// Number of rows announced
    pub nodes: usize,
    /// Unit of the coordinate columns
    pub length_unit: LengthUnit,
    /// Unit of the velocity columns
    pub velocity_unit: VelocityUnit,
    /// All `key: value` pairs, verbatim
    pub entries: BTreeMap<String, String>,
}

const VELOCITY_KEYS: [&str; 3] = ["Velocity unit X", "Velocity unit Y", "Velocity unit Z"];

fn entry<'a>(entries: &'a BTreeMap<String, String>, key: &'static str) -> Result<&'a String> {
    entries.get(key).ok_or(FlowError::MissingKey(key))
}

impl ComsolHeader {
    /// Parse the `%` lines of an export (with or without the leading `%`).
    pub fn parse<'a, I>(lines: I) -> Result<ComsolHeader>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut entries = BTreeMap::new();
        for line in lines {
            let line = line.strip_prefix('%').unwrap_or(line).trim_end();
            let parts: Vec<&str> = line.split(':').map(str::trim).collect();
            if parts.len() > 1 {
                let value = if parts.len() > 2 {
                    parts[1..parts.len() - 1].join(" ")
                } else {
                    parts[1].to_string()
                };
                let _ = entries.insert(parts[0].to_string(), value);
            } else {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                if tokens.len() == 9 {
                    for (key, &i) in VELOCITY_KEYS.iter().zip(&[4usize, 6, 8]) {
                        let unit = tokens[i].trim_start_matches('(').trim_end_matches(')');
                        let _ = entries.insert(key.to_string(), unit.to_string());
                    }
                }
            }
        }

        let get = |key: &'static str| entry(&entries, key);
        for &key in &["Dimension", "Expressions"] {
            let value = get(key)?;
            if value != "3" {
                return Err(FlowError::InvalidValue {
                    key,
                    expected: "3",
                    found: value.clone(),
                });
            }
        }
        let nodes_text = get("Nodes")?;
        let nodes = nodes_text.parse::<usize>().map_err(|_| FlowError::ParseValue {
            key: "Nodes",
            value: nodes_text.clone(),
        })?;
        let length_text = get("Length unit")?;
        let length_unit = LengthUnit::from_symbol(length_text)
            .ok_or_else(|| FlowError::UnknownUnit(length_text.clone()))?;
        let vx = get("Velocity unit X")?;
        let vy = get("Velocity unit Y")?;
        let vz = get("Velocity unit Z")?;
        if vx != vy || vx != vz {
            return Err(FlowError::InvalidValue {
                key: "Velocity unit",
                expected: "the same unit for all components",
                found: format!("{} {} {}", vx, vy, vz),
            });
        }
        let velocity_unit =
            VelocityUnit::from_symbol(vx).ok_or_else(|| FlowError::UnknownUnit(vx.clone()))?;

        Ok(ComsolHeader {
            nodes,
            length_unit,
            velocity_unit,
            entries,
        })
    }
}

/// An export converted to a grid in metres and m/s.
#[derive(Debug, Clone, PartialEq)]
pub struct ComsolImport {
    /// The validated header
    pub header: ComsolHeader,
    /// Velocity grid with LPI offset
    pub grid: VolumeGrid,
    /// Physical centre of the sampled box, in metres, `(x, y, z)`
    pub centre: [f64; 3],
    /// Non-fatal conditions met while reading
    pub warnings: Vec<DecodeWarning>,
}

fn parse_row(text: &str, line: usize) -> Result<([f64; 3], [f32; 3])> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(FlowError::MalformedRow {
            line,
            reason: format!("expected 6 columns, found {}", fields.len()),
        });
    }
    let bad = |field: &str| FlowError::MalformedRow {
        line,
        reason: format!("cannot parse {:?}", field),
    };
    let mut coords = [0f64; 3];
    for (c, field) in coords.iter_mut().zip(&fields[..3]) {
        *c = field.parse::<f64>().map_err(|_| bad(field))?;
        if !c.is_finite() {
            return Err(bad(field));
        }
    }
    let mut velocity = [0f32; 3];
    for (v, field) in velocity.iter_mut().zip(&fields[3..]) {
        let value = field.parse::<f32>().map_err(|_| bad(field))?;
        *v = if value.is_nan() { 0. } else { value };
    }
    Ok((coords, velocity))
}

fn distinct(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(::std::cmp::Ordering::Equal));
    values.dedup();
    values
}

/// Read an export from a byte stream.
pub fn read_comsol<R: BufRead>(input: R, options: &ComsolOptions) -> Result<ComsolImport> {
    let mut header_lines = Vec::new();
    let mut coords = Vec::new();
    let mut velocities = Vec::new();
    let mut in_header = true;
    for (i, line) in input.lines().enumerate() {
        let line = line?;
        if in_header && line.starts_with('%') {
            header_lines.push(line);
            continue;
        }
        in_header = false;
        let data = line.split('%').next().unwrap_or("").trim();
        if data.is_empty() {
            continue;
        }
        let (c, v) = parse_row(data, i + 1)?;
        coords.push(c);
        velocities.extend_from_slice(&v);
    }
    let header = ComsolHeader::parse(header_lines.iter().map(String::as_str))?;

    let rows = coords.len();
    if rows == 0 {
        return Err(FlowError::InvalidGeometry("no data rows".to_string()));
    }
    let mut warnings = Vec::new();
    if rows != header.nodes {
        warnings.push(
            DecodeWarning::NodeCountMismatch {
                rows,
                declared: header.nodes,
            }
            .logged(),
        );
    }

    let per_metre = header.length_unit.per_metre();
    let mut counts = [0usize; 3];
    let mut min = [0f64; 3];
    let mut max = [0f64; 3];
    for axis in 0..3 {
        let values = distinct(coords.iter().map(|c| c[axis]).collect());
        counts[axis] = values.len();
        min[axis] = values[0];
        max[axis] = values[values.len() - 1];
    }
    if rows != counts.iter().product::<usize>() {
        return Err(FlowError::IrregularGrid { rows, dims: counts });
    }
    let mut resolution = [0f64; 3];
    for axis in 0..3 {
        if counts[axis] < 2 {
            return Err(FlowError::InvalidGeometry(format!(
                "coordinate column {} holds a single value",
                axis
            )));
        }
        let extent = (max[axis] - min[axis]) / per_metre;
        resolution[axis] = round_auto(extent / (counts[axis] - 1) as f64);
    }
    let c = midpoint(min, max);
    let centre = [c[0] / per_metre, c[1] / per_metre, c[2] / per_metre];

    let velocity_scale = header.velocity_unit.per_metre_per_second() as f32;
    for v in velocities.iter_mut() {
        *v /= velocity_scale;
    }

    let [nx, ny, nz] = counts;
    let (voxels, mut spacing) = match options.axis_order {
        AxisOrder::Natural => (
            Array4::from_shape_vec((nz, ny, nx, 3), velocities)
                .map_err(|_| FlowError::IncompatibleLength(rows * 3, rows * 3))?,
            [resolution[2], resolution[1], resolution[0]],
        ),
        AxisOrder::Reversed => (from_storage(velocities, counts, 3)?, resolution),
    };
    let mut grid = VolumeGrid::new(voxels, spacing, [0.; 3])?;
    let mut offset = lpi_offset(grid.dims(), spacing);
    if options.third_axis_quickfix {
        log::warn!(
            "replacing third axis spacing {} and offset {} with twice the second axis",
            spacing[2],
            offset[2]
        );
        spacing[2] = 2. * spacing[1];
        offset[2] = 2. * offset[1];
        grid.set_spacing(spacing)?;
    }
    grid.set_offset(offset);

    let max_velocity = grid.magnitude().iter().cloned().fold(0f32, f32::max);
    log::info!(
        "{} nodes, grid {}, spacing {} m, centre {} m, maximum velocity {} m/s",
        rows,
        format_triple(&grid.dims()),
        format_triple(&grid.spacing()),
        format_triple(&centre),
        max_velocity
    );

    Ok(ComsolImport {
        header,
        grid,
        centre,
        warnings,
    })
}

/// Read an export from the file system.
pub fn read_comsol_file<P: AsRef<Path>>(path: P, options: &ComsolOptions) -> Result<ComsolImport> {
    read_comsol(BufReader::new(File::open(path)?), options)
}

/// Convert an export to MHA. Returns the path written.
pub fn txt_to_mha<P: AsRef<Path>>(
    input: P,
    output: Option<PathBuf>,
    options: &ComsolOptions,
    encoding: Encoding,
) -> Result<PathBuf> {
    let input = input.as_ref();
    let import = read_comsol_file(input, options)?;
    let output = output.unwrap_or_else(|| sibling_path(input, ".mha"));
    WriterOptions::new(&output)
        .encoding(encoding)
        .write_mha(&import.grid)?;
    Ok(output)
}
