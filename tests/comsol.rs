use std::io::Cursor;

use approx::assert_relative_eq;
use flowvol::comsol::{read_comsol_file, txt_to_mha, ComsolHeader};
use flowvol::typedef::{LengthUnit, VelocityUnit};
use flowvol::{read_comsol, AxisOrder, ComsolOptions, DecodeWarning, Encoding, FlowError, ReaderOptions};
use pretty_assertions::assert_eq;

fn export(nodes: usize, velocity_unit: &str, rows: &[String]) -> String {
    let mut text = format!(
        "% Model:              channel.mph\n\
         % Version:            COMSOL 5.3.1.275\n\
         % Date:               Jun 6 2018, 11:03\n\
         % Dimension:          3\n\
         % Nodes:              {}\n\
         % Expressions:        3\n\
         % Description:        Velocity field\n\
         % Length unit:        mm\n\
         % x                       y                        z                        u ({u})                  v ({u})                  w ({u})\n",
        nodes,
        u = velocity_unit
    );
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}

/// Rows of a 2 x 2 x 2 grid (x fastest), 1 mm apart in x and y, 2 mm in z.
/// Row `r` holds the velocity `(r, 10 r, 100 r)`.
fn cube_rows() -> Vec<String> {
    let mut rows = Vec::new();
    for z in 0..2 {
        for y in 0..2 {
            for x in 0..2 {
                let r = x + 2 * y + 4 * z;
                rows.push(format!(
                    "{} {} {} {} {} {}",
                    x,
                    y,
                    2 * z,
                    r,
                    10 * r,
                    100 * r
                ));
            }
        }
    }
    rows
}

#[test]
fn header_fields() {
    let text = export(8, "m/s", &[]);
    let header = ComsolHeader::parse(text.lines()).unwrap();
    assert_eq!(header.nodes, 8);
    assert_eq!(header.length_unit, LengthUnit::Millimetre);
    assert_eq!(header.velocity_unit, VelocityUnit(LengthUnit::Metre));
    assert_eq!(header.entries["Description"], "Velocity field");
    assert_eq!(header.entries["Date"], "Jun 6 2018, 11");
}

#[test]
fn natural_axis_order() {
    let text = export(8, "m/s", &cube_rows());
    let import = read_comsol(Cursor::new(text), &ComsolOptions::default()).unwrap();
    let grid = &import.grid;
    assert!(import.warnings.is_empty());
    assert_eq!(grid.dims(), [2, 2, 2]);
    assert_relative_eq!(grid.spacing()[0], 0.002);
    assert_relative_eq!(grid.spacing()[1], 0.001);
    assert_relative_eq!(grid.spacing()[2], 0.001);
    let offset = grid.offset();
    assert_relative_eq!(offset[0], 0.002);
    assert_relative_eq!(offset[1], 0.001);
    assert_relative_eq!(offset[2], -0.001);
    assert_relative_eq!(import.centre[2], 0.001);

    // grid index is (z, y, x), components in file order
    let v = grid.voxels();
    assert_eq!(v[[1, 0, 1, 0]], 5.);
    assert_eq!(v[[1, 0, 1, 1]], 50.);
    assert_eq!(v[[1, 0, 1, 2]], 500.);
    assert_eq!(v[[0, 1, 0, 2]], 200.);
}

#[test]
fn reversed_axis_order() {
    let text = export(8, "m/s", &cube_rows());
    let options = ComsolOptions {
        axis_order: AxisOrder::Reversed,
        ..ComsolOptions::default()
    };
    let import = read_comsol(Cursor::new(text), &options).unwrap();
    let grid = &import.grid;
    assert_relative_eq!(grid.spacing()[0], 0.001);
    assert_relative_eq!(grid.spacing()[2], 0.002);

    // grid index is (x, y, z), components reversed
    let v = grid.voxels();
    assert_eq!(v[[1, 0, 1, 0]], 500.);
    assert_eq!(v[[1, 0, 1, 2]], 5.);
    assert_eq!(v[[0, 1, 0, 0]], 200.);
}

#[test]
fn units_and_missing_values() {
    let mut rows = cube_rows();
    rows[3] = "1 1 0 NaN NaN NaN".to_string();
    rows[7] = "1 1 2 1000 -2000 3000".to_string();
    let text = export(8, "mm/s", &rows);
    let import = read_comsol(Cursor::new(text), &ComsolOptions::default()).unwrap();
    let v = import.grid.voxels();
    assert_eq!(v[[0, 1, 1, 0]], 0.);
    assert_eq!(v[[0, 1, 1, 2]], 0.);
    assert_relative_eq!(v[[1, 1, 1, 0]], 1.);
    assert_relative_eq!(v[[1, 1, 1, 1]], -2.);
    assert_relative_eq!(v[[1, 1, 1, 2]], 3.);
}

#[test]
fn third_axis_quickfix() {
    let text = export(8, "m/s", &cube_rows());
    let options = ComsolOptions {
        third_axis_quickfix: true,
        ..ComsolOptions::default()
    };
    let grid = read_comsol(Cursor::new(text), &options).unwrap().grid;
    assert_relative_eq!(grid.spacing()[2], 2. * grid.spacing()[1]);
    assert_relative_eq!(grid.offset()[2], 2. * grid.offset()[1]);
}

#[test]
fn node_count_mismatch_is_a_warning() {
    let text = export(9, "m/s", &cube_rows());
    let import = read_comsol(Cursor::new(text), &ComsolOptions::default()).unwrap();
    assert_eq!(
        import.warnings,
        vec![DecodeWarning::NodeCountMismatch {
            rows: 8,
            declared: 9
        }]
    );
}

#[test]
fn irregular_grid_is_an_error() {
    let mut rows = cube_rows();
    let _ = rows.pop();
    let text = export(7, "m/s", &rows);
    match read_comsol(Cursor::new(text), &ComsolOptions::default()) {
        Err(FlowError::IrregularGrid { rows, dims }) => {
            assert_eq!(rows, 7);
            assert_eq!(dims, [2, 2, 2]);
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn header_errors() {
    let text = export(8, "km/s", &cube_rows());
    assert!(matches!(
        read_comsol(Cursor::new(text), &ComsolOptions::default()),
        Err(FlowError::UnknownUnit(_))
    ));

    let text = export(8, "m/s", &cube_rows()).replace("Dimension:          3", "Dimension:          2");
    assert!(matches!(
        read_comsol(Cursor::new(text), &ComsolOptions::default()),
        Err(FlowError::InvalidValue { key: "Dimension", .. })
    ));

    let text = export(8, "m/s", &cube_rows()).replace("w (m/s)", "w (mm/s)");
    assert!(matches!(
        read_comsol(Cursor::new(text), &ComsolOptions::default()),
        Err(FlowError::InvalidValue { key: "Velocity unit", .. })
    ));

    let mut rows = cube_rows();
    rows[2] = "0 1 0 1 2".to_string();
    let text = export(8, "m/s", &rows);
    assert!(matches!(
        read_comsol(Cursor::new(text), &ComsolOptions::default()),
        Err(FlowError::MalformedRow { line: 12, .. })
    ));
}

#[test]
fn converts_file_to_mha() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("channel.txt");
    std::fs::write(&input, export(8, "m/s", &cube_rows())).unwrap();

    let direct = read_comsol_file(&input, &ComsolOptions::default()).unwrap();
    let output = txt_to_mha(&input, None, &ComsolOptions::default(), Encoding::default()).unwrap();
    assert_eq!(output, dir.path().join("channel.mha"));
    let obj = ReaderOptions::new().expected_channels(3).read_file(&output).unwrap();
    assert_eq!(obj.grid().voxels(), direct.grid.voxels());
    assert_eq!(obj.header().dim_size, [2, 2, 2]);
}
