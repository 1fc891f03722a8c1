mod util;

use std::fs;

use approx::assert_relative_eq;
use flowvol::fld::{read_fld_file, write_fld_file, HEADER_END};
use flowvol::{
    decode_fld, encode_fld, fld_to_mha, mha_to_fld, Encoding, FldHeader, FlowError,
    ReaderOptions, VolumeGrid, WriterOptions,
};
use flowvol::Endianness;
use ndarray::Array4;
use pretty_assertions::assert_eq;

use util::{be_bytes, bits, ramp_grid};

fn centred_grid(dims: [usize; 3]) -> VolumeGrid {
    let grid = ramp_grid(dims, 3);
    VolumeGrid::new(grid.into_voxels(), [0.5, 1.0, 2.0], [0.; 3]).unwrap()
}

#[test]
fn header_text() {
    let grid = centred_grid([4, 3, 2]);
    let text = FldHeader::for_grid(&grid).to_string();
    assert_eq!(
        text,
        "# AVS field file\n# written for PerGeos\n#\n\
         ndim=3\ndim1=2\ndim2=3\ndim3=4\nnspace=3\nveclen=3\n\
         data=float\nfield=uniform\nmin_ext=-1 -1 -0.75\nmax_ext=1 1 0.75\n"
    );
}

#[test]
fn round_trip_with_footer() {
    let grid = centred_grid([4, 3, 2]);
    let footer = b"trailing metadata".to_vec();
    let bytes = encode_fld(&grid, &footer).unwrap();
    let obj = decode_fld(&bytes).unwrap();
    assert_eq!(obj.footer(), &footer[..]);
    assert_eq!(obj.grid().dims(), [4, 3, 2]);
    assert_eq!(obj.grid().spacing(), [0.5, 1.0, 2.0]);
    assert_eq!(obj.grid().offset(), [0.; 3]);
    assert_eq!(bits(obj.grid()), bits(&grid));
    assert_eq!(obj.to_bytes().unwrap(), bytes);
}

#[test]
fn payload_follows_header_marker() {
    let voxels = Array4::from_shape_vec((2, 2, 2, 1), (0..8).map(|v| v as f32).collect()).unwrap();
    let grid = VolumeGrid::new(voxels, [1.; 3], [0.; 3]).unwrap();
    let bytes = encode_fld(&grid, &[]).unwrap();
    let text = FldHeader::for_grid(&grid).to_string();
    assert_eq!(&bytes[text.len()..text.len() + 2], &HEADER_END[..]);
    // last grid axis varies fastest
    assert_eq!(
        &bytes[text.len() + 2..],
        &be_bytes(&[0., 1., 2., 3., 4., 5., 6., 7.])[..]
    );
}

fn fld_bytes(header: &str, payload: &[f32]) -> Vec<u8> {
    let mut bytes = header.as_bytes().to_vec();
    bytes.extend_from_slice(&HEADER_END);
    bytes.extend(be_bytes(payload));
    bytes
}

const HEADER: &str = "# AVS field file\n\
                      ndim=3\ndim1=2\ndim2=2\ndim3=2\nnspace=3\nveclen=1\n\
                      data=float\nfield=uniform\nmin_ext=0 0 0\nmax_ext=1 2 4\n";

#[test]
fn spacing_and_centre_from_extents() {
    let obj = decode_fld(&fld_bytes(HEADER, &[0.; 8])).unwrap();
    assert_eq!(obj.header().spacing().unwrap(), [1., 2., 4.]);
    assert_eq!(obj.header().centre(), [0.5, 1., 2.]);
    assert_eq!(obj.grid().spacing(), [4., 2., 1.]);
    assert_eq!(obj.grid().offset(), [2., 1., 0.5]);
    assert!(obj.footer().is_empty());
}

#[test]
fn header_errors() {
    let bad = HEADER.replace("data=float", "data=double");
    assert!(matches!(
        decode_fld(&fld_bytes(&bad, &[0.; 8])),
        Err(FlowError::InvalidValue { key: "data", .. })
    ));
    let bad = HEADER.replace("field=uniform", "field=rectilinear");
    assert!(matches!(
        decode_fld(&fld_bytes(&bad, &[0.; 8])),
        Err(FlowError::InvalidValue { key: "field", .. })
    ));
    let bad = HEADER.replace("dim2=2\n", "");
    assert!(matches!(
        decode_fld(&fld_bytes(&bad, &[0.; 8])),
        Err(FlowError::MissingKey("dim2"))
    ));
    assert!(matches!(
        decode_fld(&fld_bytes(HEADER, &[0.; 7])),
        Err(FlowError::PayloadTooShort {
            expected: 32,
            actual: 28
        })
    ));
    assert!(decode_fld(HEADER.as_bytes()).is_err());
}

#[test]
fn velocity_units_between_formats() {
    let dir = tempfile::tempdir().unwrap();
    let fld_path = dir.path().join("sim.fld");
    let mut grid = centred_grid([4, 3, 2]);
    grid.voxels_mut().fill(10_000.);
    write_fld_file(&fld_path, &grid).unwrap();
    assert!(fs::read(&fld_path).unwrap().starts_with(b"# AVS field file\n"));

    let mha_path = fld_to_mha(&fld_path, None, Encoding::default()).unwrap();
    assert_eq!(mha_path, dir.path().join("sim.mha"));
    let mha = ReaderOptions::new().read_file(&mha_path).unwrap();
    assert!(mha.grid().voxels().iter().all(|&v| v == 1.));
    assert_eq!(mha.grid().spacing(), [0.5, 1.0, 2.0]);
    assert_eq!(mha.grid().offset(), [1.0, 1.0, -2.0]);

    let back = dir.path().join("back.fld");
    let written = mha_to_fld(&mha_path, Some(back.clone()), &ReaderOptions::new()).unwrap();
    assert_eq!(written, back);
    let obj = read_fld_file(&back).unwrap();
    assert!(obj.grid().voxels().iter().all(|&v| v == 10_000.));
    assert_eq!(obj.grid().offset(), [0.; 3]);
    for (a, b) in obj.grid().spacing().iter().zip(&[0.5, 1.0, 2.0]) {
        assert_relative_eq!(*a, *b);
    }
}

#[test]
fn mha_source_keeps_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flow.mha");
    let grid = centred_grid([3, 3, 3]);
    WriterOptions::new(&path).write_mha(&grid).unwrap();
    let fld = mha_to_fld(&path, None, &ReaderOptions::new()).unwrap();
    let obj = read_fld_file(&fld).unwrap();
    for (a, b) in obj.grid().voxels().iter().zip(grid.voxels().iter()) {
        assert_relative_eq!(*a, *b * 10_000.);
    }
}

const RAMP_HEADER: &str = "# AVS field file\n\
                           ndim=3\ndim1=3\ndim2=2\ndim3=2\nnspace=3\nveclen=3\n\
                           data=float\nfield=uniform\nmin_ext=-1 -0.5 -0.5\nmax_ext=1 0.5 0.5\n";

#[test]
fn converted_layout_follows_header_axes() {
    let dir = tempfile::tempdir().unwrap();
    let fld_path = dir.path().join("ramp.fld");
    let values: Vec<f32> = (0..36).map(|v| v as f32).collect();
    fs::write(&fld_path, fld_bytes(RAMP_HEADER, &values)).unwrap();

    let obj = read_fld_file(&fld_path).unwrap();
    assert_eq!(obj.grid().dims(), [2, 2, 3]);
    assert_eq!(obj.grid().voxels()[[0, 1, 2, 0]], 15.);

    let encoding = Encoding {
        compress: false,
        endianness: Endianness::Big,
    };
    let mha_path = fld_to_mha(&fld_path, None, encoding).unwrap();
    let mha = ReaderOptions::new().read_file(&mha_path).unwrap();
    assert_eq!(mha.header().dim_size, [2, 2, 3]);
    assert_eq!(mha.grid().spacing(), [1., 1., 1.]);
    assert_eq!(mha.grid().offset(), [1., 1., -1.]);

    let stored = [
        2, 1, 0, 20, 19, 18, 11, 10, 9, 29, 28, 27, 5, 4, 3, 23, 22, 21, 14, 13, 12, 32, 31, 30,
        8, 7, 6, 26, 25, 24, 17, 16, 15, 35, 34, 33,
    ];
    let expected: Vec<f32> = stored.iter().map(|&v| v as f32 / 10_000.).collect();
    let bytes = fs::read(&mha_path).unwrap();
    assert_eq!(&bytes[bytes.len() - 36 * 4..], &be_bytes(&expected)[..]);

    let back = mha_to_fld(&mha_path, Some(dir.path().join("back.fld")), &ReaderOptions::new())
        .unwrap();
    let obj = read_fld_file(&back).unwrap();
    assert_eq!(obj.header().dims, [3, 2, 2]);
    for (a, b) in obj.grid().voxels().iter().zip(&values) {
        assert_relative_eq!(*a, *b, max_relative = 1e-6);
    }
}
