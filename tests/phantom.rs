use approx::assert_relative_eq;
use flowvol::phantom::{tube_mask, WATER_VISCOSITY};
use flowvol::{
    decode_fld, decode_mha, encode_mha, fld_to_mha, generate, Encoding, FlowError, PhantomParams,
    ReaderOptions, VolumeGrid,
};
use ndarray::Array3;
use pretty_assertions::assert_eq;

fn small() -> PhantomParams {
    PhantomParams {
        length_mm: 2.,
        diameter_mm: 0.5,
        resolution_um: 50.,
        pressure_pa: 20_000.,
    }
}

#[test]
fn grid_size() {
    assert_eq!(PhantomParams::default().dims(), [19, 19, 200]);
    assert_eq!(small().dims(), [15, 15, 40]);
}

#[test]
fn mask_survives_compressed_mha() {
    let mask = tube_mask([9, 9, 4], 1., 3.);
    assert_eq!(mask.iter().filter(|&&m| m != 0).count(), 116);
    assert_eq!(mask[[4, 4, 0]], 1);
    assert_eq!(mask[[4, 1, 3]], 1);
    assert_eq!(mask[[4, 0, 3]], 0);

    let values: Array3<f32> = mask.mapv(f32::from);
    let grid = VolumeGrid::from_scalar(values, [1.; 3], [0.; 3]).unwrap();
    let obj = decode_mha(&encode_mha(&grid, true).unwrap()).unwrap();
    assert_eq!(obj.grid().voxels().iter().filter(|&&v| v != 0.).count(), 116);
}

#[test]
fn poiseuille_profile() {
    let phantom = generate(&small()).unwrap();
    let report = phantom.report;
    assert_eq!(phantom.mask.dim(), (15, 15, 40));
    assert_eq!(phantom.mask.index_axis(ndarray::Axis(2), 0).iter().filter(|&&m| m != 0).count(), 81);

    // peak at the centre, zero outside the tube
    assert_relative_eq!(phantom.velocity[[7, 7, 0]], 156.25, epsilon = 1e-3);
    assert_relative_eq!(report.max_velocity, 156.25, epsilon = 1e-3);
    assert_eq!(phantom.velocity[[0, 0, 5]], 0.);

    let radius: f64 = 0.25e-3;
    assert_relative_eq!(report.nominal_area, radius * radius * std::f64::consts::PI);
    assert_relative_eq!(report.effective_area, 81. * 50e-6 * 50e-6, max_relative = 1e-9);
    assert_relative_eq!(
        report.nominal_flow_rate,
        20_000. * std::f64::consts::PI * radius.powi(4) / (8. * 2e-3 * WATER_VISCOSITY)
    );
    assert_relative_eq!(report.nominal_permeability, radius * radius / 8., max_relative = 1e-9);
    assert_relative_eq!(report.area_error(), 3.1324, epsilon = 1e-3);
    assert_relative_eq!(report.flow_rate_error(), -0.891, epsilon = 1e-2);
    assert_relative_eq!(report.permeability_error(), -3.901, epsilon = 1e-2);
    assert!(report.to_string().contains("Effective permeability"));
}

#[test]
fn invalid_parameters() {
    let params = PhantomParams {
        diameter_mm: -1.,
        ..small()
    };
    assert!(matches!(generate(&params), Err(FlowError::InvalidGeometry(_))));
    let params = PhantomParams {
        length_mm: 0.01,
        ..small()
    };
    assert!(matches!(generate(&params), Err(FlowError::InvalidGeometry(_))));
}

#[test]
fn output_layouts() {
    let phantom = generate(&small()).unwrap();

    let mha = phantom.mha_grid().unwrap();
    assert_eq!(mha.dims(), [40, 15, 15]);
    assert_eq!(mha.spacing(), [50.; 3]);
    assert_eq!(mha.offset(), [1000., 350., -350.]);
    let v = mha.voxels();
    assert_relative_eq!(v[[3, 7, 7, 2]], 15_625., epsilon = 0.1);
    assert_eq!(v[[3, 7, 7, 0]], 0.);

    let fld = phantom.fld_grid().unwrap();
    assert_eq!(fld.dims(), [40, 15, 15]);
    assert_eq!(fld.offset(), [0.; 3]);
    assert_relative_eq!(fld.voxels()[[3, 7, 7, 2]], 156.25e6, max_relative = 1e-5);
    assert_eq!(fld.voxels()[[3, 7, 7, 0]], 0.);
}

#[test]
fn converted_fld_matches_mha() {
    let dir = tempfile::tempdir().unwrap();
    let phantom = generate(&small()).unwrap();
    let _ = phantom.write_all(dir.path(), Encoding::default()).unwrap();

    let fld_path = dir.path().join("Velocity_L2mm_D0.5mm_R50um_P20000Pa.fld");
    let output = dir.path().join("converted.mha");
    let _ = fld_to_mha(&fld_path, Some(output.clone()), Encoding::default()).unwrap();
    let converted = ReaderOptions::new().read_file(&output).unwrap();
    let direct = ReaderOptions::new()
        .read_file(dir.path().join("Velocity_L2mm_D0.5mm_R50um_P20000Pa.mha"))
        .unwrap();

    assert_eq!(converted.header().dim_size, direct.header().dim_size);
    let (a, b) = (converted.grid(), direct.grid());
    for i in 0..3 {
        assert_relative_eq!(a.spacing()[i], b.spacing()[i], max_relative = 1e-9);
        assert_relative_eq!(a.offset()[i], b.offset()[i], max_relative = 1e-9);
    }
    for (x, y) in a.voxels().iter().zip(b.voxels().iter()) {
        assert_relative_eq!(*x, *y, max_relative = 1e-5);
    }
}

#[test]
fn writes_all_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let phantom = generate(&small()).unwrap();
    let written = phantom.write_all(dir.path(), Encoding::default()).unwrap();
    for path in &written {
        assert!(path.exists(), "{} missing", path.display());
    }

    let mha_path = dir.path().join("Velocity_L2mm_D0.5mm_R50um_P20000Pa.mha");
    assert!(written.contains(&mha_path));
    let obj = ReaderOptions::new().expected_channels(3).read_file(&mha_path).unwrap();
    assert_eq!(obj.header().dim_size, [40, 15, 15]);

    let fld_path = dir.path().join("Velocity_L2mm_D0.5mm_R50um_P20000Pa.fld");
    let fld = decode_fld(&std::fs::read(&fld_path).unwrap()).unwrap();
    assert_eq!(fld.header().dims, [15, 15, 40]);

    if cfg!(feature = "nifti_output") {
        assert_eq!(written.len(), 4);
        assert!(dir.path().join("Phantom_L2mm_D0.5mm_R50um.nii.gz").exists());
    } else {
        assert_eq!(written.len(), 2);
    }
}
