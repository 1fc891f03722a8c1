//! Digital phantom: a straight tube along the third axis with laminar
//! (Hagen-Poiseuille) flow of water.

use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::{Array3, Array4, Axis};

use crate::error::{FlowError, Result};
use crate::fld::write_fld_file;
use crate::layout::lpi_offset;
use crate::volume::VolumeGrid;
use crate::writer::{Encoding, WriterOptions};

/// Dynamic viscosity of water at room temperature, in Pa·s.
pub const WATER_VISCOSITY: f64 = 0.001;

/// Tube geometry and driving pressure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhantomParams {
    /// Tube length, in millimetres
    pub length_mm: f64,
    /// Tube diameter, in millimetres
    pub diameter_mm: f64,
    /// Voxel size, in micrometres
    pub resolution_um: f64,
    /// Pressure drop along the tube, in pascal
    pub pressure_pa: f64,
}

impl Default for PhantomParams {
    fn default() -> Self {
        PhantomParams {
            length_mm: 20.,
            diameter_mm: 1.5,
            resolution_um: 100.,
            pressure_pa: 20_000.,
        }
    }
}

impl PhantomParams {
    fn length(&self) -> f64 {
        self.length_mm * 1.0e-3
    }

    fn diameter(&self) -> f64 {
        self.diameter_mm * 1.0e-3
    }

    fn resolution(&self) -> f64 {
        self.resolution_um * 1.0e-6
    }

    /// Check that every parameter is a positive number and that the tube is
    /// at least one voxel long.
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("length", self.length_mm),
            ("diameter", self.diameter_mm),
            ("resolution", self.resolution_um),
            ("pressure", self.pressure_pa),
        ];
        for (name, value) in all.iter() {
            if !(value.is_finite() && *value > 0.) {
                return Err(FlowError::InvalidGeometry(format!(
                    "{} must be positive, found {}",
                    name, value
                )));
            }
        }
        if self.dims()[2] == 0 {
            return Err(FlowError::InvalidGeometry(
                "tube is shorter than one voxel".to_string(),
            ));
        }
        Ok(())
    }

    /// Grid size: the cross-section gets a margin of 20% (at least 4 voxels)
    /// and an odd number of voxels.
    pub fn dims(&self) -> [usize; 3] {
        let transverse = (self.diameter() / self.resolution()) as usize;
        let longitudinal = (self.length() / self.resolution()) as usize;
        let mut margin = ((transverse as f64) * 0.2) as usize;
        if margin < 4 {
            margin = 4;
        }
        if (transverse + margin) % 2 == 0 {
            margin += 1;
        }
        [transverse + margin, transverse + margin, longitudinal]
    }

    /// `L<length>mm_D<diameter>mm_R<resolution>um`, shared by all outputs.
    pub fn stem(&self) -> String {
        format!(
            "L{}mm_D{:?}mm_R{}um",
            self.length_mm as i64,
            self.diameter_mm,
            self.resolution_um.round() as i64
        )
    }
}

/// Binary cross-section of a tube, repeated along the third axis. A voxel
/// belongs to the tube when its distance to voxel `(d0 / 2, d1 / 2)` is at
/// most `radius`, with `resolution` the voxel size in the same unit.
pub fn tube_mask(dims: [usize; 3], resolution: f64, radius: f64) -> Array3<i16> {
    let (cx, cy) = ((dims[0] / 2) as f64, (dims[1] / 2) as f64);
    let mut mask = Array3::zeros((dims[0], dims[1], dims[2]));
    for ((x, y, _), v) in mask.indexed_iter_mut() {
        let r = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)).sqrt() * resolution;
        if r <= radius {
            *v = 1;
        }
    }
    mask
}

/// Nominal and discretised figures of a phantom, in SI units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhantomReport {
    /// πR², in m²
    pub nominal_area: f64,
    /// Tube voxels in one slice times the voxel face, in m²
    pub effective_area: f64,
    /// Largest velocity, in m/s
    pub max_velocity: f64,
    /// Analytic flow rate, in m³/s
    pub nominal_flow_rate: f64,
    /// Sum of the velocities in one slice times the voxel face, in m³/s
    pub effective_flow_rate: f64,
    /// Analytic permeability, in m²
    pub nominal_permeability: f64,
    /// Permeability from the discretised flow, in m²
    pub effective_permeability: f64,
}

fn relative_error(effective: f64, nominal: f64) -> f64 {
    (effective - nominal) / nominal * 100.
}

impl PhantomReport {
    /// Discretisation error of the cross-section, in percent.
    pub fn area_error(&self) -> f64 {
        relative_error(self.effective_area, self.nominal_area)
    }

    /// Discretisation error of the flow rate, in percent.
    pub fn flow_rate_error(&self) -> f64 {
        relative_error(self.effective_flow_rate, self.nominal_flow_rate)
    }

    /// Discretisation error of the permeability, in percent.
    pub fn permeability_error(&self) -> f64 {
        relative_error(self.effective_permeability, self.nominal_permeability)
    }
}

impl fmt::Display for PhantomReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        const UM2: f64 = 1.0e12;
        writeln!(f, "Nominal   cross-section area : {:.1} µm²", self.nominal_area * UM2)?;
        writeln!(f, "Effective cross-section area : {:.1} µm²", self.effective_area * UM2)?;
        writeln!(f, "Error after discretization   : {:.2} %", self.area_error())?;
        writeln!(f, "Maximum flow velocity        : {:.1} cm/s", self.max_velocity * 1.0e2)?;
        writeln!(f, "Nominal   flow rate          : {:.3} ml/s", self.nominal_flow_rate * 1.0e6)?;
        writeln!(f, "Effective flow rate          : {:.3} ml/s", self.effective_flow_rate * 1.0e6)?;
        writeln!(f, "Error after discretization   : {:.2} %", self.flow_rate_error())?;
        writeln!(f, "Nominal   permeability       : {:.1} µm²", self.nominal_permeability * UM2)?;
        writeln!(f, "Effective permeability       : {:.1} µm²", self.effective_permeability * UM2)?;
        write!(f, "Error after discretization   : {:.2} %", self.permeability_error())
    }
}

/// A generated phantom.
#[derive(Debug, Clone, PartialEq)]
pub struct Phantom {
    /// Input parameters
    pub params: PhantomParams,
    /// 1 inside the tube, 0 outside
    pub mask: Array3<i16>,
    /// Velocity along the tube, in m/s
    pub velocity: Array3<f32>,
    /// Nominal and effective figures
    pub report: PhantomReport,
}

/// Build the mask and velocity field of a tube.
pub fn generate(params: &PhantomParams) -> Result<Phantom> {
    params.validate()?;
    let dims = params.dims();
    let length = params.length();
    let radius = params.diameter() / 2.;
    let resolution = params.resolution();
    let pressure = params.pressure_pa;
    let mu = WATER_VISCOSITY;

    let mask = tube_mask(dims, resolution, radius);
    let (cx, cy) = ((dims[0] / 2) as f64, (dims[1] / 2) as f64);
    let mut velocity = Array3::<f32>::zeros((dims[0], dims[1], dims[2]));
    for ((x, y, z), v) in velocity.indexed_iter_mut() {
        if mask[[x, y, z]] != 0 {
            let r2 = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)) * resolution * resolution;
            *v = (1. / (4. * mu) * pressure / length * (radius * radius - r2)) as f32;
        }
    }

    let voxel_face = resolution * resolution;
    let first_mask = mask.index_axis(Axis(2), 0);
    let first_velocity = velocity.index_axis(Axis(2), 0);
    let nominal_area = radius * radius * ::std::f64::consts::PI;
    let effective_area = first_mask.iter().filter(|&&m| m != 0).count() as f64 * voxel_face;
    let nominal_flow_rate =
        pressure * ::std::f64::consts::PI * radius.powi(4) / (8. * length * mu);
    let effective_flow_rate =
        first_velocity.iter().map(|&v| f64::from(v)).sum::<f64>() * voxel_face;
    let report = PhantomReport {
        nominal_area,
        effective_area,
        max_velocity: f64::from(velocity.iter().cloned().fold(0f32, f32::max)),
        nominal_flow_rate,
        effective_flow_rate,
        nominal_permeability: nominal_flow_rate * length * mu / (pressure * nominal_area),
        effective_permeability: effective_flow_rate * length * mu / (pressure * effective_area),
    };
    log::info!(
        "phantom grid {} x {} x {}, {} tube voxels per slice",
        dims[0],
        dims[1],
        dims[2],
        first_mask.iter().filter(|&&m| m != 0).count()
    );

    Ok(Phantom {
        params: *params,
        mask,
        velocity,
        report,
    })
}

impl Phantom {
    /// Isotropic voxel size, in micrometres.
    pub fn spacing_um(&self) -> [f64; 3] {
        [self.params.resolution_um; 3]
    }

    /// Velocity laid out for MHA viewers and PerGeos: the tube runs along
    /// the first grid axis and the flow is held in the last channel.
    fn flow_voxels(&self, scale: f32) -> Array4<f32> {
        let (d0, d1, d2) = self.velocity.dim();
        let mut voxels = Array4::<f32>::zeros((d2, d1, d0, 3));
        for ((x, y, z), &v) in self.velocity.indexed_iter() {
            voxels[[z, y, x, 2]] = v * scale;
        }
        voxels
    }

    /// Velocity in cm/s with the LPI offset.
    pub fn mha_grid(&self) -> Result<VolumeGrid> {
        let voxels = self.flow_voxels(100.);
        let (n0, n1, n2, _) = voxels.dim();
        let spacing = self.spacing_um();
        VolumeGrid::new(voxels, spacing, lpi_offset([n0, n1, n2], spacing))
    }

    /// Velocity in µm/s centred on the origin.
    pub fn fld_grid(&self) -> Result<VolumeGrid> {
        VolumeGrid::new(self.flow_voxels(1.0e6), self.spacing_um(), [0.; 3])
    }

    /// Mask file name.
    pub fn mask_name(&self) -> String {
        format!("Phantom_{}.nii.gz", self.params.stem())
    }

    /// Velocity file name with the given extension.
    pub fn velocity_name(&self, extension: &str) -> String {
        format!(
            "Velocity_{}_P{}Pa.{}",
            self.params.stem(),
            self.params.pressure_pa as i64,
            extension
        )
    }

    /// Write the velocity MHA and FLD files, plus the mask and velocity
    /// NIfTI files when NIfTI output is enabled. Returns the paths written.
    pub fn write_all(&self, dir: &Path, encoding: Encoding) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        #[cfg(feature = "nifti_output")]
        {
            use crate::nii::{write_f32, write_i16, SpatialCode, UNITS_MICRON_SEC};
            let spacing = self.spacing_um();
            let path = dir.join(self.mask_name());
            write_i16(&path, &self.mask, spacing, UNITS_MICRON_SEC, SpatialCode::Qform)?;
            written.push(path);
            let path = dir.join(self.velocity_name("nii.gz"));
            let cm = self.velocity.mapv(|v| v * 100.);
            write_f32(&path, &cm, spacing, UNITS_MICRON_SEC, SpatialCode::Qform)?;
            written.push(path);
        }

        let path = dir.join(self.velocity_name("mha"));
        WriterOptions::new(&path)
            .encoding(encoding)
            .write_mha(&self.mha_grid()?)?;
        written.push(path);

        let path = dir.join(self.velocity_name("fld"));
        write_fld_file(&path, &self.fld_grid()?)?;
        written.push(path);
        Ok(written)
    }
}
