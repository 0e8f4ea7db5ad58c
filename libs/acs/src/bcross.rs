//! B-cross rate damping.
//!
//! Commands the body dipole `m = k · (ω − ω_tgt) × b / |b|²`, whose torque
//! `m × b` opposes the rate error perpendicular to the field, then spreads it
//! over the magnetorquers with the orientation pseudo-inverse.

use nalgebra::{DMatrix, DVector, Vector3};

use crate::{
    ActuatorGeometry, ControlLawProvider, DipoleLawInput, Result,
    allocation::orientation_pseudo_inverse,
};

#[derive(Debug, Clone)]
pub struct BcrossLaw {
    gain: f64,
    target_rate: Vector3<f64>,
    channel_map: DMatrix<f64>,
}

impl BcrossLaw {
    pub fn new(gain: f64, target_rate: Vector3<f64>, geometry: &ActuatorGeometry) -> Result<Self> {
        Ok(Self {
            gain,
            target_rate,
            channel_map: orientation_pseudo_inverse(geometry)?,
        })
    }

    /// Body-frame dipole before it is split across the magnetorquers.
    pub fn body_dipole(&self, field: Vector3<f64>, rate: Vector3<f64>) -> Vector3<f64> {
        let field_sq = field.norm_squared();
        if field_sq == 0.0 {
            return Vector3::zeros();
        }
        self.gain * (rate - self.target_rate).cross(&field) / field_sq
    }
}

impl ControlLawProvider for BcrossLaw {
    fn dipole_command(&mut self, input: &DipoleLawInput) -> DVector<f64> {
        let m = self.body_dipole(input.magnetic_field, input.angular_velocity);
        &self.channel_map * DVector::from_column_slice(m.as_slice())
    }
}
