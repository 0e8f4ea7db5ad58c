use nalgebra::{DMatrix, Matrix3, SMatrix, Vector3};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Rated limits and coil geometry of one PCB magnetorquer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnetorquerConfig {
    /// Rated maximum drive voltage (V).
    pub max_voltage: f64,
    /// Turns per PCB layer.
    pub coils_per_layer: f64,
    /// Number of PCB layers carrying the coil.
    pub layers: f64,
    /// Copper trace width (m).
    pub trace_width: f64,
    /// Copper trace thickness (m).
    pub trace_thickness: f64,
    /// Gap between adjacent traces (m).
    pub gap_width: f64,
    /// Rated maximum current (A).
    pub max_current_rating: f64,
    /// Rated maximum dissipated power (W).
    pub max_power: f64,
}

impl Default for MagnetorquerConfig {
    fn default() -> Self {
        Self {
            max_voltage: 5.0,
            coils_per_layer: 32.0,
            layers: 2.0,
            trace_width: 0.0007317,
            trace_thickness: 3.556e-5, // 1oz copper
            gap_width: 8.999e-5,
            max_current_rating: 1.0,
            max_power: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// `detumble`, `spin-stabilized` or `3D-stabilized`.
    pub pointing_mode: String,
    /// `Sun` or `Nadir`.
    pub pointing_target: String,
    pub tgt_ang_vel: [f64; 3],
    /// 3x6 state-feedback gain matrix, row major.
    pub state_feedback_gains: Vec<f64>,
    /// `Bcross`, `Lyapunov`, `BaseSP` or `StateFeedback`.
    pub algorithm: String,
    /// N_mtb x 3 unit orientations, row major.
    pub mtb_orientation: Vec<f64>,
    /// N_rw x 3 spin axes, row major.
    pub rw_orientation: Vec<f64>,
    /// Body inertia tensor, row major.
    pub inertia: [f64; 9],
    pub bcross_gain: f64,
    pub magnetorquers: Vec<MagnetorquerConfig>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            pointing_mode: "detumble".to_string(),
            pointing_target: "Sun".to_string(),
            tgt_ang_vel: [0.0, 0.0, 0.0],
            state_feedback_gains: vec![0.0; 18],
            algorithm: "Bcross".to_string(),
            mtb_orientation: vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            rw_orientation: vec![],
            inertia: [0.0152, 0.0, 0.0, 0.0, 0.0146, 0.0, 0.0, 0.0, 0.0062],
            bcross_gain: 1.0e4,
            magnetorquers: vec![MagnetorquerConfig::default(); 3],
        }
    }
}

/// Immutable mounting geometry of the actuator suite.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorGeometry {
    /// N_mtb x 3, one unit orientation per row.
    pub mtb_orientation: DMatrix<f64>,
    /// N_rw x 3, one spin axis per row.
    pub rw_orientation: DMatrix<f64>,
    /// Carried for completeness; the current allocation policy does not use it.
    pub inertia: Matrix3<f64>,
}

impl ActuatorGeometry {
    pub fn n_mtb(&self) -> usize {
        self.mtb_orientation.nrows()
    }

    pub fn n_rw(&self) -> usize {
        self.rw_orientation.nrows()
    }

    /// Body-frame orientation of magnetorquer `i`.
    pub fn mtb_axis(&self, i: usize) -> Vector3<f64> {
        let g = &self.mtb_orientation;
        Vector3::new(g[(i, 0)], g[(i, 1)], g[(i, 2)])
    }
}

impl ControllerConfig {
    pub fn geometry(&self) -> Result<ActuatorGeometry> {
        let mtb_orientation = rows_of_three("mtb_orientation", &self.mtb_orientation)?;
        if mtb_orientation.nrows() != self.magnetorquers.len() {
            return Err(Error::config(format!(
                "mtb_orientation describes {} magnetorquers but {} are configured",
                mtb_orientation.nrows(),
                self.magnetorquers.len()
            )));
        }
        Ok(ActuatorGeometry {
            mtb_orientation,
            rw_orientation: rows_of_three("rw_orientation", &self.rw_orientation)?,
            inertia: Matrix3::from_row_slice(&self.inertia),
        })
    }

    pub fn feedback_gains(&self) -> Result<SMatrix<f64, 3, 6>> {
        if self.state_feedback_gains.len() != 18 {
            return Err(Error::config(format!(
                "state_feedback_gains must hold 18 values, found {}",
                self.state_feedback_gains.len()
            )));
        }
        Ok(SMatrix::from_row_slice(&self.state_feedback_gains))
    }
}

fn rows_of_three(key: &str, values: &[f64]) -> Result<DMatrix<f64>> {
    if values.len() % 3 != 0 {
        return Err(Error::config(format!(
            "{key} must be a flattened Nx3 matrix, found {} values",
            values.len()
        )));
    }
    Ok(DMatrix::from_row_slice(values.len() / 3, 3, values))
}
