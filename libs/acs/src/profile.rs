//! Reference attitude and feed-forward torque generation.

use core::str::FromStr;

use nalgebra::{Matrix3, Quaternion, SVector, Vector3};
use tracing::{trace, warn};

use crate::{EstimatedState, Error, rotation::dcm_to_quaternion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointingMode {
    Detumble,
    SpinStabilized,
    ThreeAxisStabilized,
}

impl FromStr for PointingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "detumble" => Ok(PointingMode::Detumble),
            "spin-stabilized" => Ok(PointingMode::SpinStabilized),
            "3D-stabilized" => Ok(PointingMode::ThreeAxisStabilized),
            other => Err(Error::config(format!("unrecognized pointing mode: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointingTarget {
    Sun,
    /// Not implemented: the reference attitude stays zero.
    Nadir,
}

impl FromStr for PointingTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sun" => Ok(PointingTarget::Sun),
            "Nadir" => Ok(PointingTarget::Nadir),
            other => Err(Error::config(format!(
                "unrecognized pointing target: {other}"
            ))),
        }
    }
}

/// Feed-forward torque and reference state for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceProfile {
    pub torque: Vector3<f64>,
    /// Scalar first; all zero when no attitude is being tracked.
    pub attitude: Quaternion<f64>,
    pub rate: Vector3<f64>,
}

impl ReferenceProfile {
    pub fn zero() -> Self {
        Self {
            torque: Vector3::zeros(),
            attitude: Quaternion::new(0.0, 0.0, 0.0, 0.0),
            rate: Vector3::zeros(),
        }
    }

    /// `[q_w, q_x, q_y, q_z, ω_x, ω_y, ω_z]`
    pub fn state(&self) -> SVector<f64, 7> {
        let q = &self.attitude;
        SVector::<f64, 7>::from_column_slice(&[
            q.w,
            q.i,
            q.j,
            q.k,
            self.rate.x,
            self.rate.y,
            self.rate.z,
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileGenerator {
    mode: PointingMode,
    target: PointingTarget,
    target_rate: Vector3<f64>,
}

impl ProfileGenerator {
    pub fn new(mode: PointingMode, target: PointingTarget, target_rate: Vector3<f64>) -> Self {
        Self {
            mode,
            target,
            target_rate,
        }
    }

    pub fn generate(&self, state: &EstimatedState<'_>) -> ReferenceProfile {
        let attitude = match self.target {
            PointingTarget::Sun => sun_pointing_attitude(state.sun_direction()),
            PointingTarget::Nadir => Quaternion::new(0.0, 0.0, 0.0, 0.0),
        };
        let profile = match self.mode {
            PointingMode::Detumble => ReferenceProfile::zero(),
            PointingMode::SpinStabilized => ReferenceProfile {
                torque: Vector3::zeros(),
                attitude,
                rate: self.target_rate,
            },
            PointingMode::ThreeAxisStabilized => ReferenceProfile {
                torque: Vector3::zeros(),
                attitude,
                rate: Vector3::zeros(),
            },
        };
        trace!(
            mode = ?self.mode,
            target = ?self.target,
            reference = ?profile.state(),
            "reference profile"
        );
        profile
    }
}

/// Attitude whose body +z axis points away from the sun.
///
/// The body x axis is `z × [0, 0, 1]`, which vanishes when the sun lies along
/// the inertial z axis; the frame is then undefined and the result degenerates
/// to whatever the conversion of the remaining `[0, 0, z]` column yields.
pub fn sun_pointing_attitude(sun: Vector3<f64>) -> Quaternion<f64> {
    let z_body = -sun / sun.norm();
    let x_body = z_body.cross(&Vector3::z());
    if x_body.norm() < 1e-9 {
        warn!(
            ?sun,
            "sun vector colinear with inertial z, sun-pointing frame is degenerate"
        );
    }
    let y_body = z_body.cross(&x_body);
    dcm_to_quaternion(&Matrix3::from_columns(&[x_body, y_body, z_body]))
}
