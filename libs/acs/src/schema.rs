//! Index schema shared with the estimator and the actuator drivers.
//!
//! The schema maps symbolic slices (quaternion, rate, field, sun) onto the
//! flat estimated-state vector, and actuator groups onto the flat command
//! vector. Nothing in this crate hardcodes an offset; everything goes through
//! an [`IndexSchema`].

use core::ops::Range;

use nalgebra::{Quaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Orientation quaternion, scalar first.
    pub quat: Range<usize>,
    /// Body angular velocity.
    pub ang_vel: Range<usize>,
    /// Inertial magnetic field.
    pub mag_field: Range<usize>,
    /// Inertial sun direction, not necessarily normalized.
    pub sun_pos: Range<usize>,
    pub rw_torque: Range<usize>,
    pub mtb_torque: Range<usize>,
    /// Total number of actuator channels.
    pub nu: usize,
}

impl IndexSchema {
    /// Densely packed layout: `[quat, ang_vel, mag_field, sun_pos]` for the
    /// state and `[wheels, magnetorquers]` for the actuators.
    pub fn packed(n_rw: usize, n_mtb: usize) -> Self {
        Self {
            quat: 0..4,
            ang_vel: 4..7,
            mag_field: 7..10,
            sun_pos: 10..13,
            rw_torque: 0..n_rw,
            mtb_torque: n_rw..n_rw + n_mtb,
            nu: n_rw + n_mtb,
        }
    }

    /// Length of the state vector the packed layout expects.
    pub fn state_len(&self) -> usize {
        [&self.quat, &self.ang_vel, &self.mag_field, &self.sun_pos]
            .into_iter()
            .map(|r| r.end)
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn check_actuators(&self, n_rw: usize, n_mtb: usize) -> Result<()> {
        for (what, range, expected) in [
            ("RW_TORQUE slice", &self.rw_torque, n_rw),
            ("MTB_TORQUE slice", &self.mtb_torque, n_mtb),
        ] {
            if range.len() != expected {
                return Err(Error::DimensionMismatch {
                    what,
                    expected,
                    found: range.len(),
                });
            }
            if range.end > self.nu {
                return Err(Error::OutOfBounds {
                    range: range.clone(),
                    len: self.nu,
                });
            }
        }
        Ok(())
    }
}

/// Read-only view over one tick's estimated world state.
#[derive(Debug, Clone, Copy)]
pub struct EstimatedState<'a> {
    buf: &'a [f64],
    schema: &'a IndexSchema,
}

impl<'a> EstimatedState<'a> {
    pub fn new(buf: &'a [f64], schema: &'a IndexSchema) -> Result<Self> {
        for (range, expected) in [
            (&schema.quat, 4),
            (&schema.ang_vel, 3),
            (&schema.mag_field, 3),
            (&schema.sun_pos, 3),
        ] {
            if range.len() != expected {
                return Err(Error::DimensionMismatch {
                    what: "state slice",
                    expected,
                    found: range.len(),
                });
            }
            if range.end > buf.len() {
                return Err(Error::OutOfBounds {
                    range: range.clone(),
                    len: buf.len(),
                });
            }
        }
        Ok(Self { buf, schema })
    }

    pub fn quaternion(&self) -> Quaternion<f64> {
        let q = &self.buf[self.schema.quat.clone()];
        Quaternion::new(q[0], q[1], q[2], q[3])
    }

    pub fn angular_velocity(&self) -> Vector3<f64> {
        self.vec3(&self.schema.ang_vel)
    }

    pub fn magnetic_field(&self) -> Vector3<f64> {
        self.vec3(&self.schema.mag_field)
    }

    pub fn sun_direction(&self) -> Vector3<f64> {
        self.vec3(&self.schema.sun_pos)
    }

    fn vec3(&self, range: &Range<usize>) -> Vector3<f64> {
        Vector3::from_column_slice(&self.buf[range.clone()])
    }
}
