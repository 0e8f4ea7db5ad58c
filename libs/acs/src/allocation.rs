//! Torque allocation onto the actuator command space.
//!
//! The full mixing matrix `B` maps actuator commands to body torque: wheel
//! columns are the wheel spin axes, magnetorquer columns are
//! `-[b×] · G_mtbᵀ` because a dipole `m` only produces `m × b`. `B` depends on
//! the field estimate and is rebuilt every tick.
//!
//! The current policy does not invert `B`. It maps the desired torque onto
//! magnetorquer dipoles with the pseudo-inverse of the orientation matrix
//! alone and leaves the wheel channels at zero; inertia is ignored as well.
//! Whether `pinv(B)` was intended instead is unresolved, so `B` is only
//! exposed for diagnostics.

use nalgebra::{DMatrix, DVector, Vector3};
use tracing::trace;

use crate::{ActuatorGeometry, Error, IndexSchema, Result};

const PINV_EPS: f64 = 1e-12;

/// Moore–Penrose pseudo-inverse of `G_mtbᵀ` (N_mtb x 3): maps a body vector
/// onto per-magnetorquer magnitudes.
pub fn orientation_pseudo_inverse(geometry: &ActuatorGeometry) -> Result<DMatrix<f64>> {
    geometry
        .mtb_orientation
        .transpose()
        .pseudo_inverse(PINV_EPS)
        .map_err(Error::PseudoInverse)
}

/// Builds the 3 x NU mixing matrix for body-frame field `field`.
pub fn mixing_matrix(
    geometry: &ActuatorGeometry,
    schema: &IndexSchema,
    field: Vector3<f64>,
) -> Result<DMatrix<f64>> {
    schema.check_actuators(geometry.n_rw(), geometry.n_mtb())?;
    let mut b = DMatrix::zeros(3, schema.nu);
    b.columns_mut(schema.rw_torque.start, schema.rw_torque.len())
        .copy_from(&geometry.rw_orientation.transpose());
    let field_cross = DMatrix::from_column_slice(3, 3, field.cross_matrix().as_slice());
    b.columns_mut(schema.mtb_torque.start, schema.mtb_torque.len())
        .copy_from(&(-field_cross * geometry.mtb_orientation.transpose()));
    Ok(b)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// Actuator command, NU long; non-zero only in the magnetorquer slots.
    pub command: DVector<f64>,
    /// Mixing matrix the command was produced against.
    pub mixing: DMatrix<f64>,
}

impl Allocation {
    /// Body torque the mixing matrix predicts for the command.
    pub fn predicted_torque(&self) -> Vector3<f64> {
        let torque = &self.mixing * &self.command;
        Vector3::new(torque[0], torque[1], torque[2])
    }
}

#[derive(Debug, Clone)]
pub struct ActuatorAllocator {
    geometry: ActuatorGeometry,
    mtb_pinv: DMatrix<f64>,
}

impl ActuatorAllocator {
    pub fn new(geometry: ActuatorGeometry) -> Result<Self> {
        let mtb_pinv = orientation_pseudo_inverse(&geometry)?;
        Ok(Self { geometry, mtb_pinv })
    }

    pub fn geometry(&self) -> &ActuatorGeometry {
        &self.geometry
    }

    pub fn allocate(
        &self,
        torque: Vector3<f64>,
        field: Vector3<f64>,
        schema: &IndexSchema,
    ) -> Result<Allocation> {
        let mixing = mixing_matrix(&self.geometry, schema, field)?;
        let torque = DVector::from_column_slice(torque.as_slice());
        let mut command = DVector::zeros(schema.nu);
        command
            .rows_mut(schema.mtb_torque.start, schema.mtb_torque.len())
            .copy_from(&(&self.mtb_pinv * torque));
        let allocation = Allocation { command, mixing };
        trace!(
            command = ?allocation.command.as_slice(),
            predicted_torque = ?allocation.predicted_torque(),
            "allocated torque"
        );
        Ok(allocation)
    }
}
