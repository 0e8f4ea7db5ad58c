//! One control tick, end to end.

use nalgebra::{DVector, Vector3};
use tracing::{debug, trace};

use crate::{
    ActuatorAllocator, Allocation, ControlAlgorithm, ControlCommand, ControlLaw,
    ControlLawDispatcher, ControlLawProvider, ControllerConfig, Error, EstimatedState,
    IndexSchema, Magnetorquer, PointingMode, PointingTarget, ProfileGenerator, ReferenceProfile,
    Result, rotation::inertial_to_body,
};

/// Everything one tick produced, for telemetry and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub profile: ReferenceProfile,
    pub command: ControlCommand,
    /// `None` when the control law commanded dipoles directly.
    pub allocation: Option<Allocation>,
    /// Drive voltage per actuator channel, zero outside the magnetorquer slots.
    pub voltages: DVector<f64>,
}

/// Owns the per-unit magnetorquer models and sequences a control tick.
#[derive(Debug)]
pub struct Controller {
    profile: ProfileGenerator,
    dispatcher: ControlLawDispatcher,
    allocator: ActuatorAllocator,
    magnetorquers: Vec<Magnetorquer>,
}

impl Controller {
    /// Validates `config` once and resolves every string it carries.
    ///
    /// `provider` backs the `Bcross`, `Lyapunov` and `BaseSP` algorithms and is
    /// ignored by `StateFeedback`.
    pub fn new(
        config: &ControllerConfig,
        provider: Option<Box<dyn ControlLawProvider>>,
    ) -> Result<Self> {
        let mode: PointingMode = config.pointing_mode.parse()?;
        let target: PointingTarget = config.pointing_target.parse()?;
        let algorithm: ControlAlgorithm = config.algorithm.parse()?;
        let geometry = config.geometry()?;
        let magnetorquers = config
            .magnetorquers
            .iter()
            .enumerate()
            .map(|(i, mtb)| Magnetorquer::new(mtb, geometry.mtb_axis(i)))
            .collect::<Result<Vec<_>>>()?;
        let law = ControlLaw::resolve(algorithm, config.feedback_gains()?, provider)?;
        debug!(
            ?mode,
            ?target,
            ?algorithm,
            n_mtb = geometry.n_mtb(),
            n_rw = geometry.n_rw(),
            "controller configured"
        );
        Ok(Self {
            profile: ProfileGenerator::new(mode, target, Vector3::from(config.tgt_ang_vel)),
            dispatcher: ControlLawDispatcher::new(law),
            allocator: ActuatorAllocator::new(geometry)?,
            magnetorquers,
        })
    }

    pub fn algorithm(&self) -> ControlAlgorithm {
        self.dispatcher.algorithm()
    }

    pub fn magnetorquers(&self) -> &[Magnetorquer] {
        &self.magnetorquers
    }

    /// Runs one tick and returns the voltage command, `schema.nu` long.
    pub fn run(&mut self, state: &[f64], schema: &IndexSchema) -> Result<DVector<f64>> {
        self.step(state, schema).map(|tick| tick.voltages)
    }

    /// Runs one tick. On error no magnetorquer is driven.
    pub fn step(&mut self, state: &[f64], schema: &IndexSchema) -> Result<Tick> {
        let n_mtb = self.magnetorquers.len();
        schema.check_actuators(self.allocator.geometry().n_rw(), n_mtb)?;
        let state = EstimatedState::new(state, schema)?;

        let profile = self.profile.generate(&state);
        let command = self.dispatcher.dispatch(&profile, &state);
        let (dipoles, allocation) = match &command {
            ControlCommand::Dipole(dipoles) => {
                if dipoles.len() != n_mtb {
                    return Err(Error::DimensionMismatch {
                        what: "dipole command",
                        expected: n_mtb,
                        found: dipoles.len(),
                    });
                }
                (dipoles.clone(), None)
            }
            ControlCommand::Torque(torque) => {
                let field = inertial_to_body(state.quaternion()) * state.magnetic_field();
                let allocation = self.allocator.allocate(*torque, field, schema)?;
                let dipoles = allocation
                    .command
                    .rows(schema.mtb_torque.start, n_mtb)
                    .into_owned();
                (dipoles, Some(allocation))
            }
        };

        let mut voltages = DVector::zeros(schema.nu);
        let channels = schema.mtb_torque.clone();
        for ((mtb, dipole), channel) in self
            .magnetorquers
            .iter_mut()
            .zip(dipoles.iter())
            .zip(channels)
        {
            voltages[channel] = mtb.dipole_to_voltage(*dipole);
        }
        trace!(voltages = ?voltages.as_slice(), "voltage command");
        Ok(Tick {
            profile,
            command,
            allocation,
            voltages,
        })
    }
}
