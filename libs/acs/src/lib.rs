//! Attitude-control command pipeline for a magnetorquer-actuated spacecraft.
//!
//! Each tick turns an estimated rotational state into a drive voltage per
//! actuator channel:
//!
//! 1. [`ProfileGenerator`] builds the reference attitude, rate and feed-forward torque;
//! 2. [`ControlLawDispatcher`] runs the configured control law, yielding either
//!    a body torque or a direct dipole command;
//! 3. [`ActuatorAllocator`] maps a torque onto actuator channels;
//! 4. each [`Magnetorquer`] saturates its dipole command into a voltage.
//!
//! [`Controller`] owns the pieces and sequences them.

pub mod allocation;
pub mod bcross;
mod config;
pub mod control_law;
mod controller;
mod error;
pub mod magnetorquer;
pub mod profile;
pub mod rotation;
mod schema;

pub use nalgebra;

pub use allocation::{ActuatorAllocator, Allocation};
pub use bcross::BcrossLaw;
pub use config::{ActuatorGeometry, ControllerConfig, MagnetorquerConfig};
pub use control_law::{
    ControlAlgorithm, ControlCommand, ControlLaw, ControlLawDispatcher, ControlLawProvider,
    DipoleLawInput, SunGuidance,
};
pub use controller::{Controller, Tick};
pub use error::{Error, Quantity, Result};
pub use magnetorquer::Magnetorquer;
pub use profile::{PointingMode, PointingTarget, ProfileGenerator, ReferenceProfile};
pub use schema::{EstimatedState, IndexSchema};
