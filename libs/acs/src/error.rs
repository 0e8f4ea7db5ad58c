//! Provides error definitions.
use core::fmt;
use core::ops::Range;

use thiserror::Error;

/// Physical quantity whose bound was violated by a validating setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Voltage,
    Current,
    DipoleMoment,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Quantity::Voltage => "voltage",
            Quantity::Current => "current",
            Quantity::DipoleMoment => "dipole moment",
        };
        f.write_str(name)
    }
}

/// Enumerates the failures that abort a control tick or reject a configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A validating setter received a value outside the unit's rated bound.
    #[error("{quantity} {value} exceeds limit of {limit}")]
    Range {
        quantity: Quantity,
        value: f64,
        limit: f64,
    },

    /// A configuration value could not be resolved.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Two collaborating shapes disagree, e.g. a schema slice and the actuator geometry.
    #[error("{what} has length {found}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// A schema slice reaches past the end of the vector it indexes.
    #[error("index range {range:?} out of bounds for vector of length {len}")]
    OutOfBounds { range: Range<usize>, len: usize },

    /// The SVD backing the pseudo-inverse did not converge.
    #[error("pseudo-inverse failed: {0}")]
    PseudoInverse(&'static str),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::InvalidConfiguration(msg.into())
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
