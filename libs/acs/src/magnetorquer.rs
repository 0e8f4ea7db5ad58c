//! Electro-physical model of a single PCB magnetorquer.
//!
//! The model converts between dipole moment, coil current and drive voltage.
//! Two families of operations exist and their error policies must never be
//! merged:
//!
//! - validating setters ([`Magnetorquer::set_voltage`], [`Magnetorquer::set_current`],
//!   [`Magnetorquer::set_dipole_moment`]) reject out-of-range input with
//!   [`Error::Range`] and leave the unit untouched;
//! - saturating converters ([`Magnetorquer::dipole_to_voltage`] and friends)
//!   never fail, they clip to the unit's limits so the control loop always has
//!   a command to emit.

use nalgebra::Vector3;
use tracing::{debug, trace};

use crate::{Error, MagnetorquerConfig, Quantity, Result};

/// Resistivity of annealed copper (Ω·m).
pub const COPPER_RESISTIVITY: f64 = 1.724e-8;

/// Side length of the square PCB the coil is wound on (m).
pub const PCB_SIDE_MAX: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct Magnetorquer {
    orientation: Vector3<f64>,
    turns_per_face: f64,
    cross_section_area: f64,
    resistance: f64,
    max_current: f64,
    max_voltage: f64,
    max_power: f64,
    max_dipole_moment: f64,

    dipole_moment: Vector3<f64>,
    current: f64,
    voltage: f64,
    power: f64,
}

impl Magnetorquer {
    /// Derives the coil constants of one unit.
    ///
    /// The maximum current is the tightest of the rated current, the power
    /// rating and the voltage rating; every other limit is derived from it.
    pub fn new(config: &MagnetorquerConfig, orientation: Vector3<f64>) -> Result<Self> {
        let MagnetorquerConfig {
            max_voltage,
            coils_per_layer,
            layers,
            trace_width,
            trace_thickness,
            gap_width,
            max_current_rating,
            max_power,
        } = *config;
        if trace_width <= 0.0 || trace_thickness <= 0.0 {
            return Err(Error::config("trace width and thickness must be positive"));
        }
        if coils_per_layer <= 0.0 || layers <= 0.0 {
            return Err(Error::config("coil must have at least one turn"));
        }
        for (name, limit) in [
            ("max_voltage", max_voltage),
            ("max_current_rating", max_current_rating),
            ("max_power", max_power),
        ] {
            // a non-positive limit inverts every clamp range below
            if !limit.is_finite() || limit <= 0.0 {
                return Err(Error::config(format!(
                    "{name} must be finite and positive, found {limit}"
                )));
            }
        }

        let coil_width = trace_width + gap_width;
        let turns_per_face = coils_per_layer * layers;
        let side = PCB_SIDE_MAX - coils_per_layer * coil_width;
        if side <= 0.0 {
            return Err(Error::config(format!(
                "{coils_per_layer} turns of {coil_width} m do not fit on a {PCB_SIDE_MAX} m board"
            )));
        }
        let cross_section_area = side * side;
        let coil_length = 4.0 * side * coils_per_layer * layers;
        let resistance = COPPER_RESISTIVITY * coil_length / (trace_width * trace_thickness);

        let max_current = max_current_rating
            .min((max_power / resistance).sqrt())
            .min(max_voltage / resistance);
        let this = Self {
            orientation,
            turns_per_face,
            cross_section_area,
            resistance,
            max_current,
            max_voltage: resistance * max_current,
            max_power: resistance * max_current * max_current,
            max_dipole_moment: turns_per_face * max_current * cross_section_area,
            dipole_moment: Vector3::zeros(),
            current: 0.0,
            voltage: 0.0,
            power: 0.0,
        };
        debug!(
            resistance = this.resistance,
            max_current = this.max_current,
            max_voltage = this.max_voltage,
            max_dipole_moment = this.max_dipole_moment,
            "magnetorquer constants"
        );
        Ok(this)
    }

    pub fn orientation(&self) -> Vector3<f64> {
        self.orientation
    }

    pub fn resistance(&self) -> f64 {
        self.resistance
    }

    pub fn max_current(&self) -> f64 {
        self.max_current
    }

    pub fn max_voltage(&self) -> f64 {
        self.max_voltage
    }

    pub fn max_power(&self) -> f64 {
        self.max_power
    }

    pub fn max_dipole_moment(&self) -> f64 {
        self.max_dipole_moment
    }

    pub fn cross_section_area(&self) -> f64 {
        self.cross_section_area
    }

    pub fn turns_per_face(&self) -> f64 {
        self.turns_per_face
    }

    pub fn dipole_moment(&self) -> Vector3<f64> {
        self.dipole_moment
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn voltage(&self) -> f64 {
        self.voltage
    }

    /// Power stored by the last conversion.
    pub fn power(&self) -> f64 {
        self.power
    }

    /// Dipole moment produced per ampere of coil current (A·m²/A).
    pub fn dipole_per_amp(&self) -> f64 {
        self.turns_per_face * self.cross_section_area
    }

    /// Torque produced by the stored dipole moment in `field` (same frame as the dipole).
    pub fn torque(&self, field: Vector3<f64>) -> Vector3<f64> {
        self.dipole_moment.cross(&field)
    }

    /// Ohmic power at the stored current.
    pub fn get_power(&self) -> f64 {
        self.resistance * self.current * self.current
    }

    pub fn set_voltage(&mut self, voltage: f64) -> Result<()> {
        if voltage.abs() > self.max_voltage {
            return Err(Error::Range {
                quantity: Quantity::Voltage,
                value: voltage,
                limit: self.max_voltage,
            });
        }
        // a voltage inside its own bound can still imply too much current
        let current = voltage / self.resistance;
        if current.abs() > self.max_current {
            return Err(Error::Range {
                quantity: Quantity::Current,
                value: current,
                limit: self.max_current,
            });
        }
        self.voltage = voltage;
        self.current = current;
        self.power = self.resistance * current * current;
        self.dipole_moment = self.current_to_dipole(current);
        Ok(())
    }

    pub fn set_current(&mut self, current: f64) -> Result<()> {
        if current.abs() > self.max_current {
            return Err(Error::Range {
                quantity: Quantity::Current,
                value: current,
                limit: self.max_current,
            });
        }
        self.current = current;
        self.voltage = current * self.resistance;
        self.power = self.resistance * current * current;
        self.dipole_moment = self.current_to_dipole(current);
        Ok(())
    }

    /// Assigns `magnitude` along the unit's orientation without clipping.
    pub fn set_dipole_moment(&mut self, magnitude: f64) -> Result<()> {
        if magnitude.abs() > self.max_dipole_moment {
            return Err(Error::Range {
                quantity: Quantity::DipoleMoment,
                value: magnitude,
                limit: self.max_dipole_moment,
            });
        }
        self.dipole_moment = magnitude * self.orientation;
        Ok(())
    }

    /// Dipole vector produced by `current`, clipped to the current limit.
    pub fn current_to_dipole(&self, current: f64) -> Vector3<f64> {
        let current = current.clamp(-self.max_current, self.max_current);
        self.dipole_per_amp() * current * self.orientation
    }

    /// Current needed for dipole magnitude `dipole`, clipped to the dipole limit.
    pub fn dipole_to_current(&self, dipole: f64) -> f64 {
        let dipole = dipole.clamp(-self.max_dipole_moment, self.max_dipole_moment);
        dipole / self.turns_per_face / self.cross_section_area
    }

    /// Per-tick actuation entry point: saturates dipole, current and voltage in
    /// turn, stores the result and returns the drive voltage.
    ///
    /// Non-finite input is not sanitized: a NaN dipole yields a NaN voltage.
    pub fn dipole_to_voltage(&mut self, dipole: f64) -> f64 {
        let clipped = dipole.clamp(-self.max_dipole_moment, self.max_dipole_moment);
        self.dipole_moment = clipped * self.orientation;
        // a saturated dipole drives the full rated current
        self.current = if clipped.abs() >= self.max_dipole_moment {
            self.max_current.copysign(clipped)
        } else {
            self.dipole_to_current(clipped)
                .clamp(-self.max_current, self.max_current)
        };
        self.voltage = (self.current * self.resistance).clamp(-self.max_voltage, self.max_voltage);
        self.power = self.resistance * self.current * self.current;
        if clipped != dipole {
            trace!(requested = dipole, applied = clipped, "dipole command saturated");
        }
        self.voltage
    }

    /// Reverse conversion. The current is clipped but the stored voltage is
    /// the requested one, unclipped.
    pub fn voltage_to_dipole(&mut self, voltage: f64) -> Vector3<f64> {
        self.voltage = voltage;
        self.current = (voltage / self.resistance).clamp(-self.max_current, self.max_current);
        self.dipole_moment = self.current_to_dipole(self.current);
        self.power = self.resistance * self.current * self.current;
        self.dipole_moment
    }
}
