//! Property-based tests for the magnetorquer model.
//!
//! The validating setters and the saturating converters have opposite error
//! policies; these tests pin both down across the whole input range.

use acs::{Error, Magnetorquer, MagnetorquerConfig, Quantity};
use nalgebra::Vector3;
use proptest::prelude::*;

fn config() -> impl Strategy<Value = MagnetorquerConfig> {
    (
        0.5f64..12.0,
        4.0f64..40.0,
        1.0f64..6.0,
        2e-4f64..8e-4,
        1e-5f64..7e-5,
        5e-5f64..2e-4,
        0.05f64..2.0,
        0.05f64..2.0,
    )
        .prop_map(
            |(
                max_voltage,
                coils_per_layer,
                layers,
                trace_width,
                trace_thickness,
                gap_width,
                max_current_rating,
                max_power,
            )| MagnetorquerConfig {
                max_voltage,
                coils_per_layer: coils_per_layer.round(),
                layers: layers.round(),
                trace_width,
                trace_thickness,
                gap_width,
                max_current_rating,
                max_power,
            },
        )
}

fn unit() -> Magnetorquer {
    Magnetorquer::new(&MagnetorquerConfig::default(), Vector3::y()).unwrap()
}

proptest! {
    #[test]
    fn current_dipole_round_trip(frac in -1.0f64..=1.0) {
        let mtb = unit();
        let current = frac * mtb.max_current();
        let dipole = mtb.current_to_dipole(current);
        let back = mtb.dipole_to_current(dipole.dot(&mtb.orientation()));
        prop_assert!((back - current).abs() <= 1e-12 * mtb.max_current());
    }

    #[test]
    fn oversized_dipole_saturates_voltage(excess in 1.0f64..1e6, negative in any::<bool>()) {
        let mut mtb = unit();
        let sign = if negative { -1.0 } else { 1.0 };
        let dipole = sign * (mtb.max_dipole_moment() + excess * 1e-9);
        let voltage = mtb.dipole_to_voltage(dipole);
        prop_assert_eq!(voltage.abs(), mtb.max_voltage());
        prop_assert_eq!(voltage.signum(), sign);
        prop_assert!(mtb.current().abs() <= mtb.max_current());
    }

    #[test]
    fn converters_never_exceed_limits(dipole in -1e3f64..1e3, voltage in -1e3f64..1e3) {
        let mut mtb = unit();
        let v = mtb.dipole_to_voltage(dipole);
        prop_assert!(v.abs() <= mtb.max_voltage());
        prop_assert!(mtb.dipole_moment().norm() <= mtb.max_dipole_moment() * (1.0 + 1e-12));
        prop_assert!((mtb.power() - mtb.get_power()).abs() <= 1e-15);

        let m = mtb.voltage_to_dipole(voltage);
        prop_assert!(mtb.current().abs() <= mtb.max_current());
        prop_assert!(m.norm() <= mtb.max_dipole_moment() * (1.0 + 1e-12));
        // the requested voltage is kept as is
        prop_assert_eq!(mtb.voltage(), voltage);
    }

    #[test]
    fn set_voltage_rejects_implied_overcurrent(frac in 0.9f64..=1.0) {
        let mut mtb = unit();
        let voltage = frac * mtb.max_voltage();
        let implied = voltage / mtb.resistance();
        match mtb.set_voltage(voltage) {
            Ok(()) => prop_assert!(implied.abs() <= mtb.max_current()),
            Err(Error::Range { quantity, .. }) => {
                prop_assert_eq!(quantity, Quantity::Current);
                prop_assert!(implied.abs() > mtb.max_current());
            }
            Err(err) => prop_assert!(false, "unexpected error {err}"),
        }
    }

    #[test]
    fn identical_config_identical_constants(config in config()) {
        let (Ok(a), Ok(b)) = (
            Magnetorquer::new(&config, Vector3::x()),
            Magnetorquer::new(&config, Vector3::x()),
        ) else {
            // winding does not fit on the board
            return Ok(());
        };
        prop_assert!(a.resistance() > 0.0);
        prop_assert_eq!(a.resistance(), b.resistance());
        prop_assert_eq!(a.max_current(), b.max_current());
        prop_assert_eq!(a.max_voltage(), b.max_voltage());
        prop_assert_eq!(a.max_dipole_moment(), b.max_dipole_moment());
        prop_assert!(a.max_current() <= config.max_current_rating);
        prop_assert!(a.max_power() <= config.max_power * (1.0 + 1e-12));
        prop_assert!(a.max_voltage() <= config.max_voltage * (1.0 + 1e-12));
    }
}

#[test]
fn setter_and_converter_disagree_at_the_boundary() {
    let mut mtb = unit();
    let max = mtb.max_dipole_moment();
    for d in [max, -max, max + 1e-9, -max - 1e-9] {
        let in_range = d.abs() <= max;
        assert_eq!(mtb.set_dipole_moment(d).is_ok(), in_range, "set_dipole_moment({d})");
        if in_range {
            assert_eq!(mtb.dipole_moment(), d * Vector3::y());
        }

        mtb.dipole_to_voltage(d);
        assert_eq!(mtb.dipole_moment(), d.clamp(-max, max) * Vector3::y());
    }
}

#[test]
fn set_voltage_over_limit() {
    let mut mtb = unit();
    let err = mtb.set_voltage(mtb.max_voltage() * 1.01).unwrap_err();
    assert!(matches!(
        err,
        Error::Range {
            quantity: Quantity::Voltage,
            ..
        }
    ));
}
