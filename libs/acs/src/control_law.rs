//! Control-law selection and dispatch.
//!
//! Three of the laws command magnetorquer dipoles directly and bypass torque
//! allocation; state feedback produces a body torque that still has to be
//! allocated. The two outputs are kept apart in [`ControlCommand`].

use core::fmt;
use core::str::FromStr;

use nalgebra::{DVector, Quaternion, SMatrix, SVector, Vector3};
use tracing::trace;

use crate::{EstimatedState, Error, ReferenceProfile, Result, rotation::inertial_to_body};

/// Body-frame inputs handed to a dipole-commanding control law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DipoleLawInput {
    pub magnetic_field: Vector3<f64>,
    pub angular_velocity: Vector3<f64>,
    /// Present for the sun-pointing laws only.
    pub sun_guidance: Option<SunGuidance>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunGuidance {
    pub reference_rate: Vector3<f64>,
    /// Unit sun vector in the body frame.
    pub sun_vector: Vector3<f64>,
}

/// A control law that commands magnetorquer dipoles directly.
pub trait ControlLawProvider {
    /// One signed dipole magnitude per magnetorquer channel (A·m²).
    fn dipole_command(&mut self, input: &DipoleLawInput) -> DVector<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAlgorithm {
    Bcross,
    Lyapunov,
    BaseSunPointing,
    StateFeedback,
}

impl FromStr for ControlAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bcross" => Ok(ControlAlgorithm::Bcross),
            "Lyapunov" => Ok(ControlAlgorithm::Lyapunov),
            "BaseSP" => Ok(ControlAlgorithm::BaseSunPointing),
            "StateFeedback" => Ok(ControlAlgorithm::StateFeedback),
            other => Err(Error::config(format!(
                "unrecognized controller algorithm: {other}"
            ))),
        }
    }
}

pub enum ControlLaw {
    Bcross(Box<dyn ControlLawProvider>),
    Lyapunov(Box<dyn ControlLawProvider>),
    BaseSunPointing(Box<dyn ControlLawProvider>),
    StateFeedback { gains: SMatrix<f64, 3, 6> },
}

impl fmt::Debug for ControlLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlLaw::StateFeedback { gains } => f
                .debug_struct("StateFeedback")
                .field("gains", gains)
                .finish(),
            law => write!(f, "{:?}", law.algorithm()),
        }
    }
}

impl ControlLaw {
    /// Binds `algorithm` to its parameters. The dipole-commanding laws need a
    /// provider; state feedback only needs its gains.
    pub fn resolve(
        algorithm: ControlAlgorithm,
        gains: SMatrix<f64, 3, 6>,
        provider: Option<Box<dyn ControlLawProvider>>,
    ) -> Result<Self> {
        let law = match (algorithm, provider) {
            (ControlAlgorithm::StateFeedback, _) => ControlLaw::StateFeedback { gains },
            (ControlAlgorithm::Bcross, Some(p)) => ControlLaw::Bcross(p),
            (ControlAlgorithm::Lyapunov, Some(p)) => ControlLaw::Lyapunov(p),
            (ControlAlgorithm::BaseSunPointing, Some(p)) => ControlLaw::BaseSunPointing(p),
            (algorithm, None) => {
                return Err(Error::config(format!(
                    "{algorithm:?} requires a control law provider"
                )));
            }
        };
        Ok(law)
    }

    pub fn algorithm(&self) -> ControlAlgorithm {
        match self {
            ControlLaw::Bcross(_) => ControlAlgorithm::Bcross,
            ControlLaw::Lyapunov(_) => ControlAlgorithm::Lyapunov,
            ControlLaw::BaseSunPointing(_) => ControlAlgorithm::BaseSunPointing,
            ControlLaw::StateFeedback { .. } => ControlAlgorithm::StateFeedback,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    /// Body torque (N·m); must be allocated to actuators.
    Torque(Vector3<f64>),
    /// Per-magnetorquer dipole magnitudes (A·m²); bypasses allocation.
    Dipole(DVector<f64>),
}

#[derive(Debug)]
pub struct ControlLawDispatcher {
    law: ControlLaw,
}

impl ControlLawDispatcher {
    pub fn new(law: ControlLaw) -> Self {
        Self { law }
    }

    pub fn algorithm(&self) -> ControlAlgorithm {
        self.law.algorithm()
    }

    pub fn dispatch(
        &mut self,
        profile: &ReferenceProfile,
        state: &EstimatedState<'_>,
    ) -> ControlCommand {
        let angular_velocity = state.angular_velocity();
        let command = match &mut self.law {
            ControlLaw::Bcross(provider) => {
                let r = inertial_to_body(state.quaternion());
                ControlCommand::Dipole(provider.dipole_command(&DipoleLawInput {
                    magnetic_field: r * state.magnetic_field(),
                    angular_velocity,
                    sun_guidance: None,
                }))
            }
            ControlLaw::Lyapunov(provider) | ControlLaw::BaseSunPointing(provider) => {
                let r = inertial_to_body(state.quaternion());
                let sun = r * state.sun_direction();
                ControlCommand::Dipole(provider.dipole_command(&DipoleLawInput {
                    magnetic_field: r * state.magnetic_field(),
                    angular_velocity,
                    sun_guidance: Some(SunGuidance {
                        reference_rate: profile.rate,
                        sun_vector: sun / sun.norm(),
                    }),
                }))
            }
            ControlLaw::StateFeedback { gains } => ControlCommand::Torque(state_feedback(
                gains,
                profile,
                state.quaternion(),
                angular_velocity,
            )),
        };
        trace!(?command, "control command");
        command
    }
}

/// `τ = τ_ref + K · [vec(q_ref ⊗ q_est*), ω_ref − ω_est]`
pub fn state_feedback(
    gains: &SMatrix<f64, 3, 6>,
    profile: &ReferenceProfile,
    q_est: Quaternion<f64>,
    omega_est: Vector3<f64>,
) -> Vector3<f64> {
    let q_err = profile.attitude * q_est.conjugate();
    let rate_err = profile.rate - omega_est;
    let err =
        SVector::<f64, 6>::from_iterator(q_err.imag().iter().chain(rate_err.iter()).copied());
    profile.torque + gains * err
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use approx::assert_relative_eq;
    use nalgebra::{UnitQuaternion, vector};

    use super::*;
    use crate::IndexSchema;

    /// Records what the dispatcher hands over and answers with a fixed command.
    struct Recorder {
        seen: Rc<RefCell<Vec<DipoleLawInput>>>,
        answer: DVector<f64>,
    }

    impl ControlLawProvider for Recorder {
        fn dipole_command(&mut self, input: &DipoleLawInput) -> DVector<f64> {
            self.seen.borrow_mut().push(*input);
            self.answer.clone()
        }
    }

    fn recorder() -> (Box<dyn ControlLawProvider>, Rc<RefCell<Vec<DipoleLawInput>>>) {
        let seen = Rc::new(RefCell::new(vec![]));
        let provider = Recorder {
            seen: seen.clone(),
            answer: DVector::from_column_slice(&[0.01, -0.02, 0.03]),
        };
        (Box::new(provider), seen)
    }

    /// Body rotated 90° about inertial z.
    fn rotated_state() -> Vec<f64> {
        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), core::f64::consts::FRAC_PI_2);
        vec![
            q.w, q.i, q.j, q.k, // attitude
            0.1, 0.0, -0.1, // rate
            0.0, 3e-5, 0.0, // inertial field
            0.0, 5.0, 0.0, // inertial sun
        ]
    }

    #[test]
    fn test_bcross_gets_body_field() {
        let schema = IndexSchema::packed(0, 3);
        let buf = rotated_state();
        let state = EstimatedState::new(&buf, &schema).unwrap();
        let (provider, seen) = recorder();
        let law =
            ControlLaw::resolve(ControlAlgorithm::Bcross, SMatrix::zeros(), Some(provider))
                .unwrap();
        let mut dispatcher = ControlLawDispatcher::new(law);
        let command = dispatcher.dispatch(&ReferenceProfile::zero(), &state);
        assert_eq!(
            command,
            ControlCommand::Dipole(DVector::from_column_slice(&[0.01, -0.02, 0.03]))
        );
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_relative_eq!(seen[0].magnetic_field, vector![3e-5, 0.0, 0.0], epsilon = 1e-15);
        assert_eq!(seen[0].angular_velocity, vector![0.1, 0.0, -0.1]);
        assert!(seen[0].sun_guidance.is_none());
    }

    #[test]
    fn test_sun_pointing_gets_unit_body_sun() {
        let schema = IndexSchema::packed(0, 3);
        let buf = rotated_state();
        let state = EstimatedState::new(&buf, &schema).unwrap();
        for algorithm in [ControlAlgorithm::Lyapunov, ControlAlgorithm::BaseSunPointing] {
            let (provider, seen) = recorder();
            let law = ControlLaw::resolve(algorithm, SMatrix::zeros(), Some(provider)).unwrap();
            let mut dispatcher = ControlLawDispatcher::new(law);
            let profile = ReferenceProfile {
                rate: vector![0.0, 0.0, 0.2],
                ..ReferenceProfile::zero()
            };
            dispatcher.dispatch(&profile, &state);
            let guidance = seen.borrow()[0].sun_guidance.unwrap();
            assert_relative_eq!(guidance.sun_vector, vector![1.0, 0.0, 0.0], epsilon = 1e-12);
            assert_eq!(guidance.reference_rate, vector![0.0, 0.0, 0.2]);
        }
    }

    #[test]
    fn test_state_feedback_returns_torque() {
        let schema = IndexSchema::packed(0, 3);
        let buf = [
            1.0, 0.0, 0.0, 0.0, 0.01, 0.02, 0.03, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
        ];
        let state = EstimatedState::new(&buf, &schema).unwrap();
        let mut gains = SMatrix::<f64, 3, 6>::zeros();
        gains.fixed_view_mut::<3, 3>(0, 0).fill_with_identity();
        gains.fixed_view_mut::<3, 3>(0, 3).fill_with_identity();
        gains *= 2.0;
        let law = ControlLaw::resolve(ControlAlgorithm::StateFeedback, gains, None).unwrap();
        let mut dispatcher = ControlLawDispatcher::new(law);

        let q_ref = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.2);
        let profile = ReferenceProfile {
            torque: vector![1e-3, 0.0, 0.0],
            attitude: q_ref.into_inner(),
            rate: Vector3::zeros(),
        };
        let ControlCommand::Torque(torque) = dispatcher.dispatch(&profile, &state) else {
            panic!("state feedback must produce a torque");
        };
        let expected = vector![1e-3 + 2.0 * (0.1f64).sin(), 0.0, 0.0]
            + 2.0 * vector![-0.01, -0.02, -0.03];
        assert_relative_eq!(torque, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_state_feedback_error_is_hamilton_product() {
        let q_ref = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.4).into_inner();
        let q_est = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.3).into_inner();
        let profile = ReferenceProfile {
            torque: Vector3::zeros(),
            attitude: q_ref,
            rate: Vector3::zeros(),
        };
        let mut gains = SMatrix::<f64, 3, 6>::zeros();
        gains.fixed_view_mut::<3, 3>(0, 0).fill_with_identity();
        let torque = state_feedback(&gains, &profile, q_est, Vector3::zeros());

        // q_ref ⊗ q_est* for x(0.4) and y(0.3), expanded by hand
        let (sa, ca) = (0.2f64.sin(), 0.2f64.cos());
        let (sb, cb) = (0.15f64.sin(), 0.15f64.cos());
        let expected = vector![sa * cb, -ca * sb, -sa * sb];
        assert_relative_eq!(torque, expected, epsilon = 1e-12);
        // the reversed product differs in the z component
        let reversed = (q_est.conjugate() * q_ref).imag();
        assert!((reversed - expected).norm() > 1e-2);
    }

    #[test]
    fn test_resolve() {
        assert!(matches!(
            "Magic".parse::<ControlAlgorithm>(),
            Err(Error::InvalidConfiguration(_))
        ));
        assert_eq!("BaseSP".parse(), Ok(ControlAlgorithm::BaseSunPointing));
        assert!(matches!(
            ControlLaw::resolve(ControlAlgorithm::Lyapunov, SMatrix::zeros(), None),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}
