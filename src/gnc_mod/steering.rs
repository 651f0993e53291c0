use std::f64::consts::PI;

use nalgebra::{UnitQuaternion, Vector3};

use crate::math::{euler_error_deg, reorder_132, sign};
use crate::vessel::ExternalState;

// ---------------------------------------------------------------------------
// Quaternion error -> normalized PID input
// ---------------------------------------------------------------------------

/// Steering error for one tick. All vectors are in control order
/// (pitch, yaw, roll).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringError {
    /// Euler error, degrees, each axis in (-180, 180].
    pub euler_deg: Vector3<f64>,
    /// Absolute error per axis, radians (drives the SAS/RCS arbiter).
    pub abs_rad: Vector3<f64>,
    /// Moment of inertia over available torque, s^2/rad. NaN on axes with
    /// no control authority.
    pub normalization: Vector3<f64>,
    /// Stopping-angle anticipation term, radians.
    pub anticipation: Vector3<f64>,
    /// Normalized error fed to the PID.
    pub input: Vector3<f64>,
    /// Normalized measured body rate, for derivative-on-measurement.
    pub rate: Vector3<f64>,
}

/// Torque available per body axis (pitch, roll, yaw), including the
/// throttle-dependent gimbal contribution on pitch and yaw.
pub fn available_torque(state: &ExternalState, throttle: f64) -> Vector3<f64> {
    let gimbal = state.thrust_torque_available * throttle.clamp(0.0, 1.0);
    Vector3::new(
        state.torque_available.x + gimbal,
        state.torque_available.y,
        state.torque_available.z + gimbal,
    )
}

impl SteeringError {
    /// Error that rotates `current` onto `target`, both body -> world.
    pub fn compute(
        current: &UnitQuaternion<f64>,
        target: &UnitQuaternion<f64>,
        state: &ExternalState,
        throttle: f64,
        anticipate: bool,
    ) -> Self {
        let delta = current.inverse() * target;
        let euler_deg = euler_error_deg(&delta);
        let err = euler_deg.map(f64::to_radians);

        let torque = available_torque(state, throttle);
        let moi = state.moment_of_inertia;
        let normalization_body = Vector3::from_fn(|i, _| {
            if torque[i] > 0.0 && moi[i] > 0.0 {
                moi[i] / torque[i]
            } else {
                f64::NAN
            }
        });
        let normalization = reorder_132(&normalization_body);

        // L^2 / (torque * MoI): twice the angle needed to stop the current spin
        let momentum = state.angular_momentum();
        let braking_body = Vector3::from_fn(|i, _| {
            momentum[i] * momentum[i] / (torque[i] * moi[i])
        });
        let anticipation = if anticipate {
            -sign(&reorder_132(&momentum)).component_mul(&reorder_132(&braking_body))
        } else {
            Vector3::zeros()
        };

        let combined = (err + anticipation).map(|c| c.clamp(-PI, PI));
        let input = combined.component_mul(&normalization);
        let rate = reorder_132(&state.angular_velocity).component_mul(&normalization);

        Self {
            euler_deg,
            abs_rad: err.abs(),
            normalization,
            anticipation,
            input,
            rate,
        }
    }

    /// Largest absolute axis error, radians.
    pub fn max_abs(&self) -> f64 {
        self.abs_rad.max()
    }
}
