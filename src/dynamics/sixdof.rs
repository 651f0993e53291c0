use nalgebra::{Quaternion, Vector3};

use crate::dynamics::state::{Deriv, State, MU};
use crate::math::reorder_132;
use crate::vehicle::Craft;
use crate::vessel::FlightCommand;

// ---------------------------------------------------------------------------
// 6DOF Equations of motion
// ---------------------------------------------------------------------------

/// Compute full 6DOF state derivatives.
///
/// Forces & moments:
///   1. Gravity (inverse-square, central body at the origin)
///   2. RCS translation (body frame -> inertial), only while RCS is on
///   3. Rotation command x available torque (wheels, plus RCS while on)
///   4. SAS rate damping while SAS is on
pub fn derivatives(state: &State, craft: &Craft, cmd: &FlightCommand) -> Deriv {
    // --- Gravity (inertial) ---
    let r = state.pos.norm();
    let a_gravity = if r > 1.0 { -state.pos * (MU / (r * r * r)) } else { Vector3::zeros() };

    // --- RCS translation (body frame) ---
    let mut f_body = Vector3::zeros();
    let mut mass_flow = 0.0;
    if cmd.rcs {
        let translation = cmd.translation();
        for i in 0..3 {
            let c = translation[i].clamp(-1.0, 1.0);
            let available = if c >= 0.0 { craft.rcs_thrust.positive[i] } else { craft.rcs_thrust.negative[i] };
            f_body[i] = c * available;
            mass_flow += craft.rcs_mass_flow(f_body[i].abs());
        }
    }
    let mass = state.mass.max(1e-6);
    let accel = a_gravity + state.quat * f_body / mass;

    // --- Torques (body frame) ---
    let available = craft.torque_available(cmd.rcs);
    let rotation = reorder_132(&cmd.rotation()).map(|c| c.clamp(-1.0, 1.0));
    let mut torque_body = rotation.component_mul(&available);

    if cmd.rcs {
        // RCS share of the rotation torque burns propellant, 1 m arm
        for i in 0..3 {
            mass_flow += craft.rcs_mass_flow((rotation[i] * craft.rcs_torque[i]).abs());
        }
    }

    if cmd.sas {
        let demand = -craft.inertia.component_mul(&state.omega) * craft.sas_gain;
        torque_body += Vector3::from_fn(|i, _| demand[i].clamp(-available[i], available[i]));
    }

    // --- Euler's equation: I * domega = torque - omega x (I * omega) ---
    let i_vec = craft.inertia;
    let i_omega = i_vec.component_mul(&state.omega);
    let gyro = state.omega.cross(&i_omega);
    let domega = (torque_body - gyro).component_div(&i_vec);

    // --- Quaternion kinematics: dq/dt = 0.5 * q * omega_quat ---
    let omega_quat = Quaternion::new(0.0, state.omega.x, state.omega.y, state.omega.z);
    let dquat = state.quat.quaternion() * omega_quat * 0.5;

    Deriv {
        dpos: state.vel,
        dvel: accel,
        dquat,
        domega,
        dmass: -mass_flow,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
