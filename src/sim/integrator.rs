use nalgebra::UnitQuaternion;

use crate::dynamics;
use crate::dynamics::state::State;
use crate::vehicle::Craft;
use crate::vessel::FlightCommand;

// ---------------------------------------------------------------------------
// 6DOF RK4 integrator with constant command over the step
// ---------------------------------------------------------------------------

/// Single RK4 step with the command held constant over the step.
pub fn rk4_step(state: &State, craft: &Craft, cmd: &FlightCommand, dt: f64) -> State {
    let k1 = dynamics::derivatives(state, craft, cmd);
    let k2 = dynamics::derivatives(&state.apply(&k1, dt * 0.5), craft, cmd);
    let k3 = dynamics::derivatives(&state.apply(&k2, dt * 0.5), craft, cmd);
    let k4 = dynamics::derivatives(&state.apply(&k3, dt), craft, cmd);

    let new_quat_raw = state.quat.quaternion()
        + (k1.dquat + k2.dquat * 2.0 + k3.dquat * 2.0 + k4.dquat) * (dt / 6.0);

    State {
        time: state.time + dt,
        pos: state.pos + (k1.dpos + 2.0 * k2.dpos + 2.0 * k3.dpos + k4.dpos) * (dt / 6.0),
        vel: state.vel + (k1.dvel + 2.0 * k2.dvel + 2.0 * k3.dvel + k4.dvel) * (dt / 6.0),
        quat: UnitQuaternion::new_normalize(new_quat_raw),
        omega: state.omega
            + (k1.domega + 2.0 * k2.domega + 2.0 * k3.domega + k4.domega) * (dt / 6.0),
        mass: (state.mass
            + (k1.dmass + 2.0 * k2.dmass + 2.0 * k3.dmass + k4.dmass) * (dt / 6.0))
            .max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::MU;
    use crate::vehicle::Craft;
    use nalgebra::Vector3;

    #[test]
    fn circular_orbit_keeps_radius() {
        let craft = Craft::inert("ball", 1.0);
        let mut s = State::circular(700_000.0, UnitQuaternion::identity(), Vector3::zeros(), 1.0);
        let period = 2.0 * std::f64::consts::PI * (700_000.0_f64.powi(3) / MU).sqrt();
        let dt = 1.0;
        let steps = (period / 4.0 / dt) as usize;
        for _ in 0..steps {
            s = rk4_step(&s, &craft, &FlightCommand::default(), dt);
        }
        assert!((s.pos.norm() - 700_000.0).abs() < 1.0, "radius drifted to {}", s.pos.norm());
        assert!(s.pos.y > 690_000.0, "quarter orbit should reach +y");
    }

    #[test]
    fn quaternion_stays_unit_while_spinning() {
        let craft = Craft::inert("ball", 1.0);
        let mut s = State::circular(
            700_000.0,
            UnitQuaternion::identity(),
            Vector3::new(0.3, -0.7, 1.1),
            1.0,
        );
        for _ in 0..5_000 {
            s = rk4_step(&s, &craft, &FlightCommand::default(), 0.02);
            assert!((s.quat.quaternion().norm() - 1.0).abs() < 1e-9);
        }
    }
}
