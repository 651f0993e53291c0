//! Shared RCS channel: velocity matching on the translation axes, and the
//! engage flag that the attitude arbiter and the docking autopilot both
//! request through one user registry.

use nalgebra::Vector3;
use tracing::{debug, warn};

use super::pid::PidVector;
use super::users::{UserId, UserRegistry};
use crate::config::{clamp_limit, RcsConfig};
use crate::vessel::{ExternalState, FlightCommand};

#[derive(Debug, Clone)]
pub struct ResourceChannel {
    config: RcsConfig,
    users: UserRegistry,
    pid: PidVector,
    target_velocity: Option<Vector3<f64>>, // world, m/s
    velocity_error: Vector3<f64>,          // body (right, forward, up), m/s
    last_translation: Vector3<f64>,
}

impl ResourceChannel {
    pub fn new(config: &RcsConfig) -> Self {
        let mut config = config.clone();
        config.limit = clamp_limit(config.limit);
        Self {
            users: UserRegistry::new(),
            pid: PidVector::new(config.gains(), -config.limit, config.limit),
            target_velocity: None,
            velocity_error: Vector3::zeros(),
            last_translation: Vector3::zeros(),
            config,
        }
    }

    pub fn configure(&mut self, config: &RcsConfig) {
        self.config = config.clone();
        self.config.limit = clamp_limit(config.limit);
        self.pid.set_gains(self.config.gains());
        self.pid.set_limits(-self.config.limit, self.config.limit);
        self.pid.reset();
    }

    // -----------------------------------------------------------------------
    // Ownership
    // -----------------------------------------------------------------------

    pub fn request(&mut self, user: UserId) {
        let was_engaged = self.is_engaged();
        if self.users.register(user) && !was_engaged {
            debug!(%user, "RCS channel engaged");
        }
    }

    pub fn release(&mut self, user: UserId) {
        if self.users.unregister(user) && !self.is_engaged() {
            debug!(%user, "RCS channel released");
            self.pid.reset();
        }
    }

    pub fn release_all(&mut self) {
        self.users.clear();
        self.target_velocity = None;
        self.pid.reset();
    }

    pub fn is_engaged(&self) -> bool {
        self.users.is_active()
    }

    pub fn is_held_by(&self, user: UserId) -> bool {
        self.users.contains(user)
    }

    pub fn users(&self) -> &UserRegistry {
        &self.users
    }

    // -----------------------------------------------------------------------
    // Velocity matching
    // -----------------------------------------------------------------------

    /// Velocity, in the world frame, the vessel should match.
    pub fn set_target_world_velocity(&mut self, velocity: Vector3<f64>) {
        if velocity.iter().all(|c| c.is_finite()) {
            self.target_velocity = Some(velocity);
        } else {
            warn!("non-finite RCS target velocity ignored");
        }
    }

    pub fn clear_target(&mut self) {
        self.target_velocity = None;
        self.velocity_error = Vector3::zeros();
        self.pid.reset();
    }

    pub fn target_velocity(&self) -> Option<Vector3<f64>> {
        self.target_velocity
    }

    /// Last velocity error in the vessel frame (right, forward, up).
    pub fn velocity_error(&self) -> Vector3<f64> {
        self.velocity_error
    }

    pub fn last_translation(&self) -> Vector3<f64> {
        self.last_translation
    }

    pub fn reset(&mut self) {
        self.pid.reset();
        self.last_translation = Vector3::zeros();
    }

    /// Write the channel flag and, when a velocity target is set, the
    /// translation axes.
    pub fn drive(&mut self, state: &ExternalState, dt: f64, cmd: &mut FlightCommand) {
        cmd.rcs = self.is_engaged();
        let Some(target) = self.target_velocity.filter(|_| self.is_engaged()) else {
            return;
        };

        let error_world = target - state.orbital_velocity;
        let error_body = state.orientation.inverse_transform_vector(&error_world);
        self.velocity_error = error_body;

        // seconds of full thrust needed to null each axis
        let thrust = &state.rcs_thrust;
        let normalized = Vector3::from_fn(|i, _| {
            let available = if error_body[i] >= 0.0 { thrust.positive[i] } else { thrust.negative[i] };
            if available > 0.0 {
                error_body[i] * state.mass / available
            } else {
                f64::NAN
            }
        });

        let out = self.pid.compute(&normalized, dt);
        let translation = out.map(|c| if c.is_finite() { c.clamp(-1.0, 1.0) } else { 0.0 });

        cmd.x = translation.x;
        cmd.y = translation.y;
        cmd.z = translation.z;
        cmd.authority.translation = true;
        self.last_translation = translation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vessel::DirectionalThrust;
    use approx::assert_relative_eq;

    fn channel() -> ResourceChannel {
        ResourceChannel::new(&RcsConfig::default())
    }

    #[test]
    fn engaged_while_any_user_holds_it() {
        let mut rcs = channel();
        assert!(!rcs.is_engaged());
        rcs.request(UserId::ATTITUDE);
        rcs.request(UserId::DOCKING);
        rcs.release(UserId::ATTITUDE);
        assert!(rcs.is_engaged());
        rcs.release(UserId::DOCKING);
        assert!(!rcs.is_engaged());
    }

    #[test]
    fn flag_only_without_velocity_target() {
        let mut rcs = channel();
        rcs.request(UserId::ATTITUDE);
        let state = ExternalState::at_rest();
        let mut cmd = FlightCommand::default();
        rcs.drive(&state, 0.02, &mut cmd);
        assert!(cmd.rcs);
        assert!(!cmd.authority.translation);
        assert_eq!(cmd.translation(), Vector3::zeros());
    }

    #[test]
    fn thrusts_toward_target_velocity_in_body_frame() {
        let mut rcs = channel();
        rcs.request(UserId::DOCKING);
        let state = ExternalState::at_rest();
        // 0.1 m/s faster along world +x = body right
        rcs.set_target_world_velocity(state.orbital_velocity + Vector3::new(0.1, 0.0, 0.0));
        let mut cmd = FlightCommand::default();
        rcs.drive(&state, 0.02, &mut cmd);
        // 0.1 * 5000 / 1000 = 0.5 s of thrust, kp = 2
        assert_relative_eq!(cmd.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(cmd.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(rcs.velocity_error().x, 0.1, epsilon = 1e-9);
    }

    #[test]
    fn axis_without_thrust_commands_nothing() {
        let mut rcs = channel();
        rcs.request(UserId::DOCKING);
        let mut state = ExternalState::at_rest();
        state.rcs_thrust = DirectionalThrust::zero();
        rcs.set_target_world_velocity(state.orbital_velocity + Vector3::new(0.0, 0.0, -0.3));
        let mut cmd = FlightCommand::default();
        rcs.drive(&state, 0.02, &mut cmd);
        assert_eq!(cmd.z, 0.0);
    }

    #[test]
    fn released_channel_writes_nothing() {
        let mut rcs = channel();
        let state = ExternalState::at_rest();
        rcs.set_target_world_velocity(Vector3::new(5.0, 0.0, 0.0));
        let mut cmd = FlightCommand::default();
        rcs.drive(&state, 0.02, &mut cmd);
        assert!(!cmd.rcs);
        assert_eq!(cmd.x, 0.0);
    }

    #[test]
    fn negative_limit_is_clamped_not_inverted() {
        let bad = RcsConfig { limit: -1.0, ..RcsConfig::default() };
        let state = ExternalState::at_rest();
        for mut rcs in [ResourceChannel::new(&bad), {
            let mut c = channel();
            c.configure(&bad);
            c
        }] {
            rcs.request(UserId::DOCKING);
            rcs.set_target_world_velocity(state.orbital_velocity + Vector3::new(0.1, 0.0, 0.0));
            let mut cmd = FlightCommand::default();
            rcs.drive(&state, 0.02, &mut cmd);
            assert_relative_eq!(cmd.x, crate::config::MIN_OUTPUT_LIMIT, epsilon = 1e-12);
        }
    }
}
