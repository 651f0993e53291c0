//! Attitude controller: target -> steering error -> PID -> low-pass ->
//! arbitrated rotation commands.

use nalgebra::{UnitQuaternion, Vector3};
use tracing::{debug, warn};

use super::arbiter::{ActuatorArbiter, ArbiterMode};
use super::filter::LowPassFilter;
use super::pid::PidVector;
use super::rcs::ResourceChannel;
use super::steering::SteeringError;
use super::target::AttitudeTarget;
use super::telemetry::{ArbiterTelemetry, AttitudeTelemetry};
use super::users::UserId;
use crate::config::{clamp_limit, clamp_time_constant, AttitudeConfig};
use crate::error::Result;
use crate::math::MovingAverage;
use crate::reference::ReferenceTag;
use crate::vessel::{ExternalState, FlightCommand};

#[derive(Debug, Clone)]
pub struct AttitudeController {
    config: AttitudeConfig,
    target: AttitudeTarget,
    pid: PidVector,
    filter: LowPassFilter,
    arbiter: ActuatorArbiter,
    kill_rotation: bool,
    /// Last rotation written per axis, control order.
    last_command: Vector3<f64>,
    last_action: Vector3<f64>,
    last_filtered: Vector3<f64>,
    last_error: Option<SteeringError>,
    steering_error: MovingAverage,
    nan_reported: bool,
    resets: u64,
}

impl AttitudeController {
    pub fn new(config: &AttitudeConfig) -> Self {
        let mut config = config.clone();
        config.time_constant = clamp_time_constant(config.time_constant);
        config.drive_limit = clamp_limit(config.drive_limit);
        let gains = config.gains();
        let limit = config.drive_limit;
        Self {
            target: AttitudeTarget::new(),
            pid: PidVector::new(gains, -limit, limit),
            filter: LowPassFilter::new(config.time_constant),
            arbiter: ActuatorArbiter::new(&config),
            kill_rotation: config.kill_rotation_on_manual,
            last_command: Vector3::zeros(),
            last_action: Vector3::zeros(),
            last_filtered: Vector3::zeros(),
            last_error: None,
            steering_error: MovingAverage::default(),
            nan_reported: false,
            resets: 0,
            config,
        }
    }

    /// Apply new settings. Gains follow the time constant; the loop restarts.
    pub fn configure(&mut self, config: &AttitudeConfig) {
        self.config = config.clone();
        self.config.time_constant = clamp_time_constant(config.time_constant);
        self.config.drive_limit = clamp_limit(config.drive_limit);
        self.kill_rotation = config.kill_rotation_on_manual;
        self.arbiter.configure(&self.config);
        self.apply_time_constant();
    }

    pub fn set_time_constant(&mut self, tf: f64) {
        self.config.time_constant = clamp_time_constant(tf);
        self.apply_time_constant();
    }

    fn apply_time_constant(&mut self) {
        let gains = self.config.gains();
        self.pid.set_gains(gains);
        self.pid.set_limits(-self.config.drive_limit, self.config.drive_limit);
        self.filter.set_time_constant(self.config.time_constant);
        debug!(tf = self.config.time_constant, kp = gains.kp, ki = gains.ki, kd = gains.kd, "attitude gains");
        self.reset();
    }

    /// Zero the PID memory and the output filter.
    pub fn reset(&mut self) {
        self.pid.reset();
        self.filter.reset();
        self.resets += 1;
    }

    // -----------------------------------------------------------------------
    // Targeting
    // -----------------------------------------------------------------------

    pub fn attitude_to(&mut self, orientation: UnitQuaternion<f64>, reference: ReferenceTag, user: UserId) -> Result<()> {
        self.target.attitude_to(orientation, reference, user)
    }

    pub fn attitude_to_direction(
        &mut self,
        direction: Vector3<f64>,
        reference: ReferenceTag,
        user: UserId,
        state: &ExternalState,
    ) -> Result<()> {
        self.target.attitude_to_direction(direction, reference, user, state)
    }

    pub fn attitude_to_hpr(&mut self, heading: f64, pitch: f64, roll: f64, user: UserId) -> Result<()> {
        self.target.attitude_to_hpr(heading, pitch, roll, user)
    }

    pub fn deactivate(&mut self) {
        self.target.deactivate();
    }

    pub fn angle_from_target(&mut self, state: &ExternalState) -> f64 {
        self.target.angle_from_target(state)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub fn on_enable(&mut self, state: &ExternalState) {
        self.arbiter.on_enable(&state.pilot);
        self.last_command = Vector3::zeros();
        self.steering_error.clear();
        self.reset();
    }

    pub fn on_disable(&mut self, rcs: &mut ResourceChannel) {
        self.arbiter.on_disable();
        rcs.release(UserId::ATTITUDE);
        self.reset();
    }

    /// One physics tick. Writes the rotation axes it owns into `cmd` and
    /// requests or releases RCS on `rcs`.
    pub fn drive(&mut self, state: &ExternalState, dt: f64, rcs: &mut ResourceChannel, cmd: &mut FlightCommand) {
        if let Some(reference) = self.target.take_changed() {
            debug!(%reference, "attitude target changed, resetting controller");
            self.reset();
            if reference != ReferenceTag::Inertial {
                self.kill_rotation = false;
            }
        }

        if !self.target.is_active() {
            rcs.release(UserId::ATTITUDE);
            self.last_error = None;
            return;
        }

        self.arbiter.observe_operator(&state.pilot);

        if !self.target.roll_matters() {
            self.target.realign_roll(state);
        }
        let world_target = self.target.world_target(state);
        if !self.target.is_active() {
            // reference went missing this tick
            rcs.release(UserId::ATTITUDE);
            self.last_error = None;
            return;
        }

        let error = SteeringError::compute(
            &state.orientation,
            &world_target,
            state,
            state.pilot.throttle,
            self.config.momentum_anticipation,
        );
        self.steering_error.push(self.target.angle_from_target(state));
        self.last_error = Some(error);

        let manual = self.arbiter.detect_manual(&state.pilot);
        let decision = self.arbiter.update(&error, manual);
        if decision.reset_pid {
            self.pid.reset();
            self.filter.reset();
        }
        if manual.any() && self.kill_rotation {
            // hold wherever the operator leaves the vessel
            if let Err(err) = self.target.attitude_to(state.orientation, ReferenceTag::Inertial, UserId::ATTITUDE) {
                warn!(%err, "kill rotation target rejected");
            }
        }

        if self.arbiter.rcs_engaged() {
            rcs.request(UserId::ATTITUDE);
        } else {
            rcs.release(UserId::ATTITUDE);
        }
        cmd.sas = self.arbiter.sas_engaged();

        if self.arbiter.mode() == ArbiterMode::ChannelA && self.arbiter.sas_engaged() {
            // SAS holds; the autopilot keeps its hands off
            return;
        }
        if self.arbiter.mode() == ArbiterMode::ManualOverride && manual.pitch_yaw && manual.roll {
            return;
        }

        let action = if self.config.derivative_on_measurement {
            self.pid.compute_with_rate(&error.input, &error.rate, dt)
        } else {
            self.pid.compute(&error.input, dt)
        };
        self.last_action = action;
        let limit = self.config.drive_limit;
        let filtered = self.filter.apply(&action, dt).map(|c| c.clamp(-limit, limit));
        self.last_filtered = filtered;

        self.write_rotation(&filtered, manual.pitch_yaw, manual.roll, cmd);
    }

    /// Copy finite axes into the command; a NaN axis keeps its last value.
    fn write_rotation(&mut self, rotation: &Vector3<f64>, skip_pitch_yaw: bool, skip_roll: bool, cmd: &mut FlightCommand) {
        let mut out = self.last_command;
        let mut any_nan = false;
        for i in 0..3 {
            if rotation[i].is_finite() {
                out[i] = rotation[i];
            } else {
                any_nan = true;
            }
        }
        if any_nan && !self.nan_reported {
            warn!(?rotation, "non-finite rotation command, holding previous value");
        }
        self.nan_reported = any_nan;

        if !skip_pitch_yaw {
            cmd.pitch = out.x;
            cmd.yaw = out.y;
            cmd.authority.pitch_yaw = true;
            self.last_command.x = out.x;
            self.last_command.y = out.y;
        }
        if !skip_roll {
            cmd.roll = out.z;
            cmd.authority.roll = true;
            self.last_command.z = out.z;
        }
    }

    /// Record what was actually sent to the host, for operator toggle detection.
    pub fn commit(&mut self, cmd: &FlightCommand) {
        self.arbiter.commit(cmd.sas, cmd.rcs);
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn target(&self) -> &AttitudeTarget {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut AttitudeTarget {
        &mut self.target
    }

    pub fn arbiter(&self) -> &ActuatorArbiter {
        &self.arbiter
    }

    pub fn arbiter_mut(&mut self) -> &mut ActuatorArbiter {
        &mut self.arbiter
    }

    pub fn pid(&self) -> &PidVector {
        &self.pid
    }

    pub fn filter(&self) -> &LowPassFilter {
        &self.filter
    }

    pub fn config(&self) -> &AttitudeConfig {
        &self.config
    }

    pub fn time_constant(&self) -> f64 {
        self.config.time_constant
    }

    pub fn kill_rotation(&self) -> bool {
        self.kill_rotation
    }

    pub fn set_kill_rotation(&mut self, on: bool) {
        self.kill_rotation = on;
    }

    pub fn last_error(&self) -> Option<&SteeringError> {
        self.last_error.as_ref()
    }

    pub fn last_action(&self) -> Vector3<f64> {
        self.last_action
    }

    /// Averaged angle from target over the last few ticks, degrees.
    pub fn steering_error(&self) -> f64 {
        self.steering_error.value()
    }

    /// Number of controller resets so far.
    pub fn reset_count(&self) -> u64 {
        self.resets
    }

    pub fn telemetry(&self, angle_from_target: f64) -> AttitudeTelemetry {
        let terms = self.pid.terms();
        AttitudeTelemetry {
            active: self.target.is_active(),
            reference: self.target.reference(),
            angle_from_target,
            steering_error: self.steering_error(),
            euler_error: self.last_error.map(|e| e.euler_deg).unwrap_or_default(),
            pid_proportional: terms.proportional,
            pid_integral: terms.integral,
            pid_derivative: terms.derivative,
            pid_action: self.last_action,
            filtered_action: self.last_filtered,
            time_constant: self.config.time_constant,
            kill_rotation: self.kill_rotation,
            resets: self.resets,
        }
    }

    pub fn arbiter_telemetry(&self) -> ArbiterTelemetry {
        let a = &self.arbiter;
        ArbiterTelemetry {
            mode: a.mode().to_string(),
            status: a.status(),
            settle_counter: a.settle_counter(),
            sas: a.sas_engaged(),
            rcs: a.rcs_engaged(),
            conserve_fuel: a.conserve_fuel(),
            sas_permitted: a.sas_permitted(),
            rcs_permitted: a.rcs_permitted(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vessel::PilotInput;
    use approx::assert_relative_eq;

    const DT: f64 = 0.02;

    fn setup() -> (AttitudeController, ResourceChannel, ExternalState) {
        let mut state = ExternalState::at_rest();
        state.pilot = PilotInput { sas: true, rcs: true, ..Default::default() };
        let mut ctrl = AttitudeController::new(&AttitudeConfig::default());
        ctrl.on_enable(&state);
        (ctrl, ResourceChannel::new(&Default::default()), state)
    }

    fn tick(ctrl: &mut AttitudeController, rcs: &mut ResourceChannel, state: &ExternalState) -> FlightCommand {
        let mut cmd = FlightCommand::from_pilot(&state.pilot);
        ctrl.drive(state, DT, rcs, &mut cmd);
        rcs.drive(state, DT, &mut cmd);
        ctrl.commit(&cmd);
        cmd
    }

    #[test]
    fn inactive_controller_writes_nothing() {
        let (mut ctrl, mut rcs, state) = setup();
        let cmd = tick(&mut ctrl, &mut rcs, &state);
        assert!(!cmd.authority.pitch_yaw && !cmd.authority.roll);
    }

    #[test]
    fn zero_error_hold_does_not_drift() {
        let (mut ctrl, mut rcs, state) = setup();
        ctrl.attitude_to(state.orientation, ReferenceTag::Inertial, UserId::OPERATOR).unwrap();
        for _ in 0..10 {
            let cmd = tick(&mut ctrl, &mut rcs, &state);
            assert!(cmd.rotation().norm() < 1e-9);
        }
        assert_eq!(ctrl.pid().integral(), Vector3::zeros());
    }

    #[test]
    fn pitch_error_commands_pitch() {
        let (mut ctrl, mut rcs, state) = setup();
        let target = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.3);
        ctrl.attitude_to(target, ReferenceTag::Inertial, UserId::OPERATOR).unwrap();
        let cmd = tick(&mut ctrl, &mut rcs, &state);
        assert!(cmd.authority.pitch_yaw);
        assert!(cmd.pitch > 0.0);
        assert_relative_eq!(cmd.yaw, 0.0, epsilon = 1e-9);
        // 0.3 rad is severe: RCS was permitted, so the arbiter escalates
        assert_eq!(ctrl.arbiter().mode(), ArbiterMode::ChannelB);
        assert!(cmd.rcs);
        assert!(!cmd.sas);
    }

    #[test]
    fn nan_axis_holds_previous_command() {
        let (mut ctrl, mut rcs, mut state) = setup();
        let target = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.1);
        ctrl.attitude_to(target, ReferenceTag::Inertial, UserId::OPERATOR).unwrap();
        let first = tick(&mut ctrl, &mut rcs, &state);
        state.torque_available.x = 0.0;
        let second = tick(&mut ctrl, &mut rcs, &state);
        assert_eq!(second.pitch, first.pitch);
        assert!(second.pitch.is_finite());
    }

    #[test]
    fn manual_input_yields_axis_group() {
        let (mut ctrl, mut rcs, mut state) = setup();
        let target = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.2);
        ctrl.attitude_to(target, ReferenceTag::Inertial, UserId::OPERATOR).unwrap();
        state.pilot.roll = 0.8;
        let cmd = tick(&mut ctrl, &mut rcs, &state);
        assert_eq!(ctrl.arbiter().mode(), ArbiterMode::ManualOverride);
        assert_eq!(cmd.roll, 0.8, "operator keeps the roll axis");
        assert!(!cmd.authority.roll);
        assert!(cmd.authority.pitch_yaw);
    }

    #[test]
    fn kill_rotation_holds_current_attitude_on_manual() {
        let (mut ctrl, mut rcs, mut state) = setup();
        ctrl.set_kill_rotation(true);
        ctrl.attitude_to(UnitQuaternion::identity(), ReferenceTag::Inertial, UserId::OPERATOR).unwrap();
        state.orientation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.5);
        state.pilot.yaw = 1.0;
        tick(&mut ctrl, &mut rcs, &state);
        assert_eq!(ctrl.target().orientation(), state.orientation);
        assert_eq!(ctrl.target().reference(), ReferenceTag::Inertial);
    }

    #[test]
    fn non_inertial_reference_clears_kill_rotation() {
        let (mut ctrl, mut rcs, state) = setup();
        ctrl.set_kill_rotation(true);
        ctrl.attitude_to(UnitQuaternion::identity(), ReferenceTag::Orbit, UserId::OPERATOR).unwrap();
        tick(&mut ctrl, &mut rcs, &state);
        assert!(!ctrl.kill_rotation());
    }

    #[test]
    fn time_constant_change_recomputes_gains_and_resets() {
        let (mut ctrl, _, _) = setup();
        let before = ctrl.reset_count();
        ctrl.set_time_constant(0.0);
        assert_eq!(ctrl.time_constant(), crate::config::MIN_TIME_CONSTANT);
        assert_relative_eq!(ctrl.pid().gains().kd, 0.6 / 0.01, epsilon = 1e-9);
        assert_eq!(ctrl.reset_count(), before + 1);
    }

    #[test]
    fn missing_target_reference_deactivates() {
        let (mut ctrl, mut rcs, state) = setup();
        ctrl.attitude_to(UnitQuaternion::identity(), ReferenceTag::Target, UserId::OPERATOR).unwrap();
        let cmd = tick(&mut ctrl, &mut rcs, &state);
        assert!(!ctrl.target().is_active());
        assert!(!cmd.authority.pitch_yaw);
        assert_eq!(ctrl.arbiter().mode(), ArbiterMode::Idle);
    }

    #[test]
    fn rcs_not_requested_without_rotation_authority() {
        let (mut ctrl, mut rcs, state) = setup();
        ctrl.arbiter_mut().set_rcs_rotation_authority(false);
        let target = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 1.0);
        ctrl.attitude_to(target, ReferenceTag::Inertial, UserId::OPERATOR).unwrap();
        tick(&mut ctrl, &mut rcs, &state);
        assert!(!rcs.is_held_by(UserId::ATTITUDE));
    }

    #[test]
    fn negative_drive_limit_is_clamped_on_configure() {
        let (mut ctrl, mut rcs, state) = setup();
        ctrl.configure(&AttitudeConfig { drive_limit: -0.5, ..AttitudeConfig::default() });
        assert_eq!(ctrl.config().drive_limit, crate::config::MIN_OUTPUT_LIMIT);
        let target = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.3);
        ctrl.attitude_to(target, ReferenceTag::Inertial, UserId::OPERATOR).unwrap();
        let cmd = tick(&mut ctrl, &mut rcs, &state);
        assert!(cmd.pitch > 0.0);
        assert!(cmd.pitch <= crate::config::MIN_OUTPUT_LIMIT + 1e-12);
    }

    #[test]
    fn measured_rate_damps_spin_at_zero_error() {
        let config = AttitudeConfig {
            derivative_on_measurement: true,
            momentum_anticipation: false,
            ..AttitudeConfig::default()
        };
        let (_, mut rcs, mut state) = setup();
        let mut ctrl = AttitudeController::new(&config);
        ctrl.on_enable(&state);
        // body (pitch, roll, yaw)
        state.angular_velocity = Vector3::new(0.1, 0.0, -0.05);
        ctrl.attitude_to(state.orientation, ReferenceTag::Inertial, UserId::OPERATOR).unwrap();
        let cmd = tick(&mut ctrl, &mut rcs, &state);
        assert_eq!(ctrl.last_error().unwrap().input, Vector3::zeros());
        assert!(cmd.pitch < 0.0, "pitch {} should oppose +x spin", cmd.pitch);
        assert!(cmd.yaw > 0.0, "yaw {} should oppose -z spin", cmd.yaw);
        assert_relative_eq!(cmd.roll, 0.0, epsilon = 1e-12);

        // finite-difference derivative sees no error change and stays quiet
        let (mut plain, mut rcs, _) = setup();
        plain.configure(&AttitudeConfig { momentum_anticipation: false, ..AttitudeConfig::default() });
        plain.attitude_to(state.orientation, ReferenceTag::Inertial, UserId::OPERATOR).unwrap();
        let cmd = tick(&mut plain, &mut rcs, &state);
        assert!(cmd.rotation().norm() < 1e-12);
    }
}

