use nalgebra::{UnitQuaternion, Vector3};
use tracing::debug;

use super::attitude::AttitudeController;
use super::controller::Controller;
use super::docking::DockingAutopilot;
use super::rcs::ResourceChannel;
use super::telemetry::Telemetry;
use super::users::UserId;
use crate::config::AutopilotConfig;
use crate::error::Result;
use crate::reference::ReferenceTag;
use crate::vessel::{ExternalState, FlightCommand};

// ---------------------------------------------------------------------------
// Autopilot: one per vessel, attitude + RCS + docking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Autopilot {
    config: AutopilotConfig,
    attitude: AttitudeController,
    rcs: ResourceChannel,
    docking: DockingAutopilot,
    enabled: bool,
    telemetry: Telemetry,
}

impl Autopilot {
    pub fn new(config: AutopilotConfig) -> Self {
        Self {
            attitude: AttitudeController::new(&config.attitude),
            rcs: ResourceChannel::new(&config.rcs),
            docking: DockingAutopilot::new(&config.docking),
            enabled: false,
            telemetry: Telemetry::default(),
            config,
        }
    }

    pub fn config(&self) -> &AutopilotConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // -----------------------------------------------------------------------
    // Commands for collaborators
    // -----------------------------------------------------------------------

    pub fn attitude_to(&mut self, orientation: UnitQuaternion<f64>, reference: ReferenceTag, user: UserId) -> Result<()> {
        self.attitude.attitude_to(orientation, reference, user)
    }

    pub fn attitude_to_direction(
        &mut self,
        direction: Vector3<f64>,
        reference: ReferenceTag,
        user: UserId,
        state: &ExternalState,
    ) -> Result<()> {
        self.attitude.attitude_to_direction(direction, reference, user, state)
    }

    pub fn attitude_to_hpr(&mut self, heading: f64, pitch: f64, roll: f64, user: UserId) -> Result<()> {
        self.attitude.attitude_to_hpr(heading, pitch, roll, user)
    }

    pub fn deactivate(&mut self) {
        self.attitude.deactivate();
    }

    pub fn angle_from_target(&mut self, state: &ExternalState) -> f64 {
        self.attitude.angle_from_target(state)
    }

    pub fn set_time_constant(&mut self, tf: f64) {
        self.attitude.set_time_constant(tf);
        self.config.attitude.time_constant = self.attitude.time_constant();
    }

    pub fn enable_docking(&mut self) {
        self.docking.enable(&mut self.attitude, &mut self.rcs);
    }

    pub fn disable_docking(&mut self) {
        self.docking.disable(&mut self.attitude, &mut self.rcs);
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn attitude(&self) -> &AttitudeController {
        &self.attitude
    }

    pub fn attitude_mut(&mut self) -> &mut AttitudeController {
        &mut self.attitude
    }

    pub fn rcs(&self) -> &ResourceChannel {
        &self.rcs
    }

    pub fn rcs_mut(&mut self) -> &mut ResourceChannel {
        &mut self.rcs
    }

    pub fn docking(&self) -> &DockingAutopilot {
        &self.docking
    }

    pub fn docking_mut(&mut self) -> &mut DockingAutopilot {
        &mut self.docking
    }

    fn refresh_telemetry(&mut self, state: &ExternalState) {
        let angle = self.attitude.angle_from_target(state);
        self.telemetry = Telemetry {
            time: state.time,
            attitude: self.attitude.telemetry(angle),
            arbiter: self.attitude.arbiter_telemetry(),
            docking: self.docking.telemetry(),
            rcs_engaged: self.rcs.is_engaged(),
            rcs_velocity_error: self.rcs.velocity_error(),
        };
    }
}

impl Default for Autopilot {
    fn default() -> Self {
        Self::new(AutopilotConfig::default())
    }
}

impl Controller for Autopilot {
    fn configure(&mut self, config: &AutopilotConfig) {
        self.config = config.clone();
        self.attitude.configure(&config.attitude);
        self.rcs.configure(&config.rcs);
        self.docking.configure(&config.docking);
    }

    fn on_enable(&mut self, state: &ExternalState) {
        self.enabled = true;
        self.attitude.on_enable(state);
        debug!("autopilot enabled");
    }

    fn on_disable(&mut self) {
        self.docking.disable(&mut self.attitude, &mut self.rcs);
        self.attitude.on_disable(&mut self.rcs);
        self.rcs.release_all();
        self.enabled = false;
        debug!("autopilot disabled");
    }

    fn tick(&mut self, state: &ExternalState, dt: f64) -> FlightCommand {
        let mut cmd = FlightCommand::from_pilot(&state.pilot);
        if !self.enabled {
            return cmd;
        }
        self.docking.drive(state, &mut self.attitude, &mut self.rcs);
        self.attitude.drive(state, dt, &mut self.rcs, &mut cmd);
        // an idle autopilot leaves the operator's RCS toggle alone
        if self.attitude.target().is_active() || self.docking.is_enabled() {
            self.rcs.drive(state, dt, &mut cmd);
        }
        self.attitude.commit(&cmd);
        self.refresh_telemetry(state);
        cmd
    }

    fn render(&self) -> Telemetry {
        self.telemetry.clone()
    }

    fn reset(&mut self) {
        self.attitude.reset();
        self.rcs.reset();
    }

    fn name(&self) -> &str {
        "Autopilot"
    }
}
