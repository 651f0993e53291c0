use nalgebra::Vector3;
use tracing::{debug, info, warn};

use super::event::{default_detectors, EventDetector, SimEvent};
use super::integrator::rk4_step;
use crate::dynamics::state::{SimConfig, State};
use crate::gnc::{Autopilot, Controller, Telemetry, UserId};
use crate::reference::ReferenceTag;
use crate::vehicle::Scenario;
use crate::vessel::{ExternalState, FlightCommand, PilotInput, TargetInfo};

// ---------------------------------------------------------------------------
// Host simulation: owns the plant, feeds the controller one snapshot per tick
// ---------------------------------------------------------------------------

pub struct Simulation {
    scenario: Scenario,
    config: SimConfig,
    vessel: State,
    target: Option<State>,
    pilot: PilotInput,
    /// Channel toggles as currently applied by the host.
    host_sas: bool,
    host_rcs: bool,
}

impl Simulation {
    pub fn new(scenario: Scenario, config: SimConfig) -> Self {
        let (vessel, target) = match &scenario.target {
            Some(spec) => {
                let target = State::circular(
                    scenario.orbit_radius,
                    spec.orientation,
                    Vector3::zeros(),
                    spec.craft.mass,
                );
                let vessel = State {
                    time: 0.0,
                    pos: target.pos + spec.offset,
                    vel: target.vel,
                    quat: scenario.orientation,
                    omega: scenario.angular_velocity,
                    mass: scenario.craft.mass,
                };
                (vessel, Some(target))
            }
            None => (
                State::circular(
                    scenario.orbit_radius,
                    scenario.orientation,
                    scenario.angular_velocity,
                    scenario.craft.mass,
                ),
                None,
            ),
        };
        let pilot = scenario.pilot;
        Self {
            host_sas: pilot.sas,
            host_rcs: pilot.rcs,
            pilot,
            scenario,
            config,
            vessel,
            target,
        }
    }

    pub fn vessel(&self) -> &State {
        &self.vessel
    }

    pub fn target(&self) -> Option<&State> {
        self.target.as_ref()
    }

    pub fn time(&self) -> f64 {
        self.vessel.time
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Scripted operator input from the next tick on. Channel toggles in
    /// `pilot` are applied to the host immediately.
    pub fn set_pilot(&mut self, pilot: PilotInput) {
        self.host_sas = pilot.sas;
        self.host_rcs = pilot.rcs;
        self.pilot = pilot;
    }

    pub fn host_sas(&self) -> bool {
        self.host_sas
    }

    pub fn host_rcs(&self) -> bool {
        self.host_rcs
    }

    /// What the controller sees this tick.
    pub fn snapshot(&self) -> ExternalState {
        let s = &self.vessel;
        let craft = &self.scenario.craft;
        let target = match (&self.target, &self.scenario.target) {
            (Some(t), Some(spec)) => Some(TargetInfo {
                position: t.pos,
                velocity: t.vel,
                orientation: t.quat,
                is_docking_port: spec.is_docking_port,
            }),
            _ => None,
        };
        ExternalState {
            time: s.time,
            orientation: s.quat,
            angular_velocity: s.omega,
            position: s.pos,
            orbital_velocity: s.vel,
            surface_velocity: s.surface_velocity(),
            up: s.up(),
            north: s.north(),
            normal_plus: s.orbit_normal(),
            torque_available: craft.torque_available(self.host_rcs),
            thrust_torque_available: 0.0,
            moment_of_inertia: craft.inertia,
            mass: s.mass,
            rcs_thrust: craft.rcs_thrust,
            target,
            maneuver_nodes: self.scenario.maneuver_nodes.clone(),
            docking_ports: craft.docking_ports.clone(),
            pilot: PilotInput { sas: self.host_sas, rcs: self.host_rcs, ..self.pilot },
        }
    }

    /// One physics tick: snapshot, controller, host toggles, integration.
    pub fn step(&mut self, controller: &mut dyn Controller) -> FlightCommand {
        let dt = self.config.dt;
        let snapshot = self.snapshot();
        let cmd = controller.tick(&snapshot, dt);

        if cmd.sas != self.host_sas || cmd.rcs != self.host_rcs {
            debug!(t = snapshot.time, sas = cmd.sas, rcs = cmd.rcs, "host channel toggles changed");
        }
        self.host_sas = cmd.sas;
        self.host_rcs = cmd.rcs;

        self.vessel = rk4_step(&self.vessel, &self.scenario.craft, &cmd, dt);
        if let (Some(target), Some(spec)) = (&self.target, &self.scenario.target) {
            self.target = Some(rk4_step(target, &spec.craft, &FlightCommand::default(), dt));
        }
        cmd
    }
}

// ---------------------------------------------------------------------------
// Full runs
// ---------------------------------------------------------------------------

/// Recorded history of one run, one entry per tick.
#[derive(Debug, Clone, Default)]
pub struct SimRun {
    pub states: Vec<State>,
    pub commands: Vec<FlightCommand>,
    pub telemetry: Vec<Telemetry>,
    pub events: Vec<SimEvent>,
}

impl SimRun {
    pub fn last_telemetry(&self) -> Option<&Telemetry> {
        self.telemetry.last()
    }

    pub fn duration(&self) -> f64 {
        self.states.last().map_or(0.0, |s| s.time)
    }
}

/// Run an already-enabled controller until `max_time`.
pub fn run(sim: &mut Simulation, controller: &mut dyn Controller) -> SimRun {
    let config = sim.config().clone();
    let cap = ((config.max_time / config.dt) as usize + 1).min(200_000);
    let mut out = SimRun {
        states: Vec::with_capacity(cap),
        commands: Vec::with_capacity(cap),
        telemetry: Vec::with_capacity(cap),
        events: Vec::new(),
    };
    let mut detectors: Vec<Box<dyn EventDetector>> = default_detectors();
    let mut prev: Option<Telemetry> = None;

    while sim.time() < config.max_time {
        let t = sim.time();
        let cmd = sim.step(controller);
        let frame = controller.render();

        if let Some(prev) = &prev {
            for det in detectors.iter_mut() {
                if let Some(kind) = det.check(prev, &frame) {
                    debug!(t, ?kind, "event");
                    out.events.push(SimEvent { time: t, kind });
                }
            }
        }
        prev = Some(frame.clone());

        out.states.push(sim.vessel().clone());
        out.commands.push(cmd);
        out.telemetry.push(frame);
    }

    info!(
        controller = controller.name(),
        duration = sim.time(),
        events = out.events.len(),
        "simulation finished"
    );
    out
}

/// Simulate a scenario with a custom controller. The controller is enabled
/// against the initial snapshot before the first tick.
pub fn simulate_with(scenario: Scenario, config: SimConfig, controller: &mut dyn Controller) -> SimRun {
    let mut sim = Simulation::new(scenario, config);
    controller.on_enable(&sim.snapshot());
    run(&mut sim, controller)
}

/// Simulate with the default autopilot holding the initial attitude
/// (convenience wrapper).
pub fn simulate(scenario: Scenario, config: SimConfig) -> SimRun {
    let mut sim = Simulation::new(scenario, config);
    let mut autopilot = Autopilot::default();
    let start = sim.snapshot();
    autopilot.on_enable(&start);
    autopilot.attitude_mut().set_kill_rotation(true);
    if let Err(err) = autopilot.attitude_to(start.orientation, ReferenceTag::Inertial, UserId::OPERATOR) {
        warn!(%err, "could not hold initial attitude");
    }
    run(&mut sim, &mut autopilot)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AutopilotConfig;
    use crate::gnc::{ArbiterMode, DockingPhase};
    use crate::reference;
    use crate::sim::event::EventKind;
    use crate::vehicle::{presets, ScenarioBuilder};
    use nalgebra::{UnitQuaternion, Vector3};

    fn enabled(sim: &Simulation) -> Autopilot {
        let mut ap = Autopilot::default();
        ap.on_enable(&sim.snapshot());
        ap
    }

    #[test]
    fn zero_error_hold_is_quiet_then_hands_to_sas() {
        let scenario = ScenarioBuilder::new("Hold")
            .pilot(PilotInput { sas: true, ..Default::default() })
            .build();
        let mut sim = Simulation::new(scenario, SimConfig::default());
        let mut ap = enabled(&sim);
        ap.attitude_to(UnitQuaternion::identity(), ReferenceTag::Inertial, UserId::OPERATOR)
            .unwrap();

        for _ in 0..10 {
            let cmd = sim.step(&mut ap);
            assert!(cmd.rotation().norm() < 1e-12);
        }
        assert_eq!(ap.attitude().pid().integral(), Vector3::zeros());

        for _ in 0..50 {
            sim.step(&mut ap);
        }
        assert_eq!(ap.attitude().arbiter().mode(), ArbiterMode::ChannelA);
        assert!(sim.host_sas(), "SAS takes over once settled");
        assert!(!sim.host_rcs());
    }

    #[test]
    fn reference_switch_resets_once() {
        let scratch = Simulation::new(ScenarioBuilder::new("Scratch").build(), SimConfig::default());
        let north = reference::resolve(ReferenceTag::SurfaceNorth, &scratch.snapshot()).unwrap();
        let scenario = ScenarioBuilder::new("Switch").orientation(north).build();
        let mut sim = Simulation::new(scenario, SimConfig::default());
        let mut ap = enabled(&sim);

        ap.attitude_to(UnitQuaternion::identity(), ReferenceTag::SurfaceNorth, UserId::OPERATOR)
            .unwrap();
        for _ in 0..100 {
            sim.step(&mut ap);
        }
        let resets = ap.attitude().reset_count();

        ap.attitude_to(UnitQuaternion::identity(), ReferenceTag::Orbit, UserId::OPERATOR)
            .unwrap();
        sim.step(&mut ap);
        assert_eq!(ap.attitude().reset_count(), resets + 1);

        // only one tick of history survives the reset
        let dt = sim.config().dt;
        let input = ap.attitude().last_error().unwrap().input;
        assert!(ap.attitude().pid().integral().norm() <= input.norm() * dt + 1e-12);
        assert_eq!(ap.attitude().pid().prev_error(), Some(input));

        for _ in 0..5 {
            sim.step(&mut ap);
        }
        assert_eq!(ap.attitude().reset_count(), resets + 1);
    }

    #[test]
    fn yaw_slew_converges_on_wheels() {
        let scenario = ScenarioBuilder::new("Slew").build();
        let mut sim = Simulation::new(scenario, SimConfig { dt: 0.02, max_time: 30.0 });
        let mut ap = enabled(&sim);
        let goal = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 60f64.to_radians());
        ap.attitude_to(goal, ReferenceTag::Inertial, UserId::OPERATOR).unwrap();

        let history = run(&mut sim, &mut ap);
        let last = history.states.last().unwrap();
        let residual = last.quat.angle_to(&goal).to_degrees();
        assert!(residual < 1.0, "residual {residual:.3} deg");
        assert!(last.omega.norm() < 0.01);
        assert!(history.commands.iter().all(|c| c.rotation().iter().all(|v| v.abs() <= 1.0)));
        assert!(history.events.iter().any(|e| matches!(e.kind, EventKind::Acquired { .. })));
    }

    #[test]
    fn station_approach_docks() {
        let scenario = presets::station_approach();
        let mut sim = Simulation::new(scenario, SimConfig { dt: 0.02, max_time: 240.0 });
        let mut ap = enabled(&sim);
        ap.enable_docking();

        let mut phases = vec![ap.docking().phase()];
        while sim.time() < 240.0 && ap.docking().phase() != DockingPhase::Done {
            sim.step(&mut ap);
            if phases.last() != Some(&ap.docking().phase()) {
                phases.push(ap.docking().phase());
            }
        }
        assert_eq!(ap.docking().phase(), DockingPhase::Done, "phases: {phases:?}");
        assert!(!ap.docking().is_enabled());
        assert!(phases.contains(&DockingPhase::Approaching));

        let port = sim.target().unwrap().pos;
        let distance = (sim.vessel().pos - port).norm();
        assert!(distance < 1.0, "stopped {distance:.2} m from the port");
    }

    #[test]
    fn inverted_output_limits_still_fly() {
        let config = AutopilotConfig::from_json_str(
            r#"{ "rcs": { "limit": -1.0 }, "attitude": { "drive_limit": -0.5 } }"#,
        )
        .unwrap();
        let mut sim = Simulation::new(presets::station_approach(), SimConfig { dt: 0.02, max_time: 5.0 });
        let mut ap = Autopilot::new(config);
        ap.on_enable(&sim.snapshot());
        ap.enable_docking();
        for _ in 0..100 {
            let cmd = sim.step(&mut ap);
            assert!(cmd.rotation().iter().chain(cmd.translation().iter()).all(|c| c.abs() <= 1.0));
        }

        // the same limits pushed straight through the lifecycle hook
        let mut raw = AutopilotConfig::default();
        raw.rcs.limit = -1.0;
        raw.attitude.drive_limit = -0.5;
        let mut sim = Simulation::new(presets::station_approach(), SimConfig { dt: 0.02, max_time: 5.0 });
        let mut ap = Autopilot::default();
        ap.configure(&raw);
        ap.on_enable(&sim.snapshot());
        ap.enable_docking();
        for _ in 0..100 {
            sim.step(&mut ap);
        }
        assert!(sim.vessel().pos.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn docking_from_behind_clears_axis_then_backs_up() {
        let mut scenario = presets::station_approach();
        if let Some(target) = scenario.target.as_mut() {
            target.offset = Vector3::new(0.0, -15.0, 0.0);
        }
        let mut sim = Simulation::new(scenario, SimConfig { dt: 0.02, max_time: 45.0 });
        let mut ap = enabled(&sim);
        ap.enable_docking();

        let mut phases = vec![ap.docking().phase()];
        while sim.time() < 45.0 {
            sim.step(&mut ap);
            if phases.last() != Some(&ap.docking().phase()) {
                phases.push(ap.docking().phase());
            }
        }
        let geo = ap.docking().geometry().unwrap();
        assert!(phases.contains(&DockingPhase::ClearingAxis), "phases: {phases:?}");
        assert!(phases.contains(&DockingPhase::BackingUp), "phases: {phases:?}");
        assert!(geo.lateral_distance() > 5.0, "lateral {:.2}", geo.lateral_distance());
        assert!(ap.docking().is_enabled());
    }

    #[test]
    fn default_simulate_kills_tumble() {
        let config = SimConfig { dt: 0.02, max_time: 60.0 };
        let history = simulate(presets::tumbling_probe(), config);
        let last = history.states.last().unwrap();
        assert!(last.omega.norm() < 0.01, "still spinning at {:?}", last.omega);
        assert!(history.telemetry.iter().all(|t| t.attitude.active));
    }

    #[test]
    fn idle_autopilot_passes_pilot_through() {
        let scenario = ScenarioBuilder::new("Idle")
            .pilot(PilotInput { pitch: 0.3, rcs: true, ..Default::default() })
            .build();
        let mut sim = Simulation::new(scenario, SimConfig::default());
        let mut ap = Autopilot::default();
        let cmd = sim.step(&mut ap);
        assert_eq!(cmd.pitch, 0.3);
        assert!(cmd.rcs);
        assert!(sim.host_rcs());
    }
}
