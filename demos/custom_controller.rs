use nalgebra::Vector3;

use attitude_autopilot::dynamics::SimConfig;
use attitude_autopilot::gnc::Controller;
use attitude_autopilot::sim;
use attitude_autopilot::vehicle::{CraftBuilder, ScenarioBuilder};
use attitude_autopilot::vessel::{ExternalState, FlightCommand};

/// A simple bang-bang rate damper: full opposite command on any axis spinning
/// faster than the deadband, nothing otherwise.
struct BangBangDamper {
    deadband: f64, // rad/s
}

impl Controller for BangBangDamper {
    fn tick(&mut self, state: &ExternalState, _dt: f64) -> FlightCommand {
        let w = state.angular_velocity; // body (pitch, roll, yaw)
        let kick = |rate: f64| if rate.abs() > self.deadband { -rate.signum() } else { 0.0 };
        FlightCommand {
            pitch: kick(w.x),
            yaw: kick(w.z),
            roll: kick(w.y),
            ..FlightCommand::from_pilot(&state.pilot)
        }
    }

    fn name(&self) -> &str {
        "BangBang"
    }
}

fn main() {
    let scenario = ScenarioBuilder::new("BangBang Demo")
        .craft(
            CraftBuilder::new("Probe")
                .mass(800.0)
                .inertia(Vector3::new(3.0, 2.0, 3.0))
                .wheel_torque(Vector3::new(2.0, 2.0, 2.0))
                .build(),
        )
        .angular_velocity(Vector3::new(0.2, 0.1, -0.3))
        .build();

    let config = SimConfig { dt: 0.02, max_time: 30.0 };

    let mut controller = BangBangDamper { deadband: 0.005 };

    println!("Simulating with {} controller...", controller.name());
    let run = sim::simulate_with(scenario, config, &mut controller);

    let start_rate = run.states.first().map_or(0.0, |s| s.omega.norm());
    let end_rate = run.states.last().map_or(0.0, |s| s.omega.norm());
    let settled = run
        .states
        .iter()
        .find(|s| s.omega.norm() < 0.01)
        .map(|s| s.time);

    println!("Initial rate: {:.3} deg/s", start_rate.to_degrees());
    println!("Final rate:   {:.3} deg/s", end_rate.to_degrees());
    match settled {
        Some(t) => println!("Below 0.01 rad/s after {:.2} s", t),
        None => println!("Never settled"),
    }
    println!("Steps: {}", run.states.len());
}
