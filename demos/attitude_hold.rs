use tracing_subscriber::EnvFilter;

use attitude_autopilot::dynamics::SimConfig;
use attitude_autopilot::gnc::{Autopilot, Controller, UserId};
use attitude_autopilot::sim::{self, Simulation};
use attitude_autopilot::vehicle::presets;
use attitude_autopilot::vessel::PilotInput;

/// Hold heading 90 level, nudge the stick halfway through and watch the
/// arbiter hand control between channels.
fn main() -> attitude_autopilot::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let scenario = presets::tumbling_probe();
    let pilot = scenario.pilot;
    let mut sim = Simulation::new(scenario, SimConfig { dt: 0.02, max_time: 90.0 });
    let mut autopilot = Autopilot::default();
    autopilot.on_enable(&sim.snapshot());
    autopilot.attitude_to_hpr(90.0, 0.0, 0.0, UserId::OPERATOR)?;

    while sim.time() < 45.0 {
        sim.step(&mut autopilot);
    }
    println!(
        "t={:.1}s  error {:.3} deg  arbiter: {}",
        sim.time(),
        autopilot.render().attitude.angle_from_target,
        autopilot.attitude().arbiter().status()
    );

    // one second of manual roll
    sim.set_pilot(PilotInput { roll: 0.6, sas: sim.host_sas(), rcs: sim.host_rcs(), ..pilot });
    while sim.time() < 46.0 {
        sim.step(&mut autopilot);
    }
    println!("t={:.1}s  arbiter: {}", sim.time(), autopilot.attitude().arbiter().status());
    sim.set_pilot(PilotInput { sas: sim.host_sas(), rcs: sim.host_rcs(), ..pilot });

    let rest = sim::run(&mut sim, &mut autopilot);
    for e in &rest.events {
        println!("t={:>6.2}s  {:?}", e.time, e.kind);
    }
    if let Some(last) = rest.last_telemetry() {
        println!(
            "final error {:.3} deg, {} controller resets",
            last.attitude.angle_from_target, last.attitude.resets
        );
    }
    Ok(())
}
