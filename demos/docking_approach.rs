use attitude_autopilot::dynamics::SimConfig;
use attitude_autopilot::gnc::{Autopilot, Controller, DockingPhase};
use attitude_autopilot::io::{self, RunSummary};
use attitude_autopilot::sim::{self, Simulation};
use attitude_autopilot::vehicle::presets;

/// Fly the station approach preset to the port and write the telemetry next
/// to the binary.
fn main() -> attitude_autopilot::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let scenario = presets::station_approach();
    let name = scenario.name.clone();
    let mut sim = Simulation::new(scenario, SimConfig { dt: 0.02, max_time: 180.0 });
    let mut autopilot = Autopilot::default();
    autopilot.on_enable(&sim.snapshot());
    autopilot.docking_mut().set_roll_lock(Some(0.0));
    autopilot.enable_docking();

    let run = sim::run(&mut sim, &mut autopilot);

    let done_at = run
        .telemetry
        .iter()
        .find(|t| t.docking.phase == DockingPhase::Done.to_string())
        .map(|t| t.time);
    match done_at {
        Some(t) => println!("Reached the port at t={t:.1} s"),
        None => println!("Still {} after {:.0} s", autopilot.docking().status(), run.duration()),
    }
    for e in &run.events {
        println!("t={:>6.2}s  {:?}", e.time, e.kind);
    }

    io::write_run_file("docking_approach.csv", &run)?;
    io::write_summary_file("docking_approach.json", &RunSummary::from_run(&name, &run))?;
    println!("Wrote docking_approach.csv and docking_approach.json");
    Ok(())
}
