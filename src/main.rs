use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use attitude_autopilot::dynamics::SimConfig;
use attitude_autopilot::gnc::{Autopilot, Controller};
use attitude_autopilot::io::{self, RunSummary};
use attitude_autopilot::sim::{self, SimRun, Simulation};
use attitude_autopilot::vehicle::{presets, Scenario};
use attitude_autopilot::{AutopilotConfig, Result};

/// Command-line options: `[--config FILE] [--csv PREFIX] [--json PREFIX]`.
#[derive(Default)]
struct Options {
    config: Option<String>,
    csv: Option<String>,
    json: Option<String>,
}

fn parse_args() -> Options {
    let mut opts = Options::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => opts.config = args.next(),
            "--csv" => opts.csv = args.next(),
            "--json" => opts.json = args.next(),
            other => eprintln!("ignoring unknown argument {other}"),
        }
    }
    opts
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run(parse_args()) {
        error!(%err, "run failed");
        std::process::exit(1);
    }
}

fn run(opts: Options) -> Result<()> {
    let config = match &opts.config {
        Some(path) => {
            info!(path = %path, "loading autopilot config");
            AutopilotConfig::from_json_file(path)?
        }
        None => AutopilotConfig::default(),
    };

    // -----------------------------------------------------------------------
    // Scenario 1: hold attitude on a tumbling probe
    // -----------------------------------------------------------------------
    let probe = presets::tumbling_probe();
    let hold = sim::simulate(probe.clone(), SimConfig { dt: 0.02, max_time: 60.0 });
    report(&probe, &hold);
    export(&opts, "hold", &probe, &hold)?;

    // -----------------------------------------------------------------------
    // Scenario 2: docking approach to a station port
    // -----------------------------------------------------------------------
    let station = presets::station_approach();
    let mut autopilot = Autopilot::new(config);
    let mut simulation = Simulation::new(station.clone(), SimConfig { dt: 0.02, max_time: 180.0 });
    autopilot.on_enable(&simulation.snapshot());
    autopilot.enable_docking();
    let docking = sim::run(&mut simulation, &mut autopilot);
    report(&station, &docking);
    export(&opts, "docking", &station, &docking)?;

    Ok(())
}

fn export(opts: &Options, tag: &str, scenario: &Scenario, run: &SimRun) -> Result<()> {
    if let Some(prefix) = &opts.csv {
        let path = format!("{prefix}_{tag}.csv");
        io::write_run_file(&path, run)?;
        info!(path = %path, "wrote telemetry");
    }
    if let Some(prefix) = &opts.json {
        let path = format!("{prefix}_{tag}.json");
        io::write_summary_file(&path, &RunSummary::from_run(&scenario.name, run))?;
        info!(path = %path, "wrote summary");
    }
    Ok(())
}

fn report(scenario: &Scenario, run: &SimRun) {
    let summary = RunSummary::from_run(&scenario.name, run);
    let craft = &scenario.craft;

    println!();
    println!("====================================================================");
    println!("  ATTITUDE AUTOPILOT RUN: {}", scenario.name);
    println!("====================================================================");
    println!();
    println!("  Craft");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Mass:          {:>8.1} kg    Inertia:  {:>6.1} {:>6.1} {:>6.1} kg*m^2",
        craft.mass, craft.inertia.x, craft.inertia.y, craft.inertia.z
    );
    println!(
        "  Wheel torque:  {:>8.1} N*m   RCS torque:   {:>8.1} N*m",
        craft.wheel_torque.max(),
        craft.rcs_torque.max()
    );
    println!();

    println!("  Events");
    println!("  ──────────────────────────────────────────────────────────────────");
    for e in &run.events {
        println!("  t={:>7.2}s   {:?}", e.time, e.kind);
    }
    println!();

    println!("  Summary");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!("  Final error:   {:>8.3} deg   Max error:   {:>8.2} deg", summary.final_angle_deg, summary.max_angle_deg);
    match summary.acquired_at_s {
        Some(t) => println!("  Acquired at:   {:>8.2} s", t),
        None => println!("  Acquired at:        never"),
    }
    println!("  Max rate:      {:>8.2} deg/s", summary.max_rate_deg_s);
    println!(
        "  SAS engaged:   {:>7.1} %      RCS engaged: {:>7.1} %",
        summary.sas_fraction * 100.0,
        summary.rcs_fraction * 100.0
    );
    println!("  Propellant:    {:>8.3} kg", summary.propellant_used_kg);
    if !summary.docking_phase.is_empty() && summary.docking_phase != "idle" {
        println!("  Docking:       {}", summary.docking_phase);
    }
    println!();

    // -----------------------------------------------------------------------
    // Telemetry table (sampled)
    // -----------------------------------------------------------------------
    println!("  Telemetry");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>7}  {:>8}  {:>8}  {:>10}  {:>4}  {:>4}  {:>8}",
        "t (s)", "err(deg)", "rate", "mode", "SAS", "RCS", "dock z"
    );
    println!("  {}", "─".repeat(62));

    let sample_interval = (run.states.len() / 25).max(1);
    for (i, ((s, c), t)) in run.states.iter().zip(&run.commands).zip(&run.telemetry).enumerate() {
        if i % sample_interval != 0 && i != run.states.len() - 1 {
            continue;
        }
        println!(
            "  {:>7.2}  {:>8.3}  {:>8.3}  {:>10}  {:>4}  {:>4}  {:>8.2}",
            s.time,
            t.attitude.angle_from_target,
            s.omega.norm().to_degrees(),
            t.arbiter.mode,
            if c.sas { "on" } else { "-" },
            if c.rcs { "on" } else { "-" },
            t.docking.z_separation,
        );
    }

    println!();
    println!("  Simulation: {} steps, {:.1} s", run.states.len(), summary.duration_s);
    println!("====================================================================");
    println!();
}
