use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::sim::{EventKind, SimRun};

/// Summary statistics computed from a recorded run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub scenario: String,
    pub duration_s: f64,
    pub final_angle_deg: f64,
    pub max_angle_deg: f64,
    /// First time the nose came within 1 degree of the target.
    pub acquired_at_s: Option<f64>,
    pub max_rate_deg_s: f64,
    pub channel_switches: usize,
    /// Fraction of ticks with the continuous channel (SAS) engaged.
    pub sas_fraction: f64,
    /// Fraction of ticks with the discrete channel (RCS) engaged.
    pub rcs_fraction: f64,
    pub propellant_used_kg: f64,
    pub docking_phase: String,
    pub pid_resets: u64,
}

impl RunSummary {
    /// Compute summary from run data.
    pub fn from_run(scenario: &str, run: &SimRun) -> Self {
        let ticks = run.commands.len().max(1) as f64;
        let first_mass = run.states.first().map_or(0.0, |s| s.mass);
        let last_mass = run.states.last().map_or(0.0, |s| s.mass);
        let last = run.telemetry.last();

        let acquired_at_s = run.events.iter().find_map(|e| match e.kind {
            EventKind::Acquired { .. } => Some(e.time),
            _ => None,
        });
        let channel_switches = run
            .events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::ChannelSwitch { .. }))
            .count();

        RunSummary {
            scenario: scenario.to_string(),
            duration_s: run.duration(),
            final_angle_deg: last.map_or(0.0, |t| t.attitude.angle_from_target),
            max_angle_deg: run
                .telemetry
                .iter()
                .map(|t| t.attitude.angle_from_target)
                .fold(0.0_f64, f64::max),
            acquired_at_s,
            max_rate_deg_s: run
                .states
                .iter()
                .map(|s| s.omega.norm().to_degrees())
                .fold(0.0_f64, f64::max),
            channel_switches,
            sas_fraction: run.commands.iter().filter(|c| c.sas).count() as f64 / ticks,
            rcs_fraction: run.commands.iter().filter(|c| c.rcs).count() as f64 / ticks,
            propellant_used_kg: (first_mass - last_mass).max(0.0),
            docking_phase: last.map_or_else(String::new, |t| t.docking.phase.clone()),
            pid_resets: last.map_or(0, |t| t.attitude.resets),
        }
    }
}

/// Write run summary as pretty JSON to a writer.
pub fn write_summary<W: Write>(writer: &mut W, summary: &RunSummary) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, summary)?;
    writeln!(writer)?;
    Ok(())
}

/// Write run summary JSON to a file.
pub fn write_summary_file(path: &str, summary: &RunSummary) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_summary(&mut file, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::State;
    use crate::gnc::Telemetry;
    use crate::sim::SimEvent;
    use crate::vessel::FlightCommand;
    use approx::assert_relative_eq;
    use nalgebra::{UnitQuaternion, Vector3};

    fn simple_run() -> SimRun {
        let mut states = Vec::new();
        let mut telemetry = Vec::new();
        for (i, angle) in [30.0, 12.0, 0.5].into_iter().enumerate() {
            let mut s = State::circular(700_000.0, UnitQuaternion::identity(), Vector3::zeros(), 100.0);
            s.time = i as f64;
            s.mass = 100.0 - i as f64 * 0.25;
            states.push(s);
            let mut t = Telemetry::default();
            t.attitude.angle_from_target = angle;
            t.docking.phase = "idle".into();
            telemetry.push(t);
        }
        SimRun {
            states,
            commands: vec![
                FlightCommand { rcs: true, ..Default::default() },
                FlightCommand::default(),
                FlightCommand { sas: true, ..Default::default() },
                FlightCommand { sas: true, ..Default::default() },
            ],
            telemetry,
            events: vec![
                SimEvent {
                    time: 1.0,
                    kind: EventKind::ChannelSwitch { from: "channel B".into(), to: "idle".into() },
                },
                SimEvent { time: 2.0, kind: EventKind::Acquired { angle_deg: 0.5 } },
            ],
        }
    }

    #[test]
    fn summary_from_run() {
        let s = RunSummary::from_run("Test", &simple_run());
        assert_relative_eq!(s.duration_s, 2.0);
        assert_relative_eq!(s.max_angle_deg, 30.0);
        assert_relative_eq!(s.final_angle_deg, 0.5);
        assert_eq!(s.acquired_at_s, Some(2.0));
        assert_eq!(s.channel_switches, 1);
        assert_relative_eq!(s.sas_fraction, 0.5);
        assert_relative_eq!(s.rcs_fraction, 0.25);
        assert_relative_eq!(s.propellant_used_kg, 0.5);
    }

    #[test]
    fn json_output_is_valid() {
        let summary = RunSummary::from_run("Test", &simple_run());
        let mut buf = Vec::new();
        write_summary(&mut buf, &summary).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["scenario"], "Test");
        assert_eq!(value["channel_switches"], 1);
        assert!(value["max_angle_deg"].is_number());
    }
}
