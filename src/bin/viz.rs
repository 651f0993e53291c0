use eframe::egui;
use egui_plot::{Legend, Line, Plot, PlotPoints};

use attitude_autopilot::dynamics::SimConfig;
use attitude_autopilot::gnc::{Autopilot, Controller};
use attitude_autopilot::sim::{self, SimRun, Simulation};
use attitude_autopilot::vehicle::{presets, Scenario};

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let scenario = presets::station_approach();
    let mut sim = Simulation::new(scenario.clone(), SimConfig { dt: 0.02, max_time: 150.0 });
    let mut autopilot = Autopilot::default();
    autopilot.on_enable(&sim.snapshot());
    autopilot.enable_docking();
    let run = sim::run(&mut sim, &mut autopilot);

    let app = AutopilotViz { run, scenario };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native("Attitude Autopilot", options, Box::new(|_| Ok(Box::new(app))))
}

struct AutopilotViz {
    run: SimRun,
    scenario: Scenario,
}

fn series(points: impl Iterator<Item = [f64; 2]>) -> PlotPoints<'static> {
    points.collect()
}

impl eframe::App for AutopilotViz {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let step = (self.run.states.len() / 2000).max(1);
        let idx: Vec<usize> = (0..self.run.states.len()).step_by(step).collect();
        let run = &self.run;

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.heading(format!("Scenario: {}", self.scenario.name));
            if let Some(last) = run.last_telemetry() {
                ui.label(format!(
                    "Error: {:.2} deg  |  Arbiter: {}  |  Docking: {} ({})  |  Events: {}  |  Time: {:.0} s",
                    last.attitude.angle_from_target,
                    last.arbiter.status,
                    last.docking.phase,
                    last.docking.status,
                    run.events.len(),
                    run.duration(),
                ));
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let half_w = available.x / 2.0 - 8.0;
            let half_h = available.y / 2.0 - 8.0;

            ui.horizontal(|ui| {
                // Steering error vs Time
                ui.vertical(|ui| {
                    ui.label("Angle from target (deg)");
                    let raw = series(idx.iter().map(|&i| {
                        [run.states[i].time, run.telemetry[i].attitude.angle_from_target]
                    }));
                    let avg = series(idx.iter().map(|&i| {
                        [run.states[i].time, run.telemetry[i].attitude.steering_error]
                    }));
                    Plot::new("error")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .legend(Legend::default())
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("Angle", raw));
                            plot_ui.line(Line::new("Moving average", avg));
                        });
                });

                // Rotation commands vs Time
                ui.vertical(|ui| {
                    ui.label("Rotation command");
                    let axes = ["Pitch", "Yaw", "Roll"];
                    Plot::new("rotation")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .legend(Legend::default())
                        .show(ui, |plot_ui| {
                            for (k, name) in axes.iter().enumerate() {
                                let points = series(idx.iter().map(|&i| {
                                    [run.states[i].time, run.commands[i].rotation()[k]]
                                }));
                                plot_ui.line(Line::new(*name, points));
                            }
                        });
                });
            });

            ui.horizontal(|ui| {
                // Channel state vs Time
                ui.vertical(|ui| {
                    ui.label("Channels (SAS, RCS)");
                    let sas = series(idx.iter().map(|&i| {
                        [run.states[i].time, if run.commands[i].sas { 1.0 } else { 0.0 }]
                    }));
                    let rcs = series(idx.iter().map(|&i| {
                        [run.states[i].time, if run.commands[i].rcs { 0.5 } else { 0.0 }]
                    }));
                    Plot::new("channels")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .legend(Legend::default())
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("SAS", sas));
                            plot_ui.line(Line::new("RCS", rcs));
                        });
                });

                // Docking separation vs Time
                ui.vertical(|ui| {
                    ui.label("Docking separation (m)");
                    let z = series(idx.iter().map(|&i| {
                        [run.states[i].time, run.telemetry[i].docking.z_separation]
                    }));
                    let lat = series(idx.iter().map(|&i| {
                        [run.states[i].time, run.telemetry[i].docking.lateral_separation]
                    }));
                    Plot::new("docking")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .legend(Legend::default())
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("Along axis", z));
                            plot_ui.line(Line::new("Lateral", lat));
                        });
                });
            });
        });
    }
}
