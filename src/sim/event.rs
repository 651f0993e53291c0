use crate::gnc::Telemetry;

// ---------------------------------------------------------------------------
// Simulation events
// ---------------------------------------------------------------------------

/// Kinds of simulation events.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Arbiter switched actuation channel.
    ChannelSwitch { from: String, to: String },
    /// Nose came within the threshold of the target.
    Acquired { angle_deg: f64 },
    /// Docking guidance changed phase.
    DockingPhase { from: String, to: String },
    Custom(String),
}

/// A discrete event that occurred during simulation.
#[derive(Debug, Clone)]
pub struct SimEvent {
    pub time: f64,
    pub kind: EventKind,
}

/// Trait for passive event detectors.
/// Implementations inspect consecutive telemetry frames and report events.
pub trait EventDetector {
    fn check(&mut self, prev: &Telemetry, current: &Telemetry) -> Option<EventKind>;
}

/// Detects arbiter mode changes.
pub struct ChannelSwitchDetector;

impl EventDetector for ChannelSwitchDetector {
    fn check(&mut self, prev: &Telemetry, current: &Telemetry) -> Option<EventKind> {
        if prev.arbiter.mode != current.arbiter.mode {
            Some(EventKind::ChannelSwitch {
                from: prev.arbiter.mode.clone(),
                to: current.arbiter.mode.clone(),
            })
        } else {
            None
        }
    }
}

/// Detects the first time the steering error drops below a threshold.
pub struct AcquisitionDetector {
    pub threshold_deg: f64,
    fired: bool,
}

impl AcquisitionDetector {
    pub fn new(threshold_deg: f64) -> Self {
        Self { threshold_deg, fired: false }
    }
}

impl EventDetector for AcquisitionDetector {
    fn check(&mut self, _prev: &Telemetry, current: &Telemetry) -> Option<EventKind> {
        if self.fired || !current.attitude.active {
            return None;
        }
        if current.attitude.angle_from_target < self.threshold_deg {
            self.fired = true;
            Some(EventKind::Acquired { angle_deg: current.attitude.angle_from_target })
        } else {
            None
        }
    }
}

/// Detects docking phase changes.
pub struct DockingPhaseDetector;

impl EventDetector for DockingPhaseDetector {
    fn check(&mut self, prev: &Telemetry, current: &Telemetry) -> Option<EventKind> {
        if prev.docking.phase != current.docking.phase {
            Some(EventKind::DockingPhase {
                from: prev.docking.phase.clone(),
                to: current.docking.phase.clone(),
            })
        } else {
            None
        }
    }
}

/// The detectors the runner installs by default.
pub fn default_detectors() -> Vec<Box<dyn EventDetector>> {
    vec![
        Box::new(ChannelSwitchDetector),
        Box::new(AcquisitionDetector::new(1.0)),
        Box::new(DockingPhaseDetector),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(mode: &str, angle: f64) -> Telemetry {
        let mut t = Telemetry::default();
        t.arbiter.mode = mode.into();
        t.attitude.active = true;
        t.attitude.angle_from_target = angle;
        t
    }

    #[test]
    fn channel_switch_detected() {
        let mut det = ChannelSwitchDetector;
        let e = det.check(&frame("idle", 5.0), &frame("channel B", 5.0));
        assert_eq!(
            e,
            Some(EventKind::ChannelSwitch { from: "idle".into(), to: "channel B".into() })
        );
        assert!(det.check(&frame("idle", 5.0), &frame("idle", 5.0)).is_none());
    }

    #[test]
    fn acquisition_fires_once() {
        let mut det = AcquisitionDetector::new(1.0);
        assert!(det.check(&frame("idle", 5.0), &frame("idle", 2.0)).is_none());
        assert!(det.check(&frame("idle", 2.0), &frame("idle", 0.5)).is_some());
        // Should not fire again
        assert!(det.check(&frame("idle", 0.5), &frame("idle", 0.1)).is_none());
    }

    #[test]
    fn inactive_controller_never_acquires() {
        let mut det = AcquisitionDetector::new(1.0);
        let mut t = frame("idle", 0.0);
        t.attitude.active = false;
        assert!(det.check(&t, &t).is_none());
    }
}
