use nalgebra::Vector3;

use crate::config::clamp_time_constant;

// ---------------------------------------------------------------------------
// Single-pole low-pass on the commanded torque vector
// ---------------------------------------------------------------------------

/// `y += (x - y) * alpha` with `alpha = 1 / (Tf/dt + 1)`, so the cutoff stays
/// at 1/Tf whatever the tick length.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    time_constant: f64,
    value: Vector3<f64>,
}

impl LowPassFilter {
    pub fn new(time_constant: f64) -> Self {
        Self { time_constant: clamp_time_constant(time_constant), value: Vector3::zeros() }
    }

    pub fn alpha(&self, dt: f64) -> f64 {
        if dt <= 0.0 {
            return 0.0;
        }
        1.0 / (self.time_constant / dt + 1.0)
    }

    pub fn apply(&mut self, raw: &Vector3<f64>, dt: f64) -> Vector3<f64> {
        let alpha = self.alpha(dt);
        self.apply_alpha(raw, alpha)
    }

    /// Filter with an explicit smoothing factor. Non-finite input components
    /// pass through as NaN without disturbing the stored value.
    pub fn apply_alpha(&mut self, raw: &Vector3<f64>, alpha: f64) -> Vector3<f64> {
        let alpha = alpha.clamp(0.0, 1.0);
        Vector3::from_fn(|i, _| {
            if !raw[i].is_finite() {
                return f64::NAN;
            }
            self.value[i] += (raw[i] - self.value[i]) * alpha;
            self.value[i]
        })
    }

    pub fn value(&self) -> Vector3<f64> {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = Vector3::zeros();
    }

    pub fn time_constant(&self) -> f64 {
        self.time_constant
    }

    pub fn set_time_constant(&mut self, tf: f64) {
        self.time_constant = clamp_time_constant(tf);
    }
}
