use nalgebra::Vector3;

use crate::config::Gains;

// ---------------------------------------------------------------------------
// PID Controller (single axis)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Pid {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub min: f64,
    pub max: f64,
    integral: f64,
    prev_error: Option<f64>,
    // last contributions, for display
    p_term: f64,
    i_term: f64,
    d_term: f64,
}

impl Pid {
    pub fn new(kp: f64, ki: f64, kd: f64, min: f64, max: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            min,
            max,
            integral: 0.0,
            prev_error: None,
            p_term: 0.0,
            i_term: 0.0,
            d_term: 0.0,
        }
    }

    /// Derivative from the error difference. The first sample after a reset
    /// contributes no derivative.
    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        let derivative = match self.prev_error {
            Some(prev) if dt > 0.0 => (error - prev) / dt,
            _ => 0.0,
        };
        self.step(error, derivative, dt)
    }

    /// Derivative on measurement: `rate` is the measured rate of the
    /// controlled quantity, so the error derivative is taken as `-rate`.
    pub fn update_with_rate(&mut self, error: f64, rate: f64, dt: f64) -> f64 {
        self.step(error, -rate, dt)
    }

    fn step(&mut self, error: f64, derivative: f64, dt: f64) -> f64 {
        if !error.is_finite() || !derivative.is_finite() {
            return f64::NAN;
        }
        let dt = dt.max(0.0);
        self.integral += error * dt;

        let p = self.kp * error;
        let d = self.kd * derivative;
        let raw = p + self.ki * self.integral + d;
        let out = raw.clamp(self.min, self.max);

        // Anti-windup: do not integrate further into a saturated bound.
        if (raw > self.max && error > 0.0) || (raw < self.min && error < 0.0) {
            self.integral -= error * dt;
        }

        self.p_term = p;
        self.i_term = self.ki * self.integral;
        self.d_term = d;
        self.prev_error = Some(error);
        out
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
        self.p_term = 0.0;
        self.i_term = 0.0;
        self.d_term = 0.0;
    }

    pub fn set_gains(&mut self, gains: Gains) {
        self.kp = gains.kp;
        self.ki = gains.ki;
        self.kd = gains.kd;
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn prev_error(&self) -> Option<f64> {
        self.prev_error
    }
}

// ---------------------------------------------------------------------------
// Three independent loops sharing gains and clamp
// ---------------------------------------------------------------------------

/// Three decoupled SISO loops, one per axis of a vector error.
#[derive(Debug, Clone)]
pub struct PidVector {
    axes: [Pid; 3],
}

/// Per-axis P, I and D contributions of the last update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidTerms {
    pub proportional: Vector3<f64>,
    pub integral: Vector3<f64>,
    pub derivative: Vector3<f64>,
}

impl PidVector {
    pub fn new(gains: Gains, min: f64, max: f64) -> Self {
        let pid = Pid::new(gains.kp, gains.ki, gains.kd, min, max);
        Self { axes: [pid.clone(), pid.clone(), pid] }
    }

    pub fn compute(&mut self, error: &Vector3<f64>, dt: f64) -> Vector3<f64> {
        Vector3::from_fn(|i, _| self.axes[i].update(error[i], dt))
    }

    pub fn compute_with_rate(
        &mut self,
        error: &Vector3<f64>,
        rate: &Vector3<f64>,
        dt: f64,
    ) -> Vector3<f64> {
        Vector3::from_fn(|i, _| self.axes[i].update_with_rate(error[i], rate[i], dt))
    }

    pub fn reset(&mut self) {
        for pid in &mut self.axes {
            pid.reset();
        }
    }

    pub fn set_gains(&mut self, gains: Gains) {
        for pid in &mut self.axes {
            pid.set_gains(gains);
        }
    }

    pub fn set_limits(&mut self, min: f64, max: f64) {
        for pid in &mut self.axes {
            pid.min = min;
            pid.max = max;
        }
    }

    pub fn gains(&self) -> Gains {
        let p = &self.axes[0];
        Gains { kp: p.kp, ki: p.ki, kd: p.kd }
    }

    pub fn integral(&self) -> Vector3<f64> {
        Vector3::from_fn(|i, _| self.axes[i].integral())
    }

    /// Error memory used by the difference derivative; `None` after a reset.
    pub fn prev_error(&self) -> Option<Vector3<f64>> {
        let [a, b, c] = &self.axes;
        Some(Vector3::new(a.prev_error()?, b.prev_error()?, c.prev_error()?))
    }

    pub fn terms(&self) -> PidTerms {
        PidTerms {
            proportional: Vector3::from_fn(|i, _| self.axes[i].p_term),
            integral: Vector3::from_fn(|i, _| self.axes[i].i_term),
            derivative: Vector3::from_fn(|i, _| self.axes[i].d_term),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gains(kp: f64, ki: f64, kd: f64) -> Gains {
        Gains { kp, ki, kd }
    }

    #[test]
    fn pid_proportional() {
        let mut pid = Pid::new(1.0, 0.0, 0.0, -1.0, 1.0);
        let out = pid.update(0.5, 0.01);
        assert!((out - 0.5).abs() < 1e-10, "Pure P should output Kp * error");
    }

    #[test]
    fn pid_integral_accumulates() {
        let mut pid = Pid::new(0.0, 1.0, 0.0, -1.0, 1.0);
        pid.update(1.0, 0.1);
        let out = pid.update(1.0, 0.1);
        assert!((out - 0.2).abs() < 1e-10, "Integral should accumulate");
    }

    #[test]
    fn pid_output_clamped_and_integral_held() {
        let mut pid = Pid::new(10.0, 1.0, 0.0, -1.0, 1.0);
        for _ in 0..100 {
            assert_eq!(pid.update(1.0, 0.1), 1.0);
        }
        assert!(pid.integral().abs() < 1e-12, "saturated loop must not wind up");
        // Error reversing out of saturation still integrates
        pid.update(-0.01, 0.1);
        assert!(pid.integral() < 0.0);
    }

    #[test]
    fn first_sample_after_reset_has_no_derivative_kick() {
        let mut pid = Pid::new(0.0, 0.0, 1.0, -10.0, 10.0);
        assert_eq!(pid.update(1.0, 0.1), 0.0);
        assert!((pid.update(1.5, 0.1) - 5.0).abs() < 1e-9);
        pid.reset();
        assert_eq!(pid.update(3.0, 0.1), 0.0);
    }

    #[test]
    fn derivative_on_measurement_opposes_rate() {
        let mut pid = Pid::new(0.0, 0.0, 2.0, -10.0, 10.0);
        assert!((pid.update_with_rate(0.0, 0.5, 0.02) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn non_finite_input_leaves_state_untouched() {
        let mut pid = Pid::new(1.0, 1.0, 0.0, -1.0, 1.0);
        pid.update(0.2, 0.1);
        let before = pid.integral();
        assert!(pid.update(f64::NAN, 0.1).is_nan());
        assert_eq!(pid.integral(), before);
        assert_eq!(pid.prev_error(), Some(0.2));
    }

    #[test]
    fn vector_reset_then_zero_error_is_zero() {
        let mut pid = PidVector::new(gains(2.0, 1.5, 3.0), -1.0, 1.0);
        pid.compute(&Vector3::new(0.3, -0.2, 0.1), 0.02);
        pid.compute(&Vector3::new(0.1, 0.4, -0.3), 0.02);
        pid.reset();
        assert_eq!(pid.integral(), Vector3::zeros());
        assert_eq!(pid.prev_error(), None);
        assert_eq!(pid.compute(&Vector3::zeros(), 0.02), Vector3::zeros());
    }

    #[test]
    fn vector_axes_are_independent() {
        let mut pid = PidVector::new(gains(1.0, 0.0, 0.0), -1.0, 1.0);
        let out = pid.compute(&Vector3::new(0.25, -5.0, 0.0), 0.02);
        assert_eq!(out, Vector3::new(0.25, -1.0, 0.0));
    }
}
