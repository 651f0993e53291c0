use std::collections::VecDeque;

/// Fixed-window moving average used for display smoothing.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: usize,
    samples: VecDeque<f64>,
    sum: f64,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self { window, samples: VecDeque::with_capacity(window), sum: 0.0 }
    }

    pub fn push(&mut self, sample: f64) {
        if !sample.is_finite() {
            return;
        }
        if self.samples.len() == self.window {
            if let Some(old) = self.samples.pop_front() {
                self.sum -= old;
            }
        }
        self.samples.push_back(sample);
        self.sum += sample;
    }

    pub fn value(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.sum / self.samples.len() as f64
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.sum = 0.0;
    }
}

impl Default for MovingAverage {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_drops_old_samples() {
        let mut avg = MovingAverage::new(2);
        avg.push(1.0);
        avg.push(3.0);
        assert!((avg.value() - 2.0).abs() < 1e-12);
        avg.push(5.0);
        assert!((avg.value() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn average_ignores_nan() {
        let mut avg = MovingAverage::default();
        avg.push(f64::NAN);
        assert_eq!(avg.value(), 0.0);
    }
}
