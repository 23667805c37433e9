/// One-pole filters for the echo feedback path.
///
/// `new(freq, sample_rate)`, `process(sample) -> sample`, `reset()`, plus
/// `set_sample_rate` so a lane can be retuned without losing state.

use std::f64::consts::PI;

/// Cutoff of the DC blocker in the feedback loop.
pub const DC_BLOCK_HZ: f64 = 20.0;

fn hpf_alpha(cutoff_hz: f64, sample_rate: f64) -> f64 {
    let rc = 1.0 / (2.0 * PI * cutoff_hz);
    let dt = 1.0 / sample_rate;
    rc / (rc + dt)
}

/// 1-pole high-pass filter: y[n] = alpha * (y[n-1] + x[n] - x[n-1])
#[derive(Clone, Debug)]
pub struct OnePoleHpf {
    cutoff_hz: f64,
    alpha: f64,
    prev_x: f64,
    prev_y: f64,
}

impl OnePoleHpf {
    pub fn new(cutoff_hz: f64, sample_rate: f64) -> Self {
        Self {
            cutoff_hz,
            alpha: hpf_alpha(cutoff_hz, sample_rate),
            prev_x: 0.0,
            prev_y: 0.0,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.alpha = hpf_alpha(self.cutoff_hz, sample_rate);
    }

    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        let y = self.alpha * (self.prev_y + x - self.prev_x);
        self.prev_x = x;
        self.prev_y = y;
        y
    }

    pub fn reset(&mut self) {
        self.prev_x = 0.0;
        self.prev_y = 0.0;
    }

    pub fn is_silent(&self) -> bool {
        self.prev_x == 0.0 && self.prev_y == 0.0
    }
}

/// DC blocker: 1-pole HPF at `DC_BLOCK_HZ`.
#[derive(Clone, Debug)]
pub struct DcBlocker {
    hpf: OnePoleHpf,
}

impl DcBlocker {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            hpf: OnePoleHpf::new(DC_BLOCK_HZ, sample_rate),
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.hpf.set_sample_rate(sample_rate);
    }

    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        self.hpf.process(x)
    }

    pub fn reset(&mut self) {
        self.hpf.reset();
    }

    pub fn is_silent(&self) -> bool {
        self.hpf.is_silent()
    }
}
