/// One lane of a BBD echo: feedback delay through an oversampled BBD.
///
/// Signal flow:
///   in + fb * dc_block(last) -> upsample x4 -> BBD -> decimate /4 -> out
///
/// The BBD runs at four times the host rate so its clock images and the
/// aliasing of fast clocks stay above the audio band. The output is the wet
/// signal only; mixing is left to the caller.
///
/// Time control: clock = 14 kHz * 2^(3t), t = time knob + curve(time CV),
/// clamped to [0, 2]. Feedback: knob + CV/3, clamped to [0, 0.75].
use crate::bbd::{Bbd, BbdConfig};
use crate::control::{self, CvCurve};
use crate::filters::DcBlocker;
use crate::multirate::{Decimator, Upsampler};

/// Oversampling factor of the BBD inside the echo.
pub const ECHO_OVERSAMPLE: usize = 4;

/// Clock at time = 0.
pub const BASE_CLOCK_HZ: f64 = 14_000.0;

/// Octaves of clock range per unit of time control.
pub const CLOCK_OCTAVES_PER_UNIT: f64 = 3.0;

/// Upper bound of the combined time control.
pub const MAX_TIME: f64 = 2.0;

pub const SHORT_STAGES: usize = 1024;
pub const LONG_STAGES: usize = 20_000;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EchoConfig {
    pub stages: usize,
    /// How the time CV combines with the time knob.
    pub time_curve: CvCurve,
}

impl EchoConfig {
    /// Long-delay variant.
    pub fn long() -> Self {
        Self {
            stages: LONG_STAGES,
            ..Self::default()
        }
    }
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            stages: SHORT_STAGES,
            time_curve: CvCurve::Scale,
        }
    }
}

/// Map a combined time control onto a BBD clock frequency.
#[inline]
pub fn time_to_clock_hz(t: f64) -> f64 {
    let t = if t > 0.0 { t.min(MAX_TIME) } else { 0.0 };
    BASE_CLOCK_HZ * (CLOCK_OCTAVES_PER_UNIT * t).exp2()
}

#[derive(Clone, Debug)]
pub struct BbdEcho {
    bbd: Bbd,
    up: Upsampler<ECHO_OVERSAMPLE>,
    down: Decimator<ECHO_OVERSAMPLE>,
    dc_block: DcBlocker,
    time_curve: CvCurve,
    time: f64,
    time_cv: f64,
    feedback: f64,
    feedback_cv: f64,
    last: f64,
}

impl BbdEcho {
    pub fn new(config: &EchoConfig, sample_rate: f64) -> Self {
        Self::with_design(config, &BbdConfig::juno60(config.stages), sample_rate)
    }

    /// Echo lane with custom BBD filters. The stage count comes from
    /// `config`, not `design`.
    pub fn with_design(config: &EchoConfig, design: &BbdConfig, sample_rate: f64) -> Self {
        let bbd_config = BbdConfig {
            stages: config.stages,
            ..design.clone()
        };
        let bbd_rate = sample_rate * ECHO_OVERSAMPLE as f64;
        let mut echo = Self {
            bbd: Bbd::new(&bbd_config, bbd_rate),
            up: Upsampler::new(),
            down: Decimator::new(),
            dc_block: DcBlocker::new(sample_rate),
            time_curve: config.time_curve,
            time: 0.0,
            time_cv: 0.0,
            feedback: 0.0,
            feedback_cv: 0.0,
            last: 0.0,
        };
        echo.update_clock();
        log::debug!(
            "echo lane: {} stages, delay {:.1} ms",
            config.stages,
            echo.delay_seconds() * 1000.0
        );
        echo
    }

    /// Host-rate change: the BBD is rediscretized at the oversampled rate.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.bbd.set_sample_rate(sample_rate * ECHO_OVERSAMPLE as f64);
        self.dc_block.set_sample_rate(sample_rate);
        self.update_clock();
    }

    /// Time knob in [0, 1].
    pub fn set_time(&mut self, time: f64) {
        self.time = control::clamp_unit(time);
        self.update_clock();
    }

    /// Bipolar time CV in [-1, 1].
    pub fn set_time_cv(&mut self, cv: f64) {
        self.time_cv = if cv.is_finite() { cv } else { 0.0 };
        self.update_clock();
    }

    pub fn set_time_curve(&mut self, curve: CvCurve) {
        self.time_curve = curve;
        self.update_clock();
    }

    /// Feedback knob in [0, MAX_FEEDBACK].
    pub fn set_feedback(&mut self, feedback: f64) {
        self.feedback = control::clamp_feedback(feedback);
    }

    /// Bipolar feedback CV in [-1, 1]; adds a third of its value to the knob.
    pub fn set_feedback_cv(&mut self, cv: f64) {
        self.feedback_cv = if cv.is_finite() { cv } else { 0.0 };
    }

    /// Feedback gain currently applied.
    pub fn effective_feedback(&self) -> f64 {
        control::clamp_feedback(self.feedback + self.feedback_cv / 3.0)
    }

    /// Time knob plus curved CV, clamped to [0, MAX_TIME].
    pub fn effective_time(&self) -> f64 {
        (self.time + self.time_curve.apply(0.0, self.time_cv)).clamp(0.0, MAX_TIME)
    }

    fn update_clock(&mut self) {
        self.bbd.set_clock_hz(time_to_clock_hz(self.effective_time()));
    }

    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        let fb = self.effective_feedback();
        let input = x + fb * self.dc_block.process(self.last);
        let mut frame = self.up.process(input);
        for s in frame.iter_mut() {
            *s = self.bbd.process(*s);
        }
        let out = self.down.process(&frame);
        self.last = out;
        out
    }

    pub fn process_block(&mut self, buffer: &mut [f64]) {
        for s in buffer.iter_mut() {
            *s = self.process(*s);
        }
    }

    pub fn clock_hz(&self) -> f64 {
        self.bbd.clock_hz()
    }

    pub fn delay_seconds(&self) -> f64 {
        self.bbd.delay_seconds()
    }

    pub fn reset(&mut self) {
        self.bbd.reset();
        self.up.reset();
        self.down.reset();
        self.dc_block.reset();
        self.last = 0.0;
    }

    pub fn is_silent(&self) -> bool {
        self.last == 0.0
            && self.bbd.is_silent()
            && self.up.is_silent()
            && self.down.is_silent()
            && self.dc_block.is_silent()
    }
}
