//! Bucket-brigade delay line with its companding filters.
//!
//! The BBD clock runs on its own time axis (`clock`), independent of the host
//! sample rate. Each host sample the scheduler catches the clock up to the
//! host: capture events sample the input filter into the delay register at
//! their exact fractional time, emit events step the output sample-and-hold
//! and kick the reconstruction filter. Both filters also advance once per
//! host sample.

use crate::clock::{BucketPhase, ClockState, SchedulerState};
use crate::control;
use crate::delay_register::DelayRegister;
use crate::error::{BankRole, DesignError};
use crate::pole_residue::{InputFilter, OutputFilter, PoleResidueDesign};

pub use crate::clock::MAX_EVENTS_PER_SAMPLE;

/// Slowest clock the scheduler accepts.
pub const MIN_CLOCK_HZ: f64 = 10.0;

/// Clock a new line starts at.
pub const DEFAULT_CLOCK_HZ: f64 = 14_000.0;

/// Stage count and filter designs of one BBD.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BbdConfig {
    pub stages: usize,
    pub input: PoleResidueDesign,
    pub output: PoleResidueDesign,
}

impl BbdConfig {
    /// Juno-60 filters around a chip with `stages` buckets.
    pub fn juno60(stages: usize) -> Self {
        Self {
            stages,
            input: PoleResidueDesign::juno60_input(),
            output: PoleResidueDesign::juno60_output(),
        }
    }

    pub fn validate(&self) -> Result<(), DesignError> {
        if self.stages == 0 {
            return Err(DesignError::ZeroStages);
        }
        self.input.validate(BankRole::Input)?;
        self.output.validate(BankRole::Output)?;
        Ok(())
    }
}

impl Default for BbdConfig {
    fn default() -> Self {
        Self::juno60(1024)
    }
}

#[derive(Clone, Debug)]
pub struct Bbd {
    clock: ClockState,
    input: InputFilter,
    output: OutputFilter,
    register: DelayRegister,
    sample_rate: f64,
    clock_hz: f64,
}

fn checked_sample_rate(sample_rate: f64) -> Result<f64, DesignError> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(sample_rate)
    } else {
        Err(DesignError::InvalidSampleRate(sample_rate))
    }
}

impl Bbd {
    /// Build a line. Never fails: a bad design is clamped by the filter
    /// banks and zero stages become one. Use [`Bbd::try_new`] to reject
    /// such configs instead.
    pub fn new(config: &BbdConfig, sample_rate: f64) -> Self {
        let sample_rate = checked_sample_rate(sample_rate).unwrap_or(48_000.0);
        let clock_hz = control::clamp_clock_hz(DEFAULT_CLOCK_HZ, sample_rate);
        log::debug!(
            "BBD: {} stages, input order {}, output order {}, {sample_rate} Hz",
            config.stages,
            config.input.order(),
            config.output.order()
        );
        Self {
            clock: ClockState::new(sample_rate / clock_hz),
            input: InputFilter::new(&config.input, sample_rate),
            output: OutputFilter::new(&config.output, sample_rate),
            register: DelayRegister::new(config.stages),
            sample_rate,
            clock_hz,
        }
    }

    pub fn try_new(config: &BbdConfig, sample_rate: f64) -> Result<Self, DesignError> {
        config.validate()?;
        let sample_rate = checked_sample_rate(sample_rate)?;
        Ok(Self::new(config, sample_rate))
    }

    /// Process one host sample.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        self.clock.tick();
        while let Some(event) = self.clock.next_event() {
            match event.phase {
                BucketPhase::Capture => {
                    let v = self.input.capture(event.delay);
                    self.register.write(v);
                }
                BucketPhase::Emit => {
                    let delta = self.register.read_delta();
                    self.output.scatter(event.delay, delta);
                }
            }
        }
        self.input.advance_native(input);
        self.output.advance_native();
        let y = self.output.output(self.register.last());
        self.clock.wrap();
        y
    }

    /// Process a block in place.
    pub fn process_block(&mut self, buffer: &mut [f64]) {
        for s in buffer.iter_mut() {
            *s = self.process(*s);
        }
    }

    /// Set the bucket-event rate. Clamped to
    /// [`MIN_CLOCK_HZ`, `MAX_EVENTS_PER_SAMPLE` * sample rate].
    ///
    /// The new period starts after the event already scheduled, so a jump
    /// from a very slow clock holds the line for up to one old period
    /// (0.1 s at `MIN_CLOCK_HZ`) before it follows the new rate.
    #[inline]
    pub fn set_clock_hz(&mut self, clock_hz: f64) {
        self.clock_hz = control::clamp_clock_hz(clock_hz, self.sample_rate);
        self.clock.set_step(self.sample_rate / self.clock_hz);
    }

    pub fn clock_hz(&self) -> f64 {
        self.clock_hz
    }

    /// Re-discretize both filter banks and the clock step for a new host
    /// rate. Signal state is kept. Invalid rates are ignored with a warning.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        let Ok(sample_rate) = checked_sample_rate(sample_rate) else {
            log::warn!("ignoring invalid sample rate {sample_rate}");
            return;
        };
        self.sample_rate = sample_rate;
        self.input.set_sample_rate(sample_rate);
        self.output.set_sample_rate(sample_rate);
        // re-clamp: the upper clock bound scales with the rate
        self.set_clock_hz(self.clock_hz);
        log::debug!("BBD reconfigured for {sample_rate} Hz, clock {} Hz", self.clock_hz);
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn stages(&self) -> usize {
        self.register.capacity()
    }

    /// Nominal delay: one capture and one emit per bucket.
    pub fn delay_seconds(&self) -> f64 {
        2.0 * self.stages() as f64 / self.clock_hz
    }

    /// Clock frequency that gives a nominal delay of `seconds`.
    pub fn clock_for_delay(&self, seconds: f64) -> f64 {
        2.0 * self.stages() as f64 / seconds
    }

    pub fn state(&self) -> SchedulerState {
        self.clock.state()
    }

    pub fn reset(&mut self) {
        self.clock.reset();
        self.input.reset();
        self.output.reset();
        self.register.reset();
    }

    pub fn is_silent(&self) -> bool {
        self.input.is_silent() && self.output.is_silent() && self.register.is_silent()
    }
}
