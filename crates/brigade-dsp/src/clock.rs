//! Two time axes: host samples and BBD bucket events.
//!
//! `native_time` counts host samples, `bbd_time` counts host-sample time at
//! which the next bucket event falls. Each host sample the native axis ticks
//! by one and every event with `bbd_time < native_time` is drained, each one
//! advancing `bbd_time` by `step = sample_rate / clock_hz`. Events alternate
//! capture (even) and emit (odd), modelling the two-phase clock of a real
//! BBD.

/// Both axes are reduced by whole multiples of this many host samples.
pub const WRAP_PERIOD: f64 = 1000.0;

/// Upper bound on bucket events per host sample; bounds the catch-up loop.
pub const MAX_EVENTS_PER_SAMPLE: f64 = 16.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BucketPhase {
    /// Sample the input filter into the next bucket.
    Capture,
    /// Shift the oldest bucket out to the output filter.
    Emit,
}

impl BucketPhase {
    fn flipped(self) -> Self {
        match self {
            BucketPhase::Capture => BucketPhase::Emit,
            BucketPhase::Emit => BucketPhase::Capture,
        }
    }
}

/// One bucket event, `delay` host samples after the previous host sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BucketEvent {
    pub phase: BucketPhase,
    /// Fractional offset in [0, 1).
    pub delay: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// `bbd_time >= native_time`: nothing left to do this host sample.
    AwaitingEvent,
    /// `bbd_time < native_time`: at least one event is pending.
    EmittingEvent,
}

#[derive(Clone, Debug)]
pub struct ClockState {
    native_time: f64,
    bbd_time: f64,
    step: f64,
    phase: BucketPhase,
}

impl ClockState {
    pub fn new(step: f64) -> Self {
        let mut clock = Self {
            native_time: 0.0,
            bbd_time: 0.0,
            step: 1.0,
            phase: BucketPhase::Capture,
        };
        clock.set_step(step);
        clock
    }

    /// Host samples per bucket event. Clamped so at most
    /// `MAX_EVENTS_PER_SAMPLE` events fire per host sample; non-finite
    /// values leave the step unchanged.
    pub fn set_step(&mut self, step: f64) {
        if step.is_finite() {
            self.step = step.max(1.0 / MAX_EVENTS_PER_SAMPLE);
        }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Advance the host axis by one sample.
    #[inline]
    pub fn tick(&mut self) {
        self.native_time += 1.0;
    }

    /// Pop the next event falling inside the current host sample, if any.
    #[inline]
    pub fn next_event(&mut self) -> Option<BucketEvent> {
        if self.bbd_time >= self.native_time {
            return None;
        }
        let event = BucketEvent {
            phase: self.phase,
            delay: self.bbd_time - (self.native_time - 1.0),
        };
        self.phase = self.phase.flipped();
        self.bbd_time += self.step;
        Some(event)
    }

    pub fn state(&self) -> SchedulerState {
        if self.bbd_time < self.native_time {
            SchedulerState::EmittingEvent
        } else {
            SchedulerState::AwaitingEvent
        }
    }

    /// Subtract the largest whole number of `WRAP_PERIOD`s both axes have
    /// passed. Returns the amount removed; the difference between the axes
    /// is unchanged.
    #[inline]
    pub fn wrap(&mut self) -> f64 {
        let periods = (self.native_time.min(self.bbd_time) / WRAP_PERIOD).floor();
        if periods < 1.0 {
            return 0.0;
        }
        let amount = periods * WRAP_PERIOD;
        self.native_time -= amount;
        self.bbd_time -= amount;
        amount
    }

    pub fn phase(&self) -> BucketPhase {
        self.phase
    }

    pub fn native_time(&self) -> f64 {
        self.native_time
    }

    pub fn bbd_time(&self) -> f64 {
        self.bbd_time
    }

    pub fn reset(&mut self) {
        self.native_time = 0.0;
        self.bbd_time = 0.0;
        self.phase = BucketPhase::Capture;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(clock: &mut ClockState) -> Vec<BucketEvent> {
        let mut events = Vec::new();
        while let Some(e) = clock.next_event() {
            events.push(e);
        }
        events
    }

    #[test]
    fn test_events_alternate_phase() {
        let mut clock = ClockState::new(0.25);
        clock.tick();
        let events = drain(&mut clock);
        assert_eq!(events.len(), 4);
        let phases: Vec<BucketPhase> = events.iter().map(|e| e.phase).collect();
        assert_eq!(
            phases,
            vec![
                BucketPhase::Capture,
                BucketPhase::Emit,
                BucketPhase::Capture,
                BucketPhase::Emit
            ]
        );
        let delays: Vec<f64> = events.iter().map(|e| e.delay).collect();
        assert_eq!(delays, vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_slow_clock_skips_host_samples() {
        let mut clock = ClockState::new(2.5);
        let counts: Vec<usize> = (0..5)
            .map(|_| {
                clock.tick();
                drain(&mut clock).len()
            })
            .collect();
        // events at t = 0, 2.5, 5.0 fall in host samples 1, 3 and 6
        assert_eq!(counts, vec![1, 0, 1, 0, 0]);
        clock.tick();
        assert_eq!(clock.state(), SchedulerState::EmittingEvent);
        assert_eq!(drain(&mut clock).len(), 1);
        assert_eq!(clock.state(), SchedulerState::AwaitingEvent);
    }

    #[test]
    fn test_delay_stays_in_unit_interval() {
        let mut clock = ClockState::new(0.3719);
        for _ in 0..10_000 {
            clock.tick();
            for e in drain(&mut clock) {
                assert!((0.0..1.0).contains(&e.delay), "delay {}", e.delay);
            }
            clock.wrap();
        }
    }

    #[test]
    fn test_step_clamped_to_event_budget() {
        let mut clock = ClockState::new(1e-6);
        assert_eq!(clock.step(), 1.0 / MAX_EVENTS_PER_SAMPLE);
        clock.tick();
        assert_eq!(drain(&mut clock).len(), MAX_EVENTS_PER_SAMPLE as usize);
        clock.set_step(f64::NAN);
        assert_eq!(clock.step(), 1.0 / MAX_EVENTS_PER_SAMPLE);
    }

    #[test]
    fn test_wrap_preserves_offset() {
        let mut clock = ClockState::new(0.7);
        for _ in 0..2_345 {
            clock.tick();
            drain(&mut clock);
        }
        let diff = clock.bbd_time() - clock.native_time();
        let removed = clock.wrap();
        assert_eq!(removed, 2_000.0);
        assert!(clock.native_time() < WRAP_PERIOD);
        assert!((clock.bbd_time() - clock.native_time() - diff).abs() < 1e-9);
        assert_eq!(clock.wrap(), 0.0);
    }

    #[test]
    fn test_wrap_waits_for_slower_axis() {
        // With a very slow clock bbd_time runs far ahead; nothing wraps until
        // native_time also passes a period.
        let mut clock = ClockState::new(4_410.0);
        clock.tick();
        drain(&mut clock);
        assert_eq!(clock.wrap(), 0.0);
        assert_eq!(clock.bbd_time(), 4_410.0);
    }

    #[test]
    fn test_reset_restarts_on_capture() {
        let mut clock = ClockState::new(0.5);
        clock.tick();
        clock.next_event();
        assert_eq!(clock.phase(), BucketPhase::Emit);
        clock.reset();
        assert_eq!(clock.phase(), BucketPhase::Capture);
        assert_eq!(clock.native_time(), 0.0);
        assert_eq!(clock.bbd_time(), 0.0);
    }
}
