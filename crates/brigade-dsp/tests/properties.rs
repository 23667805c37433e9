//! Cross-module properties of the multirate engine, the filter banks and
//! the BBD scheduler. Random inputs are drawn from a seeded ChaCha stream so
//! every run sees the same signals.

use std::f64::consts::PI;

use brigade_dsp::bbd::{Bbd, BbdConfig};
use brigade_dsp::control::{CvCurve, MAX_FEEDBACK};
use brigade_dsp::echo::{BbdEcho, EchoConfig};
use brigade_dsp::error::BankRole;
use brigade_dsp::multirate::{Decimator, Upsampler};
use brigade_dsp::pole_residue::{FilterBank, PoleResidueDesign};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const SR: f64 = 44_100.0;

fn noise(rng: &mut ChaCha8Rng, len: usize) -> Vec<f64> {
    (0..len).map(|_| rng.random_range(-1.0..1.0)).collect()
}

/// Impulse response of an `Upsampler<N>` -> `Decimator<N>` round trip,
/// together with the analytic DC group delay of the pair.
fn round_trip_impulse<const N: usize>(len: usize) -> (Vec<f64>, f64) {
    let mut up = Upsampler::<N>::new();
    let mut down = Decimator::<N>::new();
    let delay = up.group_delay() + down.group_delay();
    let h = (0..len)
        .map(|n| {
            let frame = up.process(if n == 0 { 1.0 } else { 0.0 });
            down.process(&frame)
        })
        .collect();
    (h, delay)
}

fn check_round_trip(factor: usize, h: &[f64], delay: f64) {
    let sum: f64 = h.iter().sum();
    let centroid = h.iter().enumerate().map(|(n, &v)| n as f64 * v).sum::<f64>() / sum;
    let tail = h[h.len() - 64..].iter().fold(0.0f64, |m, v| m.max(v.abs()));

    assert!((sum - 1.0).abs() < 1e-6, "{factor}x: impulse sums to {sum}");
    assert!(tail < 1e-9, "{factor}x: tail has not decayed ({tail})");
    assert!(
        (centroid - delay).abs() < 1e-6,
        "{factor}x: centroid {centroid} vs group delay {delay}"
    );
}

#[test]
fn test_round_trip_impulse_is_a_unit_delay_kernel() {
    let len = 512;
    let mut delays = Vec::new();

    let (h, d) = round_trip_impulse::<2>(len);
    check_round_trip(2, &h, d);
    delays.push(d);
    let (h, d) = round_trip_impulse::<4>(len);
    check_round_trip(4, &h, d);
    delays.push(d);
    let (h, d) = round_trip_impulse::<8>(len);
    check_round_trip(8, &h, d);
    delays.push(d);
    let (h, d) = round_trip_impulse::<16>(len);
    check_round_trip(16, &h, d);
    delays.push(d);
    let (h, d) = round_trip_impulse::<32>(len);
    check_round_trip(32, &h, d);
    delays.push(d);

    // Each extra octave adds a shorter slice of delay.
    for pair in delays.windows(2) {
        assert!(pair[1] > pair[0], "delays not increasing: {delays:?}");
    }
    assert!(delays[4] - delays[3] < delays[1] - delays[0]);
}

#[test]
fn test_reset_matches_fresh_instance() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let warmup = noise(&mut rng, 4096);
    let probe = noise(&mut rng, 4096);
    let config = BbdConfig::juno60(128);

    let mut used = Bbd::new(&config, SR);
    used.set_clock_hz(9_000.0);
    for &x in &warmup {
        used.process(x);
    }
    used.reset();
    assert!(used.is_silent());

    let mut fresh = Bbd::new(&config, SR);
    fresh.set_clock_hz(9_000.0);
    for (n, &x) in probe.iter().enumerate() {
        let (a, b) = (used.process(x), fresh.process(x));
        assert_eq!(a, b, "sample {n}: reset {a} vs fresh {b}");
    }

    let echo_config = EchoConfig {
        stages: 64,
        ..EchoConfig::default()
    };
    let mut used = BbdEcho::new(&echo_config, SR);
    let mut fresh = BbdEcho::new(&echo_config, SR);
    used.set_feedback(0.6);
    fresh.set_feedback(0.6);
    for &x in &warmup {
        used.process(x);
    }
    used.reset();
    for (n, &x) in probe.iter().enumerate() {
        let (a, b) = (used.process(x), fresh.process(x));
        assert_eq!(a, b, "echo sample {n}: reset {a} vs fresh {b}");
    }
}

#[test]
fn test_dc_steady_state_at_any_clock() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let config = BbdConfig::juno60(16);
    let gain = config.input.dc_gain() * config.output.dc_gain();

    let mut clocks = vec![20.0, 20_000.0];
    // log-uniform between the two ends
    clocks.extend((0..6).map(|_| 20.0 * 1000f64.powf(rng.random_range(0.0..1.0))));

    for clock in clocks {
        let level = rng.random_range(-1.0..1.0);
        let mut bbd = Bbd::new(&config, SR);
        bbd.set_clock_hz(clock);
        let settle = ((bbd.delay_seconds() + 2.0 / clock) * SR) as usize + SR as usize / 10;
        let mut y = 0.0;
        for _ in 0..settle {
            y = bbd.process(level);
        }
        let expected = level * gain;
        assert!(
            (y - expected).abs() < 1e-6,
            "clock {clock:.1} Hz: settled at {y}, expected {expected}"
        );
    }
}

#[test]
fn test_slower_clock_means_longer_delay() {
    let config = BbdConfig::juno60(64);
    let half = 0.5 * config.input.dc_gain() * config.output.dc_gain();
    let mut lags = Vec::new();
    for clock in [2_500.0, 5_000.0, 10_000.0, 20_000.0, 40_000.0] {
        let mut bbd = Bbd::new(&config, SR);
        bbd.set_clock_hz(clock);
        let limit = 4 * (bbd.delay_seconds() * SR) as usize + 256;
        let lag = (0..limit).find(|_| bbd.process(1.0) >= half);
        match lag {
            Some(lag) => lags.push(lag),
            None => panic!("clock {clock}: step never crossed half scale"),
        }
    }
    for pair in lags.windows(2) {
        assert!(pair[0] > pair[1], "lags not decreasing with clock: {lags:?}");
    }
}

#[test]
fn test_echo_feedback_sweep_stays_bounded() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut echo = BbdEcho::new(&EchoConfig::default(), SR);
    echo.set_time_curve(CvCurve::Rectify);

    let len = (10.0 * SR) as usize;
    let mut peak = 0.0f64;
    for n in 0..len {
        let secs = n as f64 / SR;
        if n % 64 == 0 {
            // feedback ramps to its cap over the first 5 s, then holds
            echo.set_feedback((secs / 5.0).min(1.0) * MAX_FEEDBACK);
            echo.set_time(0.5 + 0.5 * (2.0 * PI * 0.3 * secs).sin());
            echo.set_time_cv((2.0 * PI * 0.7 * secs).sin());
        }
        let y = echo.process(0.5 * rng.random_range(-1.0..1.0) + 0.5);
        assert!(y.is_finite(), "non-finite output at sample {n}");
        peak = peak.max(y.abs());
    }
    assert!(echo.effective_feedback() <= MAX_FEEDBACK);
    assert!(peak < 10.0, "output grew to {peak}");
}

#[test]
fn test_lut_weights_track_closed_form() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    for sample_rate in [22_050.0, 44_100.0, 96_000.0] {
        for (design, role) in [
            (PoleResidueDesign::juno60_input(), BankRole::Input),
            (PoleResidueDesign::juno60_output(), BankRole::Output),
        ] {
            let bank = FilterBank::new(&design, role, sample_rate);
            let fns: Vec<_> = bank.weight_fns().collect();
            let mut worst = 0.0f64;
            for _ in 0..10_000 {
                let d = rng.random_range(0.0..1.0);
                for &f in &fns {
                    worst = worst.max((bank.weight(f, d) - bank.weight_exact(f, d)).abs());
                }
            }
            assert!(worst < 1e-4, "{role} bank at {sample_rate} Hz: worst error {worst}");
        }
    }
}
