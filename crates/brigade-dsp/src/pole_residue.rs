//! Partial-fraction model of the BBD's analog input and output filters.
//!
//! A design is H(s) = sum_k r_k / (s - p_k) with real poles listed once and
//! complex-conjugate pairs listed by their positive-imaginary member. The
//! impulse response is then a sum of decaying exponentials and damped
//! sinusoids, which can be evaluated at any fractional time between host
//! samples. That is what lets bucket events land off the host grid.
//!
//! Both banks are step-invariant: their sections are driven by *changes* in
//! a piecewise-constant signal, and a constant DC term carries the held
//! level. For a section with g = r/p and z = exp(p*Ts):
//!
//!   input:  x[n] = z*x[n-1] + (u[n] - u[n-1])
//!           capture(d) = H(0)*u[n-1] + sum g * z^d * x       (d in [0, 1))
//!   output: x[n] = z*x[n-1] + sum_events g * z^(1-d) * delta
//!           output     = H(0)*held + sum x
//!
//! Complex sections contribute 2*Re(.) for the implied conjugate partner.
//! With constant input both banks settle exactly on `H(0) * input`,
//! independent of where the events fall.

use num_complex::Complex64;

use crate::error::{BankRole, DesignError};
use crate::tables;
use crate::weight_lut::WeightLut;

/// Slowest decay a clamped pole is given, in rad/s.
pub const MIN_POLE_DECAY: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RealPole {
    pub pole: f64,
    pub residue: f64,
}

/// One member of a conjugate pair; the partner is implied.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComplexPole {
    pub pole_re: f64,
    pub pole_im: f64,
    pub residue_re: f64,
    pub residue_im: f64,
}

impl ComplexPole {
    pub fn pole(&self) -> Complex64 {
        Complex64::new(self.pole_re, self.pole_im)
    }

    pub fn residue(&self) -> Complex64 {
        Complex64::new(self.residue_re, self.residue_im)
    }
}

/// Continuous-time (Laplace domain, rad/s) pole/residue description of one filter.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoleResidueDesign {
    pub real: Vec<RealPole>,
    pub complex: Vec<ComplexPole>,
}

impl PoleResidueDesign {
    fn from_tables(real: &[(f64, f64)], complex: &[((f64, f64), (f64, f64))]) -> Self {
        Self {
            real: real
                .iter()
                .map(|&(pole, residue)| RealPole { pole, residue })
                .collect(),
            complex: complex
                .iter()
                .map(|&((pole_re, pole_im), (residue_re, residue_im))| ComplexPole {
                    pole_re,
                    pole_im,
                    residue_re,
                    residue_im,
                })
                .collect(),
        }
    }

    /// Juno-60 anti-alias (input) filter fit.
    pub fn juno60_input() -> Self {
        Self::from_tables(&tables::JUNO60_INPUT_REAL, &tables::JUNO60_INPUT_COMPLEX)
    }

    /// Juno-60 reconstruction (output) filter fit.
    pub fn juno60_output() -> Self {
        Self::from_tables(&tables::JUNO60_OUTPUT_REAL, &tables::JUNO60_OUTPUT_COMPLEX)
    }

    /// Filter order: real poles plus both members of every pair.
    pub fn order(&self) -> usize {
        self.real.len() + 2 * self.complex.len()
    }

    /// H(0) = -sum r/p.
    pub fn dc_gain(&self) -> f64 {
        let real: f64 = self.real.iter().map(|s| s.residue / s.pole).sum();
        let complex: f64 = self
            .complex
            .iter()
            .map(|s| 2.0 * (s.residue() / s.pole()).re)
            .sum();
        -(real + complex)
    }

    /// H(j*2*pi*f).
    pub fn response(&self, freq_hz: f64) -> Complex64 {
        let s = Complex64::new(0.0, 2.0 * std::f64::consts::PI * freq_hz);
        let mut h = Complex64::new(0.0, 0.0);
        for sec in &self.real {
            h += sec.residue / (s - sec.pole);
        }
        for sec in &self.complex {
            let (p, r) = (sec.pole(), sec.residue());
            h += r / (s - p) + r.conj() / (s - p.conj());
        }
        h
    }

    pub fn validate(&self, bank: BankRole) -> Result<(), DesignError> {
        if self.real.is_empty() && self.complex.is_empty() {
            return Err(DesignError::EmptyBank(bank));
        }
        let real_parts = self
            .real
            .iter()
            .map(|s| s.pole)
            .chain(self.complex.iter().map(|s| s.pole_re));
        for (index, real_part) in real_parts.enumerate() {
            if real_part.is_finite() && real_part < 0.0 {
                continue;
            }
            return Err(DesignError::UnstablePole {
                bank,
                index,
                real_part,
            });
        }
        Ok(())
    }
}

/// Identifies one weight function of a bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeightFn {
    /// The single weight of real section k.
    Real(usize),
    /// Real part of complex section k's weight.
    B0(usize),
    /// Imaginary part of complex section k's weight.
    B1(usize),
}

#[derive(Clone, Debug)]
struct RealSection {
    pole: f64,
    gain: f64,
    /// p * Ts
    pt: f64,
    z: f64,
    state: f64,
}

#[derive(Clone, Debug)]
struct ComplexSection {
    pole: Complex64,
    gain: Complex64,
    /// p * Ts, kept unwrapped so fractional powers of z stay on the right branch.
    pt: Complex64,
    z: Complex64,
    state: Complex64,
}

/// Discretized sections of one design, their recursive state, and the
/// weight lookup tables for the current sample rate.
#[derive(Clone, Debug)]
pub struct FilterBank {
    role: BankRole,
    real: Vec<RealSection>,
    complex: Vec<ComplexSection>,
    lut: WeightLut,
    dc_gain: f64,
    sample_rate: f64,
}

/// Exponent applied to z for an event at fractional `delay`: the input side
/// looks forward from the last host sample, the output side forward to the next.
#[inline]
fn exponent(role: BankRole, delay: f64) -> f64 {
    match role {
        BankRole::Input => delay,
        BankRole::Output => 1.0 - delay,
    }
}

/// g * z^e
fn real_weight(s: &RealSection, e: f64) -> f64 {
    s.gain * (s.pt * e).exp()
}

/// g * z^e = |g| * exp(Re(pTs)*e) * exp(i*(arg g + Im(pTs)*e))
fn complex_weight(s: &ComplexSection, e: f64) -> Complex64 {
    let mag = s.gain.norm() * (s.pt.re * e).exp();
    Complex64::from_polar(mag, s.gain.arg() + s.pt.im * e)
}

/// Growing poles are mirrored into the left half-plane, which keeps |p| and
/// so the section gain |r/p|. Poles on the axis or non-finite get the
/// slowest allowed decay.
fn clamp_pole(re: f64, role: BankRole, index: usize) -> f64 {
    if re < 0.0 && re.is_finite() {
        re
    } else if re > 0.0 && re.is_finite() {
        log::warn!("{role} bank pole {index} grows (re = {re}), reflecting to -{re}");
        -re
    } else {
        log::warn!("{role} bank pole {index} does not decay (re = {re}), clamping to -{MIN_POLE_DECAY}");
        -MIN_POLE_DECAY
    }
}

impl FilterBank {
    /// Build and discretize a bank. Never fails: non-decaying poles are
    /// logged and clamped, and an invalid sample rate falls back to 48 kHz.
    pub fn new(design: &PoleResidueDesign, role: BankRole, sample_rate: f64) -> Self {
        let real: Vec<RealSection> = design
            .real
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let pole = clamp_pole(s.pole, role, i);
                RealSection {
                    pole,
                    gain: s.residue / pole,
                    pt: 0.0,
                    z: 0.0,
                    state: 0.0,
                }
            })
            .collect();
        let complex: Vec<ComplexSection> = design
            .complex
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let pole = Complex64::new(clamp_pole(s.pole_re, role, design.real.len() + i), s.pole_im);
                ComplexSection {
                    pole,
                    gain: s.residue() / pole,
                    pt: Complex64::new(0.0, 0.0),
                    z: Complex64::new(0.0, 0.0),
                    state: Complex64::new(0.0, 0.0),
                }
            })
            .collect();

        let real_sum: f64 = real.iter().map(|s| s.gain).sum();
        let complex_sum: f64 = complex.iter().map(|s| 2.0 * s.gain.re).sum();

        let mut bank = Self {
            role,
            lut: WeightLut::new(real.len(), complex.len()),
            real,
            complex,
            dc_gain: -(real_sum + complex_sum),
            sample_rate: 0.0,
        };
        bank.set_sample_rate(sample_rate);
        log::debug!(
            "{role} filter bank: {} real + {} complex sections, H(0) = {:.4}",
            bank.real.len(),
            bank.complex.len(),
            bank.dc_gain
        );
        bank
    }

    /// Re-discretize every pole and refill the weight tables in place.
    /// Recursive state is kept.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        let sample_rate = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            log::warn!("invalid sample rate {sample_rate}, using 48000");
            48_000.0
        };
        self.sample_rate = sample_rate;
        let ts = 1.0 / sample_rate;

        for s in &mut self.real {
            s.pt = s.pole * ts;
            s.z = s.pt.exp();
        }
        for s in &mut self.complex {
            s.pt = s.pole * ts;
            s.z = s.pt.exp();
        }
        let role = self.role;
        for (k, sec) in self.real.iter().enumerate() {
            self.lut.fill_real(k, |d| real_weight(sec, exponent(role, d)));
        }
        for (k, sec) in self.complex.iter().enumerate() {
            self.lut.fill_complex(k, |d| complex_weight(sec, exponent(role, d)));
        }
        log::debug!("{} filter bank discretized at {sample_rate} Hz", self.role);
    }

    /// Closed-form weight at `delay` in [0, 1].
    pub fn weight_exact(&self, func: WeightFn, delay: f64) -> f64 {
        let delay = delay.clamp(0.0, 1.0);
        match func {
            WeightFn::Real(k) => real_weight(&self.real[k], exponent(self.role, delay)),
            WeightFn::B0(k) => complex_weight(&self.complex[k], exponent(self.role, delay)).re,
            WeightFn::B1(k) => complex_weight(&self.complex[k], exponent(self.role, delay)).im,
        }
    }

    /// Table-interpolated weight at `delay`, clamped to [0, 1].
    pub fn weight(&self, func: WeightFn, delay: f64) -> f64 {
        match func {
            WeightFn::Real(k) => self.lut.real(k, delay),
            WeightFn::B0(k) => self.lut.complex(k, delay).re,
            WeightFn::B1(k) => self.lut.complex(k, delay).im,
        }
    }

    /// Every weight function of this bank.
    pub fn weight_fns(&self) -> impl Iterator<Item = WeightFn> + '_ {
        (0..self.real.len())
            .map(WeightFn::Real)
            .chain((0..self.complex.len()).flat_map(|k| [WeightFn::B0(k), WeightFn::B1(k)]))
    }

    pub fn role(&self) -> BankRole {
        self.role
    }

    pub fn dc_gain(&self) -> f64 {
        self.dc_gain
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn n_real(&self) -> usize {
        self.real.len()
    }

    pub fn n_complex(&self) -> usize {
        self.complex.len()
    }

    /// Largest discretized pole magnitude; below 1 for a stable bank.
    pub fn max_pole_magnitude(&self) -> f64 {
        self.real
            .iter()
            .map(|s| s.z.abs())
            .chain(self.complex.iter().map(|s| s.z.norm()))
            .fold(0.0, f64::max)
    }

    pub fn reset(&mut self) {
        for s in &mut self.real {
            s.state = 0.0;
        }
        for s in &mut self.complex {
            s.state = Complex64::new(0.0, 0.0);
        }
    }

    pub fn is_silent(&self) -> bool {
        self.real.iter().all(|s| s.state == 0.0)
            && self.complex.iter().all(|s| s.state.re == 0.0 && s.state.im == 0.0)
    }

    /// Sum of section states, conjugate partners included.
    #[inline]
    fn state_sum(&self) -> f64 {
        let real: f64 = self.real.iter().map(|s| s.state).sum();
        let complex: f64 = self.complex.iter().map(|s| s.state.re).sum();
        real + 2.0 * complex
    }
}

/// Input side: the anti-alias filter, sampled at capture events.
#[derive(Clone, Debug)]
pub struct InputFilter {
    bank: FilterBank,
    held: f64,
}

impl InputFilter {
    pub fn new(design: &PoleResidueDesign, sample_rate: f64) -> Self {
        Self {
            bank: FilterBank::new(design, BankRole::Input, sample_rate),
            held: 0.0,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.bank.set_sample_rate(sample_rate);
    }

    /// Per-host-sample update with the new input sample.
    #[inline]
    pub fn advance_native(&mut self, input: f64) {
        let step = input - self.held;
        self.held = input;
        for s in &mut self.bank.real {
            s.state = s.z * s.state + step;
        }
        for s in &mut self.bank.complex {
            s.state = s.z * s.state + step;
        }
    }

    /// Filter output `delay` host samples after the last `advance_native`.
    #[inline]
    pub fn capture(&self, delay: f64) -> f64 {
        let mut v = self.bank.dc_gain * self.held;
        for (k, s) in self.bank.real.iter().enumerate() {
            v += self.bank.lut.real(k, delay) * s.state;
        }
        for (k, s) in self.bank.complex.iter().enumerate() {
            let w = self.bank.lut.complex(k, delay);
            v += 2.0 * (w.re * s.state.re - w.im * s.state.im);
        }
        v
    }

    pub fn bank(&self) -> &FilterBank {
        &self.bank
    }

    pub fn reset(&mut self) {
        self.bank.reset();
        self.held = 0.0;
    }

    pub fn is_silent(&self) -> bool {
        self.bank.is_silent() && self.held == 0.0
    }
}

/// Output side: the reconstruction filter, kicked at emit events.
#[derive(Clone, Debug)]
pub struct OutputFilter {
    bank: FilterBank,
    pending_real: Vec<f64>,
    pending_complex: Vec<Complex64>,
}

impl OutputFilter {
    pub fn new(design: &PoleResidueDesign, sample_rate: f64) -> Self {
        let bank = FilterBank::new(design, BankRole::Output, sample_rate);
        Self {
            pending_real: vec![0.0; bank.n_real()],
            pending_complex: vec![Complex64::new(0.0, 0.0); bank.n_complex()],
            bank,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.bank.set_sample_rate(sample_rate);
    }

    /// Spread a held-output step at fractional `delay` into the next update.
    #[inline]
    pub fn scatter(&mut self, delay: f64, delta: f64) {
        for (k, acc) in self.pending_real.iter_mut().enumerate() {
            *acc += self.bank.lut.real(k, delay) * delta;
        }
        for (k, acc) in self.pending_complex.iter_mut().enumerate() {
            *acc += self.bank.lut.complex(k, delay) * delta;
        }
    }

    /// Per-host-sample update; consumes everything scattered since the last call.
    #[inline]
    pub fn advance_native(&mut self) {
        for (s, acc) in self.bank.real.iter_mut().zip(self.pending_real.iter_mut()) {
            s.state = s.z * s.state + *acc;
            *acc = 0.0;
        }
        for (s, acc) in self.bank.complex.iter_mut().zip(self.pending_complex.iter_mut()) {
            s.state = s.z * s.state + *acc;
            *acc = Complex64::new(0.0, 0.0);
        }
    }

    /// Current output for a sample-and-hold presenting `held`.
    #[inline]
    pub fn output(&self, held: f64) -> f64 {
        self.bank.dc_gain * held + self.bank.state_sum()
    }

    pub fn bank(&self) -> &FilterBank {
        &self.bank
    }

    pub fn reset(&mut self) {
        self.bank.reset();
        self.pending_real.fill(0.0);
        self.pending_complex.fill(Complex64::new(0.0, 0.0));
    }

    pub fn is_silent(&self) -> bool {
        self.bank.is_silent()
            && self.pending_real.iter().all(|&v| v == 0.0)
            && self.pending_complex.iter().all(|v| v.re == 0.0 && v.im == 0.0)
    }
}
