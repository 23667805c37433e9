//! Allpass building blocks for the polyphase half-band stages.
//!
//! Each section realizes H(z) = (a + z^-1) / (1 + a*z^-1) at the rate it is
//! clocked at. A polyphase path runs at the low rate, so one z^-1 here is two
//! samples at the oversampled rate.
//!
//! Recursion (shared by both orders):
//!   y = a * (x - d2) + d1;  d1 = x;  d2 = y

/// First-order allpass: one coefficient, two memory cells.
#[derive(Clone, Debug)]
pub struct FirstOrderAllpass {
    a0: f64,
    d1: f64,
    d2: f64,
}

impl FirstOrderAllpass {
    pub fn new(a0: f64) -> Self {
        Self {
            a0,
            d1: 0.0,
            d2: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        let y = (x - self.d2) * self.a0 + self.d1;
        self.d1 = x;
        self.d2 = y;
        y
    }

    pub fn reset(&mut self) {
        self.d1 = 0.0;
        self.d2 = 0.0;
    }

    pub fn is_silent(&self) -> bool {
        self.d1 == 0.0 && self.d2 == 0.0
    }

    /// Group delay at DC, in samples of the rate this section runs at.
    pub fn dc_group_delay(&self) -> f64 {
        (1.0 - self.a0) / (1.0 + self.a0)
    }
}

/// Second-order allpass: two chained first-order recursions sharing the
/// middle cell, so three memory cells instead of four.
#[derive(Clone, Debug)]
pub struct SecondOrderAllpass {
    a0: f64,
    a1: f64,
    d1: f64,
    d2: f64,
    d3: f64,
}

impl SecondOrderAllpass {
    pub fn new(a0: f64, a1: f64) -> Self {
        Self {
            a0,
            a1,
            d1: 0.0,
            d2: 0.0,
            d3: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        let y1 = (x - self.d2) * self.a0 + self.d1;
        let y2 = (y1 - self.d3) * self.a1 + self.d2;
        self.d1 = x;
        self.d2 = y1;
        self.d3 = y2;
        y2
    }

    pub fn reset(&mut self) {
        self.d1 = 0.0;
        self.d2 = 0.0;
        self.d3 = 0.0;
    }

    pub fn is_silent(&self) -> bool {
        self.d1 == 0.0 && self.d2 == 0.0 && self.d3 == 0.0
    }

    pub fn dc_group_delay(&self) -> f64 {
        (1.0 - self.a0) / (1.0 + self.a0) + (1.0 - self.a1) / (1.0 + self.a1)
    }
}

/// Coefficients for one polyphase path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCoeffs {
    First(f64),
    Second(f64, f64),
}

/// One polyphase path: either order, chosen once at construction.
#[derive(Clone, Debug)]
pub enum AllpassPath {
    First(FirstOrderAllpass),
    Second(SecondOrderAllpass),
}

impl AllpassPath {
    pub fn new(coeffs: PathCoeffs) -> Self {
        match coeffs {
            PathCoeffs::First(a0) => AllpassPath::First(FirstOrderAllpass::new(a0)),
            PathCoeffs::Second(a0, a1) => AllpassPath::Second(SecondOrderAllpass::new(a0, a1)),
        }
    }

    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        match self {
            AllpassPath::First(ap) => ap.process(x),
            AllpassPath::Second(ap) => ap.process(x),
        }
    }

    pub fn reset(&mut self) {
        match self {
            AllpassPath::First(ap) => ap.reset(),
            AllpassPath::Second(ap) => ap.reset(),
        }
    }

    pub fn is_silent(&self) -> bool {
        match self {
            AllpassPath::First(ap) => ap.is_silent(),
            AllpassPath::Second(ap) => ap.is_silent(),
        }
    }

    pub fn dc_group_delay(&self) -> f64 {
        match self {
            AllpassPath::First(ap) => ap.dc_group_delay(),
            AllpassPath::Second(ap) => ap.dc_group_delay(),
        }
    }

    pub fn order(&self) -> usize {
        match self {
            AllpassPath::First(_) => 1,
            AllpassPath::Second(_) => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// Steady-state RMS gain of a path at normalized frequency `f` (cycles/sample).
    /// The measurement window is a whole number of periods for every test frequency.
    fn steady_gain(path: &mut AllpassPath, f: f64) -> f64 {
        let n = 4000;
        let mut energy_in = 0.0f64;
        let mut energy_out = 0.0f64;
        for i in 0..n {
            let x = (2.0 * PI * f * i as f64).sin();
            let y = path.process(x);
            if i >= n / 2 {
                energy_in += x * x;
                energy_out += y * y;
            }
        }
        (energy_out / energy_in).sqrt()
    }

    #[test]
    fn test_first_order_is_allpass() {
        for &f in &[0.01, 0.1, 0.25, 0.4] {
            let mut path = AllpassPath::new(PathCoeffs::First(0.53976));
            let g = steady_gain(&mut path, f);
            assert!((g - 1.0).abs() < 0.01, "first-order gain at f={f}: {g}");
        }
    }

    #[test]
    fn test_second_order_is_allpass() {
        for &f in &[0.01, 0.1, 0.25, 0.4] {
            let mut path = AllpassPath::new(PathCoeffs::Second(0.283829344898100, 0.834411891201724));
            let g = steady_gain(&mut path, f);
            assert!((g - 1.0).abs() < 0.01, "second-order gain at f={f}: {g}");
        }
    }

    #[test]
    fn test_first_order_recursion() {
        // y0 = a*x0; y1 = a*(x1 - y0) + x0
        let a = 0.5;
        let mut ap = FirstOrderAllpass::new(a);
        assert_eq!(ap.process(1.0), 0.5);
        assert_eq!(ap.process(0.0), a * (0.0 - 0.5) + 1.0);
    }

    #[test]
    fn test_dc_passes_unchanged() {
        let mut path = AllpassPath::new(PathCoeffs::Second(0.0798664262025582, 0.5453236511825826));
        let mut y = 0.0;
        for _ in 0..500 {
            y = path.process(1.0);
        }
        assert!((y - 1.0).abs() < 1e-9, "DC gain should be unity: {y}");
    }

    #[test]
    fn test_reset_clears_state() {
        let mut path = AllpassPath::new(PathCoeffs::First(0.11192));
        path.process(0.7);
        path.process(-0.3);
        assert!(!path.is_silent());
        path.reset();
        assert!(path.is_silent());
        assert_eq!(path.process(0.0), 0.0);
        assert!(path.is_silent());
    }

    #[test]
    fn test_dc_group_delay_matches_impulse_centroid() {
        // Centroid of the impulse response equals the DC group delay.
        let coeffs = PathCoeffs::Second(0.283829344898100, 0.834411891201724);
        let mut path = AllpassPath::new(coeffs);
        let mut sum = 0.0;
        let mut moment = 0.0;
        for n in 0..2000 {
            let h = path.process(if n == 0 { 1.0 } else { 0.0 });
            sum += h;
            moment += n as f64 * h;
        }
        let expected = AllpassPath::new(coeffs).dc_group_delay();
        let centroid = moment / sum;
        assert!((centroid - expected).abs() < 1e-6, "centroid {centroid} vs {expected}");
    }

    #[test]
    fn test_order_follows_coeffs() {
        assert_eq!(AllpassPath::new(PathCoeffs::First(0.1)).order(), 1);
        assert_eq!(AllpassPath::new(PathCoeffs::Second(0.1, 0.2)).order(), 2);
    }
}
