/// Precomputed weight functions over the unit fractional delay.
///
/// One table per real section and one per complex section (the complex table
/// stores B0 in `re` and B1 in `im`). Tables are sized once for a bank and
/// refilled in place whenever the sample rate changes; reads never allocate.
use num_complex::Complex64;

use crate::tables::LUT_SIZE;

const INTERVALS: f64 = (LUT_SIZE - 1) as f64;

#[derive(Clone, Debug)]
pub struct WeightLut {
    real: Vec<[f64; LUT_SIZE]>,
    complex: Vec<[Complex64; LUT_SIZE]>,
}

/// Split a delay into a table index and interpolation fraction.
#[inline]
fn locate(delay: f64) -> (usize, f64) {
    // NaN also lands on 0.0 here
    let pos = if delay > 0.0 { delay.min(1.0) * INTERVALS } else { 0.0 };
    let idx = (pos as usize).min(LUT_SIZE - 2);
    (idx, pos - idx as f64)
}

impl WeightLut {
    pub fn new(n_real: usize, n_complex: usize) -> Self {
        Self {
            real: vec![[0.0; LUT_SIZE]; n_real],
            complex: vec![[Complex64::new(0.0, 0.0); LUT_SIZE]; n_complex],
        }
    }

    /// Sample `f` at `LUT_SIZE` uniform points over [0, 1].
    pub fn fill_real(&mut self, section: usize, f: impl Fn(f64) -> f64) {
        for (i, slot) in self.real[section].iter_mut().enumerate() {
            *slot = f(i as f64 / INTERVALS);
        }
    }

    pub fn fill_complex(&mut self, section: usize, f: impl Fn(f64) -> Complex64) {
        for (i, slot) in self.complex[section].iter_mut().enumerate() {
            *slot = f(i as f64 / INTERVALS);
        }
    }

    /// Interpolated real-section weight. `delay` is clamped to [0, 1].
    #[inline]
    pub fn real(&self, section: usize, delay: f64) -> f64 {
        let (i, frac) = locate(delay);
        let t = &self.real[section];
        t[i] + (t[i + 1] - t[i]) * frac
    }

    /// Interpolated complex-section weight, `B0 + i*B1`.
    #[inline]
    pub fn complex(&self, section: usize, delay: f64) -> Complex64 {
        let (i, frac) = locate(delay);
        let t = &self.complex[section];
        t[i] + (t[i + 1] - t[i]) * frac
    }

    pub fn n_real(&self) -> usize {
        self.real.len()
    }

    pub fn n_complex(&self) -> usize {
        self.complex.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_points_are_exact() {
        let mut lut = WeightLut::new(1, 1);
        lut.fill_real(0, |d| d * d);
        lut.fill_complex(0, |d| Complex64::new(d, -d));
        for i in [0, 1, 128, 255, 256] {
            let d = i as f64 / INTERVALS;
            assert!((lut.real(0, d) - d * d).abs() < 1e-15, "grid {i}");
            assert!((lut.complex(0, d) - Complex64::new(d, -d)).norm() < 1e-15);
        }
    }

    #[test]
    fn test_linear_function_interpolates_exactly() {
        let mut lut = WeightLut::new(1, 0);
        lut.fill_real(0, |d| 3.0 * d - 1.0);
        for d in [0.0013, 0.25, 0.5001, 0.9999] {
            assert!((lut.real(0, d) - (3.0 * d - 1.0)).abs() < 1e-12, "d={d}");
        }
    }

    #[test]
    fn test_out_of_range_delay_clamps() {
        let mut lut = WeightLut::new(1, 0);
        lut.fill_real(0, |d| 1.0 + d);
        assert_eq!(lut.real(0, -0.5), 1.0);
        assert_eq!(lut.real(0, 1.7), 2.0);
        assert_eq!(lut.real(0, f64::NAN), 1.0);
    }

    #[test]
    fn test_curved_function_error_is_small() {
        let mut lut = WeightLut::new(1, 0);
        let f = |d: f64| (-3.0 * d).exp();
        lut.fill_real(0, f);
        let mut worst = 0.0f64;
        for i in 0..1000 {
            let d = i as f64 / 999.0;
            worst = worst.max((lut.real(0, d) - f(d)).abs());
        }
        // h^2/8 * max|f''| = (1/256)^2 / 8 * 9
        assert!(worst < 2e-5, "max error {worst}");
    }
}
