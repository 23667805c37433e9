/// One octave of polyphase IIR half-band filtering.
///
/// Regalia-Mitra style decomposition: a half-band lowpass H(z) is split into
/// two allpass branches running at the low rate,
///   H(z) = 0.5 * (A_upper(z^2) + z^-1 * A_lower(z^2)),
/// so each output sample costs one pass through each branch instead of a
/// full-rate filter followed by discarding half the samples.
///
/// - Decimation: even sample -> lower path, odd sample -> upper path, average.
/// - Interpolation: the input feeds both paths; upper emits the even output
///   sample, lower the odd one. Each branch is allpass with unity DC gain, so
///   no 2x makeup gain is needed for the zero-stuffing.
///
/// Swapping the paths in either direction yields the mirror-image highpass
/// response instead of the lowpass.

use crate::allpass::AllpassPath;
use crate::tables;

#[derive(Clone, Debug)]
pub struct HalfBandStage {
    upper: AllpassPath,
    lower: AllpassPath,
}

impl HalfBandStage {
    /// Stage for the given octave above the base rate (0 = 1<->2).
    pub fn for_octave(octave: usize) -> Self {
        let (upper, lower) = tables::halfband_coeffs(octave);
        Self {
            upper: AllpassPath::new(upper),
            lower: AllpassPath::new(lower),
        }
    }

    /// Consume one pair of high-rate samples, emit one low-rate sample.
    #[inline]
    pub fn decimate(&mut self, even: f64, odd: f64) -> f64 {
        (self.upper.process(odd) + self.lower.process(even)) * 0.5
    }

    /// Consume one low-rate sample, emit two high-rate samples.
    #[inline]
    pub fn interpolate(&mut self, x: f64) -> [f64; 2] {
        [self.upper.process(x), self.lower.process(x)]
    }

    pub fn reset(&mut self) {
        self.upper.reset();
        self.lower.reset();
    }

    pub fn is_silent(&self) -> bool {
        self.upper.is_silent() && self.lower.is_silent()
    }

    /// Summed DC group delay of both paths, in low-rate samples. The stage's
    /// up+down round trip delays DC by exactly this much.
    pub fn round_trip_delay(&self) -> f64 {
        self.upper.dc_group_delay() + self.lower.dc_group_delay()
    }

    /// Allpass order of each path.
    pub fn path_order(&self) -> usize {
        self.upper.order()
    }
}
