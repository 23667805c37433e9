/// Constant design data: half-band allpass coefficients and the default
/// BBD companding/reconstruction filter fit.
///
/// Half-band coefficients come from Harris' polyphase recursive allpass
/// designs (Harris & Constantinides). Octaves next to the base rate carry the
/// narrowest relative transition band and use second-order paths; the outer
/// octaves only have to reject images far above the audio band and get by
/// with first-order paths.
///
/// Pole/residue values are continuous-time (rad/s). Complex entries list one
/// member of each conjugate pair (positive imaginary part); the partner is
/// implied.

use crate::allpass::PathCoeffs;

/// Maximum supported multirate factor (2^MAX_OCTAVES).
pub const MAX_FACTOR: usize = 32;
pub const MAX_OCTAVES: usize = 5;

/// Number of octaves (counted from the base rate) that use second-order paths.
pub const SECOND_ORDER_OCTAVES: usize = 2;

/// Upper path, second-order octaves. Fed the odd sample when decimating.
pub const NEAR_UPPER: PathCoeffs =
    PathCoeffs::Second(0.079_866_426_202_558_2, 0.545_323_651_182_582_6);
/// Lower path, second-order octaves. Fed the even sample when decimating.
pub const NEAR_LOWER: PathCoeffs =
    PathCoeffs::Second(0.283_829_344_898_100, 0.834_411_891_201_724);

/// Upper path, first-order octaves.
pub const FAR_UPPER: PathCoeffs = PathCoeffs::First(0.111_92);
/// Lower path, first-order octaves.
pub const FAR_LOWER: PathCoeffs = PathCoeffs::First(0.539_76);

/// (upper, lower) path coefficients for the stage `octave` steps above the
/// base rate (0 = the 1<->2 stage).
pub fn halfband_coeffs(octave: usize) -> (PathCoeffs, PathCoeffs) {
    if octave < SECOND_ORDER_OCTAVES {
        (NEAR_UPPER, NEAR_LOWER)
    } else {
        (FAR_UPPER, FAR_LOWER)
    }
}

// ── Juno-60 BBD filter fit ──────────────────────────────────────────────────
//
// Input (anti-alias + compressor side): one real pole, two conjugate pairs.
//   H_in(0)  ~ -0.426  (inverting)
//   rolls off above ~10 kHz, about -7.5 dB at 20 kHz
// Output (reconstruction + expander side): same order.
//   H_out(0) ~ -2.465  (inverting)
// The two inversions cancel; net DC gain through the pair is ~1.05.

/// (pole, residue) for the input filter's real section.
pub const JUNO60_INPUT_REAL: [(f64, f64); 1] = [(-66_230.0, -4_393.062_86)];

/// ((pole re, pole im), (residue re, residue im)) for the input filter's conjugate pairs.
pub const JUNO60_INPUT_COMPLEX: [((f64, f64), (f64, f64)); 2] = [
    ((-55_482.0, 25_082.0), (-10_329.271_5, 329.848)),
    ((-26_292.0, 59_437.0), (366.990_557, 1_811.494_6)),
];

/// (pole, residue) for the output filter's real section.
pub const JUNO60_OUTPUT_REAL: [(f64, f64); 1] = [(-40_399.0, 5_734.0)];

/// ((pole re, pole im), (residue re, residue im)) for the output filter's conjugate pairs.
pub const JUNO60_OUTPUT_COMPLEX: [((f64, f64), (f64, f64)); 2] = [
    ((-51_468.0, 21_437.0), (-11_256.0, 99_566.0)),
    ((-26_276.0, 59_699.0), (-13_802.0, 24_606.0)),
];

/// Entries per weight lookup table (256 intervals over the unit delay).
pub const LUT_SIZE: usize = 257;
