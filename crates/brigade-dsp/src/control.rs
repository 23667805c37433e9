/// Control-value conditioning: CV response curves and safe-range clamps.
///
/// Knobs and CVs are normalized: a knob is in [0, 1], a bipolar CV in
/// [-1, 1]. A curve combines the two into a control value in [0, 1].
use crate::bbd::MIN_CLOCK_HZ;
use crate::clock::MAX_EVENTS_PER_SAMPLE;

/// Largest feedback the echo accepts; the loop stays below unity gain.
pub const MAX_FEEDBACK: f64 = 0.75;

/// How a CV combines with its knob. Chosen once per control tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CvCurve {
    /// Bipolar CV re-centred into the unit range: ((knob + cv) + 1) / 2.
    #[default]
    Scale,
    /// knob + cv, clipped.
    Clip,
    /// |knob + cv|, clipped.
    Rectify,
}

impl CvCurve {
    /// Map a three-position switch (0, 1, 2) onto a curve. Out-of-range
    /// positions pick the nearest end.
    pub fn from_switch(position: u8) -> Self {
        match position {
            0 => CvCurve::Scale,
            1 => CvCurve::Clip,
            _ => CvCurve::Rectify,
        }
    }

    #[inline]
    pub fn apply(self, knob: f64, cv: f64) -> f64 {
        let v = match self {
            CvCurve::Scale => (knob + cv + 1.0) * 0.5,
            CvCurve::Clip => knob + cv,
            CvCurve::Rectify => (knob + cv).abs(),
        };
        clamp_unit(v)
    }
}

/// Clamp into [0, 1]; NaN maps to 0.
#[inline]
pub fn clamp_unit(v: f64) -> f64 {
    if v > 0.0 { v.min(1.0) } else { 0.0 }
}

/// Clamp a BBD clock so the event step neither diverges nor starves the
/// scheduler: [MIN_CLOCK_HZ, MAX_EVENTS_PER_SAMPLE * sample_rate].
/// Non-finite input falls back to the minimum.
#[inline]
pub fn clamp_clock_hz(clock_hz: f64, sample_rate: f64) -> f64 {
    let max = (MAX_EVENTS_PER_SAMPLE * sample_rate).max(MIN_CLOCK_HZ);
    if clock_hz.is_finite() {
        clock_hz.clamp(MIN_CLOCK_HZ, max)
    } else {
        MIN_CLOCK_HZ
    }
}

/// Clamp a feedback amount into [0, MAX_FEEDBACK]; NaN maps to 0.
#[inline]
pub fn clamp_feedback(fb: f64) -> f64 {
    if fb > 0.0 { fb.min(MAX_FEEDBACK) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_recentres_bipolar_cv() {
        assert_eq!(CvCurve::Scale.apply(0.0, -1.0), 0.0);
        assert_eq!(CvCurve::Scale.apply(0.0, 0.0), 0.5);
        assert_eq!(CvCurve::Scale.apply(0.0, 1.0), 1.0);
        assert_eq!(CvCurve::Scale.apply(1.0, 1.0), 1.0);
    }

    #[test]
    fn test_clip_and_rectify_differ_on_negative_sum() {
        assert_eq!(CvCurve::Clip.apply(0.2, -0.5), 0.0);
        assert!((CvCurve::Rectify.apply(0.2, -0.5) - 0.3).abs() < 1e-12);
        assert_eq!(CvCurve::Rectify.apply(0.5, 0.9), 1.0);
    }

    #[test]
    fn test_curves_stay_in_unit_range() {
        for curve in [CvCurve::Scale, CvCurve::Clip, CvCurve::Rectify] {
            for &(k, cv) in &[(-3.0, 0.0), (5.0, 5.0), (0.3, f64::NAN), (0.0, -9.0)] {
                let v = curve.apply(k, cv);
                assert!((0.0..=1.0).contains(&v), "{curve:?}({k}, {cv}) = {v}");
            }
        }
    }

    #[test]
    fn test_switch_positions() {
        assert_eq!(CvCurve::from_switch(0), CvCurve::Scale);
        assert_eq!(CvCurve::from_switch(1), CvCurve::Clip);
        assert_eq!(CvCurve::from_switch(2), CvCurve::Rectify);
        assert_eq!(CvCurve::from_switch(9), CvCurve::Rectify);
    }

    #[test]
    fn test_clock_clamp_bounds() {
        let sr = 48_000.0;
        assert_eq!(clamp_clock_hz(0.0, sr), MIN_CLOCK_HZ);
        assert_eq!(clamp_clock_hz(-5.0, sr), MIN_CLOCK_HZ);
        assert_eq!(clamp_clock_hz(f64::INFINITY, sr), MIN_CLOCK_HZ);
        assert_eq!(clamp_clock_hz(f64::NAN, sr), MIN_CLOCK_HZ);
        assert_eq!(clamp_clock_hz(1e9, sr), 16.0 * sr);
        assert_eq!(clamp_clock_hz(10_000.0, sr), 10_000.0);
    }

    #[test]
    fn test_feedback_clamp() {
        assert_eq!(clamp_feedback(2.0), MAX_FEEDBACK);
        assert_eq!(clamp_feedback(-0.1), 0.0);
        assert_eq!(clamp_feedback(f64::NAN), 0.0);
        assert_eq!(clamp_feedback(0.5), 0.5);
    }
}
