use brigade_dsp::control::MAX_FEEDBACK;
use nih_plug::prelude::*;

#[derive(Params)]
pub struct BrigadeParams {
    /// Echo time control: 0 = longest delay, 1 = three octaves faster clock.
    #[id = "time"]
    pub time: FloatParam,

    /// Fraction of the delayed signal fed back into the line.
    #[id = "feedback"]
    pub feedback: FloatParam,

    /// Dry/wet balance (0 = dry only, 1 = wet only).
    #[id = "mix"]
    pub mix: FloatParam,
}

impl Default for BrigadeParams {
    fn default() -> Self {
        Self {
            time: FloatParam::new(
                "Time",
                0.3,
                FloatRange::Linear {
                    min: 0.0,
                    max: 1.0,
                },
            )
            // Slow glide: clock sweeps are part of the BBD sound.
            .with_smoother(SmoothingStyle::Linear(80.0))
            .with_value_to_string(formatters::v2s_f32_rounded(2)),

            feedback: FloatParam::new(
                "Feedback",
                0.35,
                FloatRange::Linear {
                    min: 0.0,
                    max: MAX_FEEDBACK as f32,
                },
            )
            .with_smoother(SmoothingStyle::Linear(50.0))
            .with_unit(" %")
            .with_value_to_string(formatters::v2s_f32_percentage(0))
            .with_string_to_value(formatters::s2v_f32_percentage()),

            mix: FloatParam::new(
                "Mix",
                0.5,
                FloatRange::Linear {
                    min: 0.0,
                    max: 1.0,
                },
            )
            .with_smoother(SmoothingStyle::Linear(50.0))
            .with_unit(" %")
            .with_value_to_string(formatters::v2s_f32_percentage(0))
            .with_string_to_value(formatters::s2v_f32_percentage()),
        }
    }
}
