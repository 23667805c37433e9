use std::fmt;

/// Which of the two BBD filter banks a design or error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BankRole {
    /// Anti-alias / compressor side, sampled at capture events.
    Input,
    /// Reconstruction / expander side, driven at emit events.
    Output,
}

impl fmt::Display for BankRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BankRole::Input => f.write_str("input"),
            BankRole::Output => f.write_str("output"),
        }
    }
}

/// Construction-time configuration errors. The audio path itself never
/// fails; it clamps.
#[derive(Clone, Debug, PartialEq)]
pub enum DesignError {
    /// A filter bank has no sections at all.
    EmptyBank(BankRole),
    /// A continuous-time pole is not in the open left half-plane.
    UnstablePole {
        bank: BankRole,
        index: usize,
        real_part: f64,
    },
    /// A BBD with no buckets.
    ZeroStages,
    InvalidSampleRate(f64),
}

impl fmt::Display for DesignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesignError::EmptyBank(bank) => write!(f, "The {bank} filter bank has no sections."),
            DesignError::UnstablePole {
                bank,
                index,
                real_part,
            } => write!(
                f,
                "Pole {index} of the {bank} filter bank does not decay (real part {real_part})."
            ),
            DesignError::ZeroStages => f.write_str("A BBD needs at least one stage."),
            DesignError::InvalidSampleRate(sr) => {
                write!(f, "Sample rate must be finite and positive, got {sr}.")
            }
        }
    }
}

impl std::error::Error for DesignError {}
