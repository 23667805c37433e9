//! Brigade DSP library: bucket-brigade delay emulation and polyphase
//! half-band multirate conversion.
//!
//! Pure DSP math with no audio framework dependencies. Everything here is
//! single-lane and allocation-free per sample; stereo or polyphonic use means
//! one instance per lane.

// Multirate engine
pub mod allpass;
pub mod halfband;
pub mod multirate;

// BBD core
pub mod bbd;
pub mod clock;
pub mod delay_register;
pub mod pole_residue;
pub mod weight_lut;

// Shared data and errors
pub mod error;
pub mod tables;

// Effects built on the core
pub mod control;
pub mod echo;
pub mod filters;
pub mod shaper;

pub use bbd::{Bbd, BbdConfig};
pub use echo::{BbdEcho, EchoConfig};
pub use error::{BankRole, DesignError};
pub use multirate::{Decimator, Upsampler};
pub use pole_residue::PoleResidueDesign;
