//! Castmix Core - Foundation types for announcement mixing
//!
//! This crate provides the fundamental types used throughout Castmix:
//! - Decoded input audio (`AudioBuffer`)
//! - The flat mix description (`MixSettings`)
//! - Gain automation (`Envelope`, `Ramp`)
//! - Frame-domain time ranges (`FrameRange`)
//! - The rendered program (`RenderResult`)

pub mod buffer;
pub mod envelope;
pub mod error;
pub mod mixdown;
pub mod settings;
pub mod time;

pub use buffer::AudioBuffer;
pub use envelope::{ControlPoint, Envelope, Ramp};
pub use error::{MixError, Result};
pub use mixdown::{RenderResult, RenderSummary};
pub use settings::{MixSettings, TrackKind, MAX_PROGRAM_SECONDS};
pub use time::{frames_to_seconds, seconds_to_frames, FrameRange};

/// Output sample rate used when the caller does not ask for another one.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Number of interleaved channels in every rendered program.
pub const OUTPUT_CHANNELS: u16 = 2;
