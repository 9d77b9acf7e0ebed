//! Error types for Castmix.

use thiserror::Error;

/// Main error type for mixing operations.
#[derive(Error, Debug)]
pub enum MixError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid setting `{field}`: {reason}")]
    InvalidSettings { field: &'static str, reason: String },

    #[error("Sample rate mismatch: {track} track is {found} Hz, render runs at {expected} Hz")]
    SampleRateMismatch {
        track: &'static str,
        expected: u32,
        found: u32,
    },

    #[error("Program too long: {seconds:.1} s exceeds the {limit} s limit")]
    ProgramTooLong { seconds: f64, limit: f64 },

    #[error("Invalid audio buffer: {0}")]
    InvalidBuffer(String),

    #[error("Render cancelled")]
    Cancelled,

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MixError {
    /// Shorthand for an `InvalidSettings` error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidSettings {
            field,
            reason: reason.into(),
        }
    }

    /// Whether this error is the cancellation signal rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias for mixing operations.
pub type Result<T> = std::result::Result<T, MixError>;
