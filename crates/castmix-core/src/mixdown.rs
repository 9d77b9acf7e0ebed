//! The rendered program handed back to the caller.

use serde::{Deserialize, Serialize};

use crate::OUTPUT_CHANNELS;

/// Interleaved stereo output of one render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderResult {
    /// Interleaved L/R samples, unclamped.
    pub samples: Vec<f32>,
    /// Sample rate of `samples`.
    pub sample_rate: u32,
    /// Program length in seconds.
    pub total_duration_seconds: f64,
    /// Largest absolute sample value before any PCM clamping.
    pub peak_amplitude: f32,
}

/// Render metadata for display, without the audio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSummary {
    pub sample_rate: u32,
    pub frame_count: u64,
    pub total_duration_seconds: f64,
    pub peak_amplitude: f32,
}

impl RenderResult {
    /// The defined result for a program with nothing to render.
    pub fn empty(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
            total_duration_seconds: 0.0,
            peak_amplitude: 0.0,
        }
    }

    /// Number of stereo frames.
    pub fn frame_count(&self) -> usize {
        self.samples.len() / OUTPUT_CHANNELS as usize
    }

    /// Whether the program is zero-length.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Peak level in dBFS, or `None` for a silent program.
    pub fn peak_dbfs(&self) -> Option<f64> {
        if self.peak_amplitude > 0.0 {
            Some(20.0 * (self.peak_amplitude as f64).log10())
        } else {
            None
        }
    }

    /// Metadata for UI display.
    pub fn summary(&self) -> RenderSummary {
        RenderSummary {
            sample_rate: self.sample_rate,
            frame_count: self.frame_count() as u64,
            total_duration_seconds: self.total_duration_seconds,
            peak_amplitude: self.peak_amplitude,
        }
    }
}
