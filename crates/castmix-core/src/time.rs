//! Sample-accurate time representation.
//!
//! The render timeline is addressed in whole frames (one frame = one sample
//! per channel). Seconds only appear at the edges: settings come in as
//! seconds and are rounded to frames once, so every stage agrees on where
//! a track starts and ends.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Convert a duration in seconds to a frame count at `sample_rate`.
///
/// Negative and non-finite inputs map to zero.
#[inline]
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate as f64).round() as u64
}

/// Convert a frame position to seconds at `sample_rate`.
#[inline]
pub fn frames_to_seconds(frames: u64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f64 / sample_rate as f64
}

/// A frame range with inclusive start and exclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FrameRange {
    /// First frame (inclusive).
    pub start: u64,
    /// One past the last frame (exclusive).
    pub end: u64,
}

impl FrameRange {
    /// Create a new range. An `end` before `start` yields an empty range at `start`.
    #[inline]
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Create a range from a start frame and a length.
    #[inline]
    pub fn with_len(start: u64, len: u64) -> Self {
        Self::new(start, start.saturating_add(len))
    }

    /// Create a range from start/end seconds.
    pub fn from_seconds(start: f64, end: f64, sample_rate: u32) -> Self {
        Self::new(
            seconds_to_frames(start, sample_rate),
            seconds_to_frames(end, sample_rate),
        )
    }

    /// Number of frames in the range.
    #[inline]
    pub fn len(self) -> u64 {
        self.end - self.start
    }

    /// Whether the range covers no frames.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.end == self.start
    }

    /// Check if a frame is within this range.
    #[inline]
    pub fn contains(self, frame: u64) -> bool {
        frame >= self.start && frame < self.end
    }

    /// Check if two ranges overlap.
    pub fn overlaps(self, other: Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Compute the intersection of two ranges, if any.
    pub fn intersection(self, other: Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Self::new(
            self.start.max(other.start),
            self.end.min(other.end),
        ))
    }

    /// Clamp the end of the range to `limit`.
    pub fn clamp_end(self, limit: u64) -> Self {
        Self::new(self.start.min(limit), self.end.min(limit))
    }

    /// Start of the range in seconds.
    #[inline]
    pub fn start_seconds(self, sample_rate: u32) -> f64 {
        frames_to_seconds(self.start, sample_rate)
    }

    /// End of the range in seconds.
    #[inline]
    pub fn end_seconds(self, sample_rate: u32) -> f64 {
        frames_to_seconds(self.end, sample_rate)
    }

    /// Empty range starting at zero.
    pub const EMPTY: Self = Self { start: 0, end: 0 };
}

impl fmt::Display for FrameRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
