//! Decoded, read-only PCM input.

use crate::error::{MixError, Result};

/// Already-decoded audio for one source track.
///
/// Samples are stored planar (one `Vec<f32>` per channel), nominally in
/// [-1.0, 1.0]. The engine only ever reads a buffer, so callers share it
/// across renders behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Create a buffer from planar channel data.
    ///
    /// Every channel must have the same length, and there must be at least
    /// one channel.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(MixError::InvalidBuffer("sample rate must be non-zero".into()));
        }
        let first_len = match channels.first() {
            Some(ch) => ch.len(),
            None => {
                return Err(MixError::InvalidBuffer(
                    "buffer must have at least one channel".into(),
                ))
            }
        };
        if let Some((idx, ch)) = channels
            .iter()
            .enumerate()
            .find(|(_, ch)| ch.len() != first_len)
        {
            return Err(MixError::InvalidBuffer(format!(
                "channel {} has {} samples, channel 0 has {}",
                idx,
                ch.len(),
                first_len
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Create a single-channel buffer.
    pub fn from_mono(sample_rate: u32, samples: Vec<f32>) -> Result<Self> {
        Self::new(sample_rate, vec![samples])
    }

    /// Create a buffer by de-interleaving `data`.
    ///
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(sample_rate: u32, channel_count: usize, data: &[f32]) -> Result<Self> {
        if channel_count == 0 {
            return Err(MixError::InvalidBuffer(
                "buffer must have at least one channel".into(),
            ));
        }
        let frames = data.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in data.chunks_exact(channel_count) {
            for (ch, &s) in channels.iter_mut().zip(frame) {
                ch.push(s);
            }
        }
        Self::new(sample_rate, channels)
    }

    /// Native sample rate of the decoded data.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel).
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Whether the buffer contains no frames.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }

    /// Samples of one channel.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.sample_count() as f64 / self.sample_rate as f64
    }

    /// Left/right pair for a frame. Mono is duplicated to both sides and
    /// channels beyond the second are ignored.
    #[inline]
    pub fn stereo_frame(&self, frame: usize) -> (f32, f32) {
        let left = self.channels[0][frame];
        let right = match self.channels.get(1) {
            Some(ch) => ch[frame],
            None => left,
        };
        (left, right)
    }

    /// Sum of squares over all channels for `frames`, plus the number of
    /// samples that went into it.
    pub fn energy(&self, frames: std::ops::Range<usize>) -> (f64, usize) {
        let end = frames.end.min(self.sample_count());
        let start = frames.start.min(end);
        let mut sum = 0.0f64;
        for ch in &self.channels {
            for &s in &ch[start..end] {
                let s = s as f64;
                sum += s * s;
            }
        }
        (sum, (end - start) * self.channels.len())
    }
}
