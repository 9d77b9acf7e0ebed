//! Auto-ducking: lower the BGM while the voice is speaking.
//!
//! The timeline is cut into fixed 20 ms windows. A window whose voice RMS
//! level exceeds the threshold counts as speech and pulls the BGM down to
//! the reduction multiplier immediately. When speech stops, the BGM climbs
//! back to unity along a linear ramp of `release_seconds`.

use castmix_core::{frames_to_seconds, AudioBuffer, Envelope, FrameRange, MixSettings, Ramp};
use rayon::prelude::*;
use std::ops::Range;

/// Length of one analysis window.
pub const WINDOW_SECONDS: f64 = 0.020;

/// Added to the RMS before taking the log, so silence is finite.
pub const RMS_EPSILON: f64 = 1e-8;

/// Ducking parameters for one render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuckingParams {
    /// Gain change while speech is present, in dB (≤ 0).
    pub reduction_db: f64,
    /// Speech detection threshold, in dBFS.
    pub threshold_dbfs: f64,
    /// Recovery ramp length, in seconds.
    pub release_seconds: f64,
}

impl DuckingParams {
    pub fn from_settings(settings: &MixSettings) -> Self {
        Self {
            reduction_db: settings.duck_reduction_db,
            threshold_dbfs: settings.duck_threshold_dbfs,
            release_seconds: settings.duck_release_seconds,
        }
    }

    /// Linear BGM multiplier while ducked.
    pub fn multiplier(&self) -> f64 {
        10f64.powf(self.reduction_db / 20.0)
    }
}

/// Result of scanning the voice track.
#[derive(Debug, Clone)]
pub struct DuckingAnalysis {
    /// BGM gain multiplier over the timeline (1.0 = untouched).
    pub envelope: Envelope,
    /// Frames per analysis window.
    pub window_frames: u64,
    /// Per-window speech flags, in timeline order.
    pub activity: Vec<bool>,
}

impl DuckingAnalysis {
    /// Number of windows flagged as speech.
    pub fn active_windows(&self) -> usize {
        self.activity.iter().filter(|&&a| a).count()
    }
}

/// Frames per analysis window at `sample_rate` (never zero).
pub fn window_frames(sample_rate: u32) -> u64 {
    ((WINDOW_SECONDS * sample_rate as f64).round() as u64).max(1)
}

/// RMS level of `frames` of `voice`, in dBFS. `None` if the range holds no samples.
pub fn window_level_dbfs(voice: &AudioBuffer, frames: Range<usize>) -> Option<f64> {
    let (sum, count) = voice.energy(frames);
    if count == 0 {
        return None;
    }
    let rms = (sum / count as f64).sqrt();
    Some(20.0 * (rms + RMS_EPSILON).log10())
}

/// Scan `voice`, placed at `voice_start` on a timeline of `total_frames`,
/// and build the BGM ducking envelope.
pub fn analyze(
    params: &DuckingParams,
    voice: &AudioBuffer,
    voice_start: u64,
    total_frames: u64,
    sample_rate: u32,
) -> DuckingAnalysis {
    let window = window_frames(sample_rate);
    let window_count = total_frames.div_ceil(window) as usize;
    let voice_range = FrameRange::with_len(voice_start, voice.sample_count() as u64);

    // Windows are independent, and each one sums its samples sequentially,
    // so the parallel scan gives the same flags as a serial one.
    let activity: Vec<bool> = (0..window_count)
        .into_par_iter()
        .map(|k| {
            let start = k as u64 * window;
            let span = FrameRange::new(start, (start + window).min(total_frames));
            span.intersection(voice_range)
                .and_then(|hit| {
                    let local = (hit.start - voice_start) as usize..(hit.end - voice_start) as usize;
                    window_level_dbfs(voice, local)
                })
                .is_some_and(|db| db > params.threshold_dbfs)
        })
        .collect();

    let envelope = smooth(
        &activity,
        window,
        sample_rate,
        params.multiplier(),
        params.release_seconds,
    );

    tracing::debug!(
        windows = activity.len(),
        active = activity.iter().filter(|&&a| a).count(),
        points = envelope.len(),
        "ducking analysis complete"
    );

    DuckingAnalysis {
        envelope,
        window_frames: window,
        activity,
    }
}

/// A release ramp in progress, always heading back to unity.
#[derive(Debug, Clone, Copy)]
struct Release {
    from: f64,
    start: f64,
    end: f64,
}

impl Release {
    fn value_at(&self, t: f64) -> f64 {
        Ramp::Linear.interpolate(self.from, 1.0, (t - self.start) / (self.end - self.start))
    }
}

/// Turn per-window speech flags into a gain envelope: instant attack to
/// `multiplier`, linear release back to 1.0 over `release_seconds`.
pub fn smooth(
    activity: &[bool],
    window_frames: u64,
    sample_rate: u32,
    multiplier: f64,
    release_seconds: f64,
) -> Envelope {
    let mut env = Envelope::new();
    env.push(0.0, 1.0, Ramp::Linear);

    let mut level = 1.0;
    let mut release: Option<Release> = None;

    for (k, &active) in activity.iter().enumerate() {
        let t = frames_to_seconds(k as u64 * window_frames, sample_rate);

        if let Some(r) = release {
            if t >= r.end {
                env.push(r.end, 1.0, Ramp::Linear);
                level = 1.0;
                release = None;
            }
        }
        let current = release.map_or(level, |r| r.value_at(t));

        if active {
            if current > multiplier {
                env.push(t, current, Ramp::Linear);
                env.push(t, multiplier, Ramp::Linear);
                level = multiplier;
                release = None;
            }
        } else if current < 1.0 && release.is_none() {
            env.push(t, current, Ramp::Linear);
            if release_seconds > 0.0 {
                release = Some(Release {
                    from: current,
                    start: t,
                    end: t + release_seconds,
                });
            } else {
                env.push(t, 1.0, Ramp::Linear);
                level = 1.0;
            }
        }
    }

    if let Some(r) = release {
        env.push(r.end, 1.0, Ramp::Linear);
    }
    env
}
