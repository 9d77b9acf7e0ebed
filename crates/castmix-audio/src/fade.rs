//! BGM head/tail fades.
//!
//! A fade is described by a duration and a target ratio: the level, as a
//! percentage of the steady BGM gain, the head ramp starts from or the tail
//! ramp ends at. Ratio 0 is a classic fade from/to silence, ratio 100 is a
//! defined ramp that never changes level.

use castmix_core::{Envelope, MixSettings, Ramp};

/// Fade parameters for one BGM track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeSpec {
    /// Head ramp length in seconds.
    pub fade_in: f64,
    /// Tail ramp length in seconds.
    pub fade_out: f64,
    /// Head start level, percent of steady gain.
    pub fade_in_ratio: f64,
    /// Tail end level, percent of steady gain.
    pub fade_out_ratio: f64,
    /// Ramp shape for both fades.
    pub curve: Ramp,
}

impl FadeSpec {
    pub fn from_settings(settings: &MixSettings) -> Self {
        Self {
            fade_in: settings.fade_in,
            fade_out: settings.fade_out,
            fade_in_ratio: settings.fade_in_ratio,
            fade_out_ratio: settings.fade_out_ratio,
            curve: settings.fade_curve,
        }
    }
}

/// Fit the two fades into a window of `window_len` seconds.
///
/// When they would overlap, each is limited to half the window, so long
/// fades meet at the midpoint and a short one keeps its length.
pub fn clamp_durations(fade_in: f64, fade_out: f64, window_len: f64) -> (f64, f64) {
    let window_len = window_len.max(0.0);
    let fade_in = fade_in.max(0.0);
    let fade_out = fade_out.max(0.0);
    if fade_in + fade_out <= window_len {
        return (fade_in, fade_out);
    }
    let half = window_len / 2.0;
    (fade_in.min(half), fade_out.min(half))
}

/// Build the BGM fade envelope for the audible window `[start, end]` seconds.
///
/// The envelope holds `steady_gain` between the ramps, so it carries the
/// BGM track gain as well as the fades.
pub fn fade_envelope(spec: &FadeSpec, steady_gain: f64, start: f64, end: f64) -> Envelope {
    let end = end.max(start);
    let (fade_in, fade_out) = clamp_durations(spec.fade_in, spec.fade_out, end - start);
    let head_gain = steady_gain * spec.fade_in_ratio / 100.0;
    let tail_gain = steady_gain * spec.fade_out_ratio / 100.0;

    let mut env = Envelope::new();
    if fade_in > 0.0 {
        env.push(start, head_gain, spec.curve);
        env.push(start + fade_in, steady_gain, Ramp::Linear);
    } else {
        env.push(start, steady_gain, Ramp::Linear);
    }
    if fade_out > 0.0 {
        env.push(end - fade_out, steady_gain, spec.curve);
        env.push(end, tail_gain, Ramp::Linear);
    }
    env
}
