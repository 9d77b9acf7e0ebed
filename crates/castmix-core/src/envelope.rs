//! Gain envelopes: time-ordered control points with linear or exponential ramps.
//!
//! An envelope maps a time in seconds to a linear gain. Between two control
//! points the gain follows the ramp shape of the earlier point. Before the
//! first point and after the last one the gain is held flat.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gains at or below this level are substituted when interpolating in
/// log space, so a ramp toward silence never takes `ln(0)`.
pub const GAIN_FLOOR: f64 = 1e-4;

// ── Ramp shapes ─────────────────────────────────────────────────

/// How gain moves from one control point to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ramp {
    /// Gain changes arithmetically over time.
    #[default]
    Linear,
    /// `ln(gain)` changes linearly over time, so loudness moves evenly.
    Exponential,
}

impl Ramp {
    /// Interpolate between `from` and `to` at normalized position `x` in [0, 1].
    pub fn interpolate(self, from: f64, to: f64, x: f64) -> f64 {
        if from == to {
            return from;
        }
        let x = x.clamp(0.0, 1.0);
        match self {
            Self::Linear => from + (to - from) * x,
            Self::Exponential => {
                let g0 = from.max(GAIN_FLOOR);
                let g1 = to.max(GAIN_FLOOR);
                if g0 == g1 {
                    return g0;
                }
                let (l0, l1) = (g0.ln(), g1.ln());
                (l0 + (l1 - l0) * x).exp()
            }
        }
    }
}

// ── Control point ───────────────────────────────────────────────

/// A gain value pinned to a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    /// Time in seconds on the render timeline.
    pub time: f64,
    /// Linear gain at this point.
    pub gain: f64,
    /// Ramp shape used when moving TO the next point.
    pub ramp: Ramp,
}

impl ControlPoint {
    /// Create a control point with a linear outgoing ramp.
    pub fn new(time: f64, gain: f64) -> Self {
        Self {
            time,
            gain,
            ramp: Ramp::Linear,
        }
    }

    /// Create a control point with a specific outgoing ramp.
    pub fn with_ramp(time: f64, gain: f64, ramp: Ramp) -> Self {
        Self { time, gain, ramp }
    }
}

// ── Envelope ────────────────────────────────────────────────────

/// A gain curve over the render timeline.
///
/// Points are kept in non-decreasing time order. Two points may share a
/// time, which encodes an instantaneous step: sampling exactly at that
/// time yields the later point's gain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    points: Vec<ControlPoint>,
}

impl Envelope {
    /// Create an empty envelope. An empty envelope evaluates to unity gain.
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create an envelope holding a single gain forever.
    pub fn constant(gain: f64) -> Self {
        Self {
            points: vec![ControlPoint::new(0.0, gain)],
        }
    }

    /// Append a point after the existing ones.
    ///
    /// A time earlier than the last point is clamped to it so the sequence
    /// stays monotonic.
    pub fn push(&mut self, time: f64, gain: f64, ramp: Ramp) {
        let time = match self.points.last() {
            Some(last) if time < last.time => last.time,
            _ => time,
        };
        self.points.push(ControlPoint::with_ramp(time, gain, ramp));
    }

    /// Insert or update the point at `time`. Maintains sorted order.
    pub fn set(&mut self, time: f64, gain: f64, ramp: Ramp) {
        if let Some(p) = self.points.iter_mut().find(|p| p.time == time) {
            p.gain = gain;
            p.ramp = ramp;
            return;
        }
        let pos = self.points.partition_point(|p| p.time < time);
        self.points
            .insert(pos, ControlPoint::with_ramp(time, gain, ramp));
    }

    /// Evaluate the gain at `time` seconds.
    pub fn sample(&self, time: f64) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 1.0,
        };
        if time < first.time {
            return first.gain;
        }
        if time >= last.time {
            return last.gain;
        }
        // Last point at or before `time`; its successor is strictly after it.
        let idx = self
            .points
            .partition_point(|p| p.time <= time)
            .saturating_sub(1);
        let a = &self.points[idx];
        let b = &self.points[idx + 1];
        let span = b.time - a.time;
        if span <= 0.0 {
            return b.gain;
        }
        a.ramp.interpolate(a.gain, b.gain, (time - a.time) / span)
    }

    /// Evaluate the product of several envelopes at `time`.
    pub fn product(envelopes: &[&Envelope], time: f64) -> f64 {
        envelopes.iter().map(|e| e.sample(time)).product()
    }

    /// Drop everything after `end`, pinning the value the curve had there.
    ///
    /// Sub-segments of linear and log-linear ramps keep their shape, so the
    /// truncated envelope agrees with the original on `[.., end]`.
    pub fn truncate(&mut self, end: f64) {
        let last_time = match self.points.last() {
            Some(last) => last.time,
            None => return,
        };
        if last_time <= end {
            return;
        }
        let value = self.sample(end);
        let keep = self.points.partition_point(|p| p.time <= end);
        self.points.truncate(keep);
        match self.points.last() {
            Some(last) if last.time == end => {}
            _ => self.points.push(ControlPoint::new(end, value)),
        }
    }

    /// All control points (read-only).
    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    /// Number of control points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the envelope has no control points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the gain ever changes.
    pub fn is_animated(&self) -> bool {
        self.points
            .windows(2)
            .any(|w| w[0].gain != w[1].gain)
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Envelope({} points)", self.points.len())
    }
}

// ── Tests ───────────────────────────────────────────────────────
