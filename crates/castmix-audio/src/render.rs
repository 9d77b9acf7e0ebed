//! Offline renderer: evaluates a mix graph into an interleaved stereo buffer.
//!
//! The timeline is processed in fixed blocks. Block size only sets how often
//! progress is reported and cancellation is checked; every frame goes
//! through the same operations in the same order whatever the block size,
//! so output is identical across block sizes and runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use castmix_core::{MixError, RenderResult, Result, OUTPUT_CHANNELS};
use tracing::{info, warn};

use crate::eq::ThreeBandEq;
use crate::graph::{BgmAutomation, MixGraph, Stage, TrackChain};

/// Frames rendered between cancellation checks.
pub const BLOCK_FRAMES: usize = 4096;

// ── Progress and cancellation ───────────────────────────────────

/// Render progress information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderProgress {
    /// Frames rendered so far.
    pub frames_rendered: u64,
    /// Total frames in the program.
    pub total_frames: u64,
}

impl RenderProgress {
    /// Completion fraction (0.0 to 1.0).
    pub fn fraction(&self) -> f64 {
        if self.total_frames == 0 {
            return 1.0;
        }
        self.frames_rendered as f64 / self.total_frames as f64
    }
}

/// Handle for cancelling an in-progress render.
#[derive(Debug, Clone)]
pub struct RenderCancel(Arc<AtomicBool>);

impl RenderCancel {
    /// Create a new cancel handle.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Whether two handles control the same render.
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for RenderCancel {
    fn default() -> Self {
        Self::new()
    }
}

// ── Per-render track state ──────────────────────────────────────

/// A graph stage plus whatever state it needs during this render.
enum StageRun<'g> {
    Eq(ThreeBandEq),
    Gain(f64),
    Automation(&'g BgmAutomation),
}

struct TrackRun<'g, 'a> {
    chain: &'g TrackChain<'a>,
    stages: Vec<StageRun<'g>>,
}

impl<'g, 'a> TrackRun<'g, 'a> {
    fn new(chain: &'g TrackChain<'a>, sample_rate: u32) -> Self {
        let stages = chain
            .stages
            .iter()
            .map(|stage| match stage {
                Stage::Eq(gains) => StageRun::Eq(ThreeBandEq::new(sample_rate, *gains)),
                Stage::Gain(g) => StageRun::Gain(*g),
                Stage::Automation(a) => StageRun::Automation(a),
            })
            .collect();
        Self { chain, stages }
    }

    /// Add this track's contribution to `out`, which holds timeline frames
    /// `[block_start, block_start + out.len() / 2)`.
    fn mix_into(&mut self, out: &mut [f32], block_start: u64, sample_rate: u32) {
        let block_end = block_start + (out.len() / OUTPUT_CHANNELS as usize) as u64;
        let placement = self.chain.placement;
        let from = placement.start.max(block_start);
        let to = placement.end.min(block_end);
        if from >= to {
            return;
        }

        let rate = sample_rate as f64;
        for frame in from..to {
            let (l, r) = self
                .chain
                .buffer
                .stereo_frame((frame - placement.start) as usize);
            let (mut l, mut r) = (l as f64, r as f64);

            for stage in self.stages.iter_mut() {
                match stage {
                    StageRun::Eq(eq) => (l, r) = eq.process_frame(l, r),
                    StageRun::Gain(g) => {
                        l *= *g;
                        r *= *g;
                    }
                    StageRun::Automation(a) => {
                        let g = a.gain_at(frame as f64 / rate);
                        l *= g;
                        r *= g;
                    }
                }
            }

            let idx = ((frame - block_start) as usize) * OUTPUT_CHANNELS as usize;
            out[idx] += l as f32;
            out[idx + 1] += r as f32;
        }
    }
}

// ── Render ──────────────────────────────────────────────────────

/// Render `graph` to an interleaved stereo buffer.
///
/// * `cancel` – checked once per block; a cancelled render returns
///   `MixError::Cancelled` and no audio.
/// * `on_progress` – called after every block.
pub fn render(
    graph: &MixGraph<'_>,
    cancel: &RenderCancel,
    mut on_progress: impl FnMut(RenderProgress),
) -> Result<RenderResult> {
    let sample_rate = graph.sample_rate();
    let total_frames = graph.total_frames();
    if cancel.is_cancelled() {
        warn!("render cancelled before start");
        return Err(MixError::Cancelled);
    }
    if total_frames == 0 {
        info!("nothing to render");
        return Ok(RenderResult::empty(sample_rate));
    }

    info!(
        tracks = graph.tracks().len(),
        seconds = graph.total_duration_seconds(),
        sample_rate,
        "rendering mix"
    );

    let channels = OUTPUT_CHANNELS as usize;
    let total_samples = usize::try_from(total_frames)
        .ok()
        .and_then(|f| f.checked_mul(channels))
        .ok_or_else(|| MixError::Internal(format!("program of {} frames is too long", total_frames)))?;
    let mut samples: Vec<f32> = Vec::new();
    samples.try_reserve_exact(total_samples).map_err(|e| {
        MixError::Internal(format!(
            "cannot allocate {} output samples: {}",
            total_samples, e
        ))
    })?;
    samples.resize(total_samples, 0.0);

    let mut runs: Vec<TrackRun<'_, '_>> = graph
        .tracks()
        .iter()
        .map(|chain| TrackRun::new(chain, sample_rate))
        .collect();
    let master = graph.master_gain();
    let mut peak = 0.0f32;

    for (block_idx, block) in samples.chunks_mut(BLOCK_FRAMES * channels).enumerate() {
        if cancel.is_cancelled() {
            warn!("render cancelled");
            return Err(MixError::Cancelled);
        }

        let block_start = (block_idx * BLOCK_FRAMES) as u64;
        for run in runs.iter_mut() {
            run.mix_into(block, block_start, sample_rate);
        }
        for s in block.iter_mut() {
            *s = (*s as f64 * master) as f32;
            peak = peak.max(s.abs());
        }

        let frames_rendered = block_start + (block.len() / channels) as u64;
        on_progress(RenderProgress {
            frames_rendered,
            total_frames,
        });
    }

    // A cancel that lands after the last block still wins.
    if cancel.is_cancelled() {
        warn!("render cancelled");
        return Err(MixError::Cancelled);
    }

    let result = RenderResult {
        samples,
        sample_rate,
        total_duration_seconds: graph.total_duration_seconds(),
        peak_amplitude: peak,
    };
    info!(
        seconds = result.total_duration_seconds,
        peak = result.peak_amplitude,
        "render complete"
    );
    Ok(result)
}
