//! Castmix Audio - Offline mixing engine
//!
//! Combines a voice track, background music and an optional effect into
//! one stereo program.
//!
//! Architecture:
//! - `fade`: BGM head/tail fade envelopes
//! - `ducking`: voice-driven BGM gain reduction
//! - `eq`: fixed 3-band EQ on the BGM path
//! - `graph`: per-track chains placed on a shared timeline
//! - `render`: block-based offline evaluation with cancellation
//! - `session`: one owned render per mix, sync or on a worker thread

pub mod ducking;
pub mod eq;
pub mod fade;
pub mod graph;
pub mod render;
pub mod session;

pub use ducking::{DuckingAnalysis, DuckingParams};
pub use eq::{BiquadCoeffs, EqGains, ThreeBandEq};
pub use fade::FadeSpec;
pub use graph::{BgmAutomation, MixGraph, MixInputs, Stage, TrackChain};
pub use render::{RenderCancel, RenderProgress};
pub use session::{MixSession, RenderHandle};

use castmix_core::{MixSettings, RenderResult, Result};

/// Validate, wire and render one mix.
///
/// Settings are checked and sample rates compared before any audio is
/// touched. A program with no audible track renders to an empty result.
pub fn render_mix(
    inputs: &MixInputs,
    settings: &MixSettings,
    sample_rate: u32,
    cancel: &RenderCancel,
    on_progress: impl FnMut(RenderProgress),
) -> Result<RenderResult> {
    let graph = MixGraph::build(inputs, settings, sample_rate)?;
    render::render(&graph, cancel, on_progress)
}
