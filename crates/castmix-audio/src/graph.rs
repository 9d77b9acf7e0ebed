//! Mix graph: per-track processing chains placed on a shared timeline.
//!
//! ```text
//! voice  ─► gain ──────────────────────────────┐
//! bgm    ─► eq ─► gain ─► fade × ducking ──────┼─► Σ ─► master gain
//! effect ─► gain ──────────────────────────────┘
//! ```
//!
//! The graph is a plain description: stages hold parameters only. Filter
//! state and other per-render scratch live in the renderer, so one graph
//! renders the same samples every time.

use std::sync::Arc;

use castmix_core::{
    frames_to_seconds, seconds_to_frames, AudioBuffer, Envelope, FrameRange, MixError,
    MixSettings, Result, TrackKind, MAX_PROGRAM_SECONDS,
};
use smallvec::{smallvec, SmallVec};
use tracing::debug;

use crate::ducking::{self, DuckingParams};
use crate::eq::EqGains;
use crate::fade::{self, FadeSpec};

/// The decoded sources of one mix. Any of them may be absent.
///
/// Buffers are shared read-only, so the same inputs can feed several
/// renders at once.
#[derive(Debug, Clone, Default)]
pub struct MixInputs {
    pub voice: Option<Arc<AudioBuffer>>,
    pub bgm: Option<Arc<AudioBuffer>>,
    pub effect: Option<Arc<AudioBuffer>>,
}

impl MixInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_voice(mut self, buffer: impl Into<Arc<AudioBuffer>>) -> Self {
        self.voice = Some(buffer.into());
        self
    }

    pub fn with_bgm(mut self, buffer: impl Into<Arc<AudioBuffer>>) -> Self {
        self.bgm = Some(buffer.into());
        self
    }

    pub fn with_effect(mut self, buffer: impl Into<Arc<AudioBuffer>>) -> Self {
        self.effect = Some(buffer.into());
        self
    }

    /// The buffer for `kind`, if present.
    pub fn get(&self, kind: TrackKind) -> Option<&AudioBuffer> {
        match kind {
            TrackKind::Voice => self.voice.as_deref(),
            TrackKind::Bgm => self.bgm.as_deref(),
            TrackKind::Effect => self.effect.as_deref(),
        }
    }

    /// The buffer for `kind` if it is present and holds at least one frame.
    pub fn audible(&self, kind: TrackKind) -> Option<&AudioBuffer> {
        self.get(kind).filter(|b| !b.is_empty())
    }
}

/// Time-varying BGM gain relative to the steady BGM gain: the fade envelope
/// times the optional ducking envelope.
#[derive(Debug, Clone)]
pub struct BgmAutomation {
    pub fade: Envelope,
    pub ducking: Option<Envelope>,
}

impl BgmAutomation {
    /// Gain at `time` seconds on the timeline.
    #[inline]
    pub fn gain_at(&self, time: f64) -> f64 {
        let fade = self.fade.sample(time);
        match &self.ducking {
            Some(duck) => fade * duck.sample(time),
            None => fade,
        }
    }
}

/// One processing step of a track chain.
#[derive(Debug, Clone)]
pub enum Stage {
    /// 3-band equalizer.
    Eq(EqGains),
    /// Static linear gain.
    Gain(f64),
    /// Envelope-modulated gain.
    Automation(BgmAutomation),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Eq(_) => "eq",
            Self::Gain(_) => "gain",
            Self::Automation(a) if a.ducking.is_some() => "fade+ducking",
            Self::Automation(_) => "fade",
        }
    }
}

/// A source buffer, where it sits on the timeline and what is done to it.
#[derive(Debug, Clone)]
pub struct TrackChain<'a> {
    pub kind: TrackKind,
    pub buffer: &'a AudioBuffer,
    /// Timeline frames the track occupies, clamped to the program end.
    pub placement: FrameRange,
    pub stages: SmallVec<[Stage; 3]>,
}

/// The realized processing pipeline for one render.
#[derive(Debug, Clone)]
pub struct MixGraph<'a> {
    sample_rate: u32,
    total_frames: u64,
    master_gain: f64,
    tracks: Vec<TrackChain<'a>>,
}

/// Raw placement of a track before the timeline is re-zeroed.
struct Placement<'a> {
    kind: TrackKind,
    buffer: &'a AudioBuffer,
    raw_start: f64,
}

impl<'a> MixGraph<'a> {
    /// Validate `settings` against `inputs` and wire the per-track chains.
    pub fn build(inputs: &'a MixInputs, settings: &MixSettings, sample_rate: u32) -> Result<Self> {
        settings.validate()?;
        if sample_rate == 0 {
            return Err(MixError::invalid("sampleRate", "must be non-zero"));
        }
        for kind in TrackKind::ALL {
            if let Some(buffer) = inputs.audible(kind) {
                if buffer.sample_rate() != sample_rate {
                    return Err(MixError::SampleRateMismatch {
                        track: kind.name(),
                        expected: sample_rate,
                        found: buffer.sample_rate(),
                    });
                }
            }
        }

        let has_bgm = inputs.audible(TrackKind::Bgm).is_some();

        let placements: Vec<Placement<'a>> = TrackKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let buffer = inputs.audible(kind)?;
                let raw_start = match kind {
                    TrackKind::Voice => settings.voice_offset_seconds,
                    TrackKind::Bgm => settings.voice_offset_seconds - settings.bgm_lead_seconds,
                    TrackKind::Effect => settings.effect_offset_seconds,
                };
                Some(Placement {
                    kind,
                    buffer,
                    raw_start,
                })
            })
            .collect();

        if placements.is_empty() {
            debug!("no audible tracks; empty program");
            return Ok(Self {
                sample_rate,
                total_frames: 0,
                master_gain: settings.master_gain,
                tracks: Vec::new(),
            });
        }

        // Timeline zero is the earliest track start.
        let zero = placements
            .iter()
            .map(|p| p.raw_start)
            .fold(f64::INFINITY, f64::min);

        let trail_frames = if has_bgm {
            seconds_to_frames(settings.bgm_trail_seconds, sample_rate)
        } else {
            0
        };

        let mut spans: Vec<(TrackKind, &'a AudioBuffer, FrameRange)> = Vec::new();
        let mut natural_end = 0u64;
        for p in &placements {
            let start = seconds_to_frames(p.raw_start - zero, sample_rate);
            let len = p.buffer.sample_count() as u64;
            let tail = match p.kind {
                TrackKind::Voice => trail_frames,
                _ => 0,
            };
            let end = start
                .checked_add(len)
                .and_then(|end| end.checked_add(tail))
                .ok_or(MixError::ProgramTooLong {
                    seconds: f64::INFINITY,
                    limit: MAX_PROGRAM_SECONDS,
                })?;
            natural_end = natural_end.max(end);
            spans.push((p.kind, p.buffer, FrameRange::with_len(start, len)));
        }

        let total_frames = match settings.trim_end_seconds {
            Some(trim) => natural_end.min(seconds_to_frames(trim, sample_rate)),
            None => natural_end,
        };
        if total_frames > seconds_to_frames(MAX_PROGRAM_SECONDS, sample_rate) {
            return Err(MixError::ProgramTooLong {
                seconds: frames_to_seconds(total_frames, sample_rate),
                limit: MAX_PROGRAM_SECONDS,
            });
        }
        let total_seconds = frames_to_seconds(total_frames, sample_rate);

        let voice_span = spans
            .iter()
            .find(|(kind, _, _)| *kind == TrackKind::Voice)
            .map(|(_, buffer, span)| (*buffer, *span));

        let mut tracks = Vec::with_capacity(spans.len());
        for (kind, buffer, span) in spans {
            let placement = span.clamp_end(total_frames);
            let stages: SmallVec<[Stage; 3]> = match kind {
                TrackKind::Voice => smallvec![Stage::Gain(settings.voice_gain)],
                TrackKind::Effect => smallvec![Stage::Gain(settings.effect_gain)],
                TrackKind::Bgm => {
                    let mut fade = fade::fade_envelope(
                        &FadeSpec::from_settings(settings),
                        1.0,
                        placement.start_seconds(sample_rate),
                        placement.end_seconds(sample_rate),
                    );
                    fade.truncate(total_seconds);

                    let ducking = match voice_span {
                        Some((voice, voice_span)) if settings.ducking_enabled => {
                            let analysis = ducking::analyze(
                                &DuckingParams::from_settings(settings),
                                voice,
                                voice_span.start,
                                total_frames,
                                sample_rate,
                            );
                            let mut env = analysis.envelope;
                            env.truncate(total_seconds);
                            Some(env)
                        }
                        _ => None,
                    };

                    let mut stages = SmallVec::new();
                    if settings.has_eq() {
                        stages.push(Stage::Eq(EqGains {
                            low_db: settings.eq_low_db,
                            mid_db: settings.eq_mid_db,
                            high_db: settings.eq_high_db,
                        }));
                    }
                    stages.push(Stage::Gain(settings.bgm_gain));
                    stages.push(Stage::Automation(BgmAutomation { fade, ducking }));
                    stages
                }
            };

            debug!(
                track = %kind,
                placement = %placement,
                stages = ?stages.iter().map(Stage::name).collect::<Vec<_>>(),
                "track chain wired"
            );
            tracks.push(TrackChain {
                kind,
                buffer,
                placement,
                stages,
            });
        }

        Ok(Self {
            sample_rate,
            total_frames,
            master_gain: settings.master_gain,
            tracks,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Program length in frames.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Program length in seconds.
    pub fn total_duration_seconds(&self) -> f64 {
        frames_to_seconds(self.total_frames, self.sample_rate)
    }

    pub fn master_gain(&self) -> f64 {
        self.master_gain
    }

    /// Whether there is nothing to render.
    pub fn is_empty(&self) -> bool {
        self.total_frames == 0
    }

    /// All wired tracks, in mixing order.
    pub fn tracks(&self) -> &[TrackChain<'a>] {
        &self.tracks
    }

    /// The chain for `kind`, if that track is in the mix.
    pub fn track(&self, kind: TrackKind) -> Option<&TrackChain<'a>> {
        self.tracks.iter().find(|t| t.kind == kind)
    }

    /// Stage names of a track, in processing order.
    pub fn stage_names(&self, kind: TrackKind) -> Vec<&'static str> {
        self.track(kind)
            .map(|t| t.stages.iter().map(Stage::name).collect())
            .unwrap_or_default()
    }

    /// The BGM gain automation, if a BGM track is present.
    pub fn bgm_automation(&self) -> Option<&BgmAutomation> {
        self.track(TrackKind::Bgm)?
            .stages
            .iter()
            .find_map(|stage| match stage {
                Stage::Automation(a) => Some(a),
                _ => None,
            })
    }

    /// Effective BGM gain at `time` seconds: steady gain times automation.
    pub fn bgm_gain_at(&self, time: f64) -> Option<f64> {
        let track = self.track(TrackKind::Bgm)?;
        Some(track.stages.iter().fold(1.0, |gain, stage| match stage {
            Stage::Eq(_) => gain,
            Stage::Gain(g) => gain * g,
            Stage::Automation(a) => gain * a.gain_at(time),
        }))
    }
}
