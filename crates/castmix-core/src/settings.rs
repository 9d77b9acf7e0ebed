//! The flat value object describing one mix.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::envelope::Ramp;
use crate::error::{MixError, Result};

/// Largest per-track or master gain accepted (linear).
pub const MAX_GAIN: f64 = 2.0;

/// Largest EQ boost or cut accepted, in dB.
pub const MAX_EQ_DB: f64 = 24.0;

/// Longest program the engine will lay out, in seconds (24 hours).
///
/// Every duration, offset and trim is bounded by it, and the mix graph
/// rejects layouts whose combined end lands past it.
pub const MAX_PROGRAM_SECONDS: f64 = 86_400.0;

/// The three source tracks a mix can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Spoken announcement (TTS output).
    Voice,
    /// Background music.
    Bgm,
    /// One-shot sound effect (chime, jingle).
    Effect,
}

impl TrackKind {
    /// All track kinds in mixing order.
    pub const ALL: [Self; 3] = [Self::Voice, Self::Bgm, Self::Effect];

    /// Short lowercase name used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Voice => "voice",
            Self::Bgm => "bgm",
            Self::Effect => "effect",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything needed to describe one mix, independent of the audio itself.
///
/// Field names serialize in camelCase and every field has a default, so a
/// partial JSON document is a valid settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MixSettings {
    /// Linear gain of the voice track, in [0, 2].
    pub voice_gain: f64,
    /// Steady-state linear gain of the BGM track, in [0, 2].
    pub bgm_gain: f64,
    /// Linear gain of the effect track, in [0, 2].
    pub effect_gain: f64,
    /// Linear gain applied to the summed program, in [0, 2].
    pub master_gain: f64,

    /// BGM fade-in duration in seconds.
    pub fade_in: f64,
    /// BGM fade-out duration in seconds.
    pub fade_out: f64,
    /// Level the fade-in starts from, as a percentage of `bgm_gain`.
    pub fade_in_ratio: f64,
    /// Level the fade-out ends at, as a percentage of `bgm_gain`.
    pub fade_out_ratio: f64,
    /// Ramp shape of both fades.
    pub fade_curve: Ramp,

    /// Low-shelf gain in dB (100 Hz corner).
    pub eq_low_db: f64,
    /// Peaking gain in dB (1 kHz center).
    pub eq_mid_db: f64,
    /// High-shelf gain in dB (8 kHz corner).
    pub eq_high_db: f64,

    /// Lower BGM automatically while the voice is speaking.
    pub ducking_enabled: bool,
    /// Gain change applied to BGM during speech, in dB (≤ 0).
    pub duck_reduction_db: f64,
    /// Voice level above which a window counts as speech, in dBFS.
    pub duck_threshold_dbfs: f64,
    /// Time BGM takes to recover once speech stops, in seconds.
    pub duck_release_seconds: f64,

    /// How long BGM plays before the voice starts, in seconds.
    pub bgm_lead_seconds: f64,
    /// How long the program holds after the voice ends, in seconds.
    pub bgm_trail_seconds: f64,
    /// Voice placement on the raw timeline, in seconds.
    pub voice_offset_seconds: f64,
    /// Effect placement on the raw timeline, in seconds.
    pub effect_offset_seconds: f64,

    /// Hard end of the program in seconds. Truncates, never extends.
    pub trim_end_seconds: Option<f64>,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            voice_gain: 1.0,
            bgm_gain: 0.5,
            effect_gain: 1.0,
            master_gain: 1.0,
            fade_in: 0.0,
            fade_out: 0.0,
            fade_in_ratio: 0.0,
            fade_out_ratio: 0.0,
            fade_curve: Ramp::Exponential,
            eq_low_db: 0.0,
            eq_mid_db: 0.0,
            eq_high_db: 0.0,
            ducking_enabled: false,
            duck_reduction_db: -10.0,
            duck_threshold_dbfs: -42.0,
            duck_release_seconds: 0.2,
            bgm_lead_seconds: 0.0,
            bgm_trail_seconds: 0.0,
            voice_offset_seconds: 0.0,
            effect_offset_seconds: 0.0,
            trim_end_seconds: None,
        }
    }
}

impl MixSettings {
    /// Check every field, reporting the first violation by its camelCase name.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("voiceGain", self.voice_gain),
            ("bgmGain", self.bgm_gain),
            ("effectGain", self.effect_gain),
            ("masterGain", self.master_gain),
        ] {
            check_range(field, value, 0.0, MAX_GAIN)?;
        }

        for (field, value) in [
            ("fadeIn", self.fade_in),
            ("fadeOut", self.fade_out),
            ("duckReleaseSeconds", self.duck_release_seconds),
            ("bgmLeadSeconds", self.bgm_lead_seconds),
            ("bgmTrailSeconds", self.bgm_trail_seconds),
            ("voiceOffsetSeconds", self.voice_offset_seconds),
            ("effectOffsetSeconds", self.effect_offset_seconds),
        ] {
            check_range(field, value, 0.0, MAX_PROGRAM_SECONDS)?;
        }
        if let Some(trim) = self.trim_end_seconds {
            check_range("trimEndSeconds", trim, 0.0, MAX_PROGRAM_SECONDS)?;
        }

        check_range("fadeInRatio", self.fade_in_ratio, 0.0, 100.0)?;
        check_range("fadeOutRatio", self.fade_out_ratio, 0.0, 100.0)?;

        for (field, value) in [
            ("eqLowDb", self.eq_low_db),
            ("eqMidDb", self.eq_mid_db),
            ("eqHighDb", self.eq_high_db),
        ] {
            check_range(field, value, -MAX_EQ_DB, MAX_EQ_DB)?;
        }

        check_finite("duckReductionDb", self.duck_reduction_db)?;
        if self.duck_reduction_db > 0.0 {
            return Err(MixError::invalid(
                "duckReductionDb",
                format!("must be ≤ 0 dB, got {}", self.duck_reduction_db),
            ));
        }
        check_finite("duckThresholdDbfs", self.duck_threshold_dbfs)?;
        if self.duck_threshold_dbfs > 0.0 {
            return Err(MixError::invalid(
                "duckThresholdDbfs",
                format!("must be ≤ 0 dBFS, got {}", self.duck_threshold_dbfs),
            ));
        }

        Ok(())
    }

    /// Static linear gain of a track.
    pub fn track_gain(&self, kind: TrackKind) -> f64 {
        match kind {
            TrackKind::Voice => self.voice_gain,
            TrackKind::Bgm => self.bgm_gain,
            TrackKind::Effect => self.effect_gain,
        }
    }

    /// Linear BGM multiplier while ducked.
    pub fn duck_multiplier(&self) -> f64 {
        10f64.powf(self.duck_reduction_db / 20.0)
    }

    /// Whether any EQ band is away from 0 dB.
    pub fn has_eq(&self) -> bool {
        self.eq_low_db != 0.0 || self.eq_mid_db != 0.0 || self.eq_high_db != 0.0
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(MixError::invalid(field, format!("must be finite, got {}", value)))
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    check_finite(field, value)?;
    if value < min || value > max {
        return Err(MixError::invalid(
            field,
            format!("must be in [{}, {}], got {}", min, max, value),
        ));
    }
    Ok(())
}
