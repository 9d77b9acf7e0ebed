//! End-to-end mix layouts: placement, fades, ducking, EQ and trims.

use castmix_audio::{ducking, MixGraph, MixInputs};
use castmix_core::{MixError, MixSettings, Ramp, TrackKind};

use crate::fixtures::{constant, frame, podcast_settings, render, sine, SR};

fn at(seconds: f64) -> usize {
    (seconds * SR as f64).round() as usize
}

#[test]
fn narration_over_music_layout() {
    // 5 s voice over 12 s of music, music starting 2 s early.
    let inputs = MixInputs::new()
        .with_voice(constant(SR, 5.0, 0.1))
        .with_bgm(constant(SR, 12.0, 0.2));
    let settings = podcast_settings();

    let graph = MixGraph::build(&inputs, &settings, SR).unwrap();
    assert_eq!(graph.total_duration_seconds(), 12.0);
    let voice = graph.track(TrackKind::Voice).unwrap().placement;
    assert_eq!((voice.start, voice.end), (at(2.0) as u64, at(7.0) as u64));
    assert!(graph.bgm_gain_at(0.0).unwrap() < 1e-3);
    assert!((graph.bgm_gain_at(1.0).unwrap() - 0.5).abs() < 1e-12);
    assert!(graph.bgm_gain_at(12.0).unwrap() < 1e-3);

    let result = render(&inputs, &settings, SR);
    assert_eq!(result.frame_count(), at(12.0));
    assert_eq!(result.total_duration_seconds, 12.0);

    let (l, r) = frame(&result, 0);
    assert!(l.abs() < 1e-4 && r.abs() < 1e-4);
    // Music alone at steady gain before the voice comes in.
    assert!((frame(&result, at(1.9)).0 - 0.1).abs() < 1e-6);
    // Voice plus music.
    let (l, r) = frame(&result, at(5.0));
    assert!((l - 0.2).abs() < 1e-6);
    assert_eq!(l, r);
    // Voice window is half-open; music alone again from 7 s.
    assert!((frame(&result, at(7.0)).0 - 0.1).abs() < 1e-6);
    assert!(frame(&result, at(12.0) - 1).0.abs() < 1e-3);
}

#[test]
fn voice_ducks_music_and_releases() {
    let voice = sine(SR, 5.0, 440.0, 0.5);
    let inputs = MixInputs::new()
        .with_voice(voice.clone())
        .with_bgm(constant(SR, 12.0, 0.2));
    let settings = MixSettings {
        ducking_enabled: true,
        duck_reduction_db: -10.0,
        duck_threshold_dbfs: -42.0,
        duck_release_seconds: 0.2,
        ..podcast_settings()
    };
    let m = 10f64.powf(-0.5);

    let graph = MixGraph::build(&inputs, &settings, SR).unwrap();
    assert_eq!(graph.stage_names(TrackKind::Bgm), vec!["gain", "fade+ducking"]);
    let gain = |t: f64| graph.bgm_gain_at(t).unwrap();

    assert!((gain(1.5) - 0.5).abs() < 1e-12);
    assert!((gain(1.99) - 0.5).abs() < 1e-12);
    assert!((gain(2.0) - 0.5 * m).abs() < 1e-9);
    assert!((gain(4.5) - 0.5 * m).abs() < 1e-9);
    assert!((gain(6.99) - 0.5 * m).abs() < 1e-9);
    // Halfway up the release ramp, then fully back within 0.2 s.
    assert!((gain(7.1) - 0.5 * (m + (1.0 - m) * 0.5)).abs() < 1e-6);
    assert!((gain(7.25) - 0.5).abs() < 1e-9);
    assert!((gain(10.0) - 0.5).abs() < 1e-9);

    let analysis = ducking::analyze(
        &castmix_audio::DuckingParams::from_settings(&settings),
        &voice,
        at(2.0) as u64,
        at(12.0) as u64,
        SR,
    );
    assert_eq!(analysis.active_windows(), 250);

    // The ducked render differs from the plain one only by the music reduction.
    let ducked = render(&inputs, &settings, SR);
    let plain = render(
        &inputs,
        &MixSettings {
            ducking_enabled: false,
            ..settings.clone()
        },
        SR,
    );
    let i = at(4.5);
    let diff = (plain.samples[i * 2] - ducked.samples[i * 2]) as f64;
    assert!((diff - 0.1 * (1.0 - m)).abs() < 1e-5);
    assert_eq!(frame(&ducked, at(8.0)), frame(&plain, at(8.0)));
}

#[test]
fn ducking_without_speech_matches_fade_only() {
    let inputs = MixInputs::new()
        .with_voice(constant(SR, 3.0, 0.0))
        .with_bgm(sine(SR, 6.0, 220.0, 0.4));
    let fade_only = podcast_settings();
    let ducking = MixSettings {
        ducking_enabled: true,
        ..podcast_settings()
    };

    let graph = MixGraph::build(&inputs, &ducking, SR).unwrap();
    assert_eq!(graph.stage_names(TrackKind::Bgm), vec!["gain", "fade+ducking"]);
    let graph = MixGraph::build(&inputs, &fade_only, SR).unwrap();
    assert_eq!(graph.stage_names(TrackKind::Bgm), vec!["gain", "fade"]);

    assert_eq!(render(&inputs, &ducking, SR), render(&inputs, &fade_only, SR));
}

#[test]
fn full_ratio_fades_leave_music_untouched() {
    let inputs = MixInputs::new().with_bgm(sine(SR, 4.0, 330.0, 0.6));
    let steady = render(&inputs, &MixSettings::default(), SR);

    for curve in [Ramp::Linear, Ramp::Exponential] {
        let settings = MixSettings {
            fade_in: 1.5,
            fade_out: 1.5,
            fade_in_ratio: 100.0,
            fade_out_ratio: 100.0,
            fade_curve: curve,
            ..MixSettings::default()
        };
        assert_eq!(render(&inputs, &settings, SR).samples, steady.samples);
    }
}

#[test]
fn trim_cuts_program_and_lands_fade_out() {
    let inputs = MixInputs::new()
        .with_voice(constant(SR, 5.0, 0.1))
        .with_bgm(constant(SR, 12.0, 0.2));
    let settings = MixSettings {
        trim_end_seconds: Some(3.5),
        fade_curve: Ramp::Linear,
        ..podcast_settings()
    };

    let graph = MixGraph::build(&inputs, &settings, SR).unwrap();
    assert_eq!(graph.total_frames(), at(3.5) as u64);
    assert_eq!(graph.bgm_gain_at(2.5), Some(0.5));
    assert!((graph.bgm_gain_at(3.0).unwrap() - 0.25).abs() < 1e-12);
    assert_eq!(graph.bgm_gain_at(3.5), Some(0.0));

    let result = render(&inputs, &settings, SR);
    assert_eq!(result.frame_count(), at(3.5));
    assert_eq!(result.total_duration_seconds, 3.5);
}

#[test]
fn trim_longer_than_program_is_ignored() {
    let inputs = MixInputs::new().with_voice(constant(SR, 2.0, 0.1));
    let settings = MixSettings {
        trim_end_seconds: Some(30.0),
        ..MixSettings::default()
    };
    assert_eq!(render(&inputs, &settings, SR).frame_count(), at(2.0));
}

#[test]
fn effect_is_placed_on_voice_axis() {
    let inputs = MixInputs::new()
        .with_voice(constant(SR, 2.0, 0.1))
        .with_effect(constant(SR, 0.5, 0.3));
    let settings = MixSettings {
        voice_offset_seconds: 1.0,
        effect_offset_seconds: 0.0,
        effect_gain: 0.5,
        ..MixSettings::default()
    };

    let result = render(&inputs, &settings, SR);
    assert_eq!(result.frame_count(), at(3.0));
    assert!((frame(&result, at(0.25)).0 - 0.15).abs() < 1e-6);
    assert_eq!(frame(&result, at(0.75)), (0.0, 0.0));
    assert!((frame(&result, at(1.5)).0 - 0.1).abs() < 1e-6);
}

#[test]
fn master_gain_scales_everything() {
    let inputs = MixInputs::new()
        .with_voice(constant(SR, 1.0, 0.2))
        .with_bgm(constant(SR, 1.0, 0.2));
    let settings = MixSettings {
        master_gain: 0.5,
        ..MixSettings::default()
    };
    let result = render(&inputs, &settings, SR);
    // (0.2 + 0.2 * 0.5) * 0.5
    assert!((frame(&result, at(0.5)).0 - 0.15).abs() < 1e-6);
    assert!((result.peak_amplitude - 0.15).abs() < 1e-6);
}

#[test]
fn eq_shapes_music_only() {
    let inputs = MixInputs::new()
        .with_voice(sine(SR, 2.0, 50.0, 0.2))
        .with_bgm(sine(SR, 2.0, 50.0, 0.2));
    let boosted = MixSettings {
        eq_low_db: 12.0,
        ..MixSettings::default()
    };

    let graph = MixGraph::build(&inputs, &boosted, SR).unwrap();
    assert_eq!(graph.stage_names(TrackKind::Bgm), vec!["eq", "gain", "fade"]);
    assert_eq!(graph.stage_names(TrackKind::Voice), vec!["gain"]);

    let voice_only = MixInputs::new().with_voice(sine(SR, 2.0, 50.0, 0.2));
    assert_eq!(
        render(&voice_only, &boosted, SR),
        render(&voice_only, &MixSettings::default(), SR)
    );

    let bgm_only = MixInputs::new().with_bgm(sine(SR, 2.0, 50.0, 0.2));
    let flat = render(&bgm_only, &MixSettings::default(), SR);
    let loud = render(&bgm_only, &boosted, SR);
    assert!(loud.peak_amplitude > flat.peak_amplitude * 2.5);
}

#[test]
fn mismatched_sample_rate_is_rejected() {
    let inputs = MixInputs::new()
        .with_voice(constant(48_000, 1.0, 0.1))
        .with_bgm(constant(SR, 1.0, 0.1));
    match MixGraph::build(&inputs, &MixSettings::default(), SR) {
        Err(MixError::SampleRateMismatch {
            track,
            expected,
            found,
        }) => {
            assert_eq!(track, "voice");
            assert_eq!(expected, SR);
            assert_eq!(found, 48_000);
        }
        other => panic!("expected a sample rate mismatch, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn zero_length_tracks_count_as_absent() {
    let inputs = MixInputs::new()
        .with_voice(constant(SR, 1.0, 0.1))
        .with_bgm(constant(48_000, 0.0, 0.0));
    let settings = MixSettings {
        bgm_lead_seconds: 2.0,
        bgm_trail_seconds: 1.0,
        ..MixSettings::default()
    };
    let graph = MixGraph::build(&inputs, &settings, SR).unwrap();
    assert!(graph.track(TrackKind::Bgm).is_none());
    // No music means no lead and no trail.
    assert_eq!(graph.total_frames(), at(1.0) as u64);
}

#[test]
fn empty_program_renders_empty() {
    let result = render(&MixInputs::new(), &MixSettings::default(), SR);
    assert!(result.is_empty());
    assert_eq!(result.total_duration_seconds, 0.0);
    assert_eq!(result.peak_amplitude, 0.0);

    let silent = MixInputs::new().with_voice(constant(SR, 0.0, 0.0));
    assert!(render(&silent, &MixSettings::default(), SR).is_empty());
}

#[test]
fn invalid_settings_fail_before_rendering() {
    let inputs = MixInputs::new().with_voice(constant(SR, 1.0, 0.1));
    let settings = MixSettings {
        fade_in_ratio: 150.0,
        ..MixSettings::default()
    };
    match MixGraph::build(&inputs, &settings, SR) {
        Err(MixError::InvalidSettings { field, .. }) => assert_eq!(field, "fadeInRatio"),
        other => panic!("expected invalid settings, got {:?}", other.map(|_| ())),
    }
}
