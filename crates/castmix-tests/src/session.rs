//! Render sessions: background renders, progress and cancellation.

use std::sync::Arc;

use castmix_audio::{render_mix, MixInputs, MixSession, RenderCancel};
use castmix_core::MixSettings;

use crate::fixtures::{constant, podcast_settings, sine};

const SR: u32 = 8_000;

fn long_inputs() -> MixInputs {
    MixInputs::new()
        .with_voice(constant(SR, 600.0, 0.1))
        .with_bgm(constant(SR, 600.0, 0.1))
}

#[test]
fn background_render_reports_progress() {
    let session = Arc::new(MixSession::new(SR));
    let inputs = MixInputs::new()
        .with_voice(sine(SR, 4.0, 300.0, 0.3))
        .with_bgm(sine(SR, 8.0, 80.0, 0.3));
    let handle = session.spawn(inputs, podcast_settings()).unwrap();

    let updates: Vec<_> = handle.progress().iter().collect();
    let result = handle.wait().unwrap();

    assert_eq!(result.frame_count(), 8 * SR as usize);
    assert!(!updates.is_empty());
    assert!(updates
        .windows(2)
        .all(|w| w[0].frames_rendered < w[1].frames_rendered));
    assert_eq!(updates.last().map(|p| p.fraction()), Some(1.0));
    assert!(!session.is_busy());
}

#[test]
fn background_matches_foreground() {
    let inputs = MixInputs::new()
        .with_voice(sine(SR, 2.0, 300.0, 0.3))
        .with_bgm(sine(SR, 5.0, 80.0, 0.3));
    let settings = MixSettings {
        ducking_enabled: true,
        eq_high_db: -6.0,
        ..podcast_settings()
    };

    let session = Arc::new(MixSession::new(SR));
    let background = session
        .spawn(inputs.clone(), settings.clone())
        .unwrap()
        .wait()
        .unwrap();
    let foreground = session.render(&inputs, &settings, |_| {}).unwrap();
    assert_eq!(background, foreground);
}

#[test]
fn cancelled_render_yields_no_audio() {
    let session = Arc::new(MixSession::new(SR));
    let handle = session.spawn(long_inputs(), MixSettings::default()).unwrap();
    handle.cancel();
    assert!(handle.wait().unwrap_err().is_cancelled());
}

#[test]
fn session_cancel_reaches_background_render() {
    let session = Arc::new(MixSession::new(SR));
    let handle = session.spawn(long_inputs(), MixSettings::default()).unwrap();
    session.cancel();
    assert!(handle.wait().unwrap_err().is_cancelled());
    assert!(!session.is_busy());
}

#[test]
fn newer_render_supersedes_older() {
    let session = Arc::new(MixSession::new(SR));
    let stale = session.spawn(long_inputs(), MixSettings::default()).unwrap();
    let fresh = session
        .spawn(
            MixInputs::new().with_voice(constant(SR, 1.0, 0.1)),
            MixSettings::default(),
        )
        .unwrap();

    assert!(stale.wait().unwrap_err().is_cancelled());
    assert_eq!(fresh.wait().unwrap().frame_count(), SR as usize);
}

#[test]
fn pre_cancelled_token_renders_nothing() {
    let cancel = RenderCancel::new();
    cancel.cancel();
    let mut calls = 0;
    let err = render_mix(
        &MixInputs::new().with_voice(constant(SR, 1.0, 0.1)),
        &MixSettings::default(),
        SR,
        &cancel,
        |_| calls += 1,
    )
    .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(calls, 0);
}
