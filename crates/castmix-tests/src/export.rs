//! Render-to-WAV pipeline: determinism, PCM range and settings files.

use std::sync::Arc;

use castmix_audio::MixInputs;
use castmix_core::{AudioBuffer, MixSettings};
use castmix_media::{decode_wav, encode_wav, quantize_sample, SettingsFile};

use crate::fixtures::{constant, podcast_settings, render, sine, SR};

fn busy_inputs() -> MixInputs {
    MixInputs::new()
        .with_voice(sine(SR, 3.0, 440.0, 0.5))
        .with_bgm(sine(SR, 6.0, 110.0, 0.4))
        .with_effect(sine(SR, 0.5, 1_500.0, 0.3))
}

fn busy_settings() -> MixSettings {
    MixSettings {
        ducking_enabled: true,
        eq_low_db: 4.0,
        eq_mid_db: -3.0,
        eq_high_db: 2.0,
        effect_offset_seconds: 1.0,
        ..podcast_settings()
    }
}

#[test]
fn identical_inputs_encode_identical_bytes() {
    let inputs = busy_inputs();
    let settings = busy_settings();
    let first = encode_wav(&render(&inputs, &settings, SR)).unwrap();
    let second = encode_wav(&render(&inputs, &settings, SR)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn hot_mix_clamps_in_pcm_but_reports_true_peak() {
    let inputs = MixInputs::new()
        .with_voice(constant(SR, 1.0, 1.0))
        .with_bgm(constant(SR, 1.0, -1.0));
    let settings = MixSettings {
        voice_gain: 2.0,
        bgm_gain: 0.0,
        master_gain: 2.0,
        ..MixSettings::default()
    };
    let result = render(&inputs, &settings, SR);
    assert_eq!(result.peak_amplitude, 4.0);
    assert!(result.peak_dbfs().unwrap() > 12.0);

    let decoded = decode_wav(&encode_wav(&result).unwrap()).unwrap();
    assert_eq!(decoded.channel_count(), 2);
    for ch in 0..2 {
        let samples = decoded.channel(ch).unwrap();
        assert!(samples.iter().all(|&s| s == 32767.0 / 32768.0));
    }
}

#[test]
fn encoded_mix_decodes_to_quantized_samples() {
    let result = render(&busy_inputs(), &busy_settings(), SR);
    let decoded = decode_wav(&encode_wav(&result).unwrap()).unwrap();

    assert_eq!(decoded.sample_rate(), SR);
    assert_eq!(decoded.sample_count(), result.frame_count());
    let left = decoded.channel(0).unwrap();
    let right = decoded.channel(1).unwrap();
    for (i, pair) in result.samples.chunks_exact(2).enumerate().step_by(997) {
        assert_eq!(left[i], quantize_sample(pair[0]) as f32 / 32768.0);
        assert_eq!(right[i], quantize_sample(pair[1]) as f32 / 32768.0);
    }
}

#[test]
fn stereo_input_keeps_sides_and_mono_is_centered() {
    let stereo = AudioBuffer::new(SR, vec![vec![0.25; 100], vec![-0.5; 100]]).unwrap();
    let result = render(
        &MixInputs::new().with_voice(Arc::new(stereo)),
        &MixSettings::default(),
        SR,
    );
    assert_eq!(&result.samples[..4], &[0.25, -0.5, 0.25, -0.5]);

    let result = render(
        &MixInputs::new().with_voice(constant(SR, 0.01, 0.3)),
        &MixSettings::default(),
        SR,
    );
    assert!(result.samples.chunks_exact(2).all(|f| f[0] == f[1]));
}

#[test]
fn settings_file_drives_render() {
    let json = br#"{
        "version": 1,
        "settings": {
            "bgmGain": 0.25,
            "bgmLeadSeconds": 1.0,
            "fadeIn": 0.5,
            "fadeCurve": "linear"
        }
    }"#;
    let file = SettingsFile::from_json(json).unwrap();
    let inputs = MixInputs::new()
        .with_voice(constant(SR, 1.0, 0.0))
        .with_bgm(constant(SR, 3.0, 0.8));

    let result = render(&inputs, &file.settings, SR);
    assert_eq!(result.frame_count(), 3 * SR as usize);
    // Halfway through the linear fade-in, then steady.
    let mid = (0.25 * SR as f64) as usize;
    assert!((result.samples[mid * 2] - 0.8 * 0.125).abs() < 1e-6);
    assert!((result.samples[2 * SR as usize * 2] - 0.2).abs() < 1e-6);

    let reloaded = SettingsFile::from_json(&file.to_json().unwrap()).unwrap();
    assert_eq!(reloaded.settings, file.settings);
}

#[test]
fn empty_mix_is_a_valid_wav() {
    let result = render(&MixInputs::new(), &MixSettings::default(), SR);
    let bytes = encode_wav(&result).unwrap();
    let decoded = decode_wav(&bytes).unwrap();
    assert_eq!(decoded.sample_count(), 0);
    assert_eq!(decoded.sample_rate(), SR);
}
