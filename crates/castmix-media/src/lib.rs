//! Castmix Media - Containers and files around the mixing engine
//!
//! This crate handles:
//! - Encoding rendered mixes to 16-bit PCM WAV
//! - Decoding WAV inputs into `AudioBuffer`s
//! - Versioned JSON settings files

pub mod settings_file;
pub mod wav;

pub use settings_file::SettingsFile;
pub use wav::{decode_wav, decode_wav_file, encode_wav, quantize_sample, write_wav_file};
