//! 16-bit PCM WAV encoding of rendered mixes, and WAV decoding of inputs.

use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use castmix_core::{AudioBuffer, MixError, RenderResult, Result, OUTPUT_CHANNELS};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::debug;

/// Bit depth of encoded mixes.
pub const PCM_BITS: u16 = 16;

/// Convert one float sample to signed 16-bit PCM.
///
/// The sample is clamped to [-1.0, 1.0] first. Positive values scale by
/// 32767 and negative values by 32768, so both full-scale ends are reachable.
/// NaN encodes as silence.
pub fn quantize_sample(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    let s = sample.clamp(-1.0, 1.0);
    if s >= 0.0 {
        (s * 32767.0).round() as i16
    } else {
        (s * 32768.0).round() as i16
    }
}

fn output_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: OUTPUT_CHANNELS,
        sample_rate,
        bits_per_sample: PCM_BITS,
        sample_format: SampleFormat::Int,
    }
}

fn encoder_err(e: hound::Error) -> MixError {
    MixError::Encoder(e.to_string())
}

fn decoder_err(e: hound::Error) -> MixError {
    MixError::Decoder(e.to_string())
}

/// Write `result` as a stereo 16-bit WAV stream.
pub fn write_wav<W: Write + Seek>(result: &RenderResult, writer: W) -> Result<()> {
    if result.sample_rate == 0 {
        return Err(MixError::Encoder("sample rate must be non-zero".into()));
    }
    let mut wav = WavWriter::new(writer, output_spec(result.sample_rate)).map_err(encoder_err)?;
    for &s in &result.samples {
        wav.write_sample(quantize_sample(s)).map_err(encoder_err)?;
    }
    wav.finalize().map_err(encoder_err)
}

/// Encode `result` as a complete WAV file in memory.
///
/// An empty render encodes to a valid file with no audio data.
pub fn encode_wav(result: &RenderResult) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(44 + result.samples.len() * 2);
    write_wav(result, Cursor::new(&mut bytes))?;
    debug!(
        frames = result.frame_count(),
        bytes = bytes.len(),
        "encoded wav"
    );
    Ok(bytes)
}

/// Encode `result` and write it to `path`.
pub fn write_wav_file(result: &RenderResult, path: &Path) -> Result<()> {
    let bytes = encode_wav(result)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Decode a WAV stream into a planar float buffer.
///
/// Integer PCM of 8 to 32 bits is scaled into [-1.0, 1.0); 32-bit float
/// data is taken as is.
pub fn read_wav<R: Read>(reader: R) -> Result<AudioBuffer> {
    let mut wav = WavReader::new(reader).map_err(decoder_err)?;
    let spec = wav.spec();
    let data: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => wav
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(decoder_err)?,
        SampleFormat::Int => {
            if !(8..=32).contains(&spec.bits_per_sample) {
                return Err(MixError::Decoder(format!(
                    "unsupported bit depth {}",
                    spec.bits_per_sample
                )));
            }
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f64;
            wav.samples::<i32>()
                .map(|s| s.map(|v| (v as f64 * scale) as f32))
                .collect::<std::result::Result<_, _>>()
                .map_err(decoder_err)?
        }
    };

    debug!(
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        bits = spec.bits_per_sample,
        samples = data.len(),
        "decoded wav"
    );
    AudioBuffer::from_interleaved(spec.sample_rate, spec.channels as usize, &data)
}

/// Decode an in-memory WAV file.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer> {
    read_wav(Cursor::new(bytes))
}

/// Decode the WAV file at `path`.
pub fn decode_wav_file(path: &Path) -> Result<AudioBuffer> {
    let file = std::fs::File::open(path)?;
    read_wav(std::io::BufReader::new(file))
}
