//! Castmix - offline voice/BGM/effect mixdown
//!
//! Entry point for the `castmix` command-line tool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use castmix_audio::{MixInputs, MixSession};
use castmix_core::{AudioBuffer, MixSettings, DEFAULT_SAMPLE_RATE};
use castmix_media::{decode_wav_file, write_wav_file, SettingsFile};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Render(args) => execute_render(args),
        Commands::Defaults => print_defaults(),
    }
}

#[derive(Parser)]
#[command(author, version, about = "Offline voice, music and effect mixdown")]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render WAV inputs to a stereo 16-bit WAV mixdown.
    Render(RenderArgs),
    /// Print the default settings file.
    Defaults,
}

#[derive(Args)]
struct RenderArgs {
    /// Narration track.
    #[arg(long)]
    voice: Option<PathBuf>,
    /// Background music track.
    #[arg(long)]
    bgm: Option<PathBuf>,
    /// Sound effect track.
    #[arg(long)]
    effect: Option<PathBuf>,
    /// Settings file (JSON). Defaults are used when omitted.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Output path for the mixdown.
    #[arg(long)]
    out: PathBuf,
    /// Output sample rate. Every input must already be at this rate.
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}

fn load_track(path: Option<&Path>, name: &str) -> Result<Option<AudioBuffer>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let buffer = decode_wav_file(path)
        .with_context(|| format!("failed to read {} track {}", name, path.display()))?;
    info!(
        track = name,
        path = %path.display(),
        seconds = buffer.duration_seconds(),
        sample_rate = buffer.sample_rate(),
        channels = buffer.channel_count(),
        "loaded track"
    );
    Ok(Some(buffer))
}

fn load_settings(path: Option<&Path>) -> Result<MixSettings> {
    match path {
        Some(path) => {
            let file = SettingsFile::load_from_file(path)
                .with_context(|| format!("{} is not a valid settings file", path.display()))?;
            Ok(file.settings)
        }
        None => Ok(MixSettings::default()),
    }
}

fn execute_render(args: RenderArgs) -> Result<()> {
    if args.voice.is_none() && args.bgm.is_none() && args.effect.is_none() {
        bail!("nothing to mix: pass at least one of --voice, --bgm, --effect");
    }

    let settings = load_settings(args.settings.as_deref())?;
    let mut inputs = MixInputs::new();
    if let Some(voice) = load_track(args.voice.as_deref(), "voice")? {
        inputs = inputs.with_voice(voice);
    }
    if let Some(bgm) = load_track(args.bgm.as_deref(), "bgm")? {
        inputs = inputs.with_bgm(bgm);
    }
    if let Some(effect) = load_track(args.effect.as_deref(), "effect")? {
        inputs = inputs.with_effect(effect);
    }

    let session = Arc::new(MixSession::new(args.sample_rate));
    let handle = session
        .spawn(inputs, settings)
        .context("failed to start render")?;

    let mut last_decile = 0;
    for progress in handle.progress().iter() {
        let decile = (progress.fraction() * 10.0) as u32;
        if decile > last_decile {
            last_decile = decile;
            debug!("render {}%", decile * 10);
        }
    }
    let result = handle.wait().context("render failed")?;

    write_wav_file(&result, &args.out)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    let peak = match result.peak_dbfs() {
        Some(db) => format!("{:.2} dBFS", db),
        None => "silent".to_string(),
    };
    println!(
        "{}: {:.3} s at {} Hz, peak {:.4} ({})",
        args.out.display(),
        result.total_duration_seconds,
        result.sample_rate,
        result.peak_amplitude,
        peak
    );
    if result.peak_amplitude > 1.0 {
        info!("mix exceeds full scale and was clipped in the output file");
    }
    Ok(())
}

fn print_defaults() -> Result<()> {
    let json = SettingsFile::new(MixSettings::default()).to_json()?;
    println!("{}", String::from_utf8(json)?);
    Ok(())
}
