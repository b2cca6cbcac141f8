//! tunegen - melodic fingerprint generator
//!
//! Usage: tunegen [--config tunetrace.toml] <input_audio_path>

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tunetrace_cli::audio::{decode_audio, split_windows};
use tunetrace_core::{process_audio, RecognitionError, TuneConfig};

#[derive(Parser, Debug)]
#[command(name = "tunegen")]
#[command(about = "Print the melodic fingerprint of an audio file as JSON", long_about = None)]
struct Args {
    /// Input audio file path
    input_audio_path: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Analyse at most this many seconds from the start
    #[arg(short, long)]
    seconds: Option<f64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tunetrace_cli::init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => TuneConfig::load(path)?,
        None => TuneConfig::default(),
    };

    run_tunegen(&args.input_audio_path, args.seconds, &config)
}

fn run_tunegen(input_path: &Path, seconds: Option<f64>, config: &TuneConfig) -> Result<()> {
    let start = std::time::Instant::now();

    let mut audio = decode_audio(input_path)?;
    if let Some(seconds) = seconds {
        audio.truncate(seconds);
    }

    let windows = split_windows(&audio.samples, config.window_size);
    log::info!("Processing {} windows of {} samples", windows.len(), config.window_size);

    let (fingerprint, note) = match process_audio(&windows, audio.sample_rate, config) {
        Ok(fingerprint) => (fingerprint, None),
        Err(e @ RecognitionError::InsufficientInput { .. }) => (String::new(), Some(e.to_string())),
        Err(e) => return Err(e.into()),
    };

    let elapsed = start.elapsed();
    log::info!("Generated {}-character fingerprint in {:.2}s", fingerprint.len(), elapsed.as_secs_f64());

    let mut result = serde_json::json!({
        "status": "success",
        "input_file": input_path.display().to_string(),
        "sample_rate": audio.sample_rate,
        "duration_seconds": audio.duration_secs(),
        "fingerprint": fingerprint,
        "length": fingerprint.len(),
        "processing_time_seconds": elapsed.as_secs_f64(),
    });
    if let Some(note) = note {
        result["note"] = note.into();
    }

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
