//! tunematch - identify a tune against a JSON index
//!
//! Usage: tunematch [--config cfg.toml] <index.json> <audio | --fingerprint S>

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tunetrace_cli::audio::{decode_audio, split_windows};
use tunetrace_cli::output;
use tunetrace_core::{FilesystemProvider, Recognizer, TuneConfig};

#[derive(Parser, Debug)]
#[command(name = "tunematch")]
#[command(about = "Match an audio file or fingerprint against a tune index", long_about = None)]
struct Args {
    /// Tune index (JSON)
    index: PathBuf,

    /// Query audio file
    #[arg(required_unless_present = "fingerprint", conflicts_with = "fingerprint")]
    audio: Option<PathBuf>,

    /// Search this fingerprint instead of analysing audio
    #[arg(short, long)]
    fingerprint: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Analyse at most this many seconds from the start
    #[arg(short, long)]
    seconds: Option<f64>,

    /// Warn when the index is older than this many days
    #[arg(long, default_value_t = tunetrace_index::DEFAULT_MAX_AGE_DAYS)]
    max_age_days: i64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tunetrace_cli::init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => TuneConfig::load(path)?,
        None => TuneConfig::default(),
    };

    let provider = FilesystemProvider::new(&args.index).with_max_age_days(args.max_age_days);
    let recognizer = Recognizer::from_provider(config, &provider).await?;

    let (query, outcome) = match (&args.fingerprint, &args.audio) {
        (Some(fingerprint), _) => {
            log::info!("Searching fingerprint {}", fingerprint);
            (fingerprint.clone(), recognizer.identify_fingerprint(fingerprint.clone()).await)
        }
        (None, Some(path)) => {
            let mut audio = decode_audio(path)?;
            if let Some(seconds) = args.seconds {
                audio.truncate(seconds);
            }
            let windows = split_windows(&audio.samples, recognizer.config().window_size);
            (
                path.display().to_string(),
                recognizer.identify(windows, audio.sample_rate).await,
            )
        }
        (None, None) => anyhow::bail!("Either an audio file or --fingerprint is required"),
    };

    output::print_search(&query, &outcome, recognizer.index());

    Ok(())
}
