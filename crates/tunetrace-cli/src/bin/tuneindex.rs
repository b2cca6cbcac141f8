//! tuneindex - build a tune index from a directory of recordings
//!
//! Usage: tuneindex [--append] <audio_dir> <index.json>

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tunetrace_cli::audio::{decode_audio, split_windows, AudioFormat};
use tunetrace_core::{process_audio, TuneConfig};
use tunetrace_index::{IndexReader, IndexRecord, IndexWriter, TuneIndexFile};

#[derive(Parser, Debug)]
#[command(name = "tuneindex")]
#[command(about = "Fingerprint a directory of audio files into a JSON tune index", long_about = None)]
struct Args {
    /// Directory holding one recording per tune
    audio_dir: PathBuf,

    /// Output index file
    index: PathBuf,

    /// Add to an existing index instead of replacing it
    #[arg(short, long)]
    append: bool,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Analyse at most this many seconds of each file
    #[arg(short, long)]
    seconds: Option<f64>,

    /// Write compact JSON
    #[arg(long)]
    compact: bool,

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

    let start = std::time::Instant::now();

    let files = audio_files(&args.audio_dir)?;
    log::info!("Found {} audio files in {}", files.len(), args.audio_dir.display());

    let records: Vec<IndexRecord> = files
        .par_iter()
        .filter_map(|path| match fingerprint_file(path, args.seconds, &config) {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                log::warn!("Skipping {}: no searchable melody", path.display());
                None
            }
            Err(e) => {
                log::warn!("Skipping {}: {:#}", path.display(), e);
                None
            }
        })
        .collect();

    let mut index = if args.append && args.index.exists() {
        IndexReader::read(&args.index)?
    } else {
        TuneIndexFile::new()
    };
    for record in &records {
        index.add_record(record);
    }
    let index = index.with_fetched_at(Utc::now());

    let writer = if args.compact {
        IndexWriter::new().compact()
    } else {
        IndexWriter::new()
    };
    writer.write(&args.index, &index)?;

    let elapsed = start.elapsed();
    log::info!("Indexed {} of {} files in {:.2}s", records.len(), files.len(), elapsed.as_secs_f64());

    let result = serde_json::json!({
        "status": "success",
        "audio_dir": args.audio_dir.display().to_string(),
        "index_file": args.index.display().to_string(),
        "files_found": files.len(),
        "tunes_indexed": records.len(),
        "tunes_total": index.len(),
        "processing_time_seconds": elapsed.as_secs_f64(),
    });
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

/// Supported audio files directly inside `dir`, sorted by name
fn audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && AudioFormat::from_path(path).is_supported())
        .collect();
    files.sort();

    Ok(files)
}

/// Index record of one file; `None` when the melody is too short to search
fn fingerprint_file(path: &Path, seconds: Option<f64>, config: &TuneConfig) -> Result<Option<IndexRecord>> {
    let mut audio = decode_audio(path)?;
    if let Some(seconds) = seconds {
        audio.truncate(seconds);
    }

    let windows = split_windows(&audio.samples, config.window_size);
    let fingerprint = process_audio(&windows, audio.sample_rate, config)
        .with_context(|| format!("Failed to fingerprint {}", path.display()))?;

    if fingerprint.chars().count() < config.min_searchable_len {
        return Ok(None);
    }

    let identifier = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("File name is not valid UTF-8: {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    log::info!("{}: {} characters", identifier, fingerprint.len());

    Ok(Some(IndexRecord::new(identifier, fingerprint).with_metadata(serde_json::json!({
        "file": file_name,
        "sample_rate": audio.sample_rate,
        "duration_seconds": audio.duration_secs(),
    }))))
}
