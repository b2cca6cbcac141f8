//! Asynchronous recognition pipeline
//!
//! Runs analysis, decoding and search as blocking tasks on the tokio runtime,
//! one after the other, and applies each completion through the
//! [`SearchSession`]. Completions of superseded requests are dropped.

use crate::config::TuneConfig;
use crate::contour::ContourEncoder;
use crate::error::RecognitionError;
use crate::fingerprint::is_valid_fingerprint;
use crate::index_provider::IndexProvider;
use crate::lattice::LatticeDecoder;
use crate::matching::{Matcher, RankedMatch};
use crate::session::{RecordPress, SearchSession, SessionStatus, Ticket, TransitionError};
use crate::transform::{EnergyFrames, SpectralAnalyzer};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tunetrace_index::IndexRecord;

/// What a finished request reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub request: u64,
    pub fingerprint: String,
    pub matches: Vec<RankedMatch>,
    /// Set when the request failed; the result is then empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when a newer request superseded this one
    #[serde(default)]
    pub discarded: bool,
}

impl Outcome {
    fn empty(request: u64) -> Self {
        Self {
            request,
            fingerprint: String::new(),
            matches: Vec::new(),
            error: None,
            discarded: false,
        }
    }
}

/// Owns the analyzer, the index and the session
pub struct Recognizer {
    config: Arc<TuneConfig>,
    analyzer: Arc<Mutex<SpectralAnalyzer>>,
    index: Arc<[IndexRecord]>,
    session: Mutex<SearchSession>,
}

impl Recognizer {
    pub fn new(config: TuneConfig, index: Arc<[IndexRecord]>) -> Self {
        Self {
            analyzer: Arc::new(Mutex::new(SpectralAnalyzer::new(&config))),
            config: Arc::new(config),
            index,
            session: Mutex::new(SearchSession::new()),
        }
    }

    /// Load the index from a provider
    pub async fn from_provider(config: TuneConfig, provider: &dyn IndexProvider) -> Result<Self> {
        let records = provider
            .load_records()
            .await
            .with_context(|| format!("Failed to load index from {}", provider.describe()))?;
        log::info!("Loaded {} tunes from {}", records.len(), provider.describe());
        Ok(Self::new(config, records.into()))
    }

    pub fn config(&self) -> &TuneConfig {
        &self.config
    }

    pub fn index(&self) -> &[IndexRecord] {
        &self.index
    }

    pub async fn status(&self) -> SessionStatus {
        self.session.lock().await.status()
    }

    /// Record control of the front end
    pub async fn press_record(&self) -> std::result::Result<RecordPress, TransitionError> {
        let mut session = self.session.lock().await;
        if session.status() == SessionStatus::Displaying {
            session.dismiss()?;
        }
        session.press_record()
    }

    /// Abandon the request in flight
    pub async fn cancel(&self) {
        self.session.lock().await.cancel();
    }

    /// Identify imported audio
    pub async fn identify(&self, windows: Vec<Vec<f32>>, sample_rate: u32) -> Outcome {
        match self.start_import().await {
            Ok(ticket) => self.identify_recording(ticket, windows, sample_rate).await,
            Err(e) => self.rejected(e),
        }
    }

    /// Identify audio captured under `ticket`
    pub async fn identify_recording(&self, ticket: Ticket, windows: Vec<Vec<f32>>, sample_rate: u32) -> Outcome {
        let result = self.run_audio(ticket, windows, sample_rate).await;
        self.finish(ticket, result).await
    }

    /// Search a fingerprint directly, skipping the audio stages
    pub async fn identify_fingerprint(&self, fingerprint: String) -> Outcome {
        let ticket = match self.start_import().await {
            Ok(ticket) => ticket,
            Err(e) => return self.rejected(e),
        };

        let processing = self.session.lock().await.begin_processing(ticket);
        let result = match processing {
            Ok(()) if !is_valid_fingerprint(&fingerprint) => Err(RecognitionError::Range(format!(
                "fingerprint '{}' holds symbols outside the alphabet",
                fingerprint
            ))
            .into()),
            Ok(()) => self.run_search(ticket, fingerprint).await,
            Err(e) => Err(e.into()),
        };

        self.finish(ticket, result).await
    }

    async fn start_import(&self) -> std::result::Result<Ticket, TransitionError> {
        let mut session = self.session.lock().await;
        if session.status() == SessionStatus::Displaying {
            session.dismiss()?;
        }
        session.start_import()
    }

    async fn run_audio(&self, ticket: Ticket, windows: Vec<Vec<f32>>, sample_rate: u32) -> Result<Outcome> {
        self.session.lock().await.begin_processing(ticket)?;

        if windows.len() < self.config.min_windows {
            return Err(RecognitionError::InsufficientInput {
                windows: windows.len(),
                required: self.config.min_windows,
            }
            .into());
        }

        let started = Instant::now();

        let analyzer = Arc::clone(&self.analyzer);
        let frames: EnergyFrames = tokio::task::spawn_blocking(move || {
            let mut analyzer = analyzer.blocking_lock();
            analyzer.analyze(&windows, sample_rate)
        })
        .await
        .context("Spectral analysis task failed")??;

        self.ensure_current(ticket).await?;

        let config = Arc::clone(&self.config);
        let fingerprint = tokio::task::spawn_blocking(move || {
            let lattice = LatticeDecoder::new(&config).decode(&frames)?;
            ContourEncoder::new(&config).encode(&lattice, sample_rate)
        })
        .await
        .context("Decoding task failed")??;

        log::info!(
            "Fingerprint of {} characters for request {} in {:.2?}",
            fingerprint.len(),
            ticket.number(),
            started.elapsed()
        );

        self.run_search(ticket, fingerprint).await
    }

    async fn run_search(&self, ticket: Ticket, fingerprint: String) -> Result<Outcome> {
        let mut outcome = Outcome::empty(ticket.number());

        if fingerprint.chars().count() < self.config.min_searchable_len {
            log::info!(
                "Fingerprint '{}' is shorter than {} characters, nothing to search",
                fingerprint,
                self.config.min_searchable_len
            );
            self.session.lock().await.display(ticket)?;
            outcome.fingerprint = fingerprint;
            return Ok(outcome);
        }

        self.session.lock().await.begin_search(ticket)?;

        let started = Instant::now();
        let config = Arc::clone(&self.config);
        let index = Arc::clone(&self.index);
        let query = fingerprint.clone();
        let matches = tokio::task::spawn_blocking(move || Matcher::new(&config).search(&query, &index))
            .await
            .context("Search task failed")?;

        log::info!(
            "Search over {} tunes returned {} matches in {:.2?}",
            self.index.len(),
            matches.len(),
            started.elapsed()
        );

        self.session.lock().await.display(ticket)?;

        outcome.fingerprint = fingerprint;
        outcome.matches = matches;
        Ok(outcome)
    }

    async fn ensure_current(&self, ticket: Ticket) -> std::result::Result<(), TransitionError> {
        let session = self.session.lock().await;
        if session.is_current(ticket) {
            Ok(())
        } else {
            Err(TransitionError::Stale {
                ticket: ticket.number(),
                current: session.current_request(),
            })
        }
    }

    /// Turn the pipeline result into an outcome; every failure ends here
    async fn finish(&self, ticket: Ticket, result: Result<Outcome>) -> Outcome {
        let error = match result {
            Ok(outcome) => return outcome,
            Err(error) => error,
        };

        let mut outcome = Outcome::empty(ticket.number());

        if let Some(TransitionError::Stale { current, .. }) = error.downcast_ref::<TransitionError>() {
            log::debug!(
                "Discarding result of request {}, current is {}",
                ticket.number(),
                current
            );
            outcome.discarded = true;
            return outcome;
        }

        match error.downcast_ref::<RecognitionError>() {
            Some(e) if e.is_recoverable() => log::info!("Request {}: {}", ticket.number(), e),
            _ => {
                log::warn!("Request {} failed: {:#}", ticket.number(), error);
                outcome.error = Some(format!("{:#}", error));
            }
        }

        if let Err(e) = self.session.lock().await.fail(ticket) {
            log::debug!("Request {} already superseded: {}", ticket.number(), e);
        }

        outcome
    }

    fn rejected(&self, error: TransitionError) -> Outcome {
        log::warn!("Request rejected: {}", error);
        Outcome {
            error: Some(error.to_string()),
            ..Outcome::empty(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index_provider::MemoryProvider;
    use std::f32::consts::PI;

    fn index() -> Arc<[IndexRecord]> {
        vec![
            IndexRecord::new("1", "mmoqrqommoqrqomm"),
            IndexRecord::new("2", "qrstqrstqrstqrst"),
            IndexRecord::new("3", "mmoqrqoo"),
        ]
        .into()
    }

    fn tone(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (1..=6)
                    .map(|h| (2.0 * PI * freq * h as f32 * t).sin() / h as f32)
                    .sum::<f32>()
                    * 0.2
            })
            .collect()
    }

    #[tokio::test]
    async fn test_fingerprint_search() {
        let recognizer = Recognizer::new(TuneConfig::default(), index());

        let outcome = recognizer.identify_fingerprint("mmoqrqom".to_string()).await;

        assert_eq!(outcome.error, None);
        assert!(!outcome.discarded);
        assert_eq!(outcome.matches[0].identifier, "1");
        assert_eq!(recognizer.status().await, SessionStatus::Displaying);
    }

    #[tokio::test]
    async fn test_short_fingerprint_is_not_searched() {
        let recognizer = Recognizer::new(TuneConfig::default(), index());

        let outcome = recognizer.identify_fingerprint("mmo".to_string()).await;

        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.error, None);
        assert_eq!(recognizer.status().await, SessionStatus::Displaying);
    }

    #[tokio::test]
    async fn test_foreign_symbols_are_rejected() {
        let recognizer = Recognizer::new(TuneConfig::default(), index());

        let outcome = recognizer.identify_fingerprint("mmo?qrqom".to_string()).await;

        assert!(outcome.matches.is_empty());
        assert!(outcome.error.unwrap().contains("outside the alphabet"));
        assert_eq!(recognizer.status().await, SessionStatus::Idle);

        let outcome = recognizer.identify_fingerprint("mmoqrqom".to_string()).await;
        assert_eq!(outcome.error, None);
        assert_eq!(outcome.matches[0].identifier, "1");
    }

    #[tokio::test]
    async fn test_insufficient_input_gives_empty_result() {
        let recognizer = Recognizer::new(TuneConfig::default(), index());

        let outcome = recognizer.identify(vec![vec![0.1; 1024]; 3], 48000).await;

        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.error, None);
        assert_eq!(recognizer.status().await, SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_silence_is_reported() {
        let recognizer = Recognizer::new(TuneConfig::default(), index());

        let outcome = recognizer.identify(vec![vec![0.0; 1024]; 20], 48000).await;

        assert!(outcome.matches.is_empty());
        assert!(outcome.error.unwrap().contains("silence"));
        assert_eq!(recognizer.status().await, SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_cancelled_recording_is_discarded() {
        let recognizer = Recognizer::new(TuneConfig::default(), index());

        let ticket = match recognizer.press_record().await.unwrap() {
            RecordPress::Started(ticket) => ticket,
            RecordPress::Cancelled => panic!("expected a new recording"),
        };
        assert_eq!(recognizer.press_record().await.unwrap(), RecordPress::Cancelled);

        let windows = vec![tone(440.0, 48000, 1024); 20];
        let outcome = recognizer.identify_recording(ticket, windows, 48000).await;

        assert!(outcome.discarded);
        assert_eq!(recognizer.status().await, SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_melody_runs_through_pipeline() {
        let recognizer = Recognizer::new(TuneConfig::default(), index());

        let mut windows = Vec::new();
        for &freq in &[261.63f32, 293.66, 329.63, 349.23, 392.0, 349.23, 329.63, 293.66] {
            for _ in 0..12 {
                windows.push(tone(freq, 48000, 1024));
            }
        }

        let outcome = recognizer.identify(windows, 48000).await;

        assert_eq!(outcome.error, None);
        assert!(is_valid_fingerprint(&outcome.fingerprint));
        assert_eq!(recognizer.status().await, SessionStatus::Displaying);
    }

    #[tokio::test]
    async fn test_from_provider() {
        let provider = MemoryProvider::new(vec![IndexRecord::new("1", "abcdef"), IndexRecord::new("2", "ab#def")]);

        let recognizer = Recognizer::from_provider(TuneConfig::default(), &provider).await.unwrap();
        assert_eq!(recognizer.index().len(), 1);
    }
}
