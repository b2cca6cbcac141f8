//! Configuration parameters for the recognition pipeline
//!
//! Defaults are the values the tune index was built with; changing the
//! spectral or quantization parameters produces fingerprints that no longer
//! line up with a stock index.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuneConfig {
    // Audio windows
    pub window_size: usize,
    pub min_windows: usize,

    // Pitch range
    pub midi_low: i32,
    pub midi_high: i32,
    pub bins_per_midi: usize,
    pub peaks_per_frame: usize,

    // Interval model
    pub pitch_model_shift: f32,
    pub pitch_model_weight: f32,
    pub same_pitch_score: f32,

    // Note segmentation
    pub min_note_power: f32,
    pub min_note_duration: usize,
    pub min_note_duration_rel: f64,
    pub min_notes: usize,

    // Tempo search
    pub low_bpm: u32,
    pub high_bpm: u32,
    pub bpm_step: u32,

    // Octave correction
    pub shrill_threshold_pitch: i32,
    pub shrill_threshold_energy: f64,

    // Search
    pub ngram_size: usize,
    pub first_search_max_results: usize,
    pub second_search_max_results: usize,
    pub min_searchable_len: usize,
    pub match_score: i32,
    pub mismatch_score: i32,
    pub gap_score: i32,
}

impl Default for TuneConfig {
    fn default() -> Self {
        Self {
            window_size: 1024,
            min_windows: 10,

            // C3 (130.81 Hz) to B6 (1975.5 Hz)
            midi_low: 48,
            midi_high: 95,
            bins_per_midi: 3,
            peaks_per_frame: 5,

            pitch_model_shift: -7.0,
            pitch_model_weight: 0.05,
            same_pitch_score: -0.18,

            min_note_power: 0.10,
            min_note_duration: 3,
            min_note_duration_rel: 0.2,
            min_notes: 4,

            low_bpm: 60,
            high_bpm: 240,
            bpm_step: 5,

            shrill_threshold_pitch: 76,
            shrill_threshold_energy: 0.85,

            ngram_size: 4,
            first_search_max_results: 2000,
            second_search_max_results: 20,
            min_searchable_len: 5,
            match_score: 2,
            mismatch_score: -2,
            gap_score: -1,
        }
    }
}

impl TuneConfig {
    /// Number of MIDI notes covered by a frame energy vector
    pub fn midi_num(&self) -> usize {
        (self.midi_high - self.midi_low + 1).max(0) as usize
    }

    /// Number of fine-grained interpolation bins
    pub fn bins_num(&self) -> usize {
        self.midi_num() * self.bins_per_midi
    }

    /// Frames per second for non-overlapping windows
    pub fn frames_per_second(&self, sample_rate: u32) -> f64 {
        sample_rate as f64 / self.window_size as f64
    }

    /// Load configuration from a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config: TuneConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.window_size < 4 || !self.window_size.is_power_of_two() {
            anyhow::bail!("window_size must be a power of two >= 4");
        }
        if self.midi_low >= self.midi_high {
            anyhow::bail!("midi_low must be < midi_high");
        }
        if self.midi_num() > crate::fingerprint::ALPHABET.len() {
            anyhow::bail!(
                "pitch range of {} notes exceeds the {}-symbol fingerprint alphabet",
                self.midi_num(),
                crate::fingerprint::ALPHABET.len()
            );
        }
        if self.bins_per_midi == 0 {
            anyhow::bail!("bins_per_midi must be > 0");
        }
        if self.peaks_per_frame == 0 || self.peaks_per_frame > self.midi_num() {
            anyhow::bail!("peaks_per_frame must be in 1..={}", self.midi_num());
        }
        if self.low_bpm == 0 || self.low_bpm >= self.high_bpm || self.bpm_step == 0 {
            anyhow::bail!("tempo range must satisfy 0 < low_bpm < high_bpm with bpm_step > 0");
        }
        if !(0.0..=1.0).contains(&self.shrill_threshold_energy) {
            anyhow::bail!("shrill_threshold_energy must be within [0, 1]");
        }
        if self.ngram_size == 0 {
            anyhow::bail!("ngram_size must be > 0");
        }
        if self.min_notes == 0 {
            anyhow::bail!("min_notes must be > 0");
        }
        Ok(())
    }
}
