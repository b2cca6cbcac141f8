//! TuneTrace Core - melodic tune identification
//!
//! Audio windows are turned into per-frame pitch energies, decoded into a
//! pitch path, quantized into a quaver-level melody and spelled as a
//! fingerprint string. Fingerprints are looked up in a tune index with an
//! n-gram prefilter followed by global alignment.

pub mod config;
pub mod contour;
pub mod error;
pub mod fingerprint;
pub mod index_provider;
pub mod lattice;
pub mod matching;
pub mod recognizer;
pub mod session;
pub mod transform;

pub use config::TuneConfig;
pub use contour::{ContourEncoder, Note, QuantizedNote, TempoEstimate};
pub use error::{RecognitionError, Result};
pub use fingerprint::{fingerprint_to_pitches, is_valid_fingerprint, pitches_to_fingerprint, ALPHABET};
pub use index_provider::{FilesystemProvider, IndexProvider, MemoryProvider};
pub use lattice::{Lattice, LatticeDecoder};
pub use matching::{Matcher, RankedMatch};
pub use recognizer::{Outcome, Recognizer};
pub use session::{RecordPress, SearchSession, SessionStatus, Ticket, TransitionError};
pub use transform::SpectralAnalyzer;
pub use tunetrace_index::IndexRecord;

/// Fingerprint of a sequence of sample windows.
///
/// An empty string means the audio held too few notes to search.
pub fn process_audio(windows: &[Vec<f32>], sample_rate: u32, config: &TuneConfig) -> Result<String> {
    if windows.len() < config.min_windows {
        return Err(RecognitionError::InsufficientInput {
            windows: windows.len(),
            required: config.min_windows,
        });
    }

    let frames = SpectralAnalyzer::new(config).analyze(windows, sample_rate)?;
    let lattice = LatticeDecoder::new(config).decode(&frames)?;
    ContourEncoder::new(config).encode(&lattice, sample_rate)
}

/// Best matches for a fingerprint, highest score first
pub fn search(fingerprint: &str, records: &[IndexRecord], config: &TuneConfig) -> Vec<RankedMatch> {
    Matcher::new(config).search(fingerprint, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_few_windows() {
        let config = TuneConfig::default();
        let windows = vec![vec![0.0; 1024]; 9];

        assert_eq!(
            process_audio(&windows, 48000, &config),
            Err(RecognitionError::InsufficientInput {
                windows: 9,
                required: 10
            })
        );
    }

    #[test]
    fn test_silent_audio() {
        let config = TuneConfig::default();
        let windows = vec![vec![0.0; 1024]; 10];
        assert_eq!(process_audio(&windows, 48000, &config), Err(RecognitionError::Silence));
    }

    #[test]
    fn test_search_ranks_exact_tune_first() {
        let config = TuneConfig::default();
        let records = vec![
            IndexRecord::new("1", "abcd"),
            IndexRecord::new("2", "abce"),
        ];

        let results = search("abcd", &records, &config);
        assert_eq!(results[0].identifier, "1");
        assert!(search("", &records, &config).is_empty());
    }
}
