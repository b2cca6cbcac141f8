//! Pipeline errors

use thiserror::Error;

/// Failure of a recognition request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecognitionError {
    /// Too little audio to analyse. Recoverable: report an empty result.
    #[error("insufficient data for analysis: {windows} windows, need at least {required}")]
    InsufficientInput { windows: usize, required: usize },

    /// Every frame carries zero energy
    #[error("cannot decode complete silence")]
    Silence,

    /// The pitch range cannot be represented at the given sample rate,
    /// or an interpolation invariant was broken
    #[error("spectrogram range is insufficient: {0}")]
    Range(String),

    /// Decoding was attempted on zero frames
    #[error("cannot decode an empty lattice")]
    EmptyLattice,
}

impl RecognitionError {
    /// Whether the caller should simply show an empty result
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RecognitionError::InsufficientInput { .. })
    }
}

pub type Result<T> = std::result::Result<T, RecognitionError>;
