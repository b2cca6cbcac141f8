//! Audio file decoding and windowing
//!
//! Supports WAV, MP3, FLAC and OGG Vorbis through pure Rust decoders. Audio
//! is analysed at its native sample rate, so no resampling takes place.

mod decoder;
mod windows;

pub use decoder::{decode_audio, AudioData};
pub use windows::split_windows;

use std::path::Path;

/// Supported audio formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,
    Unknown,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("wav") | Some("wave") => AudioFormat::Wav,
            Some("mp3") => AudioFormat::Mp3,
            Some("flac") => AudioFormat::Flac,
            Some("ogg") | Some("oga") => AudioFormat::Ogg,
            _ => AudioFormat::Unknown,
        }
    }

    pub fn is_supported(&self) -> bool {
        *self != AudioFormat::Unknown
    }
}
