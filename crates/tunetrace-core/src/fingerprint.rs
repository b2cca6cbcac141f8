//! Fingerprint alphabet
//!
//! A fingerprint spells one character per quaver. Character `i` of
//! [`ALPHABET`] stands for MIDI pitch `midi_low + i`.

use crate::error::{RecognitionError, Result};

/// The 48 fingerprint symbols, lowest pitch first
pub const ALPHABET: [char; 48] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J',
    'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V',
];

/// Alphabet position of a symbol
pub fn symbol_offset(symbol: char) -> Option<usize> {
    match symbol {
        'a'..='z' => Some(symbol as usize - 'a' as usize),
        'A'..='V' => Some(26 + symbol as usize - 'A' as usize),
        _ => None,
    }
}

/// Symbol for a MIDI pitch, if the pitch falls inside the alphabet
pub fn pitch_to_symbol(pitch: i32, midi_low: i32) -> Option<char> {
    let offset = pitch.checked_sub(midi_low)?;
    usize::try_from(offset)
        .ok()
        .and_then(|offset| ALPHABET.get(offset).copied())
}

/// True when every character belongs to the alphabet
pub fn is_valid_fingerprint(fingerprint: &str) -> bool {
    fingerprint.chars().all(|c| symbol_offset(c).is_some())
}

/// Encode a pitch sequence
pub fn pitches_to_fingerprint(pitches: &[i32], midi_low: i32) -> Result<String> {
    pitches
        .iter()
        .map(|&pitch| {
            pitch_to_symbol(pitch, midi_low).ok_or_else(|| {
                RecognitionError::Range(format!(
                    "pitch {} cannot be encoded above MIDI {}",
                    pitch, midi_low
                ))
            })
        })
        .collect()
}

/// Decode a fingerprint back to MIDI pitches. `None` on a foreign character.
pub fn fingerprint_to_pitches(fingerprint: &str, midi_low: i32) -> Option<Vec<i32>> {
    fingerprint
        .chars()
        .map(|c| symbol_offset(c).map(|offset| midi_low + offset as i32))
        .collect()
}
