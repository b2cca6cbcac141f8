//! Note segmentation, tempo search and fingerprint encoding
//!
//! The decoded pitch path is cut into notes, the tempo that best explains
//! the note lengths in whole quavers is searched for, and the quantized
//! melody is written out one fingerprint character per quaver.

use crate::config::TuneConfig;
use crate::error::{RecognitionError, Result};
use crate::fingerprint::pitches_to_fingerprint;
use crate::lattice::Lattice;
use serde::{Deserialize, Serialize};

/// A run of frames on the same pitch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// MIDI pitch
    pub pitch: i32,
    /// Length in frames
    pub duration: usize,
    /// Mean normalized energy of the pitch over the run
    pub power: f32,
}

/// A note measured in quavers at one candidate tempo
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantizedNote {
    pub pitch: i32,
    pub quavers_exact: f64,
    /// Rounded length; 0 drops the note from the contour
    pub quavers_quant: u32,
    pub power: f32,
}

/// Winner of the tempo search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoEstimate {
    pub bpm: u32,
    pub score: f64,
    pub notes: Vec<QuantizedNote>,
}

/// Run-length encode a pitch path into notes.
///
/// Every run becomes a note with its exact frame count, the final run
/// included.
pub fn notes_from_path(path: &[usize], energies: &[Vec<f32>], midi_low: i32) -> Vec<Note> {
    let mut notes = Vec::new();
    let mut frames = path.iter().zip(energies).peekable();

    while let Some((&index, energy)) = frames.next() {
        let mut duration = 1;
        let mut total = energy.get(index).copied().unwrap_or(0.0);

        while let Some((&next, next_energy)) = frames.peek() {
            if next != index {
                break;
            }
            total += next_energy.get(next).copied().unwrap_or(0.0);
            duration += 1;
            frames.next();
        }

        notes.push(Note {
            pitch: midi_low + index as i32,
            duration,
            power: total / duration as f32,
        });
    }

    notes
}

/// Number of frames in one quaver at `bpm`
pub fn frames_per_quaver(bpm: u32, frames_per_second: f64) -> f64 {
    let quavers_per_second = bpm as f64 / 60.0 * 2.0;
    frames_per_second / quavers_per_second
}

/// Measure every note in quavers. Notes shorter than `min_duration_rel`
/// quavers get zero quavers, all others at least one.
pub fn quantize_notes(notes: &[Note], frames_per_quaver: f64, min_duration_rel: f64) -> Vec<QuantizedNote> {
    notes
        .iter()
        .map(|note| {
            let quavers_exact = note.duration as f64 / frames_per_quaver;
            let quavers_quant = if quavers_exact > min_duration_rel {
                quavers_exact.round().max(1.0) as u32
            } else {
                0
            };

            QuantizedNote {
                pitch: note.pitch,
                quavers_exact,
                quavers_quant,
                power: note.power,
            }
        })
        .collect()
}

/// Score a quantization: short notes are a priori likelier, and the
/// power-weighted rounding error is charged against the input length.
pub fn score_quantization(quantized: &[QuantizedNote], notes: &[Note], frames_per_quaver: f64) -> f64 {
    if quantized.is_empty() {
        return f64::NEG_INFINITY;
    }

    let input_frames: usize = notes.iter().map(|n| n.duration).sum();

    let mut quant_error = 0.0f64;
    let mut probability = 0.0f64;
    for note in quantized {
        quant_error += (note.quavers_exact - note.quavers_quant as f64).abs() * note.power as f64;
        probability += 3.0 - 0.5 * note.quavers_quant as f64;
    }
    probability /= quantized.len() as f64;

    let quant_score = 1.0 - quant_error * frames_per_quaver / input_frames as f64;
    probability * quant_score
}

/// Try every tempo from `low_bpm` up to (excluding) `high_bpm`. The first
/// tempo reaching the best score wins.
pub fn estimate_tempo(notes: &[Note], frames_per_second: f64, config: &TuneConfig) -> Option<TempoEstimate> {
    if notes.is_empty() {
        return None;
    }

    let mut best: Option<TempoEstimate> = None;

    for bpm in (config.low_bpm..config.high_bpm).step_by(config.bpm_step as usize) {
        let fpq = frames_per_quaver(bpm, frames_per_second);
        let quantized = quantize_notes(notes, fpq, config.min_note_duration_rel);
        let score = score_quantization(&quantized, notes, fpq);

        log::trace!("Tempo {} BPM scores {:.4}", bpm, score);

        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(TempoEstimate {
                bpm,
                score,
                notes: quantized,
            });
        }
    }

    best
}

/// One pitch per quaver
pub fn expand_quavers(notes: &[QuantizedNote]) -> Vec<i32> {
    notes
        .iter()
        .flat_map(|note| std::iter::repeat(note.pitch).take(note.quavers_quant as usize))
        .collect()
}

/// Drop the melody an octave when most of it sits in the shrill register.
///
/// The pitch at the `1 - shrill_threshold_energy` quantile decides; when it
/// reaches `shrill_threshold_pitch`, every pitch above the lowest octave of
/// the range moves down twelve semitones.
pub fn correct_shrill_octave(pitches: &[i32], config: &TuneConfig) -> Vec<i32> {
    if pitches.is_empty() {
        return Vec::new();
    }

    let mut sorted = pitches.to_vec();
    sorted.sort_unstable();
    let decision_index = ((sorted.len() as f64 * (1.0 - config.shrill_threshold_energy)).round() as usize)
        .min(sorted.len() - 1);

    if sorted[decision_index] < config.shrill_threshold_pitch {
        return pitches.to_vec();
    }

    log::debug!(
        "Contour is shrill (pitch {} at decision index {}), lowering an octave",
        sorted[decision_index],
        decision_index
    );

    let floor = config.midi_low + 12;
    pitches
        .iter()
        .map(|&p| if p > floor { p - 12 } else { p })
        .collect()
}

/// Turns a decoded lattice into a fingerprint
pub struct ContourEncoder {
    config: TuneConfig,
}

impl ContourEncoder {
    pub fn new(config: &TuneConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Notes of the lattice that are loud and long enough to keep
    pub fn notes(&self, lattice: &Lattice) -> Vec<Note> {
        notes_from_path(&lattice.path, &lattice.energies, self.config.midi_low)
            .into_iter()
            .filter(|note| {
                note.power > self.config.min_note_power && note.duration >= self.config.min_note_duration
            })
            .collect()
    }

    /// Encode the lattice. An empty string means too few notes survived.
    pub fn encode(&self, lattice: &Lattice, sample_rate: u32) -> Result<String> {
        if lattice.path.is_empty() {
            return Err(RecognitionError::EmptyLattice);
        }

        let notes = self.notes(lattice);
        if notes.len() < self.config.min_notes {
            log::info!(
                "Only {} notes retained (need {}), no searchable fingerprint",
                notes.len(),
                self.config.min_notes
            );
            return Ok(String::new());
        }

        let frames_per_second = self.config.frames_per_second(sample_rate);
        let tempo = match estimate_tempo(&notes, frames_per_second, &self.config) {
            Some(tempo) => tempo,
            None => return Ok(String::new()),
        };
        log::debug!("Best tempo {} BPM (score {:.4}) over {} notes", tempo.bpm, tempo.score, notes.len());

        let pitches = correct_shrill_octave(&expand_quavers(&tempo.notes), &self.config);
        pitches_to_fingerprint(&pitches, self.config.midi_low)
    }
}
