//! Pitch lattice decoding
//!
//! Every frame holds one cumulative score per pitch. A pitch's score is the
//! best score reachable from any pitch of the previous frame, plus the melodic
//! interval score of that transition, plus the frame's own energy.

use crate::config::TuneConfig;
use crate::error::{RecognitionError, Result};
use crate::transform::EnergyFrames;

/// Log-likelihoods of melodic intervals -12..=12 semitones, from a model
/// trained on a corpus of traditional tunes. The unison slot is unused: a
/// repeated pitch is not a transition.
const INTERVAL_LOG_LIKELIHOODS: [f32; 25] = [
    -2.6399, -4.3941, -2.9723, -2.1666, -2.3065, -1.1626, -3.7312, -0.6308, -0.6756, -0.3947,
    -0.2396, -1.3759, f32::NEG_INFINITY, -1.3005, -0.0000, -0.3356, -0.5968, -0.3042, -3.0499,
    -1.2219, -2.4878, -2.7728, -3.5722, -5.1491, -3.4140,
];

/// Log-likelihood assigned to leaps beyond an octave
const FAR_INTERVAL_LOG_LIKELIHOOD: f32 = -30.0;

/// Score of moving between two pitches
#[derive(Debug, Clone)]
pub struct IntervalModel {
    same_pitch: f32,
    near: [f32; 25],
    far: f32,
}

impl IntervalModel {
    pub fn new(config: &TuneConfig) -> Self {
        let shift = config.pitch_model_shift;
        let weight = config.pitch_model_weight;

        Self {
            same_pitch: config.same_pitch_score,
            near: INTERVAL_LOG_LIKELIHOODS.map(|l| (shift + l) * weight),
            far: (shift + FAR_INTERVAL_LOG_LIKELIHOOD) * weight,
        }
    }

    /// Score of an interval in semitones
    pub fn score(&self, interval: i32) -> f32 {
        match interval {
            0 => self.same_pitch,
            -12..=12 => self.near[(interval + 12) as usize],
            _ => self.far,
        }
    }
}

/// Decoded lattice
#[derive(Debug, Clone)]
pub struct Lattice {
    /// Energies scaled so that their grand total equals the frame count
    pub energies: EnergyFrames,
    /// Cumulative best score per frame and pitch
    pub scores: Vec<Vec<f32>>,
    /// Chosen pitch index per frame
    pub path: Vec<usize>,
}

/// Lattice decoder over the full pitch range
pub struct LatticeDecoder {
    model: IntervalModel,
    midi_num: usize,
}

impl LatticeDecoder {
    pub fn new(config: &TuneConfig) -> Self {
        Self {
            model: IntervalModel::new(config),
            midi_num: config.midi_num(),
        }
    }

    /// Decode a pitch index per frame
    pub fn decode(&self, frames: &[Vec<f32>]) -> Result<Lattice> {
        if frames.is_empty() {
            return Err(RecognitionError::EmptyLattice);
        }
        if let Some(bad) = frames.iter().position(|f| f.len() != self.midi_num) {
            return Err(RecognitionError::Range(format!(
                "frame {} has {} pitches, expected {}",
                bad,
                frames[bad].len(),
                self.midi_num
            )));
        }

        let energies = normalize(frames)?;
        let scores = self.accumulate(&energies);

        // Per-frame argmax of the forward scores, lowest pitch on ties
        let path: Vec<usize> = scores.iter().map(|frame| argmax(frame)).collect();

        log::debug!("Decoded lattice over {} frames", path.len());

        Ok(Lattice {
            energies,
            scores,
            path,
        })
    }

    fn accumulate(&self, energies: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let p = self.midi_num;

        // transition[j - k + p - 1] is the score of moving from pitch k to pitch j
        let transition: Vec<f32> = (0..2 * p - 1)
            .map(|d| self.model.score(d as i32 - (p as i32 - 1)))
            .collect();

        let mut scores: Vec<Vec<f32>> = Vec::with_capacity(energies.len());
        scores.push(energies[0].clone());

        for energy in &energies[1..] {
            let previous = &scores[scores.len() - 1];
            let next: Vec<f32> = (0..p)
                .map(|j| {
                    let best_carry = (0..p)
                        .map(|k| previous[k] + transition[j + p - 1 - k])
                        .fold(f32::NEG_INFINITY, f32::max);
                    best_carry + energy[j]
                })
                .collect();
            scores.push(next);
        }

        scores
    }
}

/// Scale all energies so that they sum to the number of frames
fn normalize(frames: &[Vec<f32>]) -> Result<EnergyFrames> {
    let total: f64 = frames
        .iter()
        .flat_map(|frame| frame.iter())
        .map(|&e| e as f64)
        .sum();

    if total == 0.0 {
        return Err(RecognitionError::Silence);
    }

    let scale = (frames.len() as f64 / total) as f32;
    Ok(frames
        .iter()
        .map(|frame| frame.iter().map(|&e| e * scale).collect())
        .collect())
}

fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
