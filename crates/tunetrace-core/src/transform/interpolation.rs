//! Mapping from cepstral bins onto the MIDI grid

use crate::config::TuneConfig;
use crate::error::{RecognitionError, Result};

/// Linear interpolation between two neighbouring cepstral bins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolationPoint {
    /// Weight applied to the bin at `hi_index`
    pub hi_weight: f32,
    /// Weight applied to the bin at `hi_index - 1`
    pub lo_weight: f32,
    pub hi_index: usize,
}

/// Interpolation points for every sub-bin of the MIDI grid at one sample rate
#[derive(Debug, Clone)]
pub struct InterpolationTable {
    sample_rate: u32,
    bins_per_midi: usize,
    midi_num: usize,
    points: Vec<InterpolationPoint>,
}

/// MIDI pitch of a frequency in Hz
pub fn hz_to_midi(freq: f64) -> f64 {
    69.0 + 12.0 * (freq / 440.0).log2()
}

impl InterpolationTable {
    /// Build the table for `sample_rate`.
    ///
    /// Cepstral bin `k` (1-based) corresponds to a period of `k` samples, that
    /// is a frequency of `sample_rate / k`. Bins therefore run from high to low
    /// pitch, and the covered range must enclose `[midi_low, midi_high]`.
    pub fn new(sample_rate: u32, config: &TuneConfig) -> Result<Self> {
        let half = config.window_size / 2;
        if sample_rate == 0 || half < 2 {
            return Err(RecognitionError::Range(format!(
                "sample rate {} with window size {}",
                sample_rate, config.window_size
            )));
        }

        let bin_midis: Vec<f64> = (0..half)
            .map(|i| hz_to_midi(sample_rate as f64 / (i + 1) as f64))
            .collect();

        let highest = bin_midis[0];
        let lowest = bin_midis[half - 1];
        if highest < config.midi_high as f64 || lowest > config.midi_low as f64 {
            return Err(RecognitionError::Range(format!(
                "bins cover MIDI {:.1}..{:.1} at {} Hz, need {}..{}",
                lowest, highest, sample_rate, config.midi_low, config.midi_high
            )));
        }

        let bins_per_midi = config.bins_per_midi;
        let bin_width = 1.0 / bins_per_midi as f64;
        let edge = (bins_per_midi / 2) as f64 / bins_per_midi as f64;
        let low_midi = config.midi_low as f64 - edge;

        let mut points = Vec::with_capacity(config.bins_num());
        for i in 0..config.bins_num() {
            let bin_midi = low_midi + i as f64 * bin_width;

            let hi = (0..half - 1)
                .find(|&j| bin_midi > bin_midis[j + 1])
                .map(|j| j + 1)
                .ok_or_else(|| {
                    RecognitionError::Range(format!(
                        "MIDI {:.2} lies below the lowest bin at {} Hz",
                        bin_midi, sample_rate
                    ))
                })?;

            let delta = bin_midis[hi - 1] - bin_midis[hi];
            let hi_weight = (bin_midis[hi - 1] - bin_midi) / delta;
            let lo_weight = (bin_midi - bin_midis[hi]) / delta;
            if !(0.0..=1.0).contains(&hi_weight) || !(0.0..=1.0).contains(&lo_weight) {
                return Err(RecognitionError::Range(format!(
                    "invalid interpolation weights {:.4}/{:.4} for MIDI {:.2}",
                    hi_weight, lo_weight, bin_midi
                )));
            }

            points.push(InterpolationPoint {
                hi_weight: hi_weight as f32,
                lo_weight: lo_weight as f32,
                hi_index: hi + 1,
            });
        }

        log::debug!(
            "Interpolation table for {} Hz: {} sub-bins over MIDI {:.1}..{:.1}",
            sample_rate,
            points.len(),
            lowest,
            highest
        );

        Ok(Self {
            sample_rate,
            bins_per_midi,
            midi_num: config.midi_num(),
            points,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn points(&self) -> &[InterpolationPoint] {
        &self.points
    }

    /// Interpolate a cepstrum onto the grid and sum sub-bins per MIDI note
    pub fn apply(&self, cepstrum: &[f32]) -> Vec<f32> {
        let mut frame = vec![0.0f32; self.midi_num];

        for (i, point) in self.points.iter().enumerate() {
            let hi = cepstrum.get(point.hi_index).copied().unwrap_or(0.0);
            let lo = cepstrum.get(point.hi_index - 1).copied().unwrap_or(0.0);
            frame[i / self.bins_per_midi] += point.hi_weight * hi + point.lo_weight * lo;
        }

        frame
    }
}
