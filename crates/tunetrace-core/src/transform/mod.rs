//! Spectral analysis of sample windows
//!
//! Each window goes through a Blackman window, an FFT, cube-root magnitude
//! compression and a second FFT. The positive part of that cepstrum-like
//! signal is interpolated onto the MIDI grid, octave-corrected and reduced to
//! its strongest peaks.

mod interpolation;

pub use interpolation::{hz_to_midi, InterpolationPoint, InterpolationTable};

use crate::config::TuneConfig;
use crate::error::{RecognitionError, Result};
use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Frame energy vectors, one per window, each `midi_num` long
pub type EnergyFrames = Vec<Vec<f32>>;

/// Turns sample windows into per-frame pitch energies.
///
/// The interpolation table depends on the sample rate only; it is built on
/// first use and rebuilt whenever a different sample rate comes in.
pub struct SpectralAnalyzer {
    config: TuneConfig,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    interpolation: Option<InterpolationTable>,
}

impl SpectralAnalyzer {
    pub fn new(config: &TuneConfig) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.window_size);

        Self {
            config: config.clone(),
            window: create_blackman_window(config.window_size),
            fft,
            interpolation: None,
        }
    }

    /// Sample rate of the cached interpolation table, if any
    pub fn cached_sample_rate(&self) -> Option<u32> {
        self.interpolation.as_ref().map(|t| t.sample_rate())
    }

    /// Analyse all windows. Windows are independent and processed in parallel;
    /// the output keeps their order.
    pub fn analyze(&mut self, windows: &[Vec<f32>], sample_rate: u32) -> Result<EnergyFrames> {
        self.prepare(sample_rate)?;
        let table = self
            .interpolation
            .as_ref()
            .ok_or_else(|| RecognitionError::Range("interpolation table missing".to_string()))?;

        let frames: EnergyFrames = windows
            .par_iter()
            .map(|window| self.process_window(window, table))
            .collect();

        log::debug!("Analysed {} windows at {} Hz", frames.len(), sample_rate);

        Ok(frames)
    }

    fn prepare(&mut self, sample_rate: u32) -> Result<()> {
        if self.cached_sample_rate() != Some(sample_rate) {
            self.interpolation = Some(InterpolationTable::new(sample_rate, &self.config)?);
        }
        Ok(())
    }

    /// Energy vector of a single window
    fn process_window(&self, samples: &[f32], table: &InterpolationTable) -> Vec<f32> {
        let n = self.config.window_size;

        // Windows shorter than the configured size are zero-padded
        let mut buffer: Vec<Complex<f32>> = (0..n)
            .map(|i| Complex::new(samples.get(i).copied().unwrap_or(0.0) * self.window[i], 0.0))
            .collect();
        self.fft.process(&mut buffer);

        for bin in buffer.iter_mut() {
            *bin = Complex::new(bin.norm_sqr().powf(1.0 / 6.0), 0.0);
        }
        self.fft.process(&mut buffer);

        let cepstrum: Vec<f32> = buffer.iter().map(|c| c.re.max(0.0)).collect();

        let mut frame = table.apply(&cepstrum);
        fix_octaves(&mut frame);
        keep_strongest(&mut frame, self.config.peaks_per_frame);
        frame
    }
}

/// Blackman window with the exact 7938/9240/1430 coefficients
pub fn create_blackman_window(size: usize) -> Vec<f32> {
    let a0 = 7938.0 / 18608.0;
    let a1 = 9240.0 / 18608.0;
    let a2 = 1430.0 / 18608.0;
    let span = size.saturating_sub(1).max(1) as f32;

    (0..size)
        .map(|i| {
            let x = i as f32 / span;
            a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
        })
        .collect()
}

/// Push energy up an octave wherever the octave above is stronger.
///
/// Decisions for a pitch class are taken on the incoming values, then applied
/// from low to high, so energy can cascade through several octaves. The frame
/// total is unchanged.
pub fn fix_octaves(frame: &mut [f32]) {
    let len = frame.len();

    for pitch_class in 0..12 {
        let shifts: Vec<usize> = (pitch_class..len.saturating_sub(12))
            .step_by(12)
            .filter(|&i| frame[i + 12] > frame[i])
            .collect();

        for i in shifts {
            frame[i + 12] += frame[i];
            frame[i] = 0.0;
        }
    }
}

/// Zero everything below the `keep`-th largest value. Ties at the threshold
/// survive.
pub fn keep_strongest(frame: &mut [f32], keep: usize) {
    if keep == 0 || frame.len() <= keep {
        return;
    }

    let mut sorted = frame.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let threshold = sorted[keep - 1];

    for value in frame.iter_mut() {
        if *value < threshold {
            *value = 0.0;
        }
    }
}
