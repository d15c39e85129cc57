use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::{Result, RigError};

/// Blocks quieter than this are treated as silence.
const SILENCE_RMS: f32 = 1e-3;

/// Dominant pitch found in one block of audio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchEstimate {
    pub frequency: f64,
    pub rms: f32,
}

/// Finds the strongest partial in a block of samples so the rig can pick the
/// rhythm whose median frequency matches what it hears.
pub struct PitchTracker {
    sample_rate: u32,
    fft_planner: RealFftPlanner<f32>,
    fft: Option<FftResources>,
}

impl PitchTracker {
    /// Creates a new tracker using the default 48 kHz sample rate.
    pub fn new() -> Self {
        Self::with_sample_rate(48_000)
    }

    /// Creates a tracker for blocks sampled at `sample_rate` Hz.
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            fft_planner: RealFftPlanner::new(),
            fft: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Estimates the dominant frequency of `samples`. Returns `None` for
    /// silent blocks.
    pub fn estimate(&mut self, samples: &[f32]) -> Result<Option<PitchEstimate>> {
        if samples.len() < 2 {
            return Err(RigError::InvalidInput(
                "pitch tracking requires blocks with at least two samples",
            ));
        }

        let rms = compute_rms(samples);
        if rms < SILENCE_RMS {
            return Ok(None);
        }

        let len = samples.len();
        let bin_hz = self.sample_rate as f64 / len as f64;
        let fft = self.prepare_fft(len);

        for (index, value) in samples.iter().enumerate() {
            fft.input[index] = *value * hann_value(index, len);
        }

        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)?;

        let magnitudes: Vec<f32> = fft.spectrum.iter().map(|bin| bin.norm()).collect();
        // Skip DC.
        let peak = magnitudes
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(index, _)| index);

        let Some(peak) = peak else {
            return Ok(None);
        };

        let offset = parabolic_offset(&magnitudes, peak);
        let frequency = (peak as f64 + offset) * bin_hz;
        tracing::debug!(frequency, rms, "estimated pitch");
        Ok(Some(PitchEstimate { frequency, rms }))
    }

    fn prepare_fft(&mut self, size: usize) -> &mut FftResources {
        if self.fft.as_ref().is_some_and(|fft| fft.size != size) {
            self.fft = None;
        }
        let planner = &mut self.fft_planner;
        self.fft
            .get_or_insert_with(|| FftResources::plan(planner, size))
    }
}

impl Default for PitchTracker {
    fn default() -> Self {
        Self::new()
    }
}

struct FftResources {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl FftResources {
    fn plan(planner: &mut RealFftPlanner<f32>, size: usize) -> Self {
        let plan = planner.plan_fft_forward(size);
        Self {
            size,
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        }
    }
}

impl fmt::Debug for PitchTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PitchTracker")
            .field("sample_rate", &self.sample_rate)
            .field("fft_size", &self.fft.as_ref().map(|fft| fft.size))
            .finish()
    }
}

/// Fills a buffer with a sine tone, handy for exercising the tracker.
pub fn sine_block(frequency: f64, sample_rate: u32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| {
            let t = n as f64 / sample_rate as f64;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Sub-bin peak position from the two neighbouring magnitudes.
fn parabolic_offset(magnitudes: &[f32], peak: usize) -> f64 {
    if peak == 0 || peak + 1 >= magnitudes.len() {
        return 0.0;
    }
    let left = magnitudes[peak - 1] as f64;
    let centre = magnitudes[peak] as f64;
    let right = magnitudes[peak + 1] as f64;
    let denominator = left - 2.0 * centre + right;
    if denominator.abs() <= f64::EPSILON {
        0.0
    } else {
        (0.5 * (left - right) / denominator).clamp(-0.5, 0.5)
    }
}

fn compute_rms(samples: &[f32]) -> f32 {
    let sum: f32 = samples.iter().map(|sample| sample * sample).sum();
    (sum / samples.len() as f32).sqrt()
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_sine_frequency() {
        let mut tracker = PitchTracker::with_sample_rate(8_000);
        let block = sine_block(440.0, 8_000, 2048);

        let estimate = tracker.estimate(&block).unwrap().expect("tone is audible");
        let bin_hz = 8_000.0 / 2048.0;
        assert!((estimate.frequency - 440.0).abs() < bin_hz);
    }

    #[test]
    fn silence_has_no_pitch() {
        let mut tracker = PitchTracker::with_sample_rate(8_000);
        assert!(tracker.estimate(&[0.0; 512]).unwrap().is_none());
    }

    #[test]
    fn rejects_tiny_blocks() {
        let mut tracker = PitchTracker::new();
        let err = tracker.estimate(&[0.5]).unwrap_err();
        assert!(matches!(err, RigError::InvalidInput(_)));
    }

    #[test]
    fn reuses_plan_across_block_sizes() {
        let mut tracker = PitchTracker::with_sample_rate(8_000);
        let short = tracker
            .estimate(&sine_block(1_000.0, 8_000, 1024))
            .unwrap()
            .unwrap();
        let long = tracker
            .estimate(&sine_block(250.0, 8_000, 4096))
            .unwrap()
            .unwrap();

        assert!((short.frequency - 1_000.0).abs() < 8.0);
        assert!((long.frequency - 250.0).abs() < 2.0);
    }
}
