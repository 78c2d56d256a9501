// src/core/features/mfcc.rs
//
// Mel-frequency cepstral coefficients averaged over the whole recording.

use log::debug;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::FeatureVector;
use crate::core::dsp::{FftProcessor, WindowType};
use crate::core::signal::PcmSignal;
use crate::error::PipelineError;

/// Number of cepstral coefficients per frame and in the aggregated vector
pub const NUM_COEFFICIENTS: usize = 40;

/// Energy floor applied before the log, in power units
const LOG_FLOOR: f64 = 1e-10;

/// MFCC analysis parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MfccParams {
    /// Analysis window in samples (25 ms at 22.05 kHz)
    pub window_length: usize,
    /// Frame step in samples (10 ms at 22.05 kHz)
    pub hop_length: usize,
    pub fft_size: usize,
    pub num_mel_bands: usize,
    pub fmin: f32,
    /// Upper filterbank edge; `None` means Nyquist
    pub fmax: Option<f32>,
    pub window: WindowType,
}

impl Default for MfccParams {
    fn default() -> Self {
        Self {
            window_length: 551,
            hop_length: 220,
            fft_size: 1024,
            num_mel_bands: 64,
            fmin: 0.0,
            fmax: None,
            window: WindowType::Hann,
        }
    }
}

impl MfccParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.window_length == 0 || self.hop_length == 0 {
            return Err("window_length and hop_length must be positive".to_string());
        }
        if self.fft_size < self.window_length {
            return Err(format!(
                "fft_size ({}) must be at least window_length ({})",
                self.fft_size, self.window_length
            ));
        }
        if self.num_mel_bands == 0 {
            return Err("num_mel_bands must be positive".to_string());
        }
        if self.fmin < 0.0 {
            return Err("fmin must not be negative".to_string());
        }
        if let Some(fmax) = self.fmax {
            if fmax <= self.fmin {
                return Err(format!("fmax ({}) must exceed fmin ({})", fmax, self.fmin));
            }
        }
        Ok(())
    }

    /// [`validate`](Self::validate) plus band edges checked against the Nyquist rate
    pub fn validate_for_rate(&self, sample_rate: u32) -> Result<(), String> {
        self.validate()?;
        let nyquist = sample_rate as f32 / 2.0;
        if self.fmin >= nyquist {
            return Err(format!("fmin ({}) must be below Nyquist ({})", self.fmin, nyquist));
        }
        if let Some(fmax) = self.fmax {
            if fmax > nyquist {
                return Err(format!("fmax ({}) must not exceed Nyquist ({})", fmax, nyquist));
            }
        }
        Ok(())
    }
}

/// Triangular filters spaced evenly on the HTK mel scale
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    /// `num_bands` rows of `num_bins` weights
    weights: Vec<Vec<f32>>,
}

impl MelFilterbank {
    pub fn new(num_bands: usize, fft_size: usize, sample_rate: u32, fmin: f32, fmax: f32) -> Self {
        let num_bins = fft_size / 2 + 1;
        let bin_hz = sample_rate as f32 / fft_size as f32;

        let mel_low = hz_to_mel(fmin);
        let mel_high = hz_to_mel(fmax);
        let hz_points: Vec<f32> = (0..num_bands + 2)
            .map(|i| mel_to_hz(mel_low + (mel_high - mel_low) * i as f32 / (num_bands + 1) as f32))
            .collect();

        let weights = (0..num_bands)
            .map(|m| {
                let (lower, center, upper) = (hz_points[m], hz_points[m + 1], hz_points[m + 2]);
                (0..num_bins)
                    .map(|k| {
                        let freq = k as f32 * bin_hz;
                        let rising = (freq - lower) / (center - lower);
                        let falling = (upper - freq) / (upper - center);
                        rising.min(falling).max(0.0)
                    })
                    .collect()
            })
            .collect();

        Self { weights }
    }

    /// Apply the filterbank to a power spectrum
    pub fn apply(&self, power: &[f32]) -> Vec<f64> {
        self.weights
            .iter()
            .map(|row| {
                row.iter()
                    .zip(power.iter())
                    .map(|(&w, &p)| w as f64 * p as f64)
                    .sum()
            })
            .collect()
    }

    pub fn num_bands(&self) -> usize {
        self.weights.len()
    }
}

/// Orthonormal DCT-II basis, truncated to the retained coefficients
#[derive(Debug, Clone)]
struct DctBasis {
    rows: Vec<Vec<f64>>,
}

impl DctBasis {
    fn new(num_inputs: usize, num_outputs: usize) -> Self {
        let n = num_inputs as f64;
        let rows = (0..num_outputs)
            .map(|k| {
                let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
                (0..num_inputs)
                    .map(|i| scale * (PI * k as f64 * (i as f64 + 0.5) / n).cos())
                    .collect()
            })
            .collect();
        Self { rows }
    }

    fn transform(&self, input: &[f64], output: &mut [f64]) {
        for (out, row) in output.iter_mut().zip(self.rows.iter()) {
            *out = row.iter().zip(input.iter()).map(|(b, x)| b * x).sum();
        }
    }
}

/// Frames a working-rate signal and reduces it to one mean MFCC vector
pub struct FeatureExtractor {
    params: MfccParams,
    fft: FftProcessor,
    filterbank: MelFilterbank,
    dct: DctBasis,
}

impl FeatureExtractor {
    pub fn new(params: MfccParams, sample_rate: u32) -> Self {
        let fmax = params.fmax.unwrap_or(sample_rate as f32 / 2.0);
        let fft = FftProcessor::new(params.fft_size, params.window_length, params.window);
        let filterbank =
            MelFilterbank::new(params.num_mel_bands, params.fft_size, sample_rate, params.fmin, fmax);
        // Fewer bands than coefficients leaves the tail of the vector at zero
        let dct = DctBasis::new(params.num_mel_bands, params.num_mel_bands.min(NUM_COEFFICIENTS));
        Self { params, fft, filterbank, dct }
    }

    /// Mean MFCC vector over all frames.
    ///
    /// Signals shorter than one window are zero-padded to a single frame.
    pub fn extract(&mut self, signal: &PcmSignal) -> Result<FeatureVector, PipelineError> {
        if signal.is_empty() {
            return Err(PipelineError::EmptySignal("signal has zero samples".to_string()));
        }

        let window = self.params.window_length;
        let hop = self.params.hop_length;

        let padded;
        let samples = if signal.len() < window {
            let mut buf = signal.samples().to_vec();
            buf.resize(window, 0.0);
            padded = buf;
            &padded[..]
        } else {
            signal.samples()
        };

        let num_frames = 1 + (samples.len() - window) / hop;
        let mut sums = [0.0f64; NUM_COEFFICIENTS];
        let mut log_mel = vec![0.0f64; self.filterbank.num_bands()];
        let mut cepstrum = [0.0f64; NUM_COEFFICIENTS];

        for frame_idx in 0..num_frames {
            let start = frame_idx * hop;
            let frame = &samples[start..start + window];

            let power = self.fft.power_spectrum(frame);
            let energies = self.filterbank.apply(&power);
            for (dst, e) in log_mel.iter_mut().zip(energies) {
                *dst = 10.0 * e.max(LOG_FLOOR).log10();
            }

            self.dct.transform(&log_mel, &mut cepstrum);
            for (sum, c) in sums.iter_mut().zip(cepstrum.iter()) {
                *sum += c;
            }
        }

        let mut mean = [0.0f32; NUM_COEFFICIENTS];
        for (m, s) in mean.iter_mut().zip(sums.iter()) {
            *m = (s / num_frames as f64) as f32;
        }

        debug!("Extracted MFCC mean over {} frames", num_frames);
        Ok(FeatureVector::new(mean))
    }

    pub fn params(&self) -> &MfccParams {
        &self.params
    }
}

#[inline]
pub fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

#[inline]
pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}
