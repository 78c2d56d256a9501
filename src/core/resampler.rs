// src/core/resampler.rs
//
// Sample rate conversion to the pipeline's working rate.
// Band-limited windowed-sinc interpolation via rubato's SincFixedIn.

use log::debug;
use rubato::{
    Resampler as _, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};
use serde::{Deserialize, Serialize};

use super::signal::{PcmSignal, WORKING_SAMPLE_RATE};
use crate::error::PipelineError;

/// Windowed-sinc filter settings.
///
/// These change MFCC output numerically; weights trained against one
/// setting should be served with the same setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResamplerParams {
    pub sinc_len: usize,
    /// Cutoff relative to the lower Nyquist frequency
    pub f_cutoff: f32,
    pub oversampling_factor: usize,
    /// Input frames per processing block
    pub chunk_size: usize,
}

impl Default for ResamplerParams {
    fn default() -> Self {
        Self {
            sinc_len: 256,
            f_cutoff: 0.95,
            oversampling_factor: 256,
            chunk_size: 1024,
        }
    }
}

impl ResamplerParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.sinc_len == 0 || self.chunk_size == 0 || self.oversampling_factor == 0 {
            return Err("resampler sinc_len, chunk_size and oversampling_factor must be positive".into());
        }
        if !(self.f_cutoff > 0.0 && self.f_cutoff <= 1.0) {
            return Err(format!("resampler f_cutoff must be in (0, 1], got {}", self.f_cutoff));
        }
        Ok(())
    }
}

/// Converts decoded signals to the working sample rate
#[derive(Debug, Clone, Default)]
pub struct SignalResampler {
    params: ResamplerParams,
}

impl SignalResampler {
    pub fn new(params: ResamplerParams) -> Self {
        Self { params }
    }

    /// Resample to [`WORKING_SAMPLE_RATE`]
    pub fn to_working_rate(&self, signal: PcmSignal) -> Result<PcmSignal, PipelineError> {
        self.resample(signal, WORKING_SAMPLE_RATE)
    }

    /// Resample to `target_rate`. A signal already at that rate is returned
    /// untouched.
    pub fn resample(&self, signal: PcmSignal, target_rate: u32) -> Result<PcmSignal, PipelineError> {
        if signal.is_empty() {
            return Err(PipelineError::Resampling("input signal is empty".to_string()));
        }
        if target_rate == 0 || signal.sample_rate() == 0 {
            return Err(PipelineError::Resampling("sample rate must be positive".to_string()));
        }
        if signal.sample_rate() == target_rate {
            return Ok(signal);
        }

        let source_rate = signal.sample_rate();
        let output = self.process(signal.samples(), source_rate, target_rate)?;
        debug!(
            "Resampled {} -> {} Hz ({} -> {} samples)",
            source_rate,
            target_rate,
            signal.len(),
            output.len()
        );
        Ok(PcmSignal::new(output, target_rate))
    }

    fn process(&self, input: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>, PipelineError> {
        let ratio = target_rate as f64 / source_rate as f64;
        let params = SincInterpolationParameters {
            sinc_len: self.params.sinc_len,
            f_cutoff: self.params.f_cutoff,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: self.params.oversampling_factor,
            window: WindowFunction::BlackmanHarris2,
        };

        let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, self.params.chunk_size, 1)
            .map_err(|e| PipelineError::Resampling(e.to_string()))?;

        let expected_len = (input.len() as f64 * ratio).ceil() as usize;
        let delay = resampler.output_delay();
        let mut output: Vec<f32> = Vec::with_capacity(expected_len + delay + self.params.chunk_size);

        let mut pos = 0;
        while input.len() - pos >= resampler.input_frames_next() {
            let end = pos + resampler.input_frames_next();
            let block = vec![&input[pos..end]];
            let out = resampler
                .process(block.as_slice(), None)
                .map_err(|e| PipelineError::Resampling(e.to_string()))?;
            output.extend_from_slice(&out[0]);
            pos = end;
        }

        if pos < input.len() {
            let block = vec![&input[pos..]];
            let out = resampler
                .process_partial(Some(block.as_slice()), None)
                .map_err(|e| PipelineError::Resampling(e.to_string()))?;
            output.extend_from_slice(&out[0]);
        }

        // Flush the filter tail until the delayed output is complete
        while output.len() < expected_len + delay {
            let out = resampler
                .process_partial::<&[f32]>(None, None)
                .map_err(|e| PipelineError::Resampling(e.to_string()))?;
            if out[0].is_empty() {
                break;
            }
            output.extend_from_slice(&out[0]);
        }

        output.drain(..delay.min(output.len()));
        output.truncate(expected_len);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.8 * (2.0 * PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_identity_at_working_rate() {
        let samples = sine(1000.0, WORKING_SAMPLE_RATE, 4096);
        let signal = PcmSignal::new(samples.clone(), WORKING_SAMPLE_RATE);
        let out = SignalResampler::default().to_working_rate(signal).unwrap();
        assert_eq!(out.samples(), samples.as_slice());
        assert_eq!(out.sample_rate(), WORKING_SAMPLE_RATE);
    }

    #[test]
    fn test_empty_input_fails() {
        let signal = PcmSignal::new(Vec::new(), 44_100);
        let err = SignalResampler::default().to_working_rate(signal).unwrap_err();
        assert!(matches!(err, PipelineError::Resampling(_)));
    }

    #[test]
    fn test_downsample_length_and_level() {
        let signal = PcmSignal::new(sine(1000.0, 44_100, 44_100), 44_100);
        let out = SignalResampler::default().to_working_rate(signal).unwrap();
        assert_eq!(out.len(), 22_050);

        let mid = &out.samples()[5_000..15_000];
        let rms = (mid.iter().map(|s| s * s).sum::<f32>() / mid.len() as f32).sqrt();
        assert!((rms - 0.8 / 2f32.sqrt()).abs() < 0.03, "rms = {}", rms);
    }

    #[test]
    fn test_upsample_length() {
        let signal = PcmSignal::new(sine(440.0, 16_000, 8_000), 16_000);
        let out = SignalResampler::default().to_working_rate(signal).unwrap();
        assert_eq!(out.len(), (8_000f64 * 22_050.0 / 16_000.0).ceil() as usize);
    }

    #[test]
    fn test_short_input() {
        let signal = PcmSignal::new(vec![0.25; 10], 48_000);
        let out = SignalResampler::default().to_working_rate(signal).unwrap();
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn test_params_validation() {
        assert!(ResamplerParams::default().validate().is_ok());
        let bad = ResamplerParams { f_cutoff: 1.5, ..Default::default() };
        assert!(bad.validate().is_err());
    }
}
