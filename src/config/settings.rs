// src/config/settings.rs
//
// Pipeline configuration: feature parameters, resampling and worker limits.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::features::MfccParams;
use crate::core::resampler::ResamplerParams;
use crate::core::signal::WORKING_SAMPLE_RATE;
use crate::error::PipelineError;

/// Only the first 30 seconds of a recording are analysed by default
pub const DEFAULT_MAX_DURATION_SECS: f64 = 30.0;

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mfcc: MfccParams,
    pub resampler: ResamplerParams,
    /// Analyse at most this many seconds of decoded audio (`None` = whole file)
    pub max_duration_secs: Option<f64>,
    /// Worker threads for batch classification (`None` = available parallelism)
    pub workers: Option<usize>,
    /// Per-request deadline; checked between pipeline stages
    pub request_timeout_ms: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mfcc: MfccParams::default(),
            resampler: ResamplerParams::default(),
            max_duration_secs: Some(DEFAULT_MAX_DURATION_SECS),
            workers: None,
            request_timeout_ms: None,
        }
    }
}

impl PipelineConfig {
    /// Load and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let config: PipelineConfig = serde_json::from_str(&text).map_err(|e| {
            PipelineError::Config(format!("malformed config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.mfcc
            .validate_for_rate(WORKING_SAMPLE_RATE)
            .map_err(PipelineError::Config)?;
        self.resampler.validate().map_err(PipelineError::Config)?;

        if let Some(max) = self.max_duration_secs {
            if !(max.is_finite() && max > 0.0) {
                return Err(PipelineError::Config(format!(
                    "max_duration_secs must be positive, got {}",
                    max
                )));
            }
        }
        if self.workers == Some(0) {
            return Err(PipelineError::Config("workers must be at least 1".to_string()));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(PipelineError::Config("request_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Resolved worker count
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

/// Builder for custom configurations
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: PipelineConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn mfcc(mut self, params: MfccParams) -> Self {
        self.config.mfcc = params;
        self
    }

    pub fn resampler(mut self, params: ResamplerParams) -> Self {
        self.config.resampler = params;
        self
    }

    pub fn max_duration_secs(mut self, secs: Option<f64>) -> Self {
        self.config.max_duration_secs = secs;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = Some(workers);
        self
    }

    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.config.request_timeout_ms = Some(ms);
        self
    }

    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_duration_secs, Some(30.0));
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"workers": 2, "mfcc": {"num_mel_bands": 40}}"#).unwrap();
        assert_eq!(config.workers, Some(2));
        assert_eq!(config.mfcc.num_mel_bands, 40);
        assert_eq!(config.mfcc.window_length, 551);
        assert_eq!(config.resampler, ResamplerParams::default());
    }

    #[test]
    fn test_builder() {
        let config = ConfigBuilder::new()
            .workers(3)
            .request_timeout_ms(500)
            .max_duration_secs(None)
            .build()
            .unwrap();
        assert_eq!(config.worker_count(), 3);
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(500)));
        assert_eq!(config.max_duration_secs, None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ConfigBuilder::new().workers(0).build(),
            Err(PipelineError::Config(_))
        ));
        assert!(ConfigBuilder::new().max_duration_secs(Some(-1.0)).build().is_err());
        let mfcc = MfccParams { num_mel_bands: 0, ..Default::default() };
        assert!(ConfigBuilder::new().mfcc(mfcc).build().is_err());
    }

    #[test]
    fn test_mel_edges_beyond_nyquist_rejected() {
        let mfcc = MfccParams { fmin: 12_000.0, ..Default::default() };
        assert!(matches!(
            ConfigBuilder::new().mfcc(mfcc).build(),
            Err(PipelineError::Config(_))
        ));
        let mfcc = MfccParams { fmin: 100.0, fmax: Some(16_000.0), ..Default::default() };
        assert!(ConfigBuilder::new().mfcc(mfcc).build().is_err());

        let json = r#"{"mfcc": {"fmin": 11025.0}}"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = PipelineConfig::load(Path::new("/nonexistent/birdclassr.json")).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
