// src/core/pipeline.rs
//
// Decode -> resample -> MFCC -> normalize -> classify -> assemble.
// A pipeline value is shared read-only between requests; each call owns its
// own buffers and returns either a result or a structured error.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::assembler::{assemble_result, ClassificationResult};
use super::catalog::SpeciesCatalog;
use super::decoder::{decode_audio, AudioFormat, AudioSample};
use super::features::{FeatureExtractor, FeatureVector};
use super::model::{Classifier, InferenceBackend, ModelWeights};
use super::normalizer::Normalizer;
use super::resampler::SignalResampler;
use super::signal::WORKING_SAMPLE_RATE;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Stage};

/// Cooperative cancellation, checked between pipeline stages
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that trips once `timeout` has elapsed from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Same cancel flag, with the deadline tightened to at most `timeout` from now
    pub fn with_deadline(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.map_or(false, |d| Instant::now() >= d)
    }

    /// Fail with [`PipelineError::Cancelled`] if the request should stop before `stage`
    pub fn check(&self, stage: Stage) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            debug!("Request cancelled before {} stage", stage);
            return Err(PipelineError::Cancelled { stage });
        }
        Ok(())
    }
}

/// Model status as reported by the `model-info` command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub loaded: bool,
    pub loaded_at: DateTime<Utc>,
    pub species_count: usize,
    pub supported_species: Vec<String>,
    pub model_type: String,
    pub feature_type: String,
    pub format_version: u32,
    pub catalog_version: String,
    pub checksum: String,
    pub working_sample_rate: u32,
}

/// Stateless classification pipeline over shared read-only weights
pub struct ClassificationPipeline<B: InferenceBackend = Classifier> {
    config: PipelineConfig,
    resampler: SignalResampler,
    normalizer: Normalizer,
    backend: Arc<B>,
    catalog: Arc<SpeciesCatalog>,
    loaded_at: DateTime<Utc>,
}

impl ClassificationPipeline<Classifier> {
    /// Build the default dense-network pipeline.
    ///
    /// Fails with [`PipelineError::ModelLoad`] if the weights are malformed or
    /// were trained against a different catalog.
    pub fn new(
        config: PipelineConfig,
        weights: Arc<ModelWeights>,
        catalog: Arc<SpeciesCatalog>,
    ) -> Result<Self, PipelineError> {
        let backend = Classifier::new(weights)?;
        Self::with_backend(config, Arc::new(backend), catalog)
    }
}

impl<B: InferenceBackend> ClassificationPipeline<B> {
    pub fn with_backend(
        config: PipelineConfig,
        backend: Arc<B>,
        catalog: Arc<SpeciesCatalog>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let weights = backend.weights();
        weights.validate()?;
        catalog
            .check_alignment(&weights.catalog_version, &weights.labels)
            .map_err(PipelineError::ModelLoad)?;
        if weights.is_demo() {
            warn!("Using built-in demo weights; predictions are not meaningful");
        }
        info!(
            "Model ready: catalog {}, weights {}",
            catalog.version(),
            weights.checksum()
        );

        Ok(Self {
            resampler: SignalResampler::new(config.resampler.clone()),
            normalizer: Normalizer::from_stats(&weights.normalization),
            config,
            backend,
            catalog,
            loaded_at: Utc::now(),
        })
    }

    /// Classify an audio payload without a deadline
    pub fn classify(
        &self,
        bytes: Vec<u8>,
        declared: Option<AudioFormat>,
    ) -> Result<ClassificationResult, PipelineError> {
        self.classify_with_cancel(bytes, declared, &CancellationToken::new())
    }

    pub fn classify_with_cancel(
        &self,
        bytes: Vec<u8>,
        declared: Option<AudioFormat>,
        token: &CancellationToken,
    ) -> Result<ClassificationResult, PipelineError> {
        let features = self.extract_features(bytes, declared, token)?;
        token.check(Stage::Normalize)?;
        Ok(self.classify_features(&features))
    }

    /// Run the signal stages only: decode, resample and MFCC aggregation
    pub fn extract_features(
        &self,
        bytes: Vec<u8>,
        declared: Option<AudioFormat>,
        token: &CancellationToken,
    ) -> Result<FeatureVector, PipelineError> {
        token.check(Stage::Decode)?;
        let started = Instant::now();
        let sample = AudioSample::new(bytes, declared)?;
        let decoded = decode_audio(&sample)?;
        drop(sample);

        let mut signal = decoded.signal;
        if signal.is_empty() {
            return Err(PipelineError::EmptySignal("decoded signal has zero samples".to_string()));
        }
        if let Some(max) = self.config.max_duration_secs {
            if signal.duration_secs() > max {
                debug!("Analysing first {:.1}s of {:.1}s", max, signal.duration_secs());
                signal.truncate_secs(max);
            }
            if signal.is_empty() {
                return Err(PipelineError::EmptySignal(format!(
                    "no samples within the first {}s",
                    max
                )));
            }
        }
        debug!("{} stage took {:?}", Stage::Decode, started.elapsed());

        token.check(Stage::Resample)?;
        let started = Instant::now();
        let signal = self.resampler.to_working_rate(signal)?;
        debug!("{} stage took {:?}", Stage::Resample, started.elapsed());

        token.check(Stage::Extract)?;
        let started = Instant::now();
        let mut extractor = FeatureExtractor::new(self.config.mfcc.clone(), WORKING_SAMPLE_RATE);
        let features = extractor.extract(&signal)?;
        debug!("{} stage took {:?}", Stage::Extract, started.elapsed());

        Ok(features)
    }

    /// Normalize, infer and rank a feature vector
    pub fn classify_features(&self, features: &FeatureVector) -> ClassificationResult {
        let normalized = self.normalizer.apply(features);
        let probabilities = self.backend.infer(&normalized);
        let result = assemble_result(&probabilities, &self.catalog);
        debug!(
            "Top prediction: {} ({:.1}%)",
            result.top.common_name,
            result.top.confidence_percent()
        );
        result
    }

    pub fn model_info(&self) -> ModelInfo {
        let weights = self.backend.weights();
        ModelInfo {
            loaded: true,
            loaded_at: self.loaded_at,
            species_count: self.catalog.entries().len(),
            supported_species: self.catalog.common_names().iter().map(|s| s.to_string()).collect(),
            model_type: if weights.is_demo() {
                "Demo Neural Network".to_string()
            } else {
                "Dense Neural Network".to_string()
            },
            feature_type: format!("MFCC ({} coefficients)", super::features::FEATURE_DIM),
            format_version: weights.format_version,
            catalog_version: weights.catalog_version.clone(),
            checksum: weights.checksum(),
            working_sample_rate: WORKING_SAMPLE_RATE,
        }
    }

    pub fn catalog(&self) -> &SpeciesCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
