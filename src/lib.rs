//! birdclassr - Identify bird species in audio recordings
//!
//! Decodes an uploaded recording, summarizes it as a 40-coefficient MFCC
//! vector and runs a small dense network that scores eight common species.
//!
//! ## Pipeline
//!
//! | Stage      | Module                  | Output                              |
//! |------------|-------------------------|-------------------------------------|
//! | Decode     | `core::decoder`         | Mono PCM at the file's native rate  |
//! | Resample   | `core::resampler`       | Mono PCM at 22 050 Hz               |
//! | Extract    | `core::features`        | Time-averaged MFCC vector           |
//! | Normalize  | `core::normalizer`      | Standardized feature vector         |
//! | Classify   | `core::model`           | Eight probabilities summing to 1    |
//! | Assemble   | `core::assembler`       | Ranked, labelled result             |
//!
//! Each stage either hands its output to the next or returns a
//! [`PipelineError`]; a failing request never affects other requests.
//!
//! ## Module Structure
//!
//! - `core` - Pipeline stages, model, catalog and the worker-pool service
//! - `config` - Pipeline configuration and builder
//! - `cli` - Command-line interface
//! - `error` - Error kinds reported at the pipeline boundary
//! - `testgen` - Synthetic bird calls and WAV encoding
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use birdclassr::{ClassificationPipeline, ModelWeights, PipelineConfig, SpeciesCatalog};
//!
//! let pipeline = ClassificationPipeline::new(
//!     PipelineConfig::default(),
//!     Arc::new(ModelWeights::load(path)?),
//!     Arc::new(SpeciesCatalog::builtin()),
//! )?;
//!
//! let result = pipeline.classify(std::fs::read("robin.wav")?, None)?;
//! println!("{} ({:.1}%)", result.top.common_name, result.top.confidence_percent());
//! ```

// Pipeline stages and inference
pub mod core;

// Command-line interface
pub mod cli;

// Pipeline configuration
pub mod config;

pub mod error;

// Synthetic audio
pub mod testgen;

pub use config::{ConfigBuilder, PipelineConfig};
pub use error::{ClassificationFailure, ErrorKind, PipelineError, Stage};
pub use crate::core::{
    AudioFormat, CancellationToken, ClassificationPipeline, ClassificationRequest,
    ClassificationResponse, ClassificationResult, ClassificationService, FeatureVector,
    ModelInfo, ModelWeights, Outcome, RankedPrediction, SpeciesCatalog, SpeciesLabel,
};
