//! Classification pipeline: decoding, signal processing, inference and ranking

pub mod assembler;
pub mod catalog;
pub mod decoder;
pub mod dsp;
pub mod features;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod resampler;
pub mod service;
pub mod signal;

pub use assembler::{assemble_result, ClassificationResult, RankedPrediction};
pub use catalog::{SpeciesCatalog, SpeciesLabel, CATALOG_VERSION, NUM_SPECIES};
pub use decoder::{decode_audio, AudioFormat, AudioSample, DecodedAudio};
pub use features::{FeatureExtractor, FeatureVector, MfccParams, FEATURE_DIM};
pub use model::{Classifier, InferenceBackend, ModelWeights, Probabilities};
pub use normalizer::Normalizer;
pub use pipeline::{CancellationToken, ClassificationPipeline, ModelInfo};
pub use resampler::{ResamplerParams, SignalResampler};
pub use service::{ClassificationRequest, ClassificationResponse, ClassificationService, Outcome};
pub use signal::{PcmSignal, WORKING_SAMPLE_RATE};
