// src/core/model/weights.rs
//
// Versioned, validated network weights. Loaded once at startup, read-only afterwards.

use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::catalog::{SpeciesCatalog, CATALOG_VERSION, NUM_SPECIES};
use crate::core::features::FEATURE_DIM;
use crate::error::PipelineError;

/// Weights file layout version understood by this build
pub const WEIGHTS_FORMAT_VERSION: u32 = 1;

pub const HIDDEN_1: usize = 128;
pub const HIDDEN_2: usize = 64;

/// `(inputs, outputs)` of each dense layer, in evaluation order
pub const LAYER_SHAPES: [(usize, usize); 3] = [
    (FEATURE_DIM, HIDDEN_1),
    (HIDDEN_1, HIDDEN_2),
    (HIDDEN_2, NUM_SPECIES),
];

/// Training-time feature statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub mean: Vec<f32>,
    pub stddev: Vec<f32>,
}

/// Fully connected layer; `weights[j]` holds the input weights of output unit `j`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

impl DenseLayer {
    pub fn input_dim(&self) -> usize {
        self.weights.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn output_dim(&self) -> usize {
        self.weights.len()
    }

    /// `bias + W · input`, accumulated in f64
    pub fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(self.bias.iter())
            .map(|(row, &b)| {
                row.iter()
                    .zip(input.iter())
                    .fold(b as f64, |acc, (&w, &x)| acc + w as f64 * x)
            })
            .collect()
    }
}

/// Where a set of weights came from
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WeightsSource {
    #[default]
    Inline,
    Demo { seed: u64 },
    File { path: PathBuf, checksum: String },
}

/// Network parameters plus the catalog alignment they were trained against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    pub format_version: u32,
    pub catalog_version: String,
    /// Common names in output-index order
    pub labels: Vec<String>,
    pub normalization: NormalizationStats,
    pub layers: Vec<DenseLayer>,
    #[serde(skip)]
    source: WeightsSource,
}

impl ModelWeights {
    /// Load and validate a JSON weights file
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let bytes = fs::read(path).map_err(|e| {
            PipelineError::ModelLoad(format!("cannot read weights {}: {}", path.display(), e))
        })?;
        let checksum = format!("{:x}", md5::compute(&bytes));

        let mut weights: ModelWeights = serde_json::from_slice(&bytes).map_err(|e| {
            PipelineError::ModelLoad(format!("malformed weights {}: {}", path.display(), e))
        })?;
        weights.validate()?;
        weights.source = WeightsSource::File {
            path: path.to_path_buf(),
            checksum,
        };

        info!("Loaded weights from {} ({})", path.display(), weights.checksum());
        Ok(weights)
    }

    /// Parse and validate weights from a JSON string
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let weights: ModelWeights = serde_json::from_str(json)
            .map_err(|e| PipelineError::ModelLoad(format!("malformed weights: {}", e)))?;
        weights.validate()?;
        Ok(weights)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Untrained demonstration network with Glorot-uniform weights.
    ///
    /// Deterministic for a given seed.
    pub fn demo(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let layers = LAYER_SHAPES
            .iter()
            .map(|&(inputs, outputs)| {
                let limit = (6.0 / (inputs + outputs) as f64).sqrt();
                DenseLayer {
                    weights: (0..outputs)
                        .map(|_| (0..inputs).map(|_| rng.gen_range(-limit..limit) as f32).collect())
                        .collect(),
                    bias: vec![0.0; outputs],
                }
            })
            .collect();

        // Rough MFCC scale: c0 carries log energy, the rest sit near zero
        let mut mean = vec![0.0f32; FEATURE_DIM];
        let mut stddev = vec![25.0f32; FEATURE_DIM];
        mean[0] = -400.0;
        stddev[0] = 150.0;

        let catalog = SpeciesCatalog::builtin();
        Self {
            format_version: WEIGHTS_FORMAT_VERSION,
            catalog_version: CATALOG_VERSION.to_string(),
            labels: catalog.common_names().iter().map(|s| s.to_string()).collect(),
            normalization: NormalizationStats { mean, stddev },
            layers,
            source: WeightsSource::Demo { seed },
        }
    }

    /// Check version, shapes and values. Every failure is a [`PipelineError::ModelLoad`].
    pub fn validate(&self) -> Result<(), PipelineError> {
        let fail = |msg: String| Err(PipelineError::ModelLoad(msg));

        if self.format_version != WEIGHTS_FORMAT_VERSION {
            return fail(format!(
                "unsupported weights format_version {} (expected {})",
                self.format_version, WEIGHTS_FORMAT_VERSION
            ));
        }
        if self.labels.len() != NUM_SPECIES {
            return fail(format!("expected {} labels, got {}", NUM_SPECIES, self.labels.len()));
        }

        let norm = &self.normalization;
        if norm.mean.len() != FEATURE_DIM || norm.stddev.len() != FEATURE_DIM {
            return fail(format!(
                "normalization needs {} means and stddevs, got {} and {}",
                FEATURE_DIM,
                norm.mean.len(),
                norm.stddev.len()
            ));
        }
        if norm.mean.iter().any(|v| !v.is_finite()) {
            return fail("normalization mean contains non-finite values".to_string());
        }
        if norm.stddev.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return fail("normalization stddev must be finite and non-negative".to_string());
        }

        if self.layers.len() != LAYER_SHAPES.len() {
            return fail(format!(
                "expected {} dense layers, got {}",
                LAYER_SHAPES.len(),
                self.layers.len()
            ));
        }
        for (idx, (layer, &(inputs, outputs))) in self.layers.iter().zip(LAYER_SHAPES.iter()).enumerate() {
            if layer.output_dim() != outputs || layer.bias.len() != outputs {
                return fail(format!(
                    "layer {}: expected {} output units, got {} rows and {} biases",
                    idx,
                    outputs,
                    layer.output_dim(),
                    layer.bias.len()
                ));
            }
            if let Some(row) = layer.weights.iter().position(|r| r.len() != inputs) {
                return fail(format!(
                    "layer {}: row {} has {} inputs, expected {}",
                    idx,
                    row,
                    layer.weights[row].len(),
                    inputs
                ));
            }
            let finite = layer.weights.iter().flatten().chain(layer.bias.iter()).all(|v| v.is_finite());
            if !finite {
                return fail(format!("layer {}: non-finite parameter", idx));
            }
        }

        Ok(())
    }

    pub fn source(&self) -> &WeightsSource {
        &self.source
    }

    /// md5 of the weights file, or a tag for weights not read from disk
    pub fn checksum(&self) -> String {
        match &self.source {
            WeightsSource::File { checksum, .. } => checksum.clone(),
            WeightsSource::Demo { seed } => format!("builtin-demo-{}", seed),
            WeightsSource::Inline => "inline".to_string(),
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self.source, WeightsSource::Demo { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_is_valid_and_deterministic() {
        let a = ModelWeights::demo(42);
        assert!(a.validate().is_ok());
        assert_eq!(a, ModelWeights::demo(42));
        assert_ne!(a.layers, ModelWeights::demo(43).layers);
        assert!(a.is_demo());
    }

    #[test]
    fn test_json_roundtrip_preserves_parameters() {
        let demo = ModelWeights::demo(1);
        let json = demo.to_json_pretty().unwrap();
        let parsed = ModelWeights::from_json(&json).unwrap();
        assert_eq!(parsed.layers, demo.layers);
        assert_eq!(parsed.normalization, demo.normalization);
        assert_eq!(parsed.source(), &WeightsSource::Inline);
    }

    #[test]
    fn test_wrong_shape_rejected() {
        let mut weights = ModelWeights::demo(3);
        weights.layers[1].weights[10].pop();
        let err = weights.validate().unwrap_err();
        assert!(matches!(err, PipelineError::ModelLoad(ref m) if m.contains("layer 1")));
    }

    #[test]
    fn test_missing_layer_rejected() {
        let mut weights = ModelWeights::demo(3);
        weights.layers.pop();
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut weights = ModelWeights::demo(3);
        weights.layers[2].bias[0] = f32::NAN;
        assert!(weights.validate().is_err());

        let mut weights = ModelWeights::demo(3);
        weights.normalization.stddev[4] = -1.0;
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_bad_version_rejected() {
        let mut weights = ModelWeights::demo(3);
        weights.format_version = 2;
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let err = ModelWeights::from_json("{\"format_version\": 1}").unwrap_err();
        assert!(matches!(err, PipelineError::ModelLoad(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ModelWeights::load(Path::new("/nonexistent/birdclassr/weights.json")).unwrap_err();
        assert!(matches!(err, PipelineError::ModelLoad(_)));
    }

    #[test]
    fn test_load_records_checksum() {
        let path = std::env::temp_dir().join(format!("birdclassr-weights-{}.json", uuid::Uuid::new_v4()));
        let json = ModelWeights::demo(9).to_json_pretty().unwrap();
        fs::write(&path, &json).unwrap();

        let loaded = ModelWeights::load(&path).unwrap();
        assert_eq!(loaded.checksum(), format!("{:x}", md5::compute(json.as_bytes())));
        assert!(!loaded.is_demo());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_dense_forward() {
        let layer = DenseLayer {
            weights: vec![vec![1.0, 2.0], vec![-1.0, 0.5]],
            bias: vec![0.5, 0.0],
        };
        let out = layer.forward(&[1.0, 3.0]);
        assert_eq!(out, vec![7.5, 0.5]);
    }
}
