// src/core/model/classifier.rs
//
// Feed-forward evaluation: 40 -> 128 ReLU -> 64 ReLU -> 8 softmax.

use std::path::Path;
use std::sync::Arc;

use super::weights::ModelWeights;
use crate::core::catalog::NUM_SPECIES;
use crate::core::features::FeatureVector;
use crate::error::PipelineError;

/// Per-species probabilities in catalog index order
pub type Probabilities = [f64; NUM_SPECIES];

/// Numeric backend behind the pipeline.
///
/// Implementations must be pure: the same features always give the same
/// probabilities, and concurrent calls share no mutable state.
pub trait InferenceBackend: Send + Sync {
    /// Load a backend from a weights file; failures are [`PipelineError::ModelLoad`]
    fn load(path: &Path) -> Result<Self, PipelineError>
    where
        Self: Sized;

    fn infer(&self, features: &FeatureVector) -> Probabilities;

    /// Weights backing this backend, for catalog alignment and model info
    fn weights(&self) -> &ModelWeights;
}

/// Hand-rolled dense network over shared read-only weights
#[derive(Debug, Clone)]
pub struct Classifier {
    weights: Arc<ModelWeights>,
}

impl Classifier {
    pub fn new(weights: Arc<ModelWeights>) -> Result<Self, PipelineError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// Pre-softmax scores
    pub fn logits(&self, features: &FeatureVector) -> Vec<f64> {
        let mut activations: Vec<f64> = features.as_slice().iter().map(|&v| sanitize(v)).collect();

        let last = self.weights.layers.len() - 1;
        for (idx, layer) in self.weights.layers.iter().enumerate() {
            activations = layer.forward(&activations);
            if idx < last {
                activations.iter_mut().for_each(|a| *a = relu(*a));
            }
        }
        activations
    }
}

impl InferenceBackend for Classifier {
    fn load(path: &Path) -> Result<Self, PipelineError> {
        let weights = ModelWeights::load(path)?;
        Ok(Self {
            weights: Arc::new(weights),
        })
    }

    fn infer(&self, features: &FeatureVector) -> Probabilities {
        let logits = self.logits(features);
        let mut probs = [0.0f64; NUM_SPECIES];
        for (p, s) in probs.iter_mut().zip(softmax(&logits)) {
            *p = s;
        }
        probs
    }

    fn weights(&self) -> &ModelWeights {
        &self.weights
    }
}

#[inline]
pub fn relu(x: f64) -> f64 {
    x.max(0.0)
}

/// Softmax with max subtraction so large logits cannot overflow
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    if logits.is_empty() {
        return Vec::new();
    }
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&x| (x - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|&e| e / total).collect()
}

/// Keep inputs finite so every layer output stays finite in f64
fn sanitize(v: f32) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(f32::MIN, f32::MAX) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use crate::core::features::FEATURE_DIM;
    use crate::core::model::{DenseLayer, NormalizationStats, LAYER_SHAPES, WEIGHTS_FORMAT_VERSION};
    use crate::core::catalog::{SpeciesCatalog, CATALOG_VERSION};

    /// Each layer copies its first `outputs` inputs through unchanged
    fn identity_weights() -> ModelWeights {
        let layers: Vec<DenseLayer> = LAYER_SHAPES
            .iter()
            .map(|&(inputs, outputs)| DenseLayer {
                weights: (0..outputs)
                    .map(|j| (0..inputs).map(|i| if i == j { 1.0 } else { 0.0 }).collect())
                    .collect(),
                bias: vec![0.0; outputs],
            })
            .collect();
        let json = serde_json::json!({
            "format_version": WEIGHTS_FORMAT_VERSION,
            "catalog_version": CATALOG_VERSION,
            "labels": SpeciesCatalog::builtin().common_names(),
            "normalization": NormalizationStats { mean: vec![0.0; FEATURE_DIM], stddev: vec![1.0; FEATURE_DIM] },
            "layers": layers,
        });
        ModelWeights::from_json(&json.to_string()).unwrap()
    }

    #[test]
    fn test_relu() {
        assert_eq!(relu(-3.0), 0.0);
        assert_eq!(relu(0.0), 0.0);
        assert_eq!(relu(2.5), 2.5);
    }

    #[test]
    fn test_softmax_uniform() {
        let probs = softmax(&[0.0; 4]);
        assert!(probs.iter().all(|&p| (p - 0.25).abs() < 1e-12));
    }

    #[test]
    fn test_softmax_large_logits() {
        let probs = softmax(&[1000.0, 1000.0, -1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-12);
        assert!(probs[2] >= 0.0);
    }

    #[test]
    fn test_identity_network_hand_computed() {
        let classifier = Classifier::new(Arc::new(identity_weights())).unwrap();

        let mut values = [0.0f32; FEATURE_DIM];
        values[0] = 1.0;
        values[1] = 2.0;
        values[2] = -1.0; // removed by ReLU
        values[9] = 5.0; // beyond the 8 outputs
        let probs = classifier.infer(&FeatureVector::new(values));

        let e = std::f64::consts::E;
        let denom = e + e * e + 6.0;
        let expected = [e / denom, e * e / denom, 1.0 / denom, 1.0 / denom, 1.0 / denom, 1.0 / denom, 1.0 / denom, 1.0 / denom];
        for (p, x) in probs.iter().zip(expected.iter()) {
            assert!((p - x).abs() < 1e-12, "{} != {}", p, x);
        }
    }

    #[test]
    fn test_valid_distribution_for_random_inputs() {
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        for seed in 0..20 {
            let classifier = Classifier::new(Arc::new(ModelWeights::demo(seed))).unwrap();
            for _ in 0..10 {
                let mut values = [0.0f32; FEATURE_DIM];
                for v in values.iter_mut() {
                    *v = rng.gen_range(-1000.0f32..1000.0);
                }
                let probs = classifier.infer(&FeatureVector::new(values));
                assert!(probs.iter().all(|&p| p >= 0.0));
                let sum: f64 = probs.iter().sum();
                assert!((sum - 1.0).abs() < 1e-6, "sum = {}", sum);
            }
        }
    }

    #[test]
    fn test_extreme_inputs_stay_valid() {
        let classifier = Classifier::new(Arc::new(ModelWeights::demo(5))).unwrap();
        let mut values = [f32::MAX; FEATURE_DIM];
        values[0] = f32::INFINITY;
        values[1] = f32::NAN;
        values[2] = f32::NEG_INFINITY;
        let probs = classifier.infer(&FeatureVector::new(values));
        assert!(probs.iter().all(|p| p.is_finite() && *p >= 0.0));
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_infer_is_deterministic() {
        let classifier = Classifier::new(Arc::new(ModelWeights::demo(11))).unwrap();
        let fv = FeatureVector::new([0.3; FEATURE_DIM]);
        assert_eq!(classifier.infer(&fv), classifier.infer(&fv));
    }
}
