//! Per-coefficient standardization with training-time statistics

use super::features::{FeatureVector, FEATURE_DIM};
use super::model::NormalizationStats;

/// Applies `(x - mean[i]) / stddev[i]`; a zero `stddev[i]` maps coefficient `i` to zero
#[derive(Debug, Clone)]
pub struct Normalizer {
    mean: [f32; FEATURE_DIM],
    stddev: [f32; FEATURE_DIM],
}

impl Normalizer {
    pub fn new(mean: [f32; FEATURE_DIM], stddev: [f32; FEATURE_DIM]) -> Self {
        Self { mean, stddev }
    }

    /// Build from validated weight statistics
    pub fn from_stats(stats: &NormalizationStats) -> Self {
        let mut mean = [0.0f32; FEATURE_DIM];
        let mut stddev = [0.0f32; FEATURE_DIM];
        mean.copy_from_slice(&stats.mean[..FEATURE_DIM]);
        stddev.copy_from_slice(&stats.stddev[..FEATURE_DIM]);
        Self { mean, stddev }
    }

    /// Leaves every coefficient unchanged
    pub fn identity() -> Self {
        Self::new([0.0; FEATURE_DIM], [1.0; FEATURE_DIM])
    }

    pub fn apply(&self, features: &FeatureVector) -> FeatureVector {
        let mut out = [0.0f32; FEATURE_DIM];
        for (i, (o, &x)) in out.iter_mut().zip(features.as_slice()).enumerate() {
            let sd = self.stddev[i];
            *o = if sd == 0.0 { 0.0 } else { (x - self.mean[i]) / sd };
        }
        FeatureVector::new(out)
    }
}
