//! Acoustic feature extraction

mod mfcc;

pub use mfcc::{hz_to_mel, mel_to_hz, FeatureExtractor, MelFilterbank, MfccParams, NUM_COEFFICIENTS};

use serde::{Deserialize, Serialize};

/// Length of the aggregated feature vector fed to the classifier
pub const FEATURE_DIM: usize = NUM_COEFFICIENTS;

/// Fixed-width feature vector; the array type guarantees exactly 40 values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(#[serde(with = "fixed_array")] [f32; FEATURE_DIM]);

impl FeatureVector {
    pub fn new(values: [f32; FEATURE_DIM]) -> Self {
        Self(values)
    }

    pub fn zeros() -> Self {
        Self([0.0; FEATURE_DIM])
    }

    /// Build from a slice, failing unless it has exactly [`FEATURE_DIM`] values
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        <[f32; FEATURE_DIM]>::try_from(values).ok().map(Self)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn as_array(&self) -> &[f32; FEATURE_DIM] {
        &self.0
    }
}

/// serde support for `[f32; 40]`, serialized as a plain sequence
mod fixed_array {
    use super::FEATURE_DIM;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f32; FEATURE_DIM], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(values.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[f32; FEATURE_DIM], D::Error> {
        let values = Vec::<f32>::deserialize(d)?;
        let len = values.len();
        <[f32; FEATURE_DIM]>::try_from(values)
            .map_err(|_| D::Error::custom(format!("expected {} values, got {}", FEATURE_DIM, len)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_checks_length() {
        assert!(FeatureVector::from_slice(&[0.0; 40]).is_some());
        assert!(FeatureVector::from_slice(&[0.0; 39]).is_none());
        assert!(FeatureVector::from_slice(&[0.0; 41]).is_none());
    }

    #[test]
    fn test_serde_sequence() {
        let mut values = [0.0f32; FEATURE_DIM];
        values[3] = 1.5;
        let fv = FeatureVector::new(values);
        let json = serde_json::to_string(&fv).unwrap();
        assert!(json.starts_with('['));
        let back: FeatureVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fv);
        assert!(serde_json::from_str::<FeatureVector>("[1.0, 2.0]").is_err());
    }
}
