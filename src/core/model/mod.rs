//! Network weights and inference

mod classifier;
mod weights;

pub use classifier::{relu, softmax, Classifier, InferenceBackend, Probabilities};
pub use weights::{
    DenseLayer, ModelWeights, NormalizationStats, WeightsSource, HIDDEN_1, HIDDEN_2, LAYER_SHAPES,
    WEIGHTS_FORMAT_VERSION,
};
