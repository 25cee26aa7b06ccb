//! Comfort classification: feature assembly, scaling and the forest model.

pub mod classifier;
pub mod features;
pub mod forest;
pub mod scaler;

pub use classifier::{
    ClassPrediction, ClassifyError, ComfortClassifier, ComfortModel, ComfortProbabilities,
    ComfortVerdict, FeatureScaler, ModelArtifact, ModelLoadError, COMFORTABLE_CLASS,
};
pub use features::{FeatureError, FeatureInput, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
