use std::{fs, path::Path, sync::Arc};

use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    features::{FeatureError, FeatureInput, FeatureVector, FEATURE_COUNT},
    forest::RandomForest,
    scaler::StandardScaler,
};

/// Class index the model uses for "comfortable".
pub const COMFORTABLE_CLASS: usize = 0;

const PROBABILITY_TOLERANCE: f64 = 1e-6;

pub trait FeatureScaler: Send + Sync {
    fn transform(&self, features: &FeatureVector) -> Result<[f64; FEATURE_COUNT]>;
}

/// Raw model output: predicted class index and the two class probabilities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassPrediction {
    pub class: usize,
    pub probabilities: [f64; 2],
}

pub trait ComfortModel: Send + Sync {
    fn predict(&self, scaled: &[f64; FEATURE_COUNT]) -> Result<ClassPrediction>;
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    FeatureValidation(#[from] FeatureError),
    #[error("Error during comfort prediction: {0}")]
    ModelInvocation(String),
}

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed model artifact: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid model artifact: {0}")]
    Shape(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComfortProbabilities {
    #[serde(rename = "nyaman")]
    pub comfortable: f64,
    #[serde(rename = "tidak_nyaman")]
    pub uncomfortable: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComfortVerdict {
    pub comfortable: bool,
    pub probabilities: ComfortProbabilities,
}

impl ComfortVerdict {
    pub fn label(&self) -> &'static str {
        if self.comfortable {
            "nyaman"
        } else {
            "tidak nyaman"
        }
    }
}

/// On-disk form of a fitted scaler and forest. Both parts validate
/// themselves while deserializing.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    pub scaler: StandardScaler,
    pub forest: RandomForest,
}

impl ModelArtifact {
    pub fn from_json(raw: &str) -> Result<Self, ModelLoadError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let raw = fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }
}

/// Comfort classification over a pre-fitted scaler and model.
///
/// Both parts are read-only after construction and shared between request
/// handlers without locking.
#[derive(Clone)]
pub struct ComfortClassifier {
    scaler: Arc<dyn FeatureScaler>,
    model: Arc<dyn ComfortModel>,
}

impl ComfortClassifier {
    pub fn new(scaler: Arc<dyn FeatureScaler>, model: Arc<dyn ComfortModel>) -> Self {
        Self { scaler, model }
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        info!(
            "Comfort model ready ({} trees)",
            artifact.forest.tree_count()
        );
        Self::new(Arc::new(artifact.scaler), Arc::new(artifact.forest))
    }

    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let artifact = ModelArtifact::load(path)?;
        info!("Loaded comfort model from {}", path.display());
        Ok(Self::from_artifact(artifact))
    }

    pub fn classify(&self, features: &FeatureInput) -> Result<ComfortVerdict, ClassifyError> {
        let vector = FeatureVector::try_from(features)?;
        self.classify_vector(&vector)
    }

    pub fn classify_vector(&self, vector: &FeatureVector) -> Result<ComfortVerdict, ClassifyError> {
        let scaled = self
            .scaler
            .transform(vector)
            .map_err(|err| ClassifyError::ModelInvocation(format!("{err:#}")))?;

        let output = self
            .model
            .predict(&scaled)
            .map_err(|err| ClassifyError::ModelInvocation(format!("{err:#}")))?;

        check_output(&output)?;

        Ok(ComfortVerdict {
            comfortable: output.class == COMFORTABLE_CLASS,
            probabilities: ComfortProbabilities {
                comfortable: output.probabilities[0],
                uncomfortable: output.probabilities[1],
            },
        })
    }
}

fn check_output(output: &ClassPrediction) -> Result<(), ClassifyError> {
    if output.class > 1 {
        return Err(ClassifyError::ModelInvocation(format!(
            "model predicted unknown class {}",
            output.class
        )));
    }

    let [a, b] = output.probabilities;
    let valid = [a, b].iter().all(|p| p.is_finite() && *p >= 0.0)
        && ((a + b) - 1.0).abs() <= PROBABILITY_TOLERANCE;
    if !valid {
        return Err(ClassifyError::ModelInvocation(format!(
            "model returned invalid probabilities [{a}, {b}]"
        )));
    }

    Ok(())
}
