use log::{error, info, warn};
use serde_json::Value;
use thiserror::Error;

use crate::{
    broadcast::BroadcastHub,
    comfort::{ClassifyError, ComfortClassifier, ComfortVerdict, FeatureInput},
    db::{ComfortPrediction, Database, NewSensorReading, SensorReading},
};

use super::payload::{parse_feature_payload, parse_sensor_payload, ValidationError};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to store data: {0:#}")]
    Storage(anyhow::Error),
    #[error(transparent)]
    Classification(#[from] ClassifyError),
}

/// What happened to the comfort step after a reading was stored.
#[derive(Debug)]
pub enum ComfortOutcome {
    Predicted {
        prediction: ComfortPrediction,
        verdict: ComfortVerdict,
    },
    /// The classifier rejected the input or failed; nothing was written.
    ClassificationFailed(ClassifyError),
    /// The verdict was computed but could not be stored.
    StorageFailed {
        verdict: ComfortVerdict,
        error: anyhow::Error,
    },
}

/// Result of a successful ingestion. The reading is always durable; the
/// comfort step may still have failed.
#[derive(Debug)]
pub struct IngestOutcome {
    pub reading: SensorReading,
    pub comfort: ComfortOutcome,
}

#[derive(Debug)]
pub struct PredictionOutcome {
    pub prediction: ComfortPrediction,
    pub verdict: ComfortVerdict,
}

/// Entry point for device readings: validate, store, classify, broadcast.
///
/// A stored reading is never rolled back. Classification and the prediction
/// write only ever degrade the outcome to a partial success.
#[derive(Clone)]
pub struct IngestionGateway {
    db: Database,
    classifier: ComfortClassifier,
    hub: BroadcastHub,
}

impl IngestionGateway {
    pub fn new(db: Database, classifier: ComfortClassifier, hub: BroadcastHub) -> Self {
        Self {
            db,
            classifier,
            hub,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub async fn ingest(&self, payload: &Value) -> Result<IngestOutcome, IngestError> {
        let values = parse_sensor_payload(payload)?;
        self.ingest_reading(values).await
    }

    pub async fn ingest_reading(
        &self,
        values: NewSensorReading,
    ) -> Result<IngestOutcome, IngestError> {
        let reading = self.db.insert_reading(&values).await.map_err(|err| {
            error!("Failed to store sensor reading: {err:#}");
            IngestError::Storage(err)
        })?;
        info!("Stored sensor reading {}", reading.id);
        self.hub.publish_reading_update(&reading);

        let comfort = match self.classifier.classify(&FeatureInput::from_reading(&values)) {
            Ok(verdict) => match self.db.insert_prediction(verdict.comfortable).await {
                Ok(prediction) => {
                    info!(
                        "Stored comfort prediction {} ({}) for reading {}",
                        prediction.id,
                        verdict.label(),
                        reading.id
                    );
                    self.hub.publish_prediction_update(&prediction);
                    ComfortOutcome::Predicted {
                        prediction,
                        verdict,
                    }
                }
                Err(error) => {
                    error!(
                        "Failed to store comfort prediction for reading {}: {error:#}",
                        reading.id
                    );
                    ComfortOutcome::StorageFailed { verdict, error }
                }
            },
            Err(err) => {
                warn!("Comfort prediction failed for reading {}: {err}", reading.id);
                ComfortOutcome::ClassificationFailed(err)
            }
        };

        Ok(IngestOutcome { reading, comfort })
    }

    /// Classifies features supplied directly by the caller and stores the
    /// verdict. Here a classification failure fails the whole operation.
    pub async fn predict(&self, payload: &Value) -> Result<PredictionOutcome, IngestError> {
        let features = parse_feature_payload(payload)?;
        self.predict_features(&features).await
    }

    pub async fn predict_features(
        &self,
        features: &FeatureInput,
    ) -> Result<PredictionOutcome, IngestError> {
        let verdict = self.classifier.classify(features).map_err(|err| {
            warn!("Direct comfort prediction failed: {err}");
            err
        })?;

        let prediction = self
            .db
            .insert_prediction(verdict.comfortable)
            .await
            .map_err(|err| {
                error!("Failed to store comfort prediction: {err:#}");
                IngestError::Storage(err)
            })?;
        info!(
            "Stored comfort prediction {} ({})",
            prediction.id,
            verdict.label()
        );
        self.hub.publish_prediction_update(&prediction);

        Ok(PredictionOutcome {
            prediction,
            verdict,
        })
    }
}
