use rocket::{http::Status, serde::json::Json, State};
use serde::Serialize;
use serde_json::Value;

use crate::{
    comfort::ComfortProbabilities,
    db::{ComfortPrediction, SensorReading},
    ingest::{ComfortOutcome, IngestionGateway},
};

use super::error::ApiError;

type ApiResponse<T> = Result<(Status, Json<T>), ApiError>;

#[derive(Debug, Serialize)]
pub struct History {
    pub sensor_data: Vec<SensorReading>,
    pub people_counts: Vec<ComfortPrediction>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SendResponse {
    Predicted {
        message: &'static str,
        comfort_prediction: &'static str,
        comfort_probabilities: ComfortProbabilities,
    },
    PredictionFailed {
        message: &'static str,
        comfort_prediction_error: String,
    },
}

#[derive(Debug, Serialize)]
pub struct PeopleResponse {
    pub message: &'static str,
    pub predicted_comfort: &'static str,
    pub probabilities: ComfortProbabilities,
}

#[get("/")]
pub async fn history(gateway: &State<IngestionGateway>) -> ApiResponse<History> {
    let db = gateway.database();
    let sensor_data = db.all_readings().await.map_err(ApiError::internal)?;
    let people_counts = db.all_predictions().await.map_err(ApiError::internal)?;

    Ok((
        Status::Ok,
        Json(History {
            sensor_data,
            people_counts,
        }),
    ))
}

#[post("/send", data = "<body>")]
pub async fn send(body: Json<Value>, gateway: &State<IngestionGateway>) -> ApiResponse<SendResponse> {
    let outcome = gateway.ingest(&body).await?;

    let response = match outcome.comfort {
        ComfortOutcome::Predicted { verdict, .. } => SendResponse::Predicted {
            message: "Sensor data and comfort prediction added successfully",
            comfort_prediction: verdict.label(),
            comfort_probabilities: verdict.probabilities,
        },
        ComfortOutcome::ClassificationFailed(err) => SendResponse::PredictionFailed {
            message: "Sensor data added successfully, but comfort prediction failed",
            comfort_prediction_error: err.to_string(),
        },
        ComfortOutcome::StorageFailed { error, .. } => SendResponse::PredictionFailed {
            message: "Sensor data added successfully, but comfort prediction failed",
            comfort_prediction_error: format!("Failed to store comfort prediction: {error:#}"),
        },
    };

    Ok((Status::Created, Json(response)))
}

#[post("/people", data = "<body>")]
pub async fn people(body: Json<Value>, gateway: &State<IngestionGateway>) -> ApiResponse<PeopleResponse> {
    let outcome = gateway.predict(&body).await?;

    Ok((
        Status::Created,
        Json(PeopleResponse {
            message: "Comfort prediction added successfully",
            predicted_comfort: outcome.verdict.label(),
            probabilities: outcome.verdict.probabilities,
        }),
    ))
}
