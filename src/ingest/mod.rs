mod gateway;
mod payload;

pub use gateway::{ComfortOutcome, IngestError, IngestOutcome, IngestionGateway, PredictionOutcome};
pub use payload::{parse_feature_payload, parse_sensor_payload, ValidationError, SENSOR_FIELDS};
