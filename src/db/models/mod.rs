pub mod comfort_prediction;
pub mod sensor_reading;

pub use comfort_prediction::ComfortPrediction;
pub use sensor_reading::{NewSensorReading, SensorReading};
