//! Sensor reading data model.
//!
//! One row of the `sensor_data` table: a timestamped sample of every
//! channel reported by the room device.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channel values of a reading before it has been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSensorReading {
    pub temp: f64,
    pub humidity: f64,
    pub illuminance: f64,
    pub co2: i64,
    pub noise: f64,
    pub current: f64,
    pub voltage: f64,
    pub gas_detection: bool,
    pub earthquake: bool,
}

impl NewSensorReading {
    /// Electrical power drawn at sampling time (current × voltage).
    pub fn energy_consumption(&self) -> f64 {
        self.current * self.voltage
    }
}

/// A persisted reading. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: i64,
    pub temp: f64,
    pub humidity: f64,
    pub illuminance: f64,
    pub co2: i64,
    pub noise: f64,
    pub current: f64,
    pub voltage: f64,
    pub gas_detection: bool,
    pub earthquake: bool,
    pub time: DateTime<Utc>,
}

impl SensorReading {
    pub fn from_new(id: i64, time: DateTime<Utc>, values: NewSensorReading) -> Self {
        Self {
            id,
            temp: values.temp,
            humidity: values.humidity,
            illuminance: values.illuminance,
            co2: values.co2,
            noise: values.noise,
            current: values.current,
            voltage: values.voltage,
            gas_detection: values.gas_detection,
            earthquake: values.earthquake,
            time,
        }
    }
}
