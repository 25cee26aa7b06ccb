use chrono::Local;
use serde::Serialize;

use crate::db::{ComfortPrediction, SensorReading};

pub const SENSOR_DATA_EVENT: &str = "sensor_data";
pub const PEOPLE_COUNT_EVENT: &str = "people_count";

/// A stored row as pushed to live subscribers, stamped with the moment it
/// was queued for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveRow<T> {
    #[serde(flatten)]
    pub row: T,
    pub timestamp: String,
}

impl<T> LiveRow<T> {
    fn stamped(row: T) -> Self {
        Self {
            row,
            timestamp: display_timestamp(),
        }
    }
}

/// Payload is a list holding the latest row, or nothing before the first
/// write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LiveEvent {
    SensorData(Vec<LiveRow<SensorReading>>),
    PeopleCount(Vec<LiveRow<ComfortPrediction>>),
}

impl LiveEvent {
    pub fn sensor_data(latest: Option<&SensorReading>) -> Self {
        LiveEvent::SensorData(latest.cloned().map(LiveRow::stamped).into_iter().collect())
    }

    pub fn people_count(latest: Option<&ComfortPrediction>) -> Self {
        LiveEvent::PeopleCount(latest.cloned().map(LiveRow::stamped).into_iter().collect())
    }

    pub fn name(&self) -> &'static str {
        match self {
            LiveEvent::SensorData(_) => SENSOR_DATA_EVENT,
            LiveEvent::PeopleCount(_) => PEOPLE_COUNT_EVENT,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            LiveEvent::SensorData(rows) => rows.is_empty(),
            LiveEvent::PeopleCount(rows) => rows.is_empty(),
        }
    }
}

/// `D - M - YYYY HH:MM:SS` in server local time, the format the room
/// dashboard renders verbatim.
pub fn display_timestamp() -> String {
    Local::now().format("%-d - %-m - %Y %H:%M:%S").to_string()
}
