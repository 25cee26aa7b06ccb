//! Comfort prediction data model.
//!
//! Rows of `people_count`. The column keeps the name the room dashboard
//! already consumes; it holds the boolean comfort verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComfortPrediction {
    pub id: i64,
    #[serde(rename = "jumlah_orang")]
    pub comfortable: bool,
    pub time: DateTime<Utc>,
}
