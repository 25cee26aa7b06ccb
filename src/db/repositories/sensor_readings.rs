use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{bool_to_sql, format_datetime, next_row_time, parse_datetime},
    models::{NewSensorReading, SensorReading},
};

const SELECT_COLUMNS: &str = "SELECT id, temp, humidity, illuminance, co2, noise, current,
        voltage, gas_detection, earthquake, time
 FROM sensor_data";

fn row_to_reading(row: &Row) -> Result<SensorReading> {
    let time: String = row.get("time")?;

    Ok(SensorReading {
        id: row.get("id")?,
        temp: row.get("temp")?,
        humidity: row.get("humidity")?,
        illuminance: row.get("illuminance")?,
        co2: row.get("co2")?,
        noise: row.get("noise")?,
        current: row.get("current")?,
        voltage: row.get("voltage")?,
        gas_detection: row.get::<_, i64>("gas_detection")? != 0,
        earthquake: row.get::<_, i64>("earthquake")? != 0,
        time: parse_datetime(&time, "time")?,
    })
}

impl Database {
    /// Appends a reading and returns it as stored. Never overwrites.
    pub async fn insert_reading(&self, reading: &NewSensorReading) -> Result<SensorReading> {
        let record = reading.clone();
        self.execute(move |conn| {
            let time = next_row_time(conn, "sensor_data", Utc::now())?;

            conn.execute(
                "INSERT INTO sensor_data (
                    temp,
                    humidity,
                    illuminance,
                    co2,
                    noise,
                    current,
                    voltage,
                    gas_detection,
                    earthquake,
                    time
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.temp,
                    record.humidity,
                    record.illuminance,
                    record.co2,
                    record.noise,
                    record.current,
                    record.voltage,
                    bool_to_sql(record.gas_detection),
                    bool_to_sql(record.earthquake),
                    format_datetime(&time),
                ],
            )
            .with_context(|| "failed to insert sensor reading")?;

            let id = conn.last_insert_rowid();
            Ok(SensorReading::from_new(id, time, record))
        })
        .await
    }

    /// Most recent reading, or `None` while the table is empty.
    pub async fn latest_reading(&self) -> Result<Option<SensorReading>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} ORDER BY time DESC, id DESC LIMIT 1"
            ))?;

            let mut rows = stmt.query([])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_reading(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Full history in insertion order.
    pub async fn all_readings(&self) -> Result<Vec<SensorReading>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id ASC"))?;

            let mut rows = stmt.query([])?;
            let mut readings = Vec::new();
            while let Some(row) = rows.next()? {
                readings.push(row_to_reading(row)?);
            }

            Ok(readings)
        })
        .await
    }
}
