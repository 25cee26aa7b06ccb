use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{bool_to_sql, format_datetime, next_row_time, parse_datetime},
    models::ComfortPrediction,
};

fn row_to_prediction(row: &Row) -> Result<ComfortPrediction> {
    let time: String = row.get("time")?;

    Ok(ComfortPrediction {
        id: row.get("id")?,
        comfortable: row.get::<_, i64>("jumlah_orang")? != 0,
        time: parse_datetime(&time, "time")?,
    })
}

impl Database {
    pub async fn insert_prediction(&self, comfortable: bool) -> Result<ComfortPrediction> {
        self.execute(move |conn| {
            let time = next_row_time(conn, "people_count", Utc::now())?;

            conn.execute(
                "INSERT INTO people_count (jumlah_orang, time) VALUES (?1, ?2)",
                params![bool_to_sql(comfortable), format_datetime(&time)],
            )
            .with_context(|| "failed to insert comfort prediction")?;

            Ok(ComfortPrediction {
                id: conn.last_insert_rowid(),
                comfortable,
                time,
            })
        })
        .await
    }

    pub async fn latest_prediction(&self) -> Result<Option<ComfortPrediction>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, jumlah_orang, time
                 FROM people_count
                 ORDER BY time DESC, id DESC
                 LIMIT 1",
            )?;

            let mut rows = stmt.query([])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_prediction(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn all_predictions(&self) -> Result<Vec<ComfortPrediction>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, jumlah_orang, time
                 FROM people_count
                 ORDER BY id ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut predictions = Vec::new();
            while let Some(row) = rows.next()? {
                predictions.push(row_to_prediction(row)?);
            }

            Ok(predictions)
        })
        .await
    }
}
