use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};

/// Fixed-width RFC 3339 so that lexical order in SQLite matches time order.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

/// Creation time for the next row of `table`: the wall clock, or one
/// microsecond past the newest existing row if the clock has not advanced.
///
/// Must run on the database worker so the read and the following insert are
/// not interleaved with another writer.
pub fn next_row_time(conn: &Connection, table: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let newest: Option<String> = conn
        .query_row(&format!("SELECT MAX(time) FROM {table}"), [], |row| row.get(0))
        .optional()
        .with_context(|| format!("failed to read newest time from {table}"))?
        .flatten();

    let Some(newest) = newest else {
        return Ok(now);
    };

    let newest = parse_datetime(&newest, "time")?;
    if now > newest {
        Ok(now)
    } else {
        Ok(newest + Duration::microseconds(1))
    }
}

pub fn bool_to_sql(value: bool) -> i64 {
    i64::from(value)
}
