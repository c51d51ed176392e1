//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::Error as SqlError;
use uuid::Uuid;

use crate::error::Error;

/// Storage format for calendar dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

fn conversion_error<E>(e: E) -> SqlError
where
    E: std::error::Error + Send + Sync + 'static,
{
    SqlError::FromSqlConversionFailure(0, Type::Text, Box::new(e))
}

/// Parse a UUID from a database string column
pub fn parse_uuid(s: &str) -> Result<Uuid, SqlError> {
    Uuid::parse_str(s).map_err(conversion_error)
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(conversion_error)
}

/// Parse an optional DateTime from an RFC3339 string
pub fn parse_datetime_opt(s: Option<String>) -> Result<Option<DateTime<Utc>>, SqlError> {
    s.map(|s| parse_datetime(&s)).transpose()
}

/// Parse a calendar date stored as YYYY-MM-DD
pub fn parse_date(s: &str) -> Result<NaiveDate, SqlError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(conversion_error)
}

pub fn parse_date_opt(s: Option<String>) -> Result<Option<NaiveDate>, SqlError> {
    s.map(|s| parse_date(&s)).transpose()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
struct UnknownVariant {
    kind: &'static str,
    value: String,
}

/// Parse a stored enum column via its `parse` function
pub fn parse_enum<T>(s: &str, kind: &'static str, parse: fn(&str) -> Option<T>) -> Result<T, SqlError> {
    parse(s).ok_or_else(|| {
        conversion_error(UnknownVariant {
            kind,
            value: s.to_string(),
        })
    })
}

/// Parse a JSON string array column
pub fn parse_string_list(s: &str) -> Result<Vec<String>, SqlError> {
    serde_json::from_str(s).map_err(conversion_error)
}

/// True when a trigger aborted the statement with `RAISE(ABORT, marker)`
pub fn aborted_with(err: &SqlError, marker: &str) -> bool {
    matches!(
        err,
        SqlError::SqliteFailure(code, Some(msg))
            if code.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains(marker)
    )
}

/// True when the write was aborted by the reservation overlap triggers
pub fn is_overlap_abort(err: &SqlError) -> bool {
    aborted_with(err, "room_unavailable")
}

/// Map UNIQUE constraint failures onto `Error::Duplicate` naming the column
pub fn classify(err: SqlError) -> Error {
    if let SqlError::SqliteFailure(code, Some(msg)) = &err {
        if code.code == rusqlite::ErrorCode::ConstraintViolation {
            if let Some(column) = msg.strip_prefix("UNIQUE constraint failed: ") {
                return Error::Duplicate(column.to_string());
            }
        }
    }
    Error::Database(err)
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
