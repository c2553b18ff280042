//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a borrowed `Connection` (a `Transaction` derefs to
//! one) so callers decide the transaction boundary.

mod appointment;
mod community;
mod medication_log;
mod notification;
mod prescription;
mod symptom;
mod user;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use uuid::Uuid;

use super::DatabaseError;

// Re-export all public items from sub-modules
pub use appointment::*;
pub use community::*;
pub use medication_log::*;
pub use notification::*;
pub use prescription::*;
pub use symptom::*;
pub use user::*;

/// Timestamps are stored as fixed-width RFC 3339 UTC text so that
/// lexicographic order equals chronological order.
pub(crate) fn timestamp_to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn timestamp_from_db(
    column: &'static str,
    raw: &str,
) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Corrupt {
            column,
            reason: e.to_string(),
        })
}

pub(crate) fn date_from_db(column: &'static str, raw: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| DatabaseError::Corrupt {
        column,
        reason: e.to_string(),
    })
}

pub(crate) fn uuid_from_db(column: &'static str, raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::Corrupt {
        column,
        reason: e.to_string(),
    })
}
