//! Storage-backed services.
//!
//! Each service wraps a shared [`Database`](crate::Database) handle and exposes the operations
//! of one area of the system. Services are cheap to clone.

pub mod admissions;
pub mod allergies;
pub mod patients;
pub mod records;
pub mod reference;
pub mod reports;
pub mod staff;

use chrono::{SecondsFormat, Utc};

/// Current time as stored in timestamp columns.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `"given last"` display name.
pub(crate) fn full_name(given: &str, last: &str) -> String {
    format!("{given} {last}")
}
