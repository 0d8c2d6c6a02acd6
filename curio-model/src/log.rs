use chrono::{DateTime, Utc};

use crate::ids::AppLogEntryId;

/// A persisted structured log line, fed by a `tracing` layer. Observability
/// only — never referenced by core invariants.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AppLogEntry {
    pub id: AppLogEntryId,
    pub timestamp_utc: DateTime<Utc>,
    pub level: String,
    pub category: String,
    pub message: String,
    pub exception: Option<String>,
    pub properties_json: Option<String>,
}
