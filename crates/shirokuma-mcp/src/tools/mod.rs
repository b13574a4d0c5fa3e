//! MCP tools.
//!
//! One module per tool family; each tool exposes a `schema()` returning its
//! JSON Schema and an `execute` returning the raw result payload. Typed
//! core errors pass through so the server can shape the error payload.

pub mod items;
pub mod listing;
pub mod related;
pub mod state;
pub mod stats;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shirokuma_core::ServiceError;

/// Payload-or-typed-error result shared by all tools
pub type ToolResult = Result<Value, ServiceError>;

/// Deserialize tool arguments; a missing argument object acts like `{}`.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Option<Value>) -> Result<T, ServiceError> {
    let value = args.unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(value)
        .map_err(|e| ServiceError::InvalidInput(format!("invalid arguments: {e}")))
}

/// Parse an ISO-8601 date or datetime. `2025-06-15` becomes midnight UTC.
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, ServiceError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    Err(ServiceError::InvalidInput(format!(
        "invalid date '{s}', expected YYYY-MM-DD or RFC 3339"
    )))
}

pub(crate) fn parse_datetime_opt(
    s: &Option<String>,
) -> Result<Option<DateTime<Utc>>, ServiceError> {
    s.as_deref().map(parse_datetime).transpose()
}
