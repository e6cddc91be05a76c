//! RFC3339 helpers for TEXT timestamp columns.

use chrono::{DateTime, Utc};

pub(crate) fn format(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Falls back to the epoch when the stored text is not RFC3339.
pub(crate) fn parse(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

pub(crate) fn parse_opt(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|value| {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}
