//! ISO-8601 handling for snooze deadlines
//!
//! Outgoing instants carry at least millisecond precision and a `Z` suffix;
//! finer fractions read from the server are written back unchanged.
//! Incoming values may omit the offset, in which case they are read as UTC.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Format an instant for the wire (`2026-10-19T15:04:00.000Z`)
#[must_use]
pub fn format_instant(instant: DateTime<Utc>) -> String {
    let nanos = instant.timestamp_subsec_nanos();
    let precision = if nanos % 1_000_000 == 0 {
        SecondsFormat::Millis
    } else if nanos % 1_000 == 0 {
        SecondsFormat::Micros
    } else {
        SecondsFormat::Nanos
    };
    instant.to_rfc3339_opts(precision, true)
}

/// Parse an ISO-8601 instant, reading offset-less values as UTC
///
/// # Errors
/// Returns the RFC 3339 parse error if the value is neither RFC 3339 nor
/// an offset-less `YYYY-MM-DDTHH:MM:SS[.f]` timestamp.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let raw = raw.trim();
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => Ok(parsed.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Utc.from_utc_datetime(&naive))
            .map_err(|_| rfc_err),
    }
}

/// `serde(with = ...)` adapter for optional instants
pub mod option {
    use super::{format_instant, parse_instant};
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize `None` as `null` and `Some` as an ISO-8601 string
    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(instant) => serializer.serialize_some(&format_instant(*instant)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize `null`, `""` or an ISO-8601 string
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse_instant(value).map(Some).map_err(de::Error::custom),
        }
    }
}
