use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Instant with the formatting specifics of the messaging specification.
///
/// Decoding accepts RFC 3339 with or without fractional seconds, the
/// minute-precision variant and the `+0000` numeric offset seen in the wild.
/// Encoding emits RFC 3339 with `-00:00` in place of `Z`. Null and the empty
/// string decode to the zero value, which encodes back to `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp(pub Option<DateTime<Utc>>);

impl Timestamp {
    pub fn now() -> Self {
        Timestamp(Some(Utc::now()))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_none()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(ts: DateTime<Utc>) -> Self {
        Timestamp(Some(ts))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(ts) => f.write_str(&format_timestamp(&ts)),
            None => f.write_str(""),
        }
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    let rfc3339 = ts.to_rfc3339_opts(SecondsFormat::Secs, true);
    match rfc3339.strip_suffix('Z') {
        Some(prefix) => format!("{prefix}-00:00"),
        None => rfc3339,
    }
}

// Formats tried after RFC 3339 fails, in order.
const OTHER_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M:%S%.f%z"];

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in OTHER_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(value, format) {
            return Some(ts.with_timezone(&Utc));
        }
    }
    None
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(ts) => serializer.serialize_str(&format_timestamp(&ts)),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_option(TimestampVisitor)
    }
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = Timestamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an RFC 3339 timestamp, an empty string or null")
    }

    fn visit_none<E: de::Error>(self) -> Result<Timestamp, E> {
        Ok(Timestamp(None))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Timestamp, E> {
        Ok(Timestamp(None))
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Timestamp, D::Error> {
        deserializer.deserialize_str(TimestampVisitor)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Timestamp, E> {
        if value.is_empty() {
            return Ok(Timestamp(None));
        }
        parse_timestamp(value)
            .map(|ts| Timestamp(Some(ts)))
            .ok_or_else(|| E::custom(format!("unsupported timestamp format: {value}")))
    }
}
