//! Human-friendly duration parsing for plans and CLI flags.
//!
//! Accepts the friendly format (`5s`, `2m`, `1m30s`, `500ms`) as well as
//! ISO 8601 (`PT5S`), using jiff's parser.

use std::time::Duration;

use jiff::SignedDuration;
use serde::{Deserialize, Deserializer, Serializer};

/// Parse a non-negative duration string.
pub fn parse(s: &str) -> Result<Duration, String> {
    let signed: SignedDuration = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid duration {:?}: {}", s, e))?;
    Duration::try_from(signed).map_err(|_| format!("duration {:?} must not be negative", s))
}

/// Format a duration in the compact friendly format, e.g. `2m 5s`.
pub fn format(d: Duration) -> String {
    match SignedDuration::try_from(d) {
        Ok(signed) => format!("{:#}", signed),
        Err(_) => format!("{}s", d.as_secs()),
    }
}

pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(*d))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse(&s).map_err(serde::de::Error::custom)
}

/// Serde helpers for `Option<Duration>`, where `null` means unbounded.
pub mod option {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => serializer.serialize_some(&super::format(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| super::parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
