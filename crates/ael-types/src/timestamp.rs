use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Point in time at which an entry was appended.
///
/// Held at millisecond precision in UTC. The textual form
/// (`YYYY-MM-DDTHH:MM:SS.mmmZ`) is used both for storage and for hashing,
/// so a `Timestamp` always round-trips through its string exactly.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current wall-clock time, truncated to milliseconds.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Truncate a `DateTime` to millisecond precision.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::from_millis(dt.timestamp_millis()).unwrap_or(Self(dt))
    }

    /// Milliseconds since the UNIX epoch.
    pub fn from_millis(ms: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp_millis(ms).map(Self)
    }

    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Parse any RFC 3339 timestamp, normalizing to UTC milliseconds.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let parsed = DateTime::parse_from_rfc3339(s).map_err(|e| TypeError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_datetime(parsed.with_timezone(&Utc)))
    }

    /// Parse a timestamp that must already be in the fixed textual form.
    ///
    /// Equivalent instants written any other way (a `+01:00` offset,
    /// missing or extra fraction digits) are rejected.
    pub fn parse_canonical(s: &str) -> Result<Self, TypeError> {
        let ts = Self::parse(s)?;
        if ts.to_canonical_string() != s {
            return Err(TypeError::InvalidTimestamp {
                value: s.to_string(),
                reason: "not in YYYY-MM-DDTHH:MM:SS.mmmZ form".into(),
            });
        }
        Ok(ts)
    }

    /// The fixed textual form used for storage and hashing.
    pub fn to_canonical_string(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.to_canonical_string())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse_canonical(&raw).map_err(serde::de::Error::custom)
    }
}
