//! UTC timestamps with an order-preserving text encoding.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A UTC instant.
///
/// Serialized as RFC 3339 with exactly six fractional digits and a `Z`
/// suffix (`2026-03-01T09:30:00.000000Z`). Every encoded timestamp has the
/// same width, so byte order of the strings equals chronological order. The
/// document store relies on this for `createdAt` ordering and date-range
/// filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current instant, truncated to microseconds.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Wrap a `chrono` datetime, truncated to microseconds.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let micros = dt.timestamp_micros();
        Self(DateTime::from_timestamp_micros(micros).unwrap_or(dt))
    }

    /// Underlying `chrono` datetime.
    #[must_use]
    pub const fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Canonical text encoding.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// This instant shifted by `delta`.
    #[must_use]
    pub fn offset(&self, delta: Duration) -> Self {
        Self(self.0 + delta)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Accept any RFC 3339 offset from clients; normalize to UTC.
        let dt = DateTime::<chrono::FixedOffset>::deserialize(deserializer)?;
        Ok(Self::from_datetime(dt.with_timezone(&Utc)))
    }
}
