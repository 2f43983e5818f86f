//! # Timestamp Value Object
//!
//! Wall-clock time at which journal entries and snapshots were written.
//!
//! Recovery never reads these values back into machine state; they exist for
//! operators and for the journal tables' `TIMESTAMPTZ` columns.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A UTC point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying `DateTime`, as bound into SQL parameters.
    #[inline]
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Time elapsed since this timestamp, zero if it lies in the future.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.age_at(Self::now())
    }

    fn age_at(&self, now: Self) -> Duration {
        (now.0 - self.0).to_std().unwrap_or(Duration::ZERO)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(millis: i64) -> Timestamp {
        Timestamp::from(Utc.timestamp_millis_opt(millis).single().unwrap())
    }

    #[test]
    fn age_counts_forward() {
        assert_eq!(at(1_000).age_at(at(3_500)), Duration::from_millis(2_500));
    }

    #[test]
    fn future_timestamp_has_zero_age() {
        assert_eq!(at(5_000).age_at(at(1_000)), Duration::ZERO);
    }

    #[test]
    fn displays_rfc3339_millis() {
        assert_eq!(at(1_704_067_200_123).to_string(), "2024-01-01T00:00:00.123Z");
    }

    #[test]
    fn serializes_as_plain_datetime() {
        let ts = at(1_704_067_200_000);
        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.starts_with("\"2024-01-01T00:00:00"));
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, back);
    }
}
