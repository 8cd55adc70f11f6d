//! Wall-clock capability and the ISO-8601 text form of timestamps.
//!
//! Record timestamps carry microsecond precision: that is all the text form
//! can express, and a record must re-parse to an equal value.

use chrono::{DateTime, FixedOffset, SubsecRound, Timelike, Utc};

use crate::error::{CoreError, Result};

/// Source of "now" for records built without an explicit timestamp.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// The system wall clock, in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().fixed_offset()
    }
}

/// A clock that always reads the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    pub fn new(at: impl Into<DateTime<FixedOffset>>) -> Self {
        Self(at.into())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Drop sub-microsecond precision.
pub fn truncate_to_micros(ts: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    ts.trunc_subsecs(6)
}

/// Render a timestamp as extended ISO-8601 text.
///
/// `2024-01-15T10:30:00+00:00`, or `2024-01-15T10:30:00.123456+00:00` when
/// the microsecond field is non-zero.
pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    let mut out = ts.format("%Y-%m-%dT%H:%M:%S").to_string();
    let micros = ts.nanosecond() / 1_000 % 1_000_000;
    if micros != 0 {
        out.push_str(&format!(".{:06}", micros));
    }
    out.push_str(&ts.format("%:z").to_string());
    out
}

/// Parse ISO-8601 text with an explicit offset (`Z` or `+HH:MM`).
pub fn parse_timestamp(text: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text)
        .map(truncate_to_micros)
        .map_err(|e| CoreError::InvalidTimestamp {
            value: text.to_string(),
            reason: e.to_string(),
        })
}
