//! Timestamped scalar observations ingested into a curve.

use core::fmt::Display;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
///
/// Ordering is a direct comparison of the millisecond counts, so range
/// queries never subtract two timestamps.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create a timestamp from milliseconds since epoch
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Create a timestamp from whole seconds since epoch
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// Current wall-clock time. Clocks set before 1970 read as the epoch.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(i64::try_from(millis).unwrap_or(i64::MAX))
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Whole seconds elapsed since `earlier`, truncated toward zero.
    ///
    /// Negative when `earlier` is actually later than `self`.
    pub const fn whole_secs_since(self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0) / 1000
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let secs = self.0.div_euclid(1000);
        let millis = self.0.rem_euclid(1000);
        write!(f, "{secs}.{millis:03}s")
    }
}

/// A single immutable `(timestamp, value)` observation.
///
/// The same sample may sit in several frames at once: promotion copies the
/// extrema of a finer window into the next coarser frame unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: Timestamp,
    pub value: f64,
}

impl Sample {
    pub const fn new(timestamp: Timestamp, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Convenience constructor for whole-second timestamps
    pub const fn at_secs(secs: i64, value: f64) -> Self {
        Self::new(Timestamp::from_secs(secs), value)
    }
}

impl Display for Sample {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[Sample] timestamp: {}, value: {}", self.timestamp, self.value)
    }
}
