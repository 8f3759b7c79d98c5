// crates/sentinel-gate-core/src/core/time.rs
// ============================================================================
// Module: Sentinel Gate Time Model
// Description: Canonical timestamp representation and injectable clocks.
// Purpose: Keep runtime services replayable by never reading wall-clock time directly.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Sentinel Gate stamps every governance record with an explicit timestamp.
//! Runtime services receive a [`Clock`] at construction and never read
//! wall-clock time themselves, so tests and offline verification can replay
//! any sequence of events deterministically. [`SystemClock`] is the production
//! clock; [`ManualClock`] is the replay/test clock.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical timestamp used across Sentinel Gate records.
///
/// # Invariants
/// - Values are unix-epoch milliseconds supplied by a [`Clock`].
/// - Monotonicity is a clock responsibility, not a timestamp property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix-epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix-epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the number of whole milliseconds elapsed since `earlier`.
    ///
    /// Saturates at zero when `earlier` is in the future of `self`.
    #[must_use]
    pub const fn millis_since(self, earlier: Self) -> u64 {
        let delta = self.0.saturating_sub(earlier.0);
        if delta < 0 { 0 } else { delta as u64 }
    }

    /// Returns the number of whole seconds elapsed since `earlier`.
    ///
    /// Saturates at zero when `earlier` is in the future of `self`.
    #[must_use]
    pub const fn secs_since(self, earlier: Self) -> u64 {
        self.millis_since(earlier) / 1_000
    }

    /// Renders the timestamp as an RFC 3339 string when representable.
    #[must_use]
    pub fn rfc3339(self) -> Option<String> {
        let nanos = i128::from(self.0).checked_mul(1_000_000)?;
        let datetime = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;
        datetime.format(&Rfc3339).ok()
    }
}

// ============================================================================
// SECTION: Clocks
// ============================================================================

/// Injectable time source for runtime services.
pub trait Clock: Send + Sync {
    /// Returns the current timestamp.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis());
        Timestamp::from_unix_millis(i64::try_from(millis).unwrap_or(i64::MAX))
    }
}

/// Settable time source for tests and deterministic replay.
#[derive(Debug, Default)]
pub struct ManualClock {
    /// Current time in unix-epoch milliseconds.
    millis: AtomicI64,
}

impl ManualClock {
    /// Creates a manual clock starting at the provided timestamp.
    #[must_use]
    pub fn starting_at(timestamp: Timestamp) -> Self {
        Self {
            millis: AtomicI64::new(timestamp.as_unix_millis()),
        }
    }

    /// Sets the clock to the provided timestamp.
    pub fn set(&self, timestamp: Timestamp) {
        self.millis.store(timestamp.as_unix_millis(), Ordering::SeqCst);
    }

    /// Advances the clock by whole milliseconds.
    pub fn advance_millis(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Advances the clock by whole seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.advance_millis(secs.saturating_mul(1_000));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_unix_millis(self.millis.load(Ordering::SeqCst))
    }
}
