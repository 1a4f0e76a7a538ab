//! Record IDs and the Replica Clock
//!
//! Every post and clear command carries an opaque [`RecordId`] and a
//! millisecond [`Timestamp`]. Timestamps come from a [`ReplicaClock`], which
//! never hands out the same value twice on one replica, even when the
//! underlying wall clock stalls or steps backwards.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Milliseconds since the Unix epoch
pub type Timestamp = u64;

/// Globally unique, opaque record identifier (random 128-bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch
    fn now_millis(&self) -> Timestamp;
}

/// Wall clock backed by the system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Timestamp {
        chrono::Utc::now().timestamp_millis().max(0) as Timestamp
    }
}

/// Manually driven clock for deterministic scenarios and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at `now`
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    /// Jump to an absolute instant
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `millis`
    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

/// Per-replica clock that stamps records with strictly increasing timestamps
///
/// Thread-safe and lock-free.
pub struct ReplicaClock {
    source: Arc<dyn Clock>,
    /// Last timestamp handed out by `stamp`
    last: AtomicU64,
}

impl ReplicaClock {
    /// Create a replica clock over a time source
    pub fn new(source: Arc<dyn Clock>) -> Self {
        Self {
            source,
            last: AtomicU64::new(0),
        }
    }

    /// Current wall-clock reading, without reserving it
    pub fn now(&self) -> Timestamp {
        self.source.now_millis()
    }

    /// Reserve a timestamp for a new record
    pub fn stamp(&self) -> Timestamp {
        loop {
            let current = self.source.now_millis();
            let last = self.last.load(Ordering::Relaxed);

            // Stalled or regressed wall clock: step past the last stamp
            let next = if current > last { current } else { last + 1 };

            if self
                .last
                .compare_exchange(last, next, Ordering::SeqCst, Ordering::Relaxed)
                .is_ok()
            {
                return next;
            }
            // CAS failed, retry
        }
    }

    /// Make every later stamp strictly greater than `instant`
    pub fn witness(&self, instant: Timestamp) {
        self.last.fetch_max(instant, Ordering::SeqCst);
    }

    /// Last timestamp handed out (0 if none yet)
    pub fn last_stamp(&self) -> Timestamp {
        self.last.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ReplicaClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicaClock")
            .field("last", &self.last_stamp())
            .finish()
    }
}
