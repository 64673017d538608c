//! Wall-clock abstraction (spec.md §5: "Deadlines are wall-clock absolute
//! timestamps drawn from the execution environment's trusted clock").
//! Injectable so dispute/proof-window arithmetic is deterministic in tests,
//! the same role `std::time::Instant` plays scattered through the teacher's
//! tiering and pre-staging code, made explicit here as a trait.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    /// Current time as Unix seconds.
    fn now(&self) -> u64;
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs()
    }
}

/// A clock that only advances when told to, for deterministic dispute/proof
/// window tests.
#[derive(Debug)]
pub struct FrozenClock {
    now: AtomicU64,
}

impl FrozenClock {
    pub fn at(timestamp: u64) -> Self {
        Self {
            now: AtomicU64::new(timestamp),
        }
    }

    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    pub fn set(&self, timestamp: u64) {
        self.now.store(timestamp, Ordering::SeqCst);
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
