use crate::Timestamp;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time handed to each call
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time in unix seconds
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
    }
}

/// Manually driven clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: Arc<AtomicU64>,
}

impl VirtualClock {
    pub fn new(genesis: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(genesis)),
        }
    }

    /// Move time forward, returning the new time
    pub fn advance(&self, seconds: u64) -> Timestamp {
        let previous = self
            .now
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |now| {
                Some(now.saturating_add(seconds))
            })
            .unwrap_or_else(|now| now);
        previous.saturating_add(seconds)
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::Release);
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::Acquire)
    }
}
