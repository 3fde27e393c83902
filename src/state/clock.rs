use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

/// Source of the ordinal (block height or equivalent) the dispute window is
/// measured in. The channel only ever reads it.
pub trait SettlementClock: Send + Sync + 'static {
    fn now(&self) -> u64;
}

/// Counter advanced by the host, e.g. from imported block heights.
/// Never moves backwards.
#[derive(Debug, Default)]
pub struct ManualClock {
    ordinal: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            ordinal: AtomicU64::new(start),
        }
    }

    /// Advances by `ordinals` and returns the new value.
    pub fn advance(&self, ordinals: u64) -> u64 {
        let previous = self
            .ordinal
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(ordinals))
            })
            .unwrap_or_else(|current| current);
        previous.saturating_add(ordinals)
    }

    /// Moves the clock to `ordinal` unless it is already past it.
    pub fn set(&self, ordinal: u64) {
        self.ordinal.fetch_max(ordinal, Ordering::SeqCst);
    }
}

impl SettlementClock for ManualClock {
    fn now(&self) -> u64 {
        self.ordinal.load(Ordering::SeqCst)
    }
}

/// Unix seconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SettlementClock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

/// First ordinal at which a channel closed at `closed_at` may be settled.
pub fn dispute_deadline(closed_at: u64, timeout_window: u64) -> u64 {
    closed_at.saturating_add(timeout_window)
}

pub fn has_matured(now: u64, closed_at: u64, timeout_window: u64) -> bool {
    now >= dispute_deadline(closed_at, timeout_window)
}
