//! Ingestion health counters.
//!
//! Faults on the hot path are recovered where they happen and surface here
//! instead of crossing into caller code.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
pub struct LinkStats {
    datagrams_received: AtomicU64,
    samples_accepted: AtomicU64,
    malformed_dropped: AtomicU64,
    oversized_dropped: AtomicU64,
    receive_errors: AtomicU64,
    buffer_overflows: AtomicU64,
    observer_panics: AtomicU64,
    subscriber_lagged: AtomicU64,
    log_write_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStatsSnapshot {
    pub datagrams_received: u64,
    pub samples_accepted: u64,
    pub malformed_dropped: u64,
    /// Datagrams longer than `max_datagram_size`, dropped before decoding.
    pub oversized_dropped: u64,
    pub receive_errors: u64,
    pub buffer_overflows: u64,
    pub observer_panics: u64,
    pub subscriber_lagged: u64,
    pub log_write_failures: u64,
}

impl LinkStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_datagram(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.samples_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_oversized(&self) {
        self.oversized_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_receive_error(&self) {
        self.receive_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overflow(&self) {
        self.buffer_overflows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_observer_panic(&self) {
        self.observer_panics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lagged(&self) {
        self.subscriber_lagged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_log_failures(&self, count: u64) {
        if count > 0 {
            self.log_write_failures.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> LinkStatsSnapshot {
        LinkStatsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            samples_accepted: self.samples_accepted.load(Ordering::Relaxed),
            malformed_dropped: self.malformed_dropped.load(Ordering::Relaxed),
            oversized_dropped: self.oversized_dropped.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            buffer_overflows: self.buffer_overflows.load(Ordering::Relaxed),
            observer_panics: self.observer_panics.load(Ordering::Relaxed),
            subscriber_lagged: self.subscriber_lagged.load(Ordering::Relaxed),
            log_write_failures: self.log_write_failures.load(Ordering::Relaxed),
        }
    }
}
