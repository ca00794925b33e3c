//! Session counters shared between the detector, the consumer, and readers.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use crate::types::SessionStats;

/// Sentinel for "no id seen yet".
pub const NO_ID: i64 = -1;

/// Counters for one watching session.
///
/// Shared by `Arc`; every field is atomic because detection and processing
/// run on different tasks.
#[derive(Debug)]
pub struct PipelineState {
    last_seen_id: AtomicI64,
    processed: AtomicU64,
    persisted: AtomicU64,
    failed: AtomicU64,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineState {
    pub fn new() -> Self {
        Self {
            last_seen_id: AtomicI64::new(NO_ID),
            processed: AtomicU64::new(0),
            persisted: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn last_seen_id(&self) -> i64 {
        self.last_seen_id.load(Ordering::SeqCst)
    }

    /// Overwrite the last seen id (used when seeding from the source).
    pub fn reset_last_seen(&self, id: i64) {
        self.last_seen_id.store(id, Ordering::SeqCst);
    }

    /// Raise the last seen id; returns true if `id` was new.
    pub fn observe(&self, id: i64) -> bool {
        self.last_seen_id.fetch_max(id, Ordering::SeqCst) < id
    }

    /// Count an image entering processing; returns its 1-based sequence number.
    pub fn next_sequence(&self) -> u64 {
        self.processed.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Count an image whose artifacts were all written.
    pub fn record_persisted(&self) {
        self.persisted.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn persisted(&self) -> u64 {
        self.persisted.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// Snapshot the counters together with the current queue depth.
    pub fn snapshot(&self, queue_depth: usize) -> SessionStats {
        SessionStats {
            processed: self.processed(),
            persisted: self.persisted(),
            failed: self.failed(),
            last_seen_id: self.last_seen_id(),
            queue_depth,
        }
    }
}
