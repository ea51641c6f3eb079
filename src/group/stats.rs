//! Per-group write statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-local counters for one storage group
///
/// The dropped-record count lives in the shared header so readers can see
/// it; everything here is producer-side observability.
#[derive(Debug, Default)]
pub struct GroupStats {
    /// Records committed by this process
    pub records_written: AtomicU64,
    /// Payload bytes committed by this process
    pub bytes_written: AtomicU64,
    /// Transactions committed
    pub transactions_committed: AtomicU64,
    /// Transactions abandoned without commit
    pub transactions_abandoned: AtomicU64,
}

impl GroupStats {
    /// Record a committed write of `bytes` payload bytes
    pub fn record_written(&self, bytes: usize) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record a batch commit of `records` records
    pub fn record_committed_batch(&self, records: u64, bytes: usize) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
        self.records_written.fetch_add(records, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record an abandoned transaction
    pub fn record_abandoned(&self) {
        self.transactions_abandoned.fetch_add(1, Ordering::Relaxed);
    }
}
