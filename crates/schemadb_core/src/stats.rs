//! Engine statistics.
//!
//! Operation counters are atomic and can be read while other operations are
//! in progress. They count since the engine was opened and are not persisted.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters for a storage engine.
#[derive(Debug, Default)]
pub struct EngineStats {
    /// Record fetches, exact or partial.
    reads: AtomicU64,
    /// Records added or replaced.
    writes: AtomicU64,
    /// Records deleted.
    deletes: AtomicU64,
    /// Fetches resolved through the partial-key index.
    partial_lookups: AtomicU64,
    /// Successful snapshot saves.
    flushes: AtomicU64,
    /// Failed snapshot saves.
    flush_failures: AtomicU64,
    /// Snapshot bytes written.
    bytes_written: AtomicU64,
    /// Database switches.
    switches: AtomicU64,
}

impl EngineStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_partial_lookup(&self) {
        self.partial_lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush(&self, bytes: u64) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_flush_failure(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_switch(&self) {
        self.switches.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            partial_lookups: self.partial_lookups.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            switches: self.switches.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Record fetches, exact or partial.
    pub reads: u64,
    /// Records added or replaced.
    pub writes: u64,
    /// Records deleted.
    pub deletes: u64,
    /// Fetches resolved through the partial-key index.
    pub partial_lookups: u64,
    /// Successful snapshot saves.
    pub flushes: u64,
    /// Failed snapshot saves.
    pub flush_failures: u64,
    /// Snapshot bytes written.
    pub bytes_written: u64,
    /// Database switches.
    pub switches: u64,
}

/// Summary of the current database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Name of the current database.
    pub database: String,
    /// Record count per schema, including empty schemas.
    pub records: BTreeMap<String, usize>,
    /// Whether memory holds changes not yet saved.
    pub dirty: bool,
    /// Engine-wide operation counters.
    pub operations: StatsSnapshot,
}

impl DatabaseStats {
    /// Total records across all schemas.
    pub fn total_records(&self) -> usize {
        self.records.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        assert_eq!(EngineStats::new().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn record_operations() {
        let stats = EngineStats::new();
        stats.record_read();
        stats.record_read();
        stats.record_partial_lookup();
        stats.record_write();
        stats.record_flush(100);
        stats.record_flush(50);
        stats.record_flush_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.reads, 2);
        assert_eq!(snap.partial_lookups, 1);
        assert_eq!(snap.writes, 1);
        assert_eq!(snap.flushes, 2);
        assert_eq!(snap.bytes_written, 150);
        assert_eq!(snap.flush_failures, 1);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(EngineStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        s.record_read();
                        s.record_delete();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snap = stats.snapshot();
        assert_eq!(snap.reads, 800);
        assert_eq!(snap.deletes, 800);
    }

    #[test]
    fn total_records() {
        let stats = DatabaseStats {
            database: "default".into(),
            records: BTreeMap::from([("User".into(), 3), ("Order".into(), 2)]),
            dirty: false,
            operations: StatsSnapshot::default(),
        };
        assert_eq!(stats.total_records(), 5);
    }
}
