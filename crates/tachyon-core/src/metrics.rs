//! Master-wide operation counters, for profiling and log-friendly
//! summaries. Mirrors `oxcrypt-core/src/vault/lock_metrics.rs`'s
//! `LockMetrics`/`LockMetricsSnapshot` shape.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct MasterMetrics {
    pub files_created: AtomicU64,
    pub files_deleted: AtomicU64,
    pub renames: AtomicU64,
    pub dependencies_created: AtomicU64,
    pub workers_registered: AtomicU64,
    pub workers_timed_out: AtomicU64,
    pub files_lost: AtomicU64,
    pub recomputations_launched: AtomicU64,
    pub journal_appends: AtomicU64,
    pub checkpoints_written: AtomicU64,
}

impl MasterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_file_created(&self) {
        self.files_created.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_file_deleted(&self) {
        self.files_deleted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rename(&self) {
        self.renames.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dependency_created(&self) {
        self.dependencies_created.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_worker_registered(&self) {
        self.workers_registered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_workers_timed_out(&self, count: u64) {
        self.workers_timed_out.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_file_lost(&self) {
        self.files_lost.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_recomputation_launched(&self) {
        self.recomputations_launched.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_journal_append(&self) {
        self.journal_appends.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_checkpoint_written(&self) {
        self.checkpoints_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MasterMetricsSnapshot {
        MasterMetricsSnapshot {
            files_created: self.files_created.load(Ordering::Relaxed),
            files_deleted: self.files_deleted.load(Ordering::Relaxed),
            renames: self.renames.load(Ordering::Relaxed),
            dependencies_created: self.dependencies_created.load(Ordering::Relaxed),
            workers_registered: self.workers_registered.load(Ordering::Relaxed),
            workers_timed_out: self.workers_timed_out.load(Ordering::Relaxed),
            files_lost: self.files_lost.load(Ordering::Relaxed),
            recomputations_launched: self.recomputations_launched.load(Ordering::Relaxed),
            journal_appends: self.journal_appends.load(Ordering::Relaxed),
            checkpoints_written: self.checkpoints_written.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.files_created.store(0, Ordering::Relaxed);
        self.files_deleted.store(0, Ordering::Relaxed);
        self.renames.store(0, Ordering::Relaxed);
        self.dependencies_created.store(0, Ordering::Relaxed);
        self.workers_registered.store(0, Ordering::Relaxed);
        self.workers_timed_out.store(0, Ordering::Relaxed);
        self.files_lost.store(0, Ordering::Relaxed);
        self.recomputations_launched.store(0, Ordering::Relaxed);
        self.journal_appends.store(0, Ordering::Relaxed);
        self.checkpoints_written.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MasterMetricsSnapshot {
    pub files_created: u64,
    pub files_deleted: u64,
    pub renames: u64,
    pub dependencies_created: u64,
    pub workers_registered: u64,
    pub workers_timed_out: u64,
    pub files_lost: u64,
    pub recomputations_launched: u64,
    pub journal_appends: u64,
    pub checkpoints_written: u64,
}

impl MasterMetricsSnapshot {
    /// Renders the snapshot as a single JSON line, for a human-inspectable
    /// status dump alongside the `tracing` event stream (see
    /// `SPEC_FULL.md` §2's ambient-stack logging note).
    pub fn to_json(self) -> String {
        serde_json::to_string(&self).expect("MasterMetricsSnapshot fields are all infallibly serializable")
    }
}
