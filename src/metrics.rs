use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TreeMetricsSnapshot {
    pub inserts: u64,
    pub moves: u64,
    pub deletes: u64,
    pub make_roots: u64,
    pub rebuilds: u64,
    pub rollbacks: u64,
    pub compensations: u64,
}

#[derive(Default)]
pub struct TreeMetrics {
    inserts: AtomicU64,
    moves: AtomicU64,
    deletes: AtomicU64,
    make_roots: AtomicU64,
    rebuilds: AtomicU64,
    rollbacks: AtomicU64,
    compensations: AtomicU64,
}

impl TreeMetrics {
    pub fn snapshot(&self) -> TreeMetricsSnapshot {
        TreeMetricsSnapshot {
            inserts: self.inserts.load(Ordering::Relaxed),
            moves: self.moves.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            make_roots: self.make_roots.load(Ordering::Relaxed),
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            compensations: self.compensations.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.inserts.store(0, Ordering::Relaxed);
        self.moves.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
        self.make_roots.store(0, Ordering::Relaxed);
        self.rebuilds.store(0, Ordering::Relaxed);
        self.rollbacks.store(0, Ordering::Relaxed);
        self.compensations.store(0, Ordering::Relaxed);
    }

    pub fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_move(&self) {
        self.moves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_make_root(&self) {
        self.make_roots.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rebuild(&self) {
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
    }

    /// An exclusive section ended without committing.
    pub fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Reserved space was closed again after a failed insert.
    pub fn record_compensation(&self) {
        self.compensations.fetch_add(1, Ordering::Relaxed);
    }
}
