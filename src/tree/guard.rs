use tracing::warn;

use crate::{
    TreeError,
    metrics::TreeMetrics,
    store::{NodeStore, Outcome},
};

/// Holds the store's exclusive lock; rolls back automatically unless
/// committed.
pub(crate) struct MutationGuard<'a, S: NodeStore> {
    store: &'a S,
    metrics: &'a TreeMetrics,
    finished: bool,
}

impl<'a, S: NodeStore> MutationGuard<'a, S> {
    pub(crate) fn acquire(store: &'a S, metrics: &'a TreeMetrics) -> Result<Self, TreeError> {
        store.lock_exclusive()?;
        Ok(Self {
            store,
            metrics,
            finished: false,
        })
    }

    pub(crate) fn commit(mut self) -> Result<(), TreeError> {
        self.store.unlock(Outcome::Commit)?;
        self.finished = true;
        Ok(())
    }

    /// Ends the section without keeping its writes, logging the cause.
    pub(crate) fn rollback(mut self, cause: &TreeError) {
        warn!(error = %cause, "rolling back structural mutation");
        self.finish_rollback();
    }

    fn finish_rollback(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.metrics.record_rollback();
        if let Err(err) = self.store.unlock(Outcome::Rollback) {
            warn!(error = %err, "rollback failed");
        }
        if !self.store.is_transactional() {
            warn!("store is not transactional; partial writes were kept");
        }
    }
}

impl<S: NodeStore> Drop for MutationGuard<'_, S> {
    fn drop(&mut self) {
        // Reached on panic or when commit itself failed.
        self.finish_rollback();
    }
}
