//! The nested-set engine: interval allocation, structural mutations,
//! rebuild, and relationship queries over any [`NodeStore`].

mod allocator;
mod guard;
mod mutation;
mod query;
mod rebuild;

pub use mutation::Position;
pub use query::{DescendantsQuery, ParentsQuery};

use crate::{
    TreeError,
    cache::{CacheStats, QueryKey, RelationCache},
    config::TreeConfig,
    fault_injection::{FaultPoint, FaultRegistry},
    integrity::{self, IntegrityReport},
    metrics::{TreeMetrics, TreeMetricsSnapshot},
    node::{Node, NodeRef},
    store::NodeStore,
};

use guard::MutationGuard;

/// Tree handle over a node store.
///
/// Every structural mutation holds the store's exclusive lock for its whole
/// duration and refreshes the caller's [`Node`] to the stored result.
pub struct NestedSet<S: NodeStore> {
    store: S,
    cache: RelationCache,
    cache_enabled: bool,
    metrics: TreeMetrics,
    faults: FaultRegistry,
}

/// Scopes written by the current mutation; their cached relationships are
/// dropped once it ends.
#[derive(Default)]
pub(crate) struct Touched {
    scopes: Vec<i64>,
}

impl Touched {
    pub(crate) fn scope(&mut self, scope: i64) {
        if !self.scopes.contains(&scope) {
            self.scopes.push(scope);
        }
    }
}

impl<S: NodeStore> NestedSet<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: RelationCache::new(),
            cache_enabled: true,
            metrics: TreeMetrics::default(),
            faults: FaultRegistry::new(),
        }
    }

    pub fn with_config(store: S, cfg: &TreeConfig) -> Self {
        let mut tree = Self::new(store);
        tree.cache_enabled = cfg.cache_relations;
        tree
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn metrics_snapshot(&self) -> TreeMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drops every memoized relationship. Needed after writes made through
    /// another handle or directly against the store.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Makes the next `failures` passes through `point` fail.
    pub fn inject_fault(&self, point: FaultPoint, failures: usize) {
        self.faults.configure(point, failures);
    }

    pub fn reset_faults(&self) {
        self.faults.reset();
    }

    /// Loads a node, failing with `NotFound` when the id is unknown.
    pub fn get(&self, id: i64) -> Result<Node, TreeError> {
        self.store
            .get(id)?
            .ok_or_else(|| TreeError::not_found(format!("node {id}")))
    }

    pub fn find(&self, id: i64) -> Result<Option<Node>, TreeError> {
        self.store.get(id)
    }

    /// Replaces `node` with its current stored state.
    pub fn reload(&self, node: &mut Node) -> Result<(), TreeError> {
        let id = node.require_id("reload")?;
        *node = self.get(id)?;
        Ok(())
    }

    /// Sweeps one scope for interval, root, parent, and level violations.
    pub fn check_invariants(&self, scope: i64) -> Result<IntegrityReport, TreeError> {
        integrity::check_scope(&self.store, scope)
    }

    pub fn check_all(&self) -> Result<Vec<IntegrityReport>, TreeError> {
        integrity::check_all(&self.store)
    }

    /// Resolves a mutation or predicate target; an unknown id is a
    /// validation failure.
    pub(crate) fn resolve_target(&self, target: NodeRef<'_>) -> Result<Node, TreeError> {
        let id = target
            .id()
            .ok_or_else(|| TreeError::validation("target node has not been saved"))?;
        self.store
            .get(id)?
            .ok_or_else(|| TreeError::validation(format!("target node {id} does not exist")))
    }

    pub(crate) fn check_fault(&self, point: FaultPoint) -> Result<(), TreeError> {
        self.faults.check(point)
    }

    /// Runs `f` inside the store's exclusive section. Commits on success,
    /// rolls back on error, and invalidates every touched scope either way.
    pub(crate) fn mutate<R, F>(&self, f: F) -> Result<R, TreeError>
    where
        F: FnOnce(&mut Touched) -> Result<R, TreeError>,
    {
        let guard = MutationGuard::acquire(&self.store, &self.metrics)?;
        let mut touched = Touched::default();
        let result = f(&mut touched);
        let result = match result {
            Ok(value) => guard.commit().map(|_| value),
            Err(err) => {
                guard.rollback(&err);
                Err(err)
            }
        };
        self.cache.invalidate_scopes(&touched.scopes);
        result
    }

    pub(crate) fn cached<F>(&self, key: QueryKey, load: F) -> Result<Vec<Node>, TreeError>
    where
        F: FnOnce() -> Result<Vec<Node>, TreeError>,
    {
        if !self.cache_enabled {
            return load();
        }
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }
        let generation = self.cache.generation();
        let value = load()?;
        self.cache.insert(key, value.clone(), generation);
        Ok(value)
    }
}
