use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::Serialize;

use crate::{
    node::Node,
    store::SortDirection,
    tree::{DescendantsQuery, ParentsQuery},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Cache key: the operation, its arguments, and the full state of the node
/// it was asked about.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum QueryKey {
    Root { scope: i64 },
    Roots,
    Parent { node: Node },
    Parents { node: Node, query: ParentsQuery },
    Descendants { node: Node, query: DescendantsQuery },
    Siblings {
        node: Node,
        include_self: bool,
        direction: SortDirection,
    },
    FullTree { scope: Option<i64> },
}

impl QueryKey {
    /// Scope the result was read from; `None` for cross-scope listings.
    fn scope(&self) -> Option<i64> {
        match self {
            QueryKey::Root { scope } => Some(*scope),
            QueryKey::Roots => None,
            QueryKey::Parent { node }
            | QueryKey::Parents { node, .. }
            | QueryKey::Descendants { node, .. }
            | QueryKey::Siblings { node, .. } => Some(node.scope),
            QueryKey::FullTree { scope } => *scope,
        }
    }
}

/// Memoized relationship results, invalidated per scope on every mutation.
///
/// Only mutations made through the owning tree handle invalidate entries.
#[derive(Default)]
pub struct RelationCache {
    inner: RwLock<AHashMap<QueryKey, Vec<Node>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    generation: AtomicU64,
}

impl RelationCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(AHashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    /// Bumped by every invalidation; read before loading a result.
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn get(&self, key: &QueryKey) -> Option<Vec<Node>> {
        if let Some(value) = self.inner.read().get(key).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(value)
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Stores `value` unless an invalidation ran since `generation` was
    /// read, which would make it a read of intermediate state.
    pub(crate) fn insert(&self, key: QueryKey, value: Vec<Node>, generation: u64) {
        let mut inner = self.inner.write();
        if self.generation.load(Ordering::Acquire) == generation {
            inner.insert(key, value);
        }
    }

    /// Drops every entry read from one of `scopes`, plus all cross-scope
    /// listings.
    pub fn invalidate_scopes(&self, scopes: &[i64]) {
        if scopes.is_empty() {
            return;
        }
        let mut inner = self.inner.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        inner.retain(|key, _| match key.scope() {
            Some(scope) => !scopes.contains(&scope),
            None => false,
        });
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        inner.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.inner.read().len();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(scope: i64) -> Node {
        Node {
            id: Some(1),
            left: 1,
            right: 2,
            level: 1,
            scope,
            parent_id: None,
        }
    }

    #[test]
    fn test_hits_and_misses() {
        let cache = RelationCache::new();
        let key = QueryKey::Root { scope: 1 };
        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), vec![node(1)], cache.generation());
        assert_eq!(cache.get(&key).unwrap().len(), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn test_invalidate_only_touched_scopes() {
        let cache = RelationCache::new();
        let generation = cache.generation();
        cache.insert(QueryKey::Root { scope: 1 }, vec![node(1)], generation);
        cache.insert(QueryKey::Root { scope: 2 }, vec![node(2)], generation);
        cache.insert(QueryKey::Roots, vec![node(1), node(2)], generation);
        cache.insert(QueryKey::Parent { node: node(2) }, vec![], generation);
        cache.invalidate_scopes(&[1]);
        assert!(cache.get(&QueryKey::Root { scope: 1 }).is_none());
        assert!(cache.get(&QueryKey::Roots).is_none());
        assert!(cache.get(&QueryKey::Root { scope: 2 }).is_some());
        assert!(cache.get(&QueryKey::Parent { node: node(2) }).is_some());
    }

    #[test]
    fn test_insert_after_invalidation_is_dropped() {
        let cache = RelationCache::new();
        let generation = cache.generation();
        cache.invalidate_scopes(&[1]);
        cache.insert(QueryKey::Root { scope: 1 }, vec![node(1)], generation);
        assert_eq!(cache.stats().entries, 0);
    }
}
