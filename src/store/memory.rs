//! In-process node store.
//!
//! Rows live in an ordered map guarded by a `parking_lot` mutex. The
//! exclusive lock is a blocking flag with a condition variable; taking it
//! snapshots the rows so [`Outcome::Rollback`] can restore them.

use std::collections::BTreeMap;

use parking_lot::{Condvar, Mutex};

use crate::{
    TreeError,
    node::Node,
    store::{Delta, Filter, NodeStore, Order, Outcome},
};

#[derive(Clone, Default)]
struct Rows {
    by_id: BTreeMap<i64, Node>,
    next_id: i64,
}

#[derive(Default)]
struct LockState {
    held: bool,
    snapshot: Option<Rows>,
}

#[derive(Default)]
pub struct MemoryNodeStore {
    rows: Mutex<Rows>,
    lock: Mutex<LockState>,
    released: Condvar,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with rows as-is, bypassing every invariant. Useful for
    /// loading an existing table or staging a corrupted one.
    pub fn from_rows<I>(rows: I) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = Node>,
    {
        let store = Self::new();
        for row in rows {
            store.insert(&row)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.rows.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NodeStore for MemoryNodeStore {
    fn read(
        &self,
        filter: &Filter,
        order: &Order,
        limit: Option<usize>,
    ) -> Result<Vec<Node>, TreeError> {
        let mut matched: Vec<Node> = self
            .rows
            .lock()
            .by_id
            .values()
            .filter(|node| filter.matches(node))
            .copied()
            .collect();
        matched.sort_by(|a, b| order.compare(a, b));
        if let Some(limit) = limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    fn count(&self, filter: &Filter) -> Result<i64, TreeError> {
        let rows = self.rows.lock();
        Ok(rows.by_id.values().filter(|node| filter.matches(node)).count() as i64)
    }

    fn max_scope(&self) -> Result<Option<i64>, TreeError> {
        Ok(self.rows.lock().by_id.values().map(|node| node.scope).max())
    }

    fn insert(&self, node: &Node) -> Result<i64, TreeError> {
        if node.left >= node.right {
            return Err(TreeError::query(format!(
                "interval [{}, {}] is empty",
                node.left, node.right
            )));
        }
        let mut rows = self.rows.lock();
        let id = match node.id {
            Some(id) if rows.by_id.contains_key(&id) => {
                return Err(TreeError::query(format!("node {id} already exists")));
            }
            Some(id) => id,
            None => rows.next_id + 1,
        };
        rows.next_id = rows.next_id.max(id);
        rows.by_id.insert(id, Node { id: Some(id), ..*node });
        Ok(id)
    }

    fn update(&self, node: &Node) -> Result<(), TreeError> {
        let id = node
            .id
            .ok_or_else(|| TreeError::query("node id must be set for update"))?;
        let mut rows = self.rows.lock();
        match rows.by_id.get_mut(&id) {
            Some(existing) => {
                *existing = *node;
                Ok(())
            }
            None => Err(TreeError::not_found(format!("node {id}"))),
        }
    }

    fn bulk_update(&self, delta: &Delta, filter: &Filter) -> Result<usize, TreeError> {
        let mut rows = self.rows.lock();
        let mut affected = 0;
        for node in rows.by_id.values_mut() {
            if filter.matches(node) {
                *node = delta.apply(node);
                affected += 1;
            }
        }
        Ok(affected)
    }

    fn delete(&self, filter: &Filter) -> Result<usize, TreeError> {
        let mut rows = self.rows.lock();
        let before = rows.by_id.len();
        rows.by_id.retain(|_, node| !filter.matches(node));
        Ok(before - rows.by_id.len())
    }

    fn lock_exclusive(&self) -> Result<(), TreeError> {
        let mut state = self.lock.lock();
        while state.held {
            self.released.wait(&mut state);
        }
        state.held = true;
        state.snapshot = Some(self.rows.lock().clone());
        Ok(())
    }

    fn unlock(&self, outcome: Outcome) -> Result<(), TreeError> {
        let mut state = self.lock.lock();
        if !state.held {
            return Err(TreeError::transaction("unlock without a held lock"));
        }
        let snapshot = state.snapshot.take();
        if outcome == Outcome::Rollback
            && let Some(snapshot) = snapshot
        {
            *self.rows.lock() = snapshot;
        }
        state.held = false;
        drop(state);
        self.released.notify_one();
        Ok(())
    }

    fn is_transactional(&self) -> bool {
        true
    }
}
