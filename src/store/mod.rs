//! Node Store contract bridging the nested-set engine with a concrete table.
//!
//! The engine only talks to a [`NodeStore`]; it never builds SQL or touches a
//! connection directly. Two implementations ship with the crate:
//! [`SqliteNodeStore`] (enabled by the default `sqlite-backend` feature) and
//! [`MemoryNodeStore`].
//!
//! # Locking and atomicity
//!
//! Structural mutations bracket their writes with [`NodeStore::lock_exclusive`]
//! and [`NodeStore::unlock`]. A transactional store must discard every write
//! made since `lock_exclusive` when unlocked with [`Outcome::Rollback`]. A store
//! that cannot do so leaves a failed move's subtree relocation partially
//! applied; `rebuild_tree` is then the only way to repair the scope.

mod filter;
mod memory;
#[cfg(feature = "sqlite-backend")]
mod sqlite;

use std::sync::Arc;

pub use filter::{Assignment, Cmp, Column, Condition, Delta, Filter, Order, SortDirection};
pub use memory::MemoryNodeStore;
#[cfg(feature = "sqlite-backend")]
pub use sqlite::SqliteNodeStore;

use crate::{TreeError, node::Node};

/// How an exclusive section ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Commit,
    Rollback,
}

pub trait NodeStore {
    /// Rows matching `filter`, sorted by `order`, at most `limit` of them.
    fn read(
        &self,
        filter: &Filter,
        order: &Order,
        limit: Option<usize>,
    ) -> Result<Vec<Node>, TreeError>;

    fn count(&self, filter: &Filter) -> Result<i64, TreeError>;

    /// Largest scope value in the table, `None` when empty.
    fn max_scope(&self) -> Result<Option<i64>, TreeError>;

    /// Inserts one row and returns its identifier. An explicit `node.id` is
    /// kept; otherwise the store assigns one.
    fn insert(&self, node: &Node) -> Result<i64, TreeError>;

    /// Overwrites the structural columns of the row with `node.id`.
    fn update(&self, node: &Node) -> Result<(), TreeError>;

    /// Applies `delta` to every row matching `filter`; returns the row count.
    fn bulk_update(&self, delta: &Delta, filter: &Filter) -> Result<usize, TreeError>;

    fn delete(&self, filter: &Filter) -> Result<usize, TreeError>;

    /// Blocks until this caller holds the store-wide write lock.
    fn lock_exclusive(&self) -> Result<(), TreeError>;

    /// Releases the lock taken by [`NodeStore::lock_exclusive`].
    fn unlock(&self, outcome: Outcome) -> Result<(), TreeError>;

    /// Whether [`Outcome::Rollback`] undoes writes.
    fn is_transactional(&self) -> bool {
        false
    }

    fn get(&self, id: i64) -> Result<Option<Node>, TreeError> {
        Ok(self
            .read(&Filter::by_id(id), &Order::none(), Some(1))?
            .into_iter()
            .next())
    }
}

impl<'a, S> NodeStore for &'a S
where
    S: NodeStore + ?Sized,
{
    fn read(
        &self,
        filter: &Filter,
        order: &Order,
        limit: Option<usize>,
    ) -> Result<Vec<Node>, TreeError> {
        (*self).read(filter, order, limit)
    }

    fn count(&self, filter: &Filter) -> Result<i64, TreeError> {
        (*self).count(filter)
    }

    fn max_scope(&self) -> Result<Option<i64>, TreeError> {
        (*self).max_scope()
    }

    fn insert(&self, node: &Node) -> Result<i64, TreeError> {
        (*self).insert(node)
    }

    fn update(&self, node: &Node) -> Result<(), TreeError> {
        (*self).update(node)
    }

    fn bulk_update(&self, delta: &Delta, filter: &Filter) -> Result<usize, TreeError> {
        (*self).bulk_update(delta, filter)
    }

    fn delete(&self, filter: &Filter) -> Result<usize, TreeError> {
        (*self).delete(filter)
    }

    fn lock_exclusive(&self) -> Result<(), TreeError> {
        (*self).lock_exclusive()
    }

    fn unlock(&self, outcome: Outcome) -> Result<(), TreeError> {
        (*self).unlock(outcome)
    }

    fn is_transactional(&self) -> bool {
        (*self).is_transactional()
    }
}

impl<S> NodeStore for Arc<S>
where
    S: NodeStore + ?Sized,
{
    fn read(
        &self,
        filter: &Filter,
        order: &Order,
        limit: Option<usize>,
    ) -> Result<Vec<Node>, TreeError> {
        self.as_ref().read(filter, order, limit)
    }

    fn count(&self, filter: &Filter) -> Result<i64, TreeError> {
        self.as_ref().count(filter)
    }

    fn max_scope(&self) -> Result<Option<i64>, TreeError> {
        self.as_ref().max_scope()
    }

    fn insert(&self, node: &Node) -> Result<i64, TreeError> {
        self.as_ref().insert(node)
    }

    fn update(&self, node: &Node) -> Result<(), TreeError> {
        self.as_ref().update(node)
    }

    fn bulk_update(&self, delta: &Delta, filter: &Filter) -> Result<usize, TreeError> {
        self.as_ref().bulk_update(delta, filter)
    }

    fn delete(&self, filter: &Filter) -> Result<usize, TreeError> {
        self.as_ref().delete(filter)
    }

    fn lock_exclusive(&self) -> Result<(), TreeError> {
        self.as_ref().lock_exclusive()
    }

    fn unlock(&self, outcome: Outcome) -> Result<(), TreeError> {
        self.as_ref().unlock(outcome)
    }

    fn is_transactional(&self) -> bool {
        self.as_ref().is_transactional()
    }
}
