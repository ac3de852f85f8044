//! Nested-set (modified preorder tree traversal) trees stored in a flat,
//! interval-indexed table.
//!
//! Every node carries a `[left, right]` interval; containment of intervals
//! encodes ancestry, so descendant, ancestor, and sibling queries are single
//! range reads. [`NestedSet`] owns the mutation engine (insert, move, delete,
//! make_root, rebuild) and the relationship queries, and talks to storage only
//! through a [`NodeStore`].
//!
//! ```no_run
//! use sqlitetree::{Node, TreeConfig, open_tree_in_memory};
//!
//! # fn main() -> Result<(), sqlitetree::TreeError> {
//! let tree = open_tree_in_memory(&TreeConfig::default())?;
//! let mut root = Node::new();
//! tree.make_root(&mut root, None)?;
//! let mut child = Node::new();
//! tree.insert_as_last_child(&mut child, &root)?;
//! tree.reload(&mut root)?;
//! assert_eq!(root.descendant_count(), 1);
//! # Ok(())
//! # }
//! ```
//! Run Criterion benchmarks with `cargo bench` to inspect reports under `target/criterion`.

pub mod cache;
pub mod config;
pub mod errors;
pub mod fault_injection;
pub mod integrity;
pub mod metrics;
pub mod node;
#[cfg(feature = "sqlite-backend")]
pub mod schema;
pub mod store;
pub mod tree;

pub use crate::cache::CacheStats;
#[cfg(feature = "sqlite-backend")]
pub use crate::config::{open_tree, open_tree_in_memory};
pub use crate::config::{ColumnConfig, SqliteConfig, TreeConfig};
pub use crate::errors::TreeError;
pub use crate::fault_injection::FaultPoint;
pub use crate::integrity::{IntegrityReport, Violation};
pub use crate::metrics::TreeMetricsSnapshot;
pub use crate::node::{Node, NodeRef};
#[cfg(feature = "sqlite-backend")]
pub use crate::store::SqliteNodeStore;
pub use crate::store::{
    Column, Delta, Filter, MemoryNodeStore, NodeStore, Order, Outcome, SortDirection,
};
pub use crate::tree::{DescendantsQuery, NestedSet, ParentsQuery, Position};
