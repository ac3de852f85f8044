//! Configuration for the nested-set table layout and the SQLite store.
//!
//! Column names are resolved once when a store is constructed; the engine
//! itself only ever refers to the typed [`Column`](crate::store::Column) enum.

use std::collections::HashMap;
#[cfg(feature = "sqlite-backend")]
use std::path::Path;
use std::time::Duration;

use crate::TreeError;
use crate::store::Column;
#[cfg(feature = "sqlite-backend")]
use crate::{store::SqliteNodeStore, tree::NestedSet};

/// Names of the six structural columns.
///
/// # Default Configuration
///
/// ```rust
/// use sqlitetree::ColumnConfig;
/// let columns = ColumnConfig::default();
/// assert_eq!(columns.left, "lft");
/// assert_eq!(columns.parent, "parent_id");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnConfig {
    pub primary: String,
    pub left: String,
    pub right: String,
    pub level: String,
    pub scope: String,
    pub parent: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            primary: "id".to_string(),
            left: "lft".to_string(),
            right: "rgt".to_string(),
            level: "lvl".to_string(),
            scope: "scope".to_string(),
            parent: "parent_id".to_string(),
        }
    }
}

impl ColumnConfig {
    pub fn name(&self, column: Column) -> &str {
        match column {
            Column::Id => &self.primary,
            Column::Left => &self.left,
            Column::Right => &self.right,
            Column::Level => &self.level,
            Column::Scope => &self.scope,
            Column::Parent => &self.parent,
        }
    }

    /// Rejects empty, non-identifier, or duplicate column names.
    pub fn validate(&self) -> Result<(), TreeError> {
        let mut seen: Vec<String> = Vec::with_capacity(Column::ALL.len());
        for column in Column::ALL {
            let name = self.name(column);
            validate_identifier(name)?;
            let lowered = name.to_ascii_lowercase();
            if seen.contains(&lowered) {
                return Err(TreeError::config(format!(
                    "column name `{name}` is used more than once"
                )));
            }
            seen.push(lowered);
        }
        Ok(())
    }
}

/// Options specific to the SQLite store.
///
/// ```rust
/// use sqlitetree::SqliteConfig;
/// let config = SqliteConfig::default();
/// assert!(!config.without_migrations);
/// assert!(config.pragma_settings.is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct SqliteConfig {
    /// Skip pending schema migrations when opening an existing database.
    pub without_migrations: bool,

    /// Prepared statement cache capacity. `None` keeps the store default of 128.
    pub cache_size: Option<usize>,

    /// How long a writer waits for another connection's exclusive lock.
    ///
    /// `None` keeps rusqlite's default of five seconds.
    pub busy_timeout: Option<Duration>,

    /// Extra `PRAGMA key = value` statements applied after opening.
    pub pragma_settings: HashMap<String, String>,
}

/// Complete configuration for a tree handle.
///
/// ```rust
/// use sqlitetree::TreeConfig;
/// let cfg = TreeConfig::default();
/// assert_eq!(cfg.table, "nested_set");
/// assert!(cfg.cache_relations);
/// ```
#[derive(Clone, Debug)]
pub struct TreeConfig {
    /// Table holding the node rows.
    pub table: String,

    /// Structural column names.
    pub columns: ColumnConfig,

    /// SQLite-specific options, ignored by other stores.
    pub sqlite: SqliteConfig,

    /// Memoize relationship query results on the tree handle.
    pub cache_relations: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            table: "nested_set".to_string(),
            columns: ColumnConfig::default(),
            sqlite: SqliteConfig::default(),
            cache_relations: true,
        }
    }
}

impl TreeConfig {
    pub fn with_table<T: Into<String>>(table: T) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), TreeError> {
        validate_identifier(&self.table)?;
        self.columns.validate()
    }

    pub(crate) fn meta_table(&self) -> String {
        format!("{}_meta", self.table)
    }
}

/// Open (creating if needed) a SQLite-backed tree at `path`.
///
/// ```rust,no_run
/// use sqlitetree::{open_tree, Node, TreeConfig};
///
/// let tree = open_tree("tree.db", &TreeConfig::default())?;
/// let mut root = Node::new();
/// tree.make_root(&mut root, None)?;
/// # Ok::<(), sqlitetree::TreeError>(())
/// ```
#[cfg(feature = "sqlite-backend")]
pub fn open_tree<P: AsRef<Path>>(
    path: P,
    cfg: &TreeConfig,
) -> Result<NestedSet<SqliteNodeStore>, TreeError> {
    let store = SqliteNodeStore::open(path, cfg)?;
    Ok(NestedSet::with_config(store, cfg))
}

#[cfg(feature = "sqlite-backend")]
pub fn open_tree_in_memory(cfg: &TreeConfig) -> Result<NestedSet<SqliteNodeStore>, TreeError> {
    let store = SqliteNodeStore::open_in_memory(cfg)?;
    Ok(NestedSet::with_config(store, cfg))
}

fn validate_identifier(name: &str) -> Result<(), TreeError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(TreeError::config(format!(
            "`{name}` is not a valid SQL identifier"
        )));
    }
    Ok(())
}
