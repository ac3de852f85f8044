//! SQLite node store.
//!
//! Filters, deltas, and orderings are rendered to SQL once per call using the
//! configured column names; every value travels as a bound parameter. The
//! exclusive lock is a `BEGIN IMMEDIATE` transaction, so a rolled back
//! mutation leaves no trace and other connections wait (up to the configured
//! busy timeout) instead of interleaving their shifts.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use crate::{
    TreeError,
    config::{ColumnConfig, TreeConfig},
    node::Node,
    schema::{ensure_schema, ensure_schema_without_migrations},
    store::{Assignment, Column, Condition, Delta, Filter, NodeStore, Order, Outcome},
};

const DEFAULT_STATEMENT_CACHE: usize = 128;

pub struct SqliteNodeStore {
    conn: Connection,
    table: String,
    columns: ColumnConfig,
    select_list: String,
}

// Helper function to check if connection is in-memory
fn is_in_memory_connection(conn: &Connection) -> bool {
    match conn.pragma_query_value(None, "database_list", |row| {
        let name: String = row.get(2)?;
        Ok(name)
    }) {
        Ok(name) => name.is_empty() || name == ":memory:",
        Err(_) => true,
    }
}

impl SqliteNodeStore {
    pub fn open<P: AsRef<Path>>(path: P, cfg: &TreeConfig) -> Result<Self, TreeError> {
        let conn = Connection::open(path).map_err(|e| TreeError::connection(e.to_string()))?;
        Self::from_connection(conn, cfg)
    }

    pub fn open_in_memory(cfg: &TreeConfig) -> Result<Self, TreeError> {
        let conn =
            Connection::open_in_memory().map_err(|e| TreeError::connection(e.to_string()))?;
        Self::from_connection(conn, cfg)
    }

    /// Wraps an existing connection, creating the node table if needed.
    pub fn from_connection(conn: Connection, cfg: &TreeConfig) -> Result<Self, TreeError> {
        cfg.validate()?;
        conn.set_prepared_statement_cache_capacity(
            cfg.sqlite.cache_size.unwrap_or(DEFAULT_STATEMENT_CACHE),
        );
        if let Some(timeout) = cfg.sqlite.busy_timeout {
            conn.busy_timeout(timeout)
                .map_err(|e| TreeError::connection(e.to_string()))?;
        }

        if !is_in_memory_connection(&conn) {
            // WAL lets readers proceed while a mutation holds the write lock
            if conn.pragma_update(None, "journal_mode", "WAL").is_err() {
                let _ = conn.pragma_update(None, "journal_mode", "DELETE");
            }
            let _ = conn.pragma_update(None, "synchronous", "NORMAL");
        }

        for (key, value) in &cfg.sqlite.pragma_settings {
            let pragma_sql = format!("PRAGMA {} = {}", key, value);
            match conn.execute(&pragma_sql, []) {
                Ok(_) => {}
                Err(rusqlite::Error::ExecuteReturnedResults) => {}
                Err(e) => {
                    return Err(TreeError::connection(format!(
                        "PRAGMA {} = {}: {}",
                        key, value, e
                    )));
                }
            }
        }

        if cfg.sqlite.without_migrations {
            ensure_schema_without_migrations(&conn, cfg)?;
        } else {
            ensure_schema(&conn, cfg)?;
        }

        let columns = cfg.columns.clone();
        let select_list = Column::ALL
            .iter()
            .map(|column| columns.name(*column).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Self {
            conn,
            table: cfg.table.clone(),
            columns,
            select_list,
        })
    }

    /// The underlying connection, for reading payload columns or running
    /// maintenance SQL. Writing structural columns through it bypasses the
    /// engine and requires a `rebuild_tree` afterwards.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn render_filter(&self, filter: &Filter, params: &mut Vec<i64>) -> String {
        if filter.is_empty() {
            return String::new();
        }
        let clauses: Vec<String> = filter
            .conditions()
            .iter()
            .map(|condition| self.render_condition(condition, params))
            .collect();
        format!(" WHERE {}", clauses.join(" AND "))
    }

    fn render_condition(&self, condition: &Condition, params: &mut Vec<i64>) -> String {
        match condition {
            Condition::Compare { column, cmp, value } => {
                params.push(*value);
                format!("{} {} ?", self.columns.name(*column), cmp.as_sql())
            }
            Condition::IsNull(column) => format!("{} IS NULL", self.columns.name(*column)),
            Condition::Relative {
                column,
                cmp,
                other,
                offset,
            } => {
                params.push(*offset);
                format!(
                    "{} {} ({} + ?)",
                    self.columns.name(*column),
                    cmp.as_sql(),
                    self.columns.name(*other)
                )
            }
            Condition::OneOf { column, values } => {
                if values.is_empty() {
                    return "0".to_string();
                }
                params.extend(values.iter().copied());
                let placeholders = vec!["?"; values.len()].join(", ");
                format!("{} IN ({placeholders})", self.columns.name(*column))
            }
        }
    }

    fn render_order(&self, order: &Order) -> String {
        if order.keys().is_empty() {
            return String::new();
        }
        let keys: Vec<String> = order
            .keys()
            .iter()
            .map(|(column, direction)| {
                format!("{} {}", self.columns.name(*column), direction.as_sql())
            })
            .collect();
        format!(" ORDER BY {}", keys.join(", "))
    }

    fn render_delta(&self, delta: &Delta, params: &mut Vec<Option<i64>>) -> String {
        delta
            .assignments()
            .iter()
            .map(|assignment| match *assignment {
                Assignment::Add(column, amount) => {
                    params.push(Some(amount));
                    let name = self.columns.name(column);
                    format!("{name} = {name} + ?")
                }
                Assignment::Set(column, value) => {
                    params.push(value);
                    format!("{} = ?", self.columns.name(column))
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn row_to_node(row: &rusqlite::Row<'_>) -> Result<Node, rusqlite::Error> {
    Ok(Node {
        id: row.get(0)?,
        left: row.get(1)?,
        right: row.get(2)?,
        level: row.get(3)?,
        scope: row.get(4)?,
        parent_id: row.get(5)?,
    })
}

impl NodeStore for SqliteNodeStore {
    fn read(
        &self,
        filter: &Filter,
        order: &Order,
        limit: Option<usize>,
    ) -> Result<Vec<Node>, TreeError> {
        let mut params = Vec::new();
        let mut sql = format!("SELECT {} FROM {}", self.select_list, self.table);
        sql.push_str(&self.render_filter(filter, &mut params));
        sql.push_str(&self.render_order(order));
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            params.push(limit as i64);
        }
        let mut stmt = self
            .conn
            .prepare_cached(&sql)
            .map_err(|e| TreeError::query(e.to_string()))?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), row_to_node)
            .map_err(|e| TreeError::query(e.to_string()))?;
        let mut nodes = Vec::new();
        for node in rows {
            nodes.push(node.map_err(|e| TreeError::query(e.to_string()))?);
        }
        Ok(nodes)
    }

    fn count(&self, filter: &Filter) -> Result<i64, TreeError> {
        let mut params = Vec::new();
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            self.table,
            self.render_filter(filter, &mut params)
        );
        let mut stmt = self
            .conn
            .prepare_cached(&sql)
            .map_err(|e| TreeError::query(e.to_string()))?;
        stmt.query_row(params_from_iter(params.iter()), |row| row.get(0))
            .map_err(|e| TreeError::query(e.to_string()))
    }

    fn max_scope(&self) -> Result<Option<i64>, TreeError> {
        let sql = format!("SELECT MAX({}) FROM {}", self.columns.scope, self.table);
        let max: Option<Option<i64>> = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .optional()
            .map_err(|e| TreeError::query(e.to_string()))?;
        Ok(max.flatten())
    }

    fn insert(&self, node: &Node) -> Result<i64, TreeError> {
        let c = &self.columns;
        let sql = format!(
            "INSERT INTO {}({}, {}, {}, {}, {}, {}) VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
            self.table, c.primary, c.left, c.right, c.level, c.scope, c.parent
        );
        let mut stmt = self
            .conn
            .prepare_cached(&sql)
            .map_err(|e| TreeError::query(e.to_string()))?;
        stmt.execute(params![
            node.id,
            node.left,
            node.right,
            node.level,
            node.scope,
            node.parent_id,
        ])
        .map_err(|e| TreeError::query(e.to_string()))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, node: &Node) -> Result<(), TreeError> {
        let id = node
            .id
            .ok_or_else(|| TreeError::query("node id must be set for update"))?;
        let c = &self.columns;
        let sql = format!(
            "UPDATE {} SET {}=?1, {}=?2, {}=?3, {}=?4, {}=?5 WHERE {}=?6",
            self.table, c.left, c.right, c.level, c.scope, c.parent, c.primary
        );
        let mut stmt = self
            .conn
            .prepare_cached(&sql)
            .map_err(|e| TreeError::query(e.to_string()))?;
        let affected = stmt
            .execute(params![
                node.left,
                node.right,
                node.level,
                node.scope,
                node.parent_id,
                id,
            ])
            .map_err(|e| TreeError::query(e.to_string()))?;
        if affected == 0 {
            return Err(TreeError::not_found(format!("node {id}")));
        }
        Ok(())
    }

    fn bulk_update(&self, delta: &Delta, filter: &Filter) -> Result<usize, TreeError> {
        if delta.is_empty() {
            return Ok(0);
        }
        let mut params: Vec<Option<i64>> = Vec::new();
        let set_clause = self.render_delta(delta, &mut params);
        let mut filter_params = Vec::new();
        let where_clause = self.render_filter(filter, &mut filter_params);
        params.extend(filter_params.into_iter().map(Some));
        let sql = format!("UPDATE {} SET {set_clause}{where_clause}", self.table);
        let mut stmt = self
            .conn
            .prepare_cached(&sql)
            .map_err(|e| TreeError::query(e.to_string()))?;
        stmt.execute(params_from_iter(params.iter()))
            .map_err(|e| TreeError::query(e.to_string()))
    }

    fn delete(&self, filter: &Filter) -> Result<usize, TreeError> {
        let mut params = Vec::new();
        let sql = format!(
            "DELETE FROM {}{}",
            self.table,
            self.render_filter(filter, &mut params)
        );
        let mut stmt = self
            .conn
            .prepare_cached(&sql)
            .map_err(|e| TreeError::query(e.to_string()))?;
        stmt.execute(params_from_iter(params.iter()))
            .map_err(|e| TreeError::query(e.to_string()))
    }

    fn lock_exclusive(&self) -> Result<(), TreeError> {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| TreeError::transaction(e.to_string()))
    }

    fn unlock(&self, outcome: Outcome) -> Result<(), TreeError> {
        let sql = match outcome {
            Outcome::Commit => "COMMIT",
            Outcome::Rollback => "ROLLBACK",
        };
        self.conn
            .execute_batch(sql)
            .map_err(|e| TreeError::transaction(e.to_string()))
    }

    fn is_transactional(&self) -> bool {
        true
    }
}
