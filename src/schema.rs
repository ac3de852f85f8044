use rusqlite::{Connection, OptionalExtension};

use crate::{config::TreeConfig, errors::TreeError};

pub const BASE_SCHEMA_VERSION: i64 = 1;

struct MigrationStep {
    target_version: i64,
    statements: fn(&TreeConfig) -> Vec<String>,
}

const MIGRATION_STEPS: &[MigrationStep] = &[MigrationStep {
    target_version: 2,
    statements: relationship_indexes,
}];

pub const SCHEMA_VERSION: i64 = BASE_SCHEMA_VERSION + MIGRATION_STEPS.len() as i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: i64,
    pub to_version: i64,
    pub statements: Vec<String>,
    pub dry_run: bool,
}

pub fn ensure_schema(conn: &Connection, cfg: &TreeConfig) -> Result<(), TreeError> {
    ensure_base_schema(conn, cfg)?;
    ensure_meta(conn, cfg)?;
    run_pending_migrations(conn, cfg, false)?;
    Ok(())
}

pub fn ensure_schema_without_migrations(
    conn: &Connection,
    cfg: &TreeConfig,
) -> Result<(), TreeError> {
    ensure_base_schema(conn, cfg)?;
    ensure_meta(conn, cfg)?;
    Ok(())
}

fn ensure_base_schema(conn: &Connection, cfg: &TreeConfig) -> Result<(), TreeError> {
    cfg.validate()?;
    let c = &cfg.columns;
    let table = &cfg.table;
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            {id}     INTEGER PRIMARY KEY AUTOINCREMENT,
            {lft}    INTEGER NOT NULL,
            {rgt}    INTEGER NOT NULL,
            {lvl}    INTEGER NOT NULL,
            {scope}  INTEGER NOT NULL,
            {parent} INTEGER,
            CHECK ({lft} < {rgt})
        );
        CREATE INDEX IF NOT EXISTS idx_{table}_scope_left ON {table}({scope}, {lft});
        CREATE TABLE IF NOT EXISTS {meta} (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL
        );
        "#,
        id = c.primary,
        lft = c.left,
        rgt = c.right,
        lvl = c.level,
        scope = c.scope,
        parent = c.parent,
        meta = cfg.meta_table(),
    ))
    .map_err(|e| TreeError::schema(e.to_string()))
}

fn relationship_indexes(cfg: &TreeConfig) -> Vec<String> {
    let c = &cfg.columns;
    let table = &cfg.table;
    vec![
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_scope_right ON {table}({}, {})",
            c.scope, c.right
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_parent ON {table}({})",
            c.parent
        ),
    ]
}

pub fn read_schema_version(conn: &Connection, cfg: &TreeConfig) -> Result<i64, TreeError> {
    conn.query_row(
        &format!("SELECT schema_version FROM {} WHERE id=1", cfg.meta_table()),
        [],
        |row| row.get(0),
    )
    .map_err(|e| TreeError::schema(e.to_string()))
}

pub fn run_pending_migrations(
    conn: &Connection,
    cfg: &TreeConfig,
    dry_run: bool,
) -> Result<MigrationReport, TreeError> {
    let current = read_schema_version(conn, cfg)?;
    let mut statements: Vec<String> = Vec::new();
    let mut target = current;
    for step in MIGRATION_STEPS {
        if step.target_version > current {
            target = step.target_version;
            statements.extend((step.statements)(cfg));
        }
    }
    if statements.is_empty() || dry_run {
        return Ok(MigrationReport {
            from_version: current,
            to_version: target,
            statements,
            dry_run,
        });
    }
    conn.execute("BEGIN IMMEDIATE", [])
        .map_err(|e| TreeError::schema(e.to_string()))?;
    let result: Result<(), TreeError> = (|| {
        for sql in &statements {
            conn.execute(sql, [])
                .map_err(|e| TreeError::schema(e.to_string()))?;
        }
        conn.execute(
            &format!(
                "UPDATE {} SET schema_version=?1 WHERE id=1",
                cfg.meta_table()
            ),
            [target],
        )
        .map_err(|e| TreeError::schema(e.to_string()))?;
        Ok(())
    })();
    match result {
        Ok(()) => {
            conn.execute("COMMIT", [])
                .map_err(|e| TreeError::schema(e.to_string()))?;
        }
        Err(err) => {
            let _ = conn.execute("ROLLBACK", []);
            return Err(err);
        }
    }
    Ok(MigrationReport {
        from_version: current,
        to_version: target,
        statements,
        dry_run,
    })
}

fn ensure_meta(conn: &Connection, cfg: &TreeConfig) -> Result<(), TreeError> {
    let meta = cfg.meta_table();
    let version: Option<i64> = conn
        .query_row(
            &format!("SELECT schema_version FROM {meta} WHERE id=1"),
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| TreeError::schema(e.to_string()))?;
    match version {
        Some(existing) => {
            if existing > SCHEMA_VERSION {
                return Err(TreeError::schema(format!(
                    "database schema version {existing} is newer than supported {SCHEMA_VERSION}"
                )));
            }
            if existing < BASE_SCHEMA_VERSION {
                conn.execute(
                    &format!("UPDATE {meta} SET schema_version=?1 WHERE id=1"),
                    [BASE_SCHEMA_VERSION],
                )
                .map_err(|e| TreeError::schema(e.to_string()))?;
            }
        }
        None => {
            conn.execute(
                &format!("INSERT INTO {meta}(id, schema_version) VALUES(1, ?1)"),
                [BASE_SCHEMA_VERSION],
            )
            .map_err(|e| TreeError::schema(e.to_string()))?;
        }
    }
    Ok(())
}
