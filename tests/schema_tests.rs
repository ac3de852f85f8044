use rusqlite::Connection;
use sqlitetree::{
    ColumnConfig, Node, SqliteNodeStore, TreeConfig, TreeError, open_tree_in_memory,
    schema::{SCHEMA_VERSION, ensure_schema, read_schema_version, run_pending_migrations},
};

#[test]
fn test_schema_creates_tree_and_meta_tables() {
    let conn = Connection::open_in_memory().unwrap();
    let cfg = TreeConfig::default();
    ensure_schema(&conn, &cfg).unwrap();
    assert!(object_exists(&conn, "nested_set"));
    assert!(object_exists(&conn, "nested_set_meta"));
    assert!(object_exists(&conn, "idx_nested_set_scope_left"));
    assert!(object_exists(&conn, "idx_nested_set_parent"));
    assert_eq!(read_schema_version(&conn, &cfg).unwrap(), SCHEMA_VERSION);
}

#[test]
fn test_schema_is_idempotent() {
    let conn = Connection::open_in_memory().unwrap();
    let cfg = TreeConfig::default();
    ensure_schema(&conn, &cfg).unwrap();
    ensure_schema(&conn, &cfg).unwrap();
    let report = run_pending_migrations(&conn, &cfg, false).unwrap();
    assert!(report.statements.is_empty());
    assert_eq!(report.from_version, SCHEMA_VERSION);
}

#[test]
fn test_migrations_from_base_version() {
    let mut cfg = TreeConfig::default();
    cfg.sqlite.without_migrations = true;
    let store = SqliteNodeStore::open_in_memory(&cfg).unwrap();
    let conn = store.connection();
    assert_eq!(read_schema_version(conn, &cfg).unwrap(), 1);
    assert!(!object_exists(conn, "idx_nested_set_parent"));

    let dry = run_pending_migrations(conn, &cfg, true).unwrap();
    assert!(dry.dry_run);
    assert_eq!(dry.to_version, SCHEMA_VERSION);
    assert!(!dry.statements.is_empty());
    assert_eq!(read_schema_version(conn, &cfg).unwrap(), 1);

    run_pending_migrations(conn, &cfg, false).unwrap();
    assert_eq!(read_schema_version(conn, &cfg).unwrap(), SCHEMA_VERSION);
    assert!(object_exists(conn, "idx_nested_set_parent"));
}

#[test]
fn test_newer_schema_version_rejected() {
    let conn = Connection::open_in_memory().unwrap();
    let cfg = TreeConfig::default();
    ensure_schema(&conn, &cfg).unwrap();
    conn.execute(
        "UPDATE nested_set_meta SET schema_version = ?1 WHERE id = 1",
        [SCHEMA_VERSION + 1],
    )
    .unwrap();
    let err = ensure_schema(&conn, &cfg).unwrap_err();
    assert!(matches!(err, TreeError::SchemaError(_)));
    assert!(err.to_string().contains("newer than supported"));
}

#[test]
fn test_interval_check_constraint() {
    let conn = Connection::open_in_memory().unwrap();
    ensure_schema(&conn, &TreeConfig::default()).unwrap();
    let err = conn.execute(
        "INSERT INTO nested_set (lft, rgt, lvl, scope) VALUES (4, 4, 1, 1)",
        [],
    );
    assert!(err.is_err());
}

#[test]
fn test_custom_table_and_columns() {
    let cfg = TreeConfig {
        table: "categories".into(),
        columns: ColumnConfig {
            primary: "category_id".into(),
            left: "lo".into(),
            right: "hi".into(),
            level: "depth".into(),
            scope: "tree".into(),
            parent: "parent".into(),
        },
        ..TreeConfig::default()
    };
    let tree = open_tree_in_memory(&cfg).unwrap();
    let mut root = Node::new();
    tree.make_root(&mut root, None).unwrap();
    let mut child = Node::new();
    tree.insert_as_last_child(&mut child, &root).unwrap();

    let conn = tree.store().connection();
    assert!(object_exists(conn, "categories_meta"));
    let (lo, hi, depth, parent): (i64, i64, i64, i64) = conn
        .query_row(
            "SELECT lo, hi, depth, parent FROM categories WHERE category_id = ?1",
            [child.id.unwrap()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .unwrap();
    assert_eq!((lo, hi, depth, Some(parent)), (2, 3, 2, root.id));
}

#[test]
fn test_invalid_config_rejected_before_open() {
    let cfg = TreeConfig::with_table("bad name");
    assert!(matches!(
        open_tree_in_memory(&cfg),
        Err(TreeError::ConfigError(_))
    ));
}

fn object_exists(conn: &Connection, name: &str) -> bool {
    conn.prepare("SELECT name FROM sqlite_master WHERE name=?1")
        .unwrap()
        .exists([name])
        .unwrap()
}
