use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{ToSql, Value as SqlValue, ValueRef};
use rusqlite::{params, Connection};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::graph::entity::Node;
use crate::graph::relationship::Edge;

/// Database schema version - increment when schema changes
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// One result row: column name -> value
pub type Record = Map<String, Value>;

/// Named query parameters, bound as `:name`
pub type Params = BTreeMap<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Graph store unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),
}

impl From<r2d2::Error> for StoreError {
    fn from(e: r2d2::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Query(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Query(format!("Invalid JSON value: {}", e))
    }
}

/// Executes parameterized, read-only structured queries against the graph
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn query(&self, statement: &str, params: &Params) -> Result<Vec<Record>, StoreError>;
}

/// Connection target for the graph store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// `sqlite://path/to/file.db`, a bare path, or `:memory:`
    pub uri: String,
    pub pool_size: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "graphsemantics.db".to_string(),
            pool_size: 4,
        }
    }
}

impl StoreConfig {
    pub fn new(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            ..Default::default()
        }
    }

    /// Filesystem path (or `:memory:`) the uri points at
    pub fn database_path(&self) -> &str {
        let uri = self.uri.trim();
        uri.strip_prefix("sqlite://")
            .or_else(|| uri.strip_prefix("sqlite:"))
            .unwrap_or(uri)
    }
}

/// Property graph persisted in SQLite behind a connection pool
///
/// The pool is acquired once in [`SqliteGraphStore::connect`] and shared by
/// every tool; it is released when the last handle is dropped.
#[derive(Clone)]
pub struct SqliteGraphStore {
    pool: Pool<SqliteConnectionManager>,
    uri: String,
}

impl std::fmt::Debug for SqliteGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteGraphStore")
            .field("pool", &"SQLite Pool")
            .field("uri", &self.uri)
            .finish()
    }
}

impl SqliteGraphStore {
    /// Open the pool, verify it is reachable and bring the schema up to date
    pub fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let path = config.database_path();
        let in_memory = path == ":memory:";

        if !in_memory {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() && !parent.is_dir() {
                    return Err(StoreError::Unavailable(format!(
                        "Directory '{}' does not exist",
                        parent.display()
                    )));
                }
            }
        }

        let manager = if in_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path)
        };
        let manager = manager.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

        let mut builder = Pool::builder().connection_timeout(Duration::from_secs(5));
        builder = if in_memory {
            // Every in-memory connection is its own database: keep exactly one alive
            builder.max_size(1).max_lifetime(None).idle_timeout(None)
        } else {
            builder.max_size(config.pool_size.max(1))
        };

        let pool = builder
            .build(manager)
            .map_err(|e| {
                StoreError::Unavailable(format!("Failed to open graph store at '{}': {}", path, e))
            })?;

        let store = Self {
            pool,
            uri: config.uri.clone(),
        };
        store.initialize_schema()?;

        info!("Connected to graph store at {}", path);
        Ok(store)
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Initialize the database schema if needed
    fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self.pool.get()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )?;
        conn.execute(
            "INSERT INTO schema_version (version)
             SELECT 0 WHERE NOT EXISTS (SELECT 1 FROM schema_version)",
            [],
        )?;

        apply_migrations(&conn)
    }

    /// Insert or update a single node
    pub fn save_node(&self, node: &Node) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        upsert_node(&conn, node)
    }

    /// Insert a single edge; both endpoints must already exist
    pub fn save_edge(&self, edge: &Edge) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        upsert_edge(&conn, edge)
    }

    /// Save nodes then edges atomically
    pub fn save_all_in_transaction(&self, nodes: &[Node], edges: &[Edge]) -> Result<(), StoreError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        for node in nodes {
            upsert_node(&tx, node)?;
        }
        for edge in edges {
            upsert_edge(&tx, edge)?;
        }

        tx.commit()?;
        debug!("Saved {} nodes and {} edges", nodes.len(), edges.len());
        Ok(())
    }

    /// Number of nodes and edges currently stored
    pub fn counts(&self) -> Result<(usize, usize), StoreError> {
        let conn = self.pool.get()?;
        let nodes: i64 = conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        let edges: i64 = conn.query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        Ok((nodes as usize, edges as usize))
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn query(&self, statement: &str, params: &Params) -> Result<Vec<Record>, StoreError> {
        let pool = self.pool.clone();
        let statement = statement.to_string();
        let params = params.clone();

        tokio::task::spawn_blocking(move || run_query(&pool, &statement, &params))
            .await
            .map_err(|e| StoreError::Unavailable(format!("Query task failed: {}", e)))?
    }
}

/// Apply schema migrations as needed
fn apply_migrations(conn: &Connection) -> Result<(), StoreError> {
    let version: i32 =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;

    if version < 1 {
        conn.execute_batch(
            "CREATE TABLE nodes (
                id TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                name TEXT NOT NULL,
                properties TEXT NOT NULL DEFAULT '{}'
            );

            CREATE TABLE edges (
                id TEXT PRIMARY KEY,
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                relationship_type TEXT NOT NULL,
                FOREIGN KEY(source_id) REFERENCES nodes(id),
                FOREIGN KEY(target_id) REFERENCES nodes(id)
            );

            CREATE INDEX idx_node_name ON nodes(name COLLATE NOCASE);
            CREATE INDEX idx_node_label ON nodes(label);

            CREATE INDEX idx_edge_source ON edges(source_id);
            CREATE INDEX idx_edge_target ON edges(target_id);
            CREATE INDEX idx_edge_type ON edges(relationship_type);",
        )?;

        conn.execute(
            "UPDATE schema_version SET version = ?",
            params![CURRENT_SCHEMA_VERSION],
        )?;
    }

    Ok(())
}

fn upsert_node(conn: &Connection, node: &Node) -> Result<(), StoreError> {
    let properties = serde_json::to_string(&node.properties)?;
    conn.execute(
        "INSERT INTO nodes (id, label, name, properties) VALUES (?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            label = excluded.label,
            name = excluded.name,
            properties = excluded.properties",
        params![node.id.as_str(), node.label, node.name, properties],
    )?;
    Ok(())
}

fn upsert_edge(conn: &Connection, edge: &Edge) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR REPLACE INTO edges (id, source_id, target_id, relationship_type)
         VALUES (?, ?, ?, ?)",
        params![
            edge.id.as_str(),
            edge.source_id.as_str(),
            edge.target_id.as_str(),
            edge.relationship_type,
        ],
    )?;
    Ok(())
}

fn run_query(
    pool: &Pool<SqliteConnectionManager>,
    statement: &str,
    params: &Params,
) -> Result<Vec<Record>, StoreError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(statement)?;

    if !stmt.readonly() {
        return Err(StoreError::Query(
            "Only read-only statements can be executed".to_string(),
        ));
    }

    let bound: Vec<(String, SqlValue)> = params
        .iter()
        .map(|(name, value)| (format!(":{}", name), json_to_sql(value)))
        .collect();
    let named: Vec<(&str, &dyn ToSql)> = bound
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect();

    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();

    let mut rows = stmt.query(named.as_slice())?;
    let mut records = Vec::new();

    while let Some(row) = rows.next()? {
        let mut record = Record::new();
        for (idx, column) in columns.iter().enumerate() {
            record.insert(column.clone(), sql_to_json(row.get_ref(idx)?));
        }
        records.push(record);
    }

    debug!("Query returned {} records", records.len());
    Ok(records)
}

fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) | ValueRef::Blob(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    }
}
