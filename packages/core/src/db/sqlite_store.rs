//! SqliteStore - NodeStore Implementation for libsql
//!
//! Persists nodes and blobs in an embedded libsql (SQLite-compatible) database.
//!
//! # Schema
//!
//! - `nodes`: one row per node; the kind tag and type name act as the
//!   discriminator, content columns are NULL for bare nodes and per-type
//!   fields live in the `properties` JSON column
//! - `blobs`: binary attachments with their metadata
//!
//! `uri` is unique in both tables, `path` is indexed for prefix lookups and
//! `(parent_uri, name)` is unique so two siblings can never share a name.
//!
//! # Examples
//!
//! ```rust,no_run
//! use ptahcms_core::db::{NodeStore, SqliteStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store: Arc<dyn NodeStore> = Arc::new(SqliteStore::open("./data/cms.db").await?);
//!     let node = store.get_node("type-page:0f3c").await?;
//!     Ok(())
//! }
//! ```

use crate::db::{DatabaseError, NodeStore};
use crate::models::{Blob, ContentFields, LocalRoles, Node, NodeKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Builder, Connection, Database, Row, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

const NODE_COLUMNS: &str = "id, uri, type_name, kind, root_path, parent_uri, owner, acls, \
     local_roles, is_content, name, path, title, description, public, created, modified, \
     effective, expires, lang, properties";

const BLOB_COLUMNS: &str = "id, uri, parent_uri, mimetype, filename, size, data, created, modified";

/// `NodeStore` backed by an embedded libsql database
///
/// All statements go through one connection guarded by a mutex, which keeps
/// in-memory databases coherent and serializes batch transactions.
pub struct SqliteStore {
    _db: Database,
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) a database file and initialize the schema
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let db_path = path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;
        let conn = db.connect()?;

        let store = Self {
            _db: db,
            conn: Mutex::new(conn),
            db_path,
        };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Open a private in-memory database
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::open(":memory:").await
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// PRAGMA statements return rows, so they go through `query()`
    async fn execute_pragma(conn: &Connection, pragma: &str) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().await;

        Self::execute_pragma(&conn, "PRAGMA busy_timeout = 5000").await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uri TEXT NOT NULL UNIQUE,
                type_name TEXT NOT NULL,
                kind TEXT NOT NULL,
                root_path TEXT,
                parent_uri TEXT,
                owner TEXT,
                acls TEXT NOT NULL DEFAULT '[]',
                local_roles TEXT NOT NULL DEFAULT '{}',
                is_content INTEGER NOT NULL DEFAULT 0,
                name TEXT,
                path TEXT,
                title TEXT,
                description TEXT,
                public INTEGER,
                created TEXT,
                modified TEXT,
                effective TEXT,
                expires TEXT,
                lang TEXT,
                properties TEXT NOT NULL DEFAULT '{}'
            )",
            (),
        )
        .await
        .map_err(|e| DatabaseError::initialization_failed(format!("nodes table: {}", e)))?;

        let indexes = [
            "CREATE INDEX IF NOT EXISTS idx_nodes_path ON nodes(path)",
            "CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_uri)",
            "CREATE INDEX IF NOT EXISTS idx_nodes_type ON nodes(type_name)",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_parent_name ON nodes(parent_uri, name)",
        ];
        for sql in indexes {
            conn.execute(sql, ())
                .await
                .map_err(|e| DatabaseError::initialization_failed(format!("{}: {}", sql, e)))?;
        }

        conn.execute(
            "CREATE TABLE IF NOT EXISTS blobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uri TEXT NOT NULL UNIQUE,
                parent_uri TEXT,
                mimetype TEXT NOT NULL DEFAULT '',
                filename TEXT NOT NULL DEFAULT '',
                size INTEGER NOT NULL DEFAULT 0,
                data BLOB,
                created TEXT NOT NULL,
                modified TEXT NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| DatabaseError::initialization_failed(format!("blobs table: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_blobs_parent ON blobs(parent_uri)",
            (),
        )
        .await
        .map_err(|e| DatabaseError::initialization_failed(format!("blobs index: {}", e)))?;

        debug!(path = %self.db_path.display(), "Schema initialized");
        Ok(())
    }

    async fn query_nodes(
        conn: &Connection,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<Vec<Node>, DatabaseError> {
        let mut stmt = conn.prepare(sql).await?;
        let mut rows = stmt.query(params).await?;
        let mut nodes = Vec::new();
        while let Some(row) = rows.next().await? {
            nodes.push(row_to_node(&row)?);
        }
        Ok(nodes)
    }

    async fn query_blobs(
        conn: &Connection,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<Vec<Blob>, DatabaseError> {
        let mut stmt = conn.prepare(sql).await?;
        let mut rows = stmt.query(params).await?;
        let mut blobs = Vec::new();
        while let Some(row) = rows.next().await? {
            blobs.push(row_to_blob(&row)?);
        }
        Ok(blobs)
    }

    async fn write_node(conn: &Connection, node: &Node) -> Result<u64, DatabaseError> {
        let mut params = node_values(node)?;
        params.push(Value::Text(node.uri.clone()));
        conn.execute(
            "UPDATE nodes SET type_name = ?1, kind = ?2, root_path = ?3, parent_uri = ?4,
                owner = ?5, acls = ?6, local_roles = ?7, is_content = ?8, name = ?9,
                path = ?10, title = ?11, description = ?12, public = ?13, created = ?14,
                modified = ?15, effective = ?16, expires = ?17, lang = ?18, properties = ?19
             WHERE uri = ?20",
            params,
        )
        .await
        .map_err(|e| map_write_error(e, node))
    }

    async fn apply_batch(conn: &Connection, nodes: &[Node]) -> Result<(), DatabaseError> {
        // clear names first so a batch may permute sibling names
        for node in nodes {
            conn.execute(
                "UPDATE nodes SET name = NULL WHERE uri = ?1",
                vec![Value::Text(node.uri.clone())],
            )
            .await?;
        }
        for node in nodes {
            if Self::write_node(conn, node).await? == 0 {
                return Err(DatabaseError::record_not_found(&node.uri));
            }
        }
        Ok(())
    }

    async fn delete_batch(conn: &Connection, uris: &[String]) -> Result<usize, DatabaseError> {
        let mut removed = 0;
        for uri in uris {
            let affected = conn
                .execute(
                    "DELETE FROM nodes WHERE uri = ?1",
                    vec![Value::Text(uri.clone())],
                )
                .await?;
            removed += affected as usize;
        }
        Ok(removed)
    }
}

#[async_trait]
impl NodeStore for SqliteStore {
    async fn insert_node(&self, mut node: Node) -> Result<Node, DatabaseError> {
        let conn = self.conn.lock().await;
        let mut params = vec![Value::Text(node.uri.clone())];
        params.extend(node_values(&node)?);

        conn.execute(
            "INSERT INTO nodes (uri, type_name, kind, root_path, parent_uri, owner, acls,
                local_roles, is_content, name, path, title, description, public, created,
                modified, effective, expires, lang, properties)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20)",
            params,
        )
        .await
        .map_err(|e| map_write_error(e, &node))?;

        node.id = Some(conn.last_insert_rowid());
        Ok(node)
    }

    async fn get_node(&self, uri: &str) -> Result<Option<Node>, DatabaseError> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {NODE_COLUMNS} FROM nodes WHERE uri = ?1");
        let nodes = Self::query_nodes(&conn, &sql, vec![Value::Text(uri.to_string())]).await?;
        Ok(nodes.into_iter().next())
    }

    async fn update_node(&self, node: &Node) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().await;
        if Self::write_node(&conn, node).await? == 0 {
            return Err(DatabaseError::record_not_found(&node.uri));
        }
        Ok(())
    }

    async fn update_nodes(&self, nodes: &[Node]) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().await;
        conn.execute("BEGIN", ()).await?;
        match Self::apply_batch(&conn, nodes).await {
            Ok(()) => {
                conn.execute("COMMIT", ()).await?;
                Ok(())
            }
            Err(err) => {
                conn.execute("ROLLBACK", ()).await?;
                Err(err)
            }
        }
    }

    async fn delete_node(&self, uri: &str) -> Result<bool, DatabaseError> {
        let conn = self.conn.lock().await;
        let affected = conn
            .execute(
                "DELETE FROM nodes WHERE uri = ?1",
                vec![Value::Text(uri.to_string())],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn delete_nodes(&self, uris: &[String]) -> Result<usize, DatabaseError> {
        let conn = self.conn.lock().await;
        conn.execute("BEGIN", ()).await?;
        match Self::delete_batch(&conn, uris).await {
            Ok(removed) => {
                conn.execute("COMMIT", ()).await?;
                debug!("Deleted {} nodes in one transaction", removed);
                Ok(removed)
            }
            Err(err) => {
                conn.execute("ROLLBACK", ()).await?;
                Err(err)
            }
        }
    }

    async fn child_names(&self, parent_uri: &str) -> Result<Vec<String>, DatabaseError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT name FROM nodes WHERE parent_uri = ?1 ORDER BY id")
            .await?;
        let mut rows = stmt.query(vec![Value::Text(parent_uri.to_string())]).await?;
        let mut names = Vec::new();
        while let Some(row) = rows.next().await? {
            let name: Option<String> = row.get(0)?;
            names.push(name.unwrap_or_default());
        }
        Ok(names)
    }

    async fn children(&self, parent_uri: &str) -> Result<Vec<Node>, DatabaseError> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {NODE_COLUMNS} FROM nodes WHERE parent_uri = ?1 ORDER BY id");
        Self::query_nodes(&conn, &sql, vec![Value::Text(parent_uri.to_string())]).await
    }

    async fn child(&self, parent_uri: &str, name: &str) -> Result<Option<Node>, DatabaseError> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM nodes WHERE parent_uri = ?1 AND name = ?2 AND is_content = 1"
        );
        let nodes = Self::query_nodes(
            &conn,
            &sql,
            vec![
                Value::Text(parent_uri.to_string()),
                Value::Text(name.to_string()),
            ],
        )
        .await?;
        Ok(nodes.into_iter().next())
    }

    async fn find_root(&self, type_name: &str, name: &str) -> Result<Option<Node>, DatabaseError> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM nodes
             WHERE parent_uri IS NULL AND type_name = ?1 AND name = ?2
             ORDER BY id LIMIT 1"
        );
        let nodes = Self::query_nodes(
            &conn,
            &sql,
            vec![
                Value::Text(type_name.to_string()),
                Value::Text(name.to_string()),
            ],
        )
        .await?;
        Ok(nodes.into_iter().next())
    }

    async fn nodes_by_type(
        &self,
        type_name: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Node>, DatabaseError> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM nodes WHERE type_name = ?1 ORDER BY id LIMIT ?2 OFFSET ?3"
        );
        Self::query_nodes(
            &conn,
            &sql,
            vec![
                Value::Text(type_name.to_string()),
                Value::Integer(limit as i64),
                Value::Integer(offset as i64),
            ],
        )
        .await
    }

    async fn count_by_type(&self, type_name: &str) -> Result<usize, DatabaseError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT COUNT(*) FROM nodes WHERE type_name = ?1")
            .await?;
        let mut rows = stmt.query(vec![Value::Text(type_name.to_string())]).await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(count as usize)
    }

    async fn insert_blob(&self, mut blob: Blob) -> Result<Blob, DatabaseError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO blobs (uri, parent_uri, mimetype, filename, size, data, created, modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            vec![
                Value::Text(blob.uri.clone()),
                opt_text(blob.parent_uri.as_deref()),
                Value::Text(blob.mimetype.clone()),
                Value::Text(blob.filename.clone()),
                Value::Integer(blob.size as i64),
                blob.data.clone().map(Value::Blob).unwrap_or(Value::Null),
                Value::Text(blob.created.to_rfc3339()),
                Value::Text(blob.modified.to_rfc3339()),
            ],
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DatabaseError::duplicate_uri(&blob.uri)
            } else {
                DatabaseError::LibsqlError(e)
            }
        })?;

        blob.id = Some(conn.last_insert_rowid());
        Ok(blob)
    }

    async fn get_blob(&self, uri: &str) -> Result<Option<Blob>, DatabaseError> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {BLOB_COLUMNS} FROM blobs WHERE uri = ?1");
        let blobs = Self::query_blobs(&conn, &sql, vec![Value::Text(uri.to_string())]).await?;
        Ok(blobs.into_iter().next())
    }

    async fn update_blob(&self, blob: &Blob) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().await;
        let affected = conn
            .execute(
                "UPDATE blobs SET parent_uri = ?1, mimetype = ?2, filename = ?3, size = ?4,
                    data = ?5, modified = ?6
                 WHERE uri = ?7",
                vec![
                    opt_text(blob.parent_uri.as_deref()),
                    Value::Text(blob.mimetype.clone()),
                    Value::Text(blob.filename.clone()),
                    Value::Integer(blob.size as i64),
                    blob.data.clone().map(Value::Blob).unwrap_or(Value::Null),
                    Value::Text(blob.modified.to_rfc3339()),
                    Value::Text(blob.uri.clone()),
                ],
            )
            .await?;
        if affected == 0 {
            return Err(DatabaseError::record_not_found(&blob.uri));
        }
        Ok(())
    }

    async fn delete_blob(&self, uri: &str) -> Result<bool, DatabaseError> {
        let conn = self.conn.lock().await;
        let affected = conn
            .execute(
                "DELETE FROM blobs WHERE uri = ?1",
                vec![Value::Text(uri.to_string())],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn get_blob_by_parent(&self, parent_uri: &str) -> Result<Option<Blob>, DatabaseError> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {BLOB_COLUMNS} FROM blobs WHERE parent_uri = ?1 ORDER BY id LIMIT 1");
        let blobs =
            Self::query_blobs(&conn, &sql, vec![Value::Text(parent_uri.to_string())]).await?;
        Ok(blobs.into_iter().next())
    }
}

fn opt_text(value: Option<&str>) -> Value {
    value
        .map(|s| Value::Text(s.to_string()))
        .unwrap_or(Value::Null)
}

fn opt_time(value: Option<DateTime<Utc>>) -> Value {
    value
        .map(|dt| Value::Text(dt.to_rfc3339()))
        .unwrap_or(Value::Null)
}

/// Column values of a node in `NODE_COLUMNS` order, minus `id` and `uri`
fn node_values(node: &Node) -> Result<Vec<Value>, DatabaseError> {
    let content = node.content.as_ref();
    Ok(vec![
        Value::Text(node.type_name.clone()),
        Value::Text(node.kind.label().to_string()),
        opt_text(node.root_path()),
        opt_text(node.parent_uri.as_deref()),
        opt_text(node.owner.as_deref()),
        Value::Text(serde_json::to_string(&node.acls)?),
        Value::Text(serde_json::to_string(&node.local_roles)?),
        Value::Integer(i64::from(content.is_some())),
        opt_text(content.map(|c| c.name.as_str())),
        opt_text(content.map(|c| c.path.as_str())),
        opt_text(content.map(|c| c.title.as_str())),
        opt_text(content.map(|c| c.description.as_str())),
        content
            .map(|c| Value::Integer(i64::from(c.public)))
            .unwrap_or(Value::Null),
        opt_time(content.and_then(|c| c.created)),
        opt_time(content.and_then(|c| c.modified)),
        opt_time(content.and_then(|c| c.effective)),
        opt_time(content.and_then(|c| c.expires)),
        opt_text(content.map(|c| c.lang.as_str())),
        Value::Text(serde_json::to_string(&node.properties)?),
    ])
}

fn parse_time(value: Option<String>) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    match value {
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| DatabaseError::serialization(format!("timestamp '{}': {}", s, e))),
        None => Ok(None),
    }
}

fn row_to_node(row: &Row) -> Result<Node, DatabaseError> {
    let id: i64 = row.get(0)?;
    let uri: String = row.get(1)?;
    let type_name: String = row.get(2)?;
    let kind_label: String = row.get(3)?;
    let root_path: Option<String> = row.get(4)?;
    let parent_uri: Option<String> = row.get(5)?;
    let owner: Option<String> = row.get(6)?;
    let acls: String = row.get(7)?;
    let local_roles: String = row.get(8)?;
    let is_content: i64 = row.get(9)?;
    let properties: String = row.get(20)?;

    let kind = match kind_label.as_str() {
        "node" => NodeKind::Node,
        "content" => NodeKind::Content,
        "container" => NodeKind::Container,
        "application_root" => NodeKind::ApplicationRoot {
            root_path: root_path.unwrap_or_else(|| "/".to_string()),
        },
        other => {
            return Err(DatabaseError::serialization(format!(
                "unknown node kind '{}' for {}",
                other, uri
            )))
        }
    };

    let content = if is_content != 0 {
        let public: Option<i64> = row.get(14)?;
        Some(ContentFields {
            name: row.get::<Option<String>>(10)?.unwrap_or_default(),
            path: row.get::<Option<String>>(11)?.unwrap_or_default(),
            title: row.get::<Option<String>>(12)?.unwrap_or_default(),
            description: row.get::<Option<String>>(13)?.unwrap_or_default(),
            public: public.unwrap_or(0) != 0,
            created: parse_time(row.get(15)?)?,
            modified: parse_time(row.get(16)?)?,
            effective: parse_time(row.get(17)?)?,
            expires: parse_time(row.get(18)?)?,
            lang: row
                .get::<Option<String>>(19)?
                .unwrap_or_else(|| "en".to_string()),
        })
    } else {
        None
    };

    let acls: Vec<String> = serde_json::from_str(&acls)?;
    let local_roles: LocalRoles = serde_json::from_str(&local_roles)?;

    Ok(Node {
        id: Some(id),
        uri,
        type_name,
        kind,
        parent_uri,
        owner,
        acls,
        local_roles,
        content,
        properties: serde_json::from_str(&properties)?,
    })
}

fn row_to_blob(row: &Row) -> Result<Blob, DatabaseError> {
    let size: i64 = row.get(5)?;
    let created: String = row.get(7)?;
    let modified: String = row.get(8)?;
    let now = Utc::now();

    Ok(Blob {
        id: Some(row.get(0)?),
        uri: row.get(1)?,
        parent_uri: row.get(2)?,
        mimetype: row.get(3)?,
        filename: row.get(4)?,
        size: size.max(0) as u64,
        data: row.get(6)?,
        created: parse_time(Some(created))?.unwrap_or(now),
        modified: parse_time(Some(modified))?.unwrap_or(now),
    })
}

fn is_unique_violation(err: &libsql::Error) -> bool {
    err.to_string().contains("UNIQUE constraint failed")
}

fn map_write_error(err: libsql::Error, node: &Node) -> DatabaseError {
    if !is_unique_violation(&err) {
        return DatabaseError::LibsqlError(err);
    }
    if err.to_string().contains("nodes.uri") {
        DatabaseError::duplicate_uri(&node.uri)
    } else {
        DatabaseError::duplicate_name(node.parent_uri.clone().unwrap_or_default(), node.name())
    }
}
