//! SQLite implementation of the Jotter key-value storage trait.

use jotter_core::{
    get_pending_migrations, validate_namespace, Error, KeyValueStorage, META_TABLE,
    SCHEMA_VERSION,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed storage. Rows are keyed by `(namespace, key)`.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    namespace: String,
}

impl SqliteStorage {
    /// Open a database at the given path and run any pending migrations.
    pub fn open<P: AsRef<Path>>(path: P, namespace: &str) -> Result<Self, Error> {
        validate_namespace(namespace)?;
        let conn = Connection::open(path).map_err(|e| Error::Storage(e.to_string()))?;
        Self::with_connection(conn, namespace)
    }

    /// Open an in-memory database and run migrations.
    pub fn open_in_memory(namespace: &str) -> Result<Self, Error> {
        validate_namespace(namespace)?;
        let conn = Connection::open_in_memory().map_err(|e| Error::Storage(e.to_string()))?;
        Self::with_connection(conn, namespace)
    }

    fn with_connection(conn: Connection, namespace: &str) -> Result<Self, Error> {
        let storage = Self {
            conn: Mutex::new(conn),
            namespace: namespace.to_string(),
        };
        storage.run_migrations()?;
        Ok(storage)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("connection lock poisoned".into()))
    }

    /// Bring the schema up to [`SCHEMA_VERSION`] in one transaction.
    fn run_migrations(&self) -> Result<(), Error> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::Storage(e.to_string()))?;

        tx.execute(META_TABLE, [])
            .map_err(|e| Error::Storage(e.to_string()))?;

        let current_version = match tx
            .query_row(
                "SELECT value FROM _jotter_meta WHERE key = 'schema_version'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| Error::Storage(format!("Failed to read schema version: {}", e)))?
        {
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                Error::CorruptState(format!("invalid schema version {:?}", raw))
            })?,
            None => 0,
        };

        let pending = get_pending_migrations(current_version);
        if pending.is_empty() {
            return Ok(());
        }

        for migration in pending {
            log::info!("Applying migration {} ({})", migration.version, migration.name);
            for statement in migration.statements {
                tx.execute(statement, []).map_err(|e| {
                    Error::Storage(format!("Migration {} failed: {}", migration.name, e))
                })?;
            }
        }

        tx.execute(
            "INSERT OR REPLACE INTO _jotter_meta (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )
        .map_err(|e| Error::Storage(e.to_string()))?;
        tx.commit().map_err(|e| Error::Storage(e.to_string()))
    }
}

#[async_trait::async_trait(?Send)]
impl KeyValueStorage for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT value FROM kv WHERE namespace = ?1 AND key = ?2",
            params![self.namespace, key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| Error::Storage(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let conn = self.conn().map_err(|e| Error::Persistence(e.to_string()))?;
        conn.execute(
            "INSERT INTO kv (namespace, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(namespace, key)
             DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
            params![self.namespace, key, value],
        )
        .map_err(|e| Error::Persistence(e.to_string()))?;
        log::debug!("Stored {}/{} ({} bytes)", self.namespace, key, value.len());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        let conn = self.conn().map_err(|e| Error::Persistence(e.to_string()))?;
        let removed = conn
            .execute(
                "DELETE FROM kv WHERE namespace = ?1 AND key = ?2",
                params![self.namespace, key],
            )
            .map_err(|e| Error::Persistence(e.to_string()))?;
        log::debug!("Removed {}/{} ({} rows)", self.namespace, key, removed);
        Ok(())
    }
}
