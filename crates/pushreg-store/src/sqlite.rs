/// SqliteStore: durable key-value store backed by a single SQLite table.
///
/// Every entry is scoped by a namespace so several clients (or several
/// sender configurations) can share one database file. A batch is one
/// SQLite transaction.
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::{expect_int, expect_text, KeyValueStore, StoreError, StoredValue, WriteBatch, WriteOp};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS kv_entries (
    namespace  TEXT NOT NULL,
    key        TEXT NOT NULL,
    text_value TEXT,
    int_value  INTEGER,
    PRIMARY KEY (namespace, key)
);
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    namespace: String,
}

impl SqliteStore {
    /// Namespace used when the caller has no preference.
    pub const DEFAULT_NAMESPACE: &'static str = "pushreg";

    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>, namespace: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), namespace, "opened sqlite store");
        Self::with_connection(conn, namespace)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(namespace: &str) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, namespace)
    }

    fn with_connection(conn: Connection, namespace: &str) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            namespace: namespace.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn get(&self, key: &str) -> Result<Option<StoredValue>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT text_value, int_value FROM kv_entries WHERE namespace = ?1 AND key = ?2",
                params![self.namespace, key],
                |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<i64>>(1)?)),
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((Some(text), _)) => Ok(Some(StoredValue::Text(text))),
            Some((None, Some(n))) => Ok(Some(StoredValue::Int(n))),
            Some((None, None)) => Err(StoreError::Corrupt {
                key: key.to_string(),
                reason: "entry has no value".into(),
            }),
        }
    }
}

impl KeyValueStore for SqliteStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.get(key)?.map(|v| expect_text(key, v)).transpose()
    }

    fn get_int(&self, key: &str) -> Result<Option<i64>, StoreError> {
        self.get(key)?.map(|v| expect_int(key, v)).transpose()
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let count = batch.len();
        for op in batch.into_ops() {
            match op {
                WriteOp::PutString { key, value } => {
                    tx.execute(
                        "INSERT INTO kv_entries (namespace, key, text_value, int_value)
                         VALUES (?1, ?2, ?3, NULL)
                         ON CONFLICT(namespace, key)
                         DO UPDATE SET text_value = excluded.text_value, int_value = NULL",
                        params![self.namespace, key, value],
                    )?;
                }
                WriteOp::PutInt { key, value } => {
                    tx.execute(
                        "INSERT INTO kv_entries (namespace, key, text_value, int_value)
                         VALUES (?1, ?2, NULL, ?3)
                         ON CONFLICT(namespace, key)
                         DO UPDATE SET text_value = NULL, int_value = excluded.int_value",
                        params![self.namespace, key, value],
                    )?;
                }
                WriteOp::Remove { key } => {
                    tx.execute(
                        "DELETE FROM kv_entries WHERE namespace = ?1 AND key = ?2",
                        params![self.namespace, key],
                    )?;
                }
            }
        }
        tx.commit()?;
        tracing::trace!(namespace = %self.namespace, count, "committed write batch");
        Ok(())
    }
}
