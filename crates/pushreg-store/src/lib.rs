//! pushreg storage layer.
//!
//! Small key-value abstraction the registration core persists its token
//! through. Reads are per key; writes are grouped into a [`WriteBatch`]
//! and committed all-or-nothing by [`KeyValueStore::apply`].
//!
//! Two backends ship with the crate:
//! - [`MemoryStore`]: process-local, for tests and ephemeral clients.
//! - [`SqliteStore`]: durable, one table shared by any number of namespaces.

mod batch;
mod error;
mod memory;
mod sqlite;

pub use batch::{WriteBatch, WriteOp};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A value as held by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    Text(String),
    Int(i64),
}

impl StoredValue {
    fn kind(&self) -> &'static str {
        match self {
            StoredValue::Text(_) => "a string",
            StoredValue::Int(_) => "an integer",
        }
    }
}

/// Persistent key-value storage with batched, atomic writes.
///
/// Implementations must make `apply` atomic with respect to concurrent
/// reads: a reader sees either none or all of a batch.
pub trait KeyValueStore: Send + Sync {
    /// Read a string value. `Ok(None)` if the key is absent.
    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Read an integer value. `Ok(None)` if the key is absent.
    fn get_int(&self, key: &str) -> Result<Option<i64>, StoreError>;

    /// Commit every operation of `batch`, or none of them.
    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

/// Narrow a stored value to a string, rejecting integers.
pub(crate) fn expect_text(key: &str, value: StoredValue) -> Result<String, StoreError> {
    match value {
        StoredValue::Text(s) => Ok(s),
        other => Err(StoreError::TypeMismatch {
            key: key.to_string(),
            expected: "a string",
            found: other.kind(),
        }),
    }
}

/// Narrow a stored value to an integer, rejecting strings.
pub(crate) fn expect_int(key: &str, value: StoredValue) -> Result<i64, StoreError> {
    match value {
        StoredValue::Int(n) => Ok(n),
        other => Err(StoreError::TypeMismatch {
            key: key.to_string(),
            expected: "an integer",
            found: other.kind(),
        }),
    }
}
