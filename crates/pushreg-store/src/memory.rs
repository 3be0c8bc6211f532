/// MemoryStore: process-local key-value store.
///
/// A whole batch is applied under one lock, so readers never observe a
/// partial commit. Nothing survives the process.
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::{expect_int, expect_text, KeyValueStore, StoreError, StoredValue, WriteBatch, WriteOp};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, StoredValue>>, StoreError> {
        self.entries.lock().map_err(|_| StoreError::Poisoned)
    }

    fn get(&self, key: &str) -> Result<Option<StoredValue>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }
}

impl KeyValueStore for MemoryStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.get(key)?.map(|v| expect_text(key, v)).transpose()
    }

    fn get_int(&self, key: &str) -> Result<Option<i64>, StoreError> {
        self.get(key)?.map(|v| expect_int(key, v)).transpose()
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        for op in batch.into_ops() {
            match op {
                WriteOp::PutString { key, value } => {
                    entries.insert(key, StoredValue::Text(value));
                }
                WriteOp::PutInt { key, value } => {
                    entries.insert(key, StoredValue::Int(value));
                }
                WriteOp::Remove { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}
