/// A single write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    PutString { key: String, value: String },
    PutInt { key: String, value: i64 },
    Remove { key: String },
}

impl WriteOp {
    /// Key touched by this operation.
    pub fn key(&self) -> &str {
        match self {
            WriteOp::PutString { key, .. } | WriteOp::PutInt { key, .. } | WriteOp::Remove { key } => {
                key
            }
        }
    }
}

/// Ordered group of writes committed together.
///
/// ```rust
/// use pushreg_store::WriteBatch;
///
/// let batch = WriteBatch::new()
///     .put_string("registration_token", "abc")
///     .put_int("app_version", 7);
/// assert_eq!(batch.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a string write.
    pub fn put_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push(WriteOp::PutString {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Queue an integer write.
    pub fn put_int(mut self, key: impl Into<String>, value: i64) -> Self {
        self.ops.push(WriteOp::PutInt {
            key: key.into(),
            value,
        });
        self
    }

    /// Queue a removal. Removing an absent key is not an error.
    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.ops.push(WriteOp::Remove { key: key.into() });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}
