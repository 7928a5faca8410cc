use async_trait::async_trait;
use records_core::cursor::Cursor;
use records_core::record::{Attributes, Record};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    AlreadyExists,

    /// The write would produce an item the store cannot hold, such as a
    /// merge that grows past the size limit. Caused by the caller's data.
    #[error("{0}")]
    Invalid(String),

    /// Transient failure; the only variant that is retried.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store rejected request: {0}")]
    Rejected(String),

    #[error("stored item is corrupt: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    pub next_cursor: Option<Cursor>,
}

/// Narrow client over a single partitioned key-value table.
///
/// Implementations must be safe to share across concurrent invocations and
/// must not cache records in memory.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Record, StoreError>;

    /// Unconditional upsert.
    async fn put(&self, record: Record) -> Result<Record, StoreError>;

    /// Writes a record whose id must not exist yet.
    async fn insert(&self, record: Record) -> Result<Record, StoreError>;

    /// Replaces the attributes of an existing record.
    async fn replace(&self, record: Record) -> Result<Record, StoreError>;

    /// Sets non-null patch values and removes null ones on an existing record.
    async fn merge(&self, id: &str, patch: Attributes) -> Result<Record, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Returns up to `limit` records after `cursor`, in no particular order.
    async fn list(&self, limit: usize, cursor: Option<&Cursor>) -> Result<Page, StoreError>;
}
