use async_trait::async_trait;
use thiserror::Error;

use crate::{collection::Collection, models::Record};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("timestamp error: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("unknown collection: {0}")]
    UnknownCollection(String),
    #[error("directory access denied")]
    AccessDenied,
    #[error("duplicate key in {collection}: {key}")]
    DuplicateKey { collection: Collection, key: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("{0}")]
    Other(String),
}

/// CRUD contract shared by every record backend.
///
/// Keys are the effective keys declared by the backend's `KeyMap`. Missing
/// keys are not errors: `get` yields `None`, `put` and `delete` do nothing.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Acquires whatever the backend needs before first use.
    async fn init(&self) -> Result<(), StoreError>;

    /// Stores a new record and returns its effective key.
    async fn add(&self, collection: Collection, record: Record) -> Result<Option<String>, StoreError>;

    /// Replaces the record with the same effective key. Never creates.
    async fn put(&self, collection: Collection, record: Record) -> Result<Option<String>, StoreError>;

    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Record>, StoreError>;
    async fn get_all(&self, collection: Collection) -> Result<Vec<Record>, StoreError>;
    async fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError>;
    async fn count(&self, collection: Collection) -> Result<usize, StoreError>;
}
