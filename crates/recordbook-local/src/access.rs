use std::path::PathBuf;

use async_trait::async_trait;
use recordbook_core::StoreError;

/// Source of the directory a `LocalDirectoryStore` writes into. Refusal is
/// reported as `StoreError::AccessDenied`.
#[async_trait]
pub trait DirectoryAccess: Send + Sync {
    async fn request(&self) -> Result<PathBuf, StoreError>;
}

/// Grants a fixed directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct GrantedDirectory {
    path: PathBuf,
}

impl GrantedDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DirectoryAccess for GrantedDirectory {
    async fn request(&self) -> Result<PathBuf, StoreError> {
        tokio::fs::create_dir_all(&self.path).await?;
        Ok(self.path.clone())
    }
}

/// Always refuses, leaving the store in memory-only mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedDirectory;

#[async_trait]
impl DirectoryAccess for DeniedDirectory {
    async fn request(&self) -> Result<PathBuf, StoreError> {
        Err(StoreError::AccessDenied)
    }
}
