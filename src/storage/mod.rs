// Snapshot persistence - every store writes its whole collection under one key
mod file;
mod memory;
mod sqlite;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

pub use self::file::FileBackend;
pub use self::memory::MemoryBackend;
pub use self::sqlite::SqliteBackend;

pub const USER_KEY: &str = "user";
pub const CATEGORIES_KEY: &str = "categories";
pub const POSTS_KEY: &str = "posts";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Raw key-value blob storage.
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError>;

    /// Overwrite the blob stored under `key` (last write wins)
    async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError>;

    /// Returns whether a blob was present
    async fn remove(&self, key: &str) -> Result<bool, RepositoryError>;
}

pub type DynSnapshotBackend = Arc<dyn SnapshotBackend>;

/// Outcome of reading a snapshot whose contents may be stale or hand-edited.
#[derive(Debug, PartialEq)]
pub enum Snapshot<T> {
    Found(T),
    Missing,
    Corrupt(String),
}

/// Typed view over one key of a [`SnapshotBackend`].
pub struct Repository<T> {
    key: &'static str,
    backend: DynSnapshotBackend,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            backend: self.backend.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(backend: DynSnapshotBackend, key: &'static str) -> Self {
        Self {
            key,
            backend,
            _marker: PhantomData,
        }
    }

    pub async fn load(&self) -> Result<Option<T>, RepositoryError> {
        match self.backend.get(self.key).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Like [`Repository::load`], but reports malformed JSON as
    /// [`Snapshot::Corrupt`] instead of failing. Backend errors still propagate.
    pub async fn load_snapshot(&self) -> Result<Snapshot<T>, RepositoryError> {
        match self.load().await {
            Ok(Some(value)) => Ok(Snapshot::Found(value)),
            Ok(None) => Ok(Snapshot::Missing),
            Err(RepositoryError::Serialization(e)) => Ok(Snapshot::Corrupt(e.to_string())),
            Err(e) => Err(e),
        }
    }

    pub async fn save(&self, value: &T) -> Result<(), RepositoryError> {
        let json = serde_json::to_string(value)?;
        self.backend.set(self.key, &json).await
    }

    pub async fn clear(&self) -> Result<(), RepositoryError> {
        self.backend.remove(self.key).await?;
        Ok(())
    }
}
