//! Durable local cache for in-progress answers.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::persist::PersistedExamState;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no cached state for key: {0}")]
    NotFound(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Trait for local cache backends.
///
/// The cache must survive a full process restart on the same device/profile;
/// entries are keyed per exam and student (see [`crate::persist::cache_key`])
/// so students and exams sharing a device never collide.
pub trait Storage: Send + Sync {
    /// Save the state under a cache key.
    fn save(&self, key: &str, state: &PersistedExamState) -> BoxFuture<'_, StorageResult<()>>;

    /// Load the state for a cache key.
    fn load(&self, key: &str) -> BoxFuture<'_, StorageResult<PersistedExamState>>;

    /// Delete the entry for a cache key.
    ///
    /// Never called by the engine itself; clearing an answer cache (e.g.
    /// after grading) is the embedding application's decision.
    fn delete(&self, key: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// Check whether an entry exists for a cache key.
    fn exists(&self, key: &str) -> BoxFuture<'_, StorageResult<bool>>;
}
