//! Storage abstraction for persistence.
//!
//! Every artifact the labeling tool owns (the field schema, one label file per
//! document, one analysis result per document) is a named file in a flat
//! namespace. Backends only move text and bytes; encoding lives in
//! [`crate::assets`].

mod file;
mod memory;
mod queued;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use queued::QueuedStorage;

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Invalid file name: {0}")]
    InvalidName(String),
    #[error("Storage error: {0}")]
    Other(String),
}

impl StorageError {
    /// Stable machine-readable code, surfaced as the error name in the UI state.
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::NotFound(_) => "NotFound",
            StorageError::Serialization(_) => "SerializationError",
            StorageError::Io(_) => "IoError",
            StorageError::InvalidName(_) => "InvalidName",
            StorageError::Other(_) => "StorageError",
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async storage operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for file storage backends.
///
/// Reads and deletes take `ignore_not_found`: when set, a missing file yields
/// `Ok(None)` / `Ok(())` instead of [`StorageError::NotFound`].
pub trait Storage: Send + Sync {
    /// Read a file as UTF-8 text.
    fn read_text(&self, path: &str, ignore_not_found: bool)
    -> BoxFuture<'_, StorageResult<Option<String>>>;

    /// Read a file as raw bytes.
    fn read_binary(
        &self,
        path: &str,
        ignore_not_found: bool,
    ) -> BoxFuture<'_, StorageResult<Option<Vec<u8>>>>;

    /// Write (create or replace) a text file.
    fn write_text(&self, path: &str, contents: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// Write (create or replace) a binary file.
    fn write_binary(&self, path: &str, contents: &[u8]) -> BoxFuture<'_, StorageResult<()>>;

    /// Delete a file.
    fn delete_file(&self, path: &str, ignore_not_found: bool) -> BoxFuture<'_, StorageResult<()>>;

    /// List all file names.
    fn list_files(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    /// Check if a file exists.
    fn file_exists(&self, path: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

impl<S: Storage + ?Sized> Storage for std::sync::Arc<S> {
    fn read_text(
        &self,
        path: &str,
        ignore_not_found: bool,
    ) -> BoxFuture<'_, StorageResult<Option<String>>> {
        (**self).read_text(path, ignore_not_found)
    }

    fn read_binary(
        &self,
        path: &str,
        ignore_not_found: bool,
    ) -> BoxFuture<'_, StorageResult<Option<Vec<u8>>>> {
        (**self).read_binary(path, ignore_not_found)
    }

    fn write_text(&self, path: &str, contents: &str) -> BoxFuture<'_, StorageResult<()>> {
        (**self).write_text(path, contents)
    }

    fn write_binary(&self, path: &str, contents: &[u8]) -> BoxFuture<'_, StorageResult<()>> {
        (**self).write_binary(path, contents)
    }

    fn delete_file(&self, path: &str, ignore_not_found: bool) -> BoxFuture<'_, StorageResult<()>> {
        (**self).delete_file(path, ignore_not_found)
    }

    fn list_files(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        (**self).list_files()
    }

    fn file_exists(&self, path: &str) -> BoxFuture<'_, StorageResult<bool>> {
        (**self).file_exists(path)
    }
}

/// Map a missing file to `None` when the caller asked to ignore it.
pub(crate) fn not_found<T>(path: &str, ignore_not_found: bool) -> StorageResult<Option<T>> {
    if ignore_not_found {
        Ok(None)
    } else {
        Err(StorageError::NotFound(path.to_string()))
    }
}
