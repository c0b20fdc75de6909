//! In-memory storage implementation.

use super::{BoxFuture, Storage, StorageError, StorageResult, not_found};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryStorage {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    fn read_bytes(&self, path: &str, ignore_not_found: bool) -> StorageResult<Option<Vec<u8>>> {
        let files = self
            .files
            .read()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        match files.get(path) {
            Some(bytes) => Ok(Some(bytes.clone())),
            None => not_found(path, ignore_not_found),
        }
    }

    fn insert(&self, path: String, bytes: Vec<u8>) -> StorageResult<()> {
        let mut files = self
            .files
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        files.insert(path, bytes);
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn read_text(
        &self,
        path: &str,
        ignore_not_found: bool,
    ) -> BoxFuture<'_, StorageResult<Option<String>>> {
        let path = path.to_string();
        Box::pin(async move {
            match self.read_bytes(&path, ignore_not_found)? {
                Some(bytes) => String::from_utf8(bytes)
                    .map(Some)
                    .map_err(|e| StorageError::Serialization(format!("{}: {}", path, e))),
                None => Ok(None),
            }
        })
    }

    fn read_binary(
        &self,
        path: &str,
        ignore_not_found: bool,
    ) -> BoxFuture<'_, StorageResult<Option<Vec<u8>>>> {
        let path = path.to_string();
        Box::pin(async move { self.read_bytes(&path, ignore_not_found) })
    }

    fn write_text(&self, path: &str, contents: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = path.to_string();
        let bytes = contents.as_bytes().to_vec();
        Box::pin(async move { self.insert(path, bytes) })
    }

    fn write_binary(&self, path: &str, contents: &[u8]) -> BoxFuture<'_, StorageResult<()>> {
        let path = path.to_string();
        let bytes = contents.to_vec();
        Box::pin(async move { self.insert(path, bytes) })
    }

    fn delete_file(&self, path: &str, ignore_not_found: bool) -> BoxFuture<'_, StorageResult<()>> {
        let path = path.to_string();
        Box::pin(async move {
            let mut files = self
                .files
                .write()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            if files.remove(&path).is_none() && !ignore_not_found {
                return Err(StorageError::NotFound(path));
            }
            Ok(())
        })
    }

    fn list_files(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let files = self
                .files
                .read()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            let mut names: Vec<String> = files.keys().cloned().collect();
            names.sort();
            Ok(names)
        })
    }

    fn file_exists(&self, path: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = path.to_string();
        Box::pin(async move {
            let files = self
                .files
                .read()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            Ok(files.contains_key(&path))
        })
    }
}
