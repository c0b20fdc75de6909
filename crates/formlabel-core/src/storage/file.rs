//! File-based storage implementation.

use super::{BoxFuture, Storage, StorageError, StorageResult, not_found};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// File-based storage.
///
/// Stores every file flat in a single directory. File names are used as-is
/// after validation, so `invoice.pdf.labels.json` lands next to `fields.json`.
pub struct FileStorage {
    /// Base directory for file storage.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Linux: `~/.local/share/formlabel/files/`
    /// On Windows: `%LOCALAPPDATA%\formlabel\files\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("formlabel").join("files"))
    }

    /// Resolve a file name inside the base directory.
    ///
    /// Names must be a single path component.
    fn file_path(&self, name: &str) -> StorageResult<PathBuf> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0']);
        if invalid {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.base_path.join(name))
    }

    /// Get the base path.
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    fn read_bytes(&self, name: &str, ignore_not_found: bool) -> StorageResult<Option<Vec<u8>>> {
        let path = self.file_path(name)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => not_found(name, ignore_not_found),
            Err(e) => Err(StorageError::Io(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn write_bytes(&self, name: &str, bytes: &[u8]) -> StorageResult<()> {
        let path = self.file_path(name)?;
        fs::write(&path, bytes)
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }
}

impl Storage for FileStorage {
    fn read_text(
        &self,
        path: &str,
        ignore_not_found: bool,
    ) -> BoxFuture<'_, StorageResult<Option<String>>> {
        let name = path.to_string();
        Box::pin(async move {
            match self.read_bytes(&name, ignore_not_found)? {
                Some(bytes) => String::from_utf8(bytes)
                    .map(Some)
                    .map_err(|e| StorageError::Serialization(format!("{}: {}", name, e))),
                None => Ok(None),
            }
        })
    }

    fn read_binary(
        &self,
        path: &str,
        ignore_not_found: bool,
    ) -> BoxFuture<'_, StorageResult<Option<Vec<u8>>>> {
        let name = path.to_string();
        Box::pin(async move { self.read_bytes(&name, ignore_not_found) })
    }

    fn write_text(&self, path: &str, contents: &str) -> BoxFuture<'_, StorageResult<()>> {
        let name = path.to_string();
        let contents = contents.to_string();
        Box::pin(async move { self.write_bytes(&name, contents.as_bytes()) })
    }

    fn write_binary(&self, path: &str, contents: &[u8]) -> BoxFuture<'_, StorageResult<()>> {
        let name = path.to_string();
        let contents = contents.to_vec();
        Box::pin(async move { self.write_bytes(&name, &contents) })
    }

    fn delete_file(&self, path: &str, ignore_not_found: bool) -> BoxFuture<'_, StorageResult<()>> {
        let name = path.to_string();
        Box::pin(async move {
            let path = self.file_path(&name)?;
            match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    not_found::<()>(&name, ignore_not_found).map(|_| ())
                }
                Err(e) => Err(StorageError::Io(format!(
                    "Failed to delete {}: {}",
                    path.display(),
                    e
                ))),
            }
        })
    }

    fn list_files(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let base = self.base_path.clone();

        Box::pin(async move {
            if !base.exists() {
                return Ok(vec![]);
            }

            let entries = fs::read_dir(&base)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

            let mut names = Vec::new();
            for entry in entries.flatten() {
                let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
                if !is_file {
                    continue;
                }
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
            names.sort();
            Ok(names)
        })
    }

    fn file_exists(&self, path: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let name = path.to_string();
        Box::pin(async move { Ok(self.file_path(&name)?.is_file()) })
    }
}
