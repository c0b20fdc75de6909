//! Per-path write ordering on top of any storage backend.

use super::{BoxFuture, Storage, StorageError, StorageResult, not_found};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Content of the most recently submitted, not yet settled write for a path.
#[derive(Debug, Clone)]
enum PendingWrite {
    Text(String),
    Binary(Vec<u8>),
    Deleted,
}

#[derive(Default)]
struct PendingState {
    next_seq: u64,
    latest: Option<(u64, PendingWrite)>,
}

/// Ordering state for one path.
#[derive(Default)]
struct PathQueue {
    /// Sequence number of the last write applied to the backend.
    applied: tokio::sync::Mutex<u64>,
    pending: Mutex<PendingState>,
}

impl PathQueue {
    fn settle(&self, seq: u64) {
        if let Ok(mut pending) = self.pending.lock() {
            if matches!(pending.latest, Some((latest, _)) if latest == seq) {
                pending.latest = None;
            }
        }
    }
}

/// Storage wrapper that serializes writes per path.
///
/// A write is registered when the method is called, not when its future is
/// first polled. From that moment reads of the path return the latest
/// registered content. Writes to one path reach the backend one at a time,
/// and a write whose submission is older than one already applied is
/// skipped, so the backend always ends with the last submitted content.
pub struct QueuedStorage<S> {
    inner: S,
    queues: Mutex<HashMap<String, Arc<PathQueue>>>,
}

impl<S: Storage> QueuedStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn submit(&self, path: &str, write: PendingWrite) -> StorageResult<(Arc<PathQueue>, u64)> {
        let mut queues = self
            .queues
            .lock()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        let queue = queues.entry(path.to_string()).or_default().clone();
        let mut pending = queue
            .pending
            .lock()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        pending.next_seq += 1;
        let seq = pending.next_seq;
        pending.latest = Some((seq, write));
        drop(pending);
        Ok((queue, seq))
    }

    fn pending(&self, path: &str) -> StorageResult<Option<PendingWrite>> {
        let queues = self
            .queues
            .lock()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        let Some(queue) = queues.get(path) else {
            return Ok(None);
        };
        let pending = queue
            .pending
            .lock()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        Ok(pending.latest.as_ref().map(|(_, write)| write.clone()))
    }

    fn enqueue(&self, path: &str, write: PendingWrite, ignore_not_found: bool) -> BoxFuture<'_, StorageResult<()>> {
        let path = path.to_string();
        let (queue, seq) = match self.submit(&path, write.clone()) {
            Ok(submitted) => submitted,
            Err(e) => return Box::pin(async move { Err(e) }),
        };

        Box::pin(async move {
            let mut applied = queue.applied.lock().await;
            let result = if *applied > seq {
                log::debug!("Skipping superseded write #{} to {}", seq, path);
                Ok(())
            } else {
                let result = match &write {
                    PendingWrite::Text(text) => self.inner.write_text(&path, text).await,
                    PendingWrite::Binary(bytes) => self.inner.write_binary(&path, bytes).await,
                    PendingWrite::Deleted => self.inner.delete_file(&path, ignore_not_found).await,
                };
                if result.is_ok() {
                    *applied = seq;
                }
                result
            };
            queue.settle(seq);
            result
        })
    }
}

impl<S: Storage> Storage for QueuedStorage<S> {
    fn read_text(
        &self,
        path: &str,
        ignore_not_found: bool,
    ) -> BoxFuture<'_, StorageResult<Option<String>>> {
        let path = path.to_string();
        Box::pin(async move {
            match self.pending(&path)? {
                Some(PendingWrite::Text(text)) => Ok(Some(text)),
                Some(PendingWrite::Binary(bytes)) => String::from_utf8(bytes)
                    .map(Some)
                    .map_err(|e| StorageError::Serialization(format!("{}: {}", path, e))),
                Some(PendingWrite::Deleted) => not_found(&path, ignore_not_found),
                None => self.inner.read_text(&path, ignore_not_found).await,
            }
        })
    }

    fn read_binary(
        &self,
        path: &str,
        ignore_not_found: bool,
    ) -> BoxFuture<'_, StorageResult<Option<Vec<u8>>>> {
        let path = path.to_string();
        Box::pin(async move {
            match self.pending(&path)? {
                Some(PendingWrite::Text(text)) => Ok(Some(text.into_bytes())),
                Some(PendingWrite::Binary(bytes)) => Ok(Some(bytes)),
                Some(PendingWrite::Deleted) => not_found(&path, ignore_not_found),
                None => self.inner.read_binary(&path, ignore_not_found).await,
            }
        })
    }

    fn write_text(&self, path: &str, contents: &str) -> BoxFuture<'_, StorageResult<()>> {
        self.enqueue(path, PendingWrite::Text(contents.to_string()), false)
    }

    fn write_binary(&self, path: &str, contents: &[u8]) -> BoxFuture<'_, StorageResult<()>> {
        self.enqueue(path, PendingWrite::Binary(contents.to_vec()), false)
    }

    fn delete_file(&self, path: &str, ignore_not_found: bool) -> BoxFuture<'_, StorageResult<()>> {
        self.enqueue(path, PendingWrite::Deleted, ignore_not_found)
    }

    fn list_files(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let mut names = self.inner.list_files().await?;
            let pending: Vec<(String, bool)> = {
                let queues = self
                    .queues
                    .lock()
                    .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
                queues
                    .iter()
                    .filter_map(|(path, queue)| {
                        let pending = queue.pending.lock().ok()?;
                        let (_, write) = pending.latest.as_ref()?;
                        Some((path.clone(), !matches!(write, PendingWrite::Deleted)))
                    })
                    .collect()
            };
            for (path, present) in pending {
                if present && !names.contains(&path) {
                    names.push(path);
                } else if !present {
                    names.retain(|name| name != &path);
                }
            }
            names.sort();
            Ok(names)
        })
    }

    fn file_exists(&self, path: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = path.to_string();
        Box::pin(async move {
            match self.pending(&path)? {
                Some(PendingWrite::Deleted) => Ok(false),
                Some(_) => Ok(true),
                None => self.inner.file_exists(&path).await,
            }
        })
    }
}
