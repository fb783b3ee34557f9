use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use log::{debug, warn};

use crate::handle::{BlobHandle, BlobId};
use crate::BlobError;

/// Shared state behind a store and all of its handles.
#[derive(Default)]
pub(crate) struct Inner {
    entries: Mutex<HashMap<BlobId, Bytes>>,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, HashMap<BlobId, Bytes>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn get(&self, id: BlobId) -> Option<Bytes> {
        self.entries().get(&id).cloned()
    }

    pub(crate) fn release(&self, id: BlobId) -> Result<(), BlobError> {
        match self.entries().remove(&id) {
            Some(data) => {
                self.released.fetch_add(1, Ordering::SeqCst);
                debug!("Released blob {} ({} bytes)", id, data.len());
                Ok(())
            }
            None => {
                warn!("Release requested for unknown blob {}", id);
                Err(BlobError::Missing(id))
            }
        }
    }
}

/// Snapshot of the store's acquisition accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlobStats {
    pub acquired: usize,
    pub released: usize,
    pub live: usize,
}

/// Store that owns the bytes of every live image.
///
/// Cloning the store is cheap; clones share the same blobs and counters.
#[derive(Clone, Default)]
pub struct BlobStore {
    inner: Arc<Inner>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `data` and return the handle that refers to it.
    pub fn acquire(&self, data: impl Into<Bytes>, mime: impl Into<String>) -> BlobHandle {
        let data = data.into();
        let mime = mime.into();
        let id = BlobId::new();
        let len = data.len();

        self.inner.entries().insert(id, data);
        self.inner.acquired.fetch_add(1, Ordering::SeqCst);
        debug!("Acquired blob {} ({} bytes, {})", id, len, mime);

        BlobHandle::new(id, mime, len, Arc::clone(&self.inner))
    }

    /// Number of blobs currently held.
    pub fn live_count(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn acquired_count(&self) -> usize {
        self.inner.acquired.load(Ordering::SeqCst)
    }

    pub fn released_count(&self) -> usize {
        self.inner.released.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> BlobStats {
        BlobStats {
            acquired: self.acquired_count(),
            released: self.released_count(),
            live: self.live_count(),
        }
    }
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore").field("stats", &self.stats()).finish()
    }
}
