use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use log::warn;
use uuid::Uuid;

use crate::store::Inner;
use crate::BlobError;

/// Opaque identifier of a stored blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobId(Uuid);

impl BlobId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Display URL of the blob
    pub fn url(&self) -> String {
        format!("blob:goblin/{}", self.0)
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owned reference to one blob held by a [`crate::BlobStore`].
///
/// Dropping a handle that was never released still frees the blob, but logs
/// a warning: every owner is expected to call [`BlobHandle::release`].
pub struct BlobHandle {
    id: BlobId,
    mime: String,
    len: usize,
    store: Arc<Inner>,
    released: bool,
}

impl BlobHandle {
    pub(crate) fn new(id: BlobId, mime: String, len: usize, store: Arc<Inner>) -> Self {
        Self {
            id,
            mime,
            len,
            store,
            released: false,
        }
    }

    pub fn id(&self) -> BlobId {
        self.id
    }

    /// Display URL of the blob, stable for the lifetime of the handle.
    pub fn url(&self) -> String {
        self.id.url()
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cheap, reference-counted view of the stored bytes.
    pub fn bytes(&self) -> Result<Bytes, BlobError> {
        self.store.get(self.id).ok_or(BlobError::Missing(self.id))
    }

    /// Release the blob. Consumes the handle, so a second release cannot be
    /// expressed.
    pub fn release(mut self) -> Result<(), BlobError> {
        self.released = true;
        self.store.release(self.id)
    }
}

impl Drop for BlobHandle {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!("Blob {} dropped without explicit release", self.id);
        if let Err(e) = self.store.release(self.id) {
            warn!("Failed to release dropped blob: {}", e);
        }
    }
}

impl fmt::Debug for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobHandle")
            .field("id", &self.id)
            .field("mime", &self.mime)
            .field("len", &self.len)
            .finish()
    }
}
