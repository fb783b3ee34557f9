use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use goblin_blob::{BlobError, BlobHandle, BlobId, BlobStore};
use log::{debug, error, info};

/// Shown where a seed is expected but the backend did not report one
pub const SEED_PLACEHOLDER: &str = "---";

/// The displayed image and the seed that produced it
#[derive(Debug)]
pub struct CurrentImage {
    handle: BlobHandle,
    seed: Option<i64>,
}

impl CurrentImage {
    pub fn id(&self) -> BlobId {
        self.handle.id()
    }

    pub fn url(&self) -> String {
        self.handle.url()
    }

    pub fn seed(&self) -> Option<i64> {
        self.seed
    }
}

/// Seed text for display, `---` when unknown
pub fn seed_label(seed: Option<i64>) -> String {
    seed.map_or_else(|| SEED_PLACEHOLDER.to_string(), |s| s.to_string())
}

/// Detached view of the current image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSnapshot {
    pub id: BlobId,
    pub url: String,
    pub mime: String,
    pub seed: Option<i64>,
    pub bytes: Bytes,
}

#[derive(Debug, Default)]
struct SlotState {
    current: Option<CurrentImage>,
    closed: bool,
}

/// Holder of the single live image of a session.
///
/// Installing a new image swaps it in under the lock and releases the
/// superseded handle afterwards, so there is never a moment without a
/// displayable image and every handle is released exactly once.
///
/// Once closed the slot stays empty: late results are dropped without
/// acquiring a handle.
#[derive(Debug)]
pub struct ImageSlot {
    store: BlobStore,
    state: Mutex<SlotState>,
}

impl ImageSlot {
    pub fn new(store: BlobStore) -> Self {
        Self {
            store,
            state: Mutex::new(SlotState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn store(&self) -> &BlobStore {
        &self.store
    }

    pub fn is_empty(&self) -> bool {
        self.lock().current.is_none()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn current_id(&self) -> Option<BlobId> {
        self.lock().current.as_ref().map(CurrentImage::id)
    }

    pub fn current_seed(&self) -> Option<i64> {
        self.lock().current.as_ref().and_then(CurrentImage::seed)
    }

    pub fn snapshot(&self) -> Result<Option<ImageSnapshot>, BlobError> {
        let state = self.lock();
        let Some(image) = state.current.as_ref() else {
            return Ok(None);
        };
        Ok(Some(ImageSnapshot {
            id: image.id(),
            url: image.url(),
            mime: image.handle.mime().to_string(),
            seed: image.seed,
            bytes: image.handle.bytes()?,
        }))
    }

    /// Acquire a handle for `bytes`, make it current and release the
    /// previous one. Returns `None`, with nothing acquired, once the slot is
    /// closed.
    pub fn install(&self, bytes: Bytes, mime: &str, seed: Option<i64>) -> Option<BlobId> {
        let (id, previous) = {
            let mut state = self.lock();
            if state.closed {
                debug!("Dropping {} bytes: image slot is closed", bytes.len());
                return None;
            }
            let handle = self.store.acquire(bytes, mime);
            let id = handle.id();
            debug!("Acquired image {} ({} bytes)", id, handle.len());
            (id, state.current.replace(CurrentImage { handle, seed }))
        };

        release_previous(previous);
        Some(id)
    }

    /// Swap in `bytes` only if `expected` is still the current image,
    /// keeping its seed. Returns `None`, with nothing acquired, when the
    /// image changed in the meantime or the slot is closed.
    pub fn replace_if_current(&self, expected: BlobId, bytes: Bytes, mime: &str) -> Option<BlobId> {
        let (id, previous) = {
            let mut state = self.lock();
            let seed = match state.current.as_ref() {
                Some(image) if !state.closed && image.id() == expected => image.seed,
                _ => return None,
            };
            let handle = self.store.acquire(bytes, mime);
            let id = handle.id();
            debug!("Acquired image {} ({} bytes)", id, handle.len());
            (id, state.current.replace(CurrentImage { handle, seed }))
        };

        release_previous(previous);
        Some(id)
    }

    /// Release the held image, if any, and refuse every later install.
    /// Returns whether an image was held.
    pub fn close(&self) -> bool {
        let previous = {
            let mut state = self.lock();
            state.closed = true;
            state.current.take()
        };
        let had_image = previous.is_some();
        release_previous(previous);
        had_image
    }
}

fn release_previous(previous: Option<CurrentImage>) {
    let Some(image) = previous else {
        return;
    };
    let id = image.id();
    match image.handle.release() {
        Ok(()) => info!("Released image {}", id),
        Err(e) => error!("Failed to release image {}: {}", id, e),
    }
}
