//! In-memory image blob store with explicitly released handles.
//!
//! A [`BlobStore`] owns the bytes of every image that is currently
//! displayable. Acquiring data hands back a [`BlobHandle`], the only way to
//! reach those bytes again. Handles are not `Clone`, so each one can be
//! released exactly once, either explicitly through [`BlobHandle::release`]
//! or, as a last resort, when it is dropped.
//!
//! # Example
//!
//! ```
//! use goblin_blob::BlobStore;
//!
//! let store = BlobStore::new();
//! let handle = store.acquire(vec![0x89, 0x50, 0x4e, 0x47], "image/png");
//! assert_eq!(store.live_count(), 1);
//!
//! handle.release().unwrap();
//! assert_eq!(store.live_count(), 0);
//! assert_eq!(store.released_count(), 1);
//! ```

mod handle;
mod store;

pub use handle::{BlobHandle, BlobId};
pub use store::{BlobStats, BlobStore};

use thiserror::Error;

/// Errors raised by the blob store.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum BlobError {
    /// The blob behind this id is no longer held by the store.
    #[error("Blob {0} is not held by the store")]
    Missing(BlobId),
}
