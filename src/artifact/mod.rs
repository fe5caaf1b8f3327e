//! The single artifact served by channel-gate.
//!
//! The artifact is uploaded to remote storage at most once per process. The
//! returned handle is cached and every delivery sends by handle, so raw bytes
//! are never re-read once a handle exists.

mod cache;

pub use cache::{ArtifactCache, CacheStats, Fetched, UploadFailure};

use crate::access::ChatId;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque, storage-issued reference to already uploaded artifact bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactHandle(String);

impl ArtifactHandle {
    /// Wrap a storage-issued identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as issued by storage.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Local location of the artifact bytes, read only when no handle exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    path: PathBuf,
}

impl ArtifactSource {
    /// Create a source for the file at `path`. The file is not checked here.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the artifact file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name presented to recipients.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| "artifact".to_string(), |name| name.to_string_lossy().into_owned())
    }
}

/// Remote artifact storage and transport.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Upload the bytes behind `source` and return a reusable handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or the upload is rejected.
    async fn upload(&self, source: &ArtifactSource) -> Result<ArtifactHandle>;

    /// Send the already uploaded artifact to `destination`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport rejects the delivery.
    async fn send_by_handle(&self, handle: &ArtifactHandle, destination: ChatId) -> Result<()>;
}
