//! Process-lifetime cache of the artifact handle.
//!
//! The cache is empty until the first successful upload and immutable after.
//! Concurrent first requests are single-flighted: one caller uploads while the
//! others wait for its result. Callers that waited on a failed attempt share
//! that failure; the cache stays empty and only a later request starts over.

use crate::artifact::{ArtifactHandle, ArtifactSource, ArtifactStore};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Default deadline for one upload.
const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// The artifact could not be uploaded. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("artifact upload failed: {detail}")]
pub struct UploadFailure {
    /// Operator-facing description, never shown to the requester.
    pub detail: String,
}

/// Cache statistics for monitoring.
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    /// Number of requests answered with a handle another call uploaded.
    pub hits: u64,
    /// Number of uploads that completed successfully.
    pub uploads: u64,
    /// Number of uploads that failed or timed out.
    pub upload_failures: u64,
}

/// Result of [`ArtifactCache::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// The cached handle.
    pub handle: ArtifactHandle,
    /// True if this call performed the upload.
    pub uploaded: bool,
}

/// Outcome of the most recent failed upload.
#[derive(Default)]
struct Attempts {
    /// Bumped on every failed upload.
    generation: u64,
    last_failure: Option<UploadFailure>,
}

/// Owns the lazily populated handle of the artifact.
pub struct ArtifactCache {
    handle: OnceCell<ArtifactHandle>,
    /// Held for the duration of one upload.
    upload_permit: tokio::sync::Mutex<()>,
    attempts: Mutex<Attempts>,
    store: Arc<dyn ArtifactStore>,
    upload_timeout: Duration,
    stats: Mutex<CacheStats>,
}

impl ArtifactCache {
    /// Create an empty cache uploading through `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self::with_timeout(store, DEFAULT_UPLOAD_TIMEOUT)
    }

    /// Create an empty cache with a custom upload deadline.
    #[must_use]
    pub fn with_timeout(store: Arc<dyn ArtifactStore>, upload_timeout: Duration) -> Self {
        Self {
            handle: OnceCell::new(),
            upload_permit: tokio::sync::Mutex::new(()),
            attempts: Mutex::new(Attempts::default()),
            store,
            upload_timeout,
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Return the cached handle, uploading `source` first if the cache is empty.
    ///
    /// # Errors
    ///
    /// Returns [`UploadFailure`] if the upload fails or exceeds its deadline.
    pub async fn fetch_or_upload(&self, source: &ArtifactSource) -> Result<ArtifactHandle, UploadFailure> {
        self.fetch(source).await.map(|fetched| fetched.handle)
    }

    /// Like [`fetch_or_upload`](Self::fetch_or_upload), also reporting whether
    /// this call performed the upload.
    ///
    /// # Errors
    ///
    /// Returns [`UploadFailure`] if the upload fails or exceeds its deadline.
    pub async fn fetch(&self, source: &ArtifactSource) -> Result<Fetched, UploadFailure> {
        if let Some(fetched) = self.cached() {
            return Ok(fetched);
        }

        let seen = self.attempts.lock().generation;
        let _permit = self.upload_permit.lock().await;

        // Another caller finished while we waited for the permit
        if let Some(fetched) = self.cached() {
            return Ok(fetched);
        }
        {
            let attempts = self.attempts.lock();
            if attempts.generation != seen {
                if let Some(failure) = &attempts.last_failure {
                    debug!("Sharing failure of the upload this request waited on");
                    return Err(failure.clone());
                }
            }
        }

        match self.upload(source).await {
            Ok(handle) => {
                // The permit is held, so nothing else can have set the cell
                let _ = self.handle.set(handle.clone());
                Ok(Fetched { handle, uploaded: true })
            }
            Err(failure) => {
                let mut attempts = self.attempts.lock();
                attempts.generation += 1;
                attempts.last_failure = Some(failure.clone());
                Err(failure)
            }
        }
    }

    fn cached(&self) -> Option<Fetched> {
        let handle = self.handle.get()?.clone();
        self.stats.lock().hits += 1;
        Some(Fetched { handle, uploaded: false })
    }

    async fn upload(&self, source: &ArtifactSource) -> Result<ArtifactHandle, UploadFailure> {
        debug!("Uploading artifact from {}", source.path().display());

        let result = match tokio::time::timeout(self.upload_timeout, self.store.upload(source)).await {
            Ok(Ok(handle)) => Ok(handle),
            Ok(Err(e)) => Err(UploadFailure { detail: e.to_string() }),
            Err(_) => Err(UploadFailure {
                detail: format!("upload timed out after {:?}", self.upload_timeout),
            }),
        };

        let mut stats = self.stats.lock();
        match &result {
            Ok(handle) => {
                stats.uploads += 1;
                info!("Artifact uploaded, handle cached ({handle})");
            }
            Err(failure) => {
                stats.upload_failures += 1;
                warn!("Artifact upload from {} failed: {}", source.path().display(), failure.detail);
            }
        }
        result
    }

    /// The cached handle, if an upload has succeeded.
    #[must_use]
    pub fn handle(&self) -> Option<&ArtifactHandle> {
        self.handle.get()
    }

    /// Check if a handle is cached.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.handle.initialized()
    }

    /// Get current cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    /// The store used for uploads and deliveries.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }
}
