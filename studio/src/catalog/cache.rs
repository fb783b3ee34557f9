use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::OnceCell;

use super::{GpuInfo, ModelCatalog};
use crate::clients::{Backend, BackendError};

/// Session cache of the model catalog and the GPU status.
///
/// Both values are fetched at most once successfully. A failed fetch leaves
/// the cell empty so the next call tries again. Concurrent first calls share
/// one request.
pub struct CatalogCache {
    backend: Arc<dyn Backend>,
    models: OnceCell<ModelCatalog>,
    gpu: OnceCell<GpuInfo>,
    models_failed: AtomicBool,
}

impl CatalogCache {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            models: OnceCell::new(),
            gpu: OnceCell::new(),
            models_failed: AtomicBool::new(false),
        }
    }

    /// Catalog, fetched on first use
    pub async fn ensure_models(&self) -> Result<&ModelCatalog, BackendError> {
        let result = self
            .models
            .get_or_try_init(|| async {
                info!("Fetching model catalog");
                self.backend.list_models().await
            })
            .await;

        match &result {
            Ok(_) => self.models_failed.store(false, Ordering::SeqCst),
            Err(e) => {
                warn!("Model catalog unavailable: {}", e);
                self.models_failed.store(true, Ordering::SeqCst);
            }
        }
        result
    }

    /// GPU status, fetched on first use
    pub async fn ensure_gpu_info(&self) -> Result<&GpuInfo, BackendError> {
        self.gpu
            .get_or_try_init(|| async {
                info!("Checking GPU status");
                self.backend.health_status().await
            })
            .await
            .inspect_err(|e| warn!("GPU status unavailable: {}", e))
    }

    pub fn models(&self) -> Option<&ModelCatalog> {
        self.models.get()
    }

    pub fn gpu_info(&self) -> Option<&GpuInfo> {
        self.gpu.get()
    }

    /// Whether the last catalog fetch failed and nothing is cached
    pub fn is_offline(&self) -> bool {
        self.models.get().is_none() && self.models_failed.load(Ordering::SeqCst)
    }
}
