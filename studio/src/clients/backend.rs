//! Typed interface to the image backend.
//!
//! The trait hides the transport, so controllers can be driven by the HTTP
//! implementation or by an in-memory one in tests.

use async_trait::async_trait;
use bytes::Bytes;

use super::error::BackendError;
use crate::catalog::{GpuInfo, ModelCatalog};
use crate::params::GenerationRequest;

/// Prompt pair suggested by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RandomPrompt {
    pub prompt: String,
    pub negative_prompt: String,
}

/// Result of `POST /generate`
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    /// Encoded image, format chosen by the backend
    pub bytes: Bytes,
    /// Content type reported by the backend
    pub mime: String,
    /// Seed of record, `None` when the backend did not report one
    pub seed: Option<i64>,
}

/// Input of `POST /upscale`
#[derive(Debug, Clone, PartialEq)]
pub struct UpscaleRequest {
    /// Re-encoded source image
    pub image: Bytes,
    pub width: u32,
    pub height: u32,
    pub model: String,
}

/// Remote operations of the image backend. Each call is a single
/// request/response; nothing is retried.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_models(&self) -> Result<ModelCatalog, BackendError>;

    async fn random_prompt(&self) -> Result<RandomPrompt, BackendError>;

    async fn health_status(&self) -> Result<GpuInfo, BackendError>;

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, BackendError>;

    /// Returns the upscaled image as JPEG bytes
    async fn upscale(&self, request: &UpscaleRequest) -> Result<Bytes, BackendError>;
}
