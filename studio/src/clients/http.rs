use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use log::{debug, error, info, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;

use super::backend::{Backend, GeneratedImage, RandomPrompt, UpscaleRequest};
use super::config::BackendConfig;
use super::error::{BackendError, Operation};
use super::wire::{self, UpscaleBody, UpscaleResponse};
use crate::catalog::{GpuInfo, ModelCatalog};
use crate::params::GenerationRequest;

const SEED_HEADER: &str = "X-Seed";
const DEFAULT_MIME: &str = "application/octet-stream";

/// [`Backend`] over the backend's HTTP API
pub struct HttpBackend {
    config: BackendConfig,
    http: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                error!("Failed to build HTTP client: {}", e);
                BackendError::Setup(e.to_string())
            })?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Send a request and turn transport failures and non-success statuses
    /// into [`BackendError`]s.
    async fn send(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<Response, BackendError> {
        let response = request.send().await.map_err(|e| {
            error!("{} request error: {}", operation, e);
            BackendError::Transport {
                operation,
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!("{} error response ({}): {}", operation, status, body);

        // Only generation surfaces the backend's own error text
        let message = match operation {
            Operation::Generate if !body.trim().is_empty() => body.trim().to_string(),
            _ => operation.fallback_message().to_string(),
        };
        Err(BackendError::RequestFailed {
            operation,
            status_code: status.as_u16(),
            message,
        })
    }

    async fn get_json(&self, operation: Operation, path: &str) -> Result<Value, BackendError> {
        let response = self.send(operation, self.http.get(self.config.url(path))).await?;
        read_json(operation, response).await
    }
}

async fn read_json(operation: Operation, response: Response) -> Result<Value, BackendError> {
    response.json::<Value>().await.map_err(|e| {
        error!("Failed to parse {} response: {}", operation, e);
        invalid(operation, e.to_string())
    })
}

fn invalid(operation: Operation, message: impl Into<String>) -> BackendError {
    BackendError::InvalidResponse {
        operation,
        message: message.into(),
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_models(&self) -> Result<ModelCatalog, BackendError> {
        let body = self.get_json(Operation::ListModels, "/models").await?;
        let catalog =
            wire::parse_catalog(body).map_err(|msg| invalid(Operation::ListModels, msg))?;
        info!(
            "Loaded model catalog: {} categories, {} models",
            catalog.categories().len(),
            catalog.total_models()
        );
        Ok(catalog)
    }

    async fn random_prompt(&self) -> Result<RandomPrompt, BackendError> {
        let body = self
            .get_json(Operation::RandomPrompt, "/prompts/random")
            .await?;
        wire::parse_random_prompt(body).map_err(|msg| invalid(Operation::RandomPrompt, msg))
    }

    async fn health_status(&self) -> Result<GpuInfo, BackendError> {
        let body = self.get_json(Operation::Health, "/health").await?;
        let gpu = wire::parse_health(body).map_err(|msg| invalid(Operation::Health, msg))?;
        debug!("Health check: {:?}", gpu);
        Ok(gpu)
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, BackendError> {
        let operation = Operation::Generate;
        info!(
            "Generating with model '{}' ({}, seed {})",
            request.model, request.shape, request.seed
        );

        let response = self
            .send(
                operation,
                self.http.post(self.config.url("/generate")).json(request),
            )
            .await?;

        let headers = response.headers();
        let seed_header = headers
            .get(SEED_HEADER)
            .and_then(|value| value.to_str().ok());
        let seed = wire::parse_seed_header(seed_header);
        if seed.is_none() {
            if let Some(raw) = seed_header {
                warn!("Ignoring unparsable {} header: {:?}", SEED_HEADER, raw);
            }
        }
        let mime = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(DEFAULT_MIME)
            .to_string();

        let bytes = response.bytes().await.map_err(|e| {
            error!("Failed to read generated image: {}", e);
            invalid(operation, e.to_string())
        })?;

        info!("Generation complete: {} bytes ({})", bytes.len(), mime);
        Ok(GeneratedImage { bytes, mime, seed })
    }

    async fn upscale(&self, request: &UpscaleRequest) -> Result<Bytes, BackendError> {
        let operation = Operation::Upscale;
        let body = UpscaleBody {
            image_base64: STANDARD.encode(&request.image),
            width: request.width,
            height: request.height,
            model: &request.model,
        };
        info!(
            "Upscaling to {}x{} with '{}'",
            request.width, request.height, request.model
        );

        let response = self
            .send(
                operation,
                self.http.post(self.config.url("/upscale")).json(&body),
            )
            .await?;

        let parsed: UpscaleResponse = response.json().await.map_err(|e| {
            error!("Failed to parse upscale response: {}", e);
            invalid(operation, e.to_string())
        })?;

        let decoded = STANDARD.decode(parsed.image_base64.trim()).map_err(|e| {
            error!("Upscale response is not valid base64: {}", e);
            invalid(operation, format!("invalid base64 image: {}", e))
        })?;

        Ok(Bytes::from(decoded))
    }
}
