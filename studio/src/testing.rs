//! In-memory backend for unit tests.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;

use crate::catalog::{GpuInfo, ModelCatalog};
use crate::clients::{
    Backend, BackendError, GeneratedImage, Operation, RandomPrompt, UpscaleRequest,
};
use crate::params::GenerationRequest;

/// Encoded PNG of the given size
pub fn png_bytes(width: u32, height: u32) -> Bytes {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([40, 120, 60]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("encode test png");
    Bytes::from(out.into_inner())
}

fn failure(operation: Operation, status_code: u16, message: &str) -> BackendError {
    BackendError::RequestFailed {
        operation,
        status_code,
        message: message.to_string(),
    }
}

/// Backend with canned responses and call counters.
///
/// A gated backend parks generate/upscale calls until [`MockBackend::open_gate`]
/// is called, which lets tests observe a request while it is in flight.
pub struct MockBackend {
    catalog: Mutex<Result<ModelCatalog, BackendError>>,
    prompt: Mutex<Result<RandomPrompt, BackendError>>,
    gpu: Mutex<Result<GpuInfo, BackendError>>,
    generated: Mutex<Result<GeneratedImage, BackendError>>,
    upscaled: Mutex<Result<Bytes, BackendError>>,

    list_calls: AtomicUsize,
    prompt_calls: AtomicUsize,
    health_calls: AtomicUsize,
    generate_calls: AtomicUsize,
    upscale_calls: AtomicUsize,

    last_generate: Mutex<Option<GenerationRequest>>,
    last_upscale: Mutex<Option<UpscaleRequest>>,

    gated: bool,
    gate: Notify,
    generating: Notify,
    upscaling: Notify,
    prompting: Notify,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            catalog: Mutex::new(Ok(ModelCatalog::default())),
            prompt: Mutex::new(Ok(RandomPrompt::default())),
            gpu: Mutex::new(Ok(GpuInfo {
                available: false,
                device_name: None,
            })),
            generated: Mutex::new(Ok(GeneratedImage {
                bytes: png_bytes(4, 4),
                mime: "image/png".to_string(),
                seed: None,
            })),
            upscaled: Mutex::new(Ok(Bytes::from_static(b"upscaled"))),
            list_calls: AtomicUsize::new(0),
            prompt_calls: AtomicUsize::new(0),
            health_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            upscale_calls: AtomicUsize::new(0),
            last_generate: Mutex::new(None),
            last_upscale: Mutex::new(None),
            gated: false,
            gate: Notify::new(),
            generating: Notify::new(),
            upscaling: Notify::new(),
            prompting: Notify::new(),
        }
    }

    pub fn gated(mut self) -> Self {
        self.gated = true;
        self
    }

    pub fn with_catalog(self, catalog: ModelCatalog) -> Self {
        *self.catalog.lock().unwrap() = Ok(catalog);
        self
    }

    pub fn with_prompt(self, prompt: &str, negative_prompt: &str) -> Self {
        *self.prompt.lock().unwrap() = Ok(RandomPrompt {
            prompt: prompt.to_string(),
            negative_prompt: negative_prompt.to_string(),
        });
        self
    }

    pub fn with_gpu(self, gpu: GpuInfo) -> Self {
        *self.gpu.lock().unwrap() = Ok(gpu);
        self
    }

    pub fn with_image(self, bytes: Bytes, seed: Option<i64>) -> Self {
        *self.generated.lock().unwrap() = Ok(GeneratedImage {
            bytes,
            mime: "image/png".to_string(),
            seed,
        });
        self
    }

    pub fn with_upscaled(self, bytes: Bytes) -> Self {
        *self.upscaled.lock().unwrap() = Ok(bytes);
        self
    }

    pub fn fail_catalog(&self) {
        *self.catalog.lock().unwrap() = Err(failure(
            Operation::ListModels,
            503,
            "Failed to fetch models",
        ));
    }

    pub fn fail_prompt(&self) {
        *self.prompt.lock().unwrap() = Err(failure(
            Operation::RandomPrompt,
            500,
            "Failed to fetch prompt",
        ));
    }

    pub fn fail_health(&self) {
        *self.gpu.lock().unwrap() = Err(failure(
            Operation::Health,
            500,
            "Failed to fetch GPU status",
        ));
    }

    pub fn fail_generate(&self, status_code: u16, message: &str) {
        *self.generated.lock().unwrap() = Err(failure(Operation::Generate, status_code, message));
    }

    pub fn fail_upscale(&self, status_code: u16, message: &str) {
        *self.upscaled.lock().unwrap() = Err(failure(Operation::Upscale, status_code, message));
    }

    pub fn open_gate(&self) {
        self.gate.notify_one();
    }

    pub async fn wait_until_generating(&self) {
        self.generating.notified().await;
    }

    pub async fn wait_until_upscaling(&self) {
        self.upscaling.notified().await;
    }

    pub async fn wait_until_prompting(&self) {
        self.prompting.notified().await;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn prompt_calls(&self) -> usize {
        self.prompt_calls.load(Ordering::SeqCst)
    }

    pub fn health_calls(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn upscale_calls(&self) -> usize {
        self.upscale_calls.load(Ordering::SeqCst)
    }

    pub fn last_generate_request(&self) -> Option<GenerationRequest> {
        self.last_generate.lock().unwrap().clone()
    }

    pub fn last_upscale_request(&self) -> Option<UpscaleRequest> {
        self.last_upscale.lock().unwrap().clone()
    }

    async fn pass_gate(&self, entered: &Notify) {
        entered.notify_one();
        if self.gated {
            self.gate.notified().await;
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list_models(&self) -> Result<ModelCatalog, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.catalog.lock().unwrap().clone()
    }

    async fn random_prompt(&self) -> Result<RandomPrompt, BackendError> {
        self.prompt_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate(&self.prompting).await;
        self.prompt.lock().unwrap().clone()
    }

    async fn health_status(&self) -> Result<GpuInfo, BackendError> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        self.gpu.lock().unwrap().clone()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, BackendError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_generate.lock().unwrap() = Some(request.clone());
        self.pass_gate(&self.generating).await;
        self.generated.lock().unwrap().clone()
    }

    async fn upscale(&self, request: &UpscaleRequest) -> Result<Bytes, BackendError> {
        self.upscale_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_upscale.lock().unwrap() = Some(request.clone());
        self.pass_gate(&self.upscaling).await;
        self.upscaled.lock().unwrap().clone()
    }
}
