//! The session context: owns parameters, session state, catalog cache and
//! controllers, and exposes one `on_*` method per user action.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use goblin_blob::{BlobStats, BlobStore};
use image::ImageFormat;
use log::{error, info, warn};
use tokio::sync::broadcast;

use crate::catalog::{CatalogCache, GpuIndicator, ModelListView};
use crate::clients::{Backend, HttpBackend};
use crate::clipboard;
use crate::config::ClientConfig;
use crate::error::{Error, ValidationError};
use crate::params::{ParameterModel, ResolutionPreset, Shape, UpscaleModel, UpscaleStrategy};
use crate::session::{
    lock_params, seed_label, EventBus, Generated, GenerationController, GenerationError,
    ImageSlot, ImageSnapshot, InFlightGuard, SessionStateChanged, SessionStateManager,
    SessionStatus, SharedParams, StatusIndicator, StatusInputs, UpscaleController, UpscaleError,
    UpscaleInput, UpscaleOutcome,
};

/// Outcome of a random prompt request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RandomPromptOutcome {
    Applied,
    /// Another random prompt request is pending
    Busy,
    /// The request failed; parameters are unchanged
    Failed,
}

pub struct Studio {
    params: SharedParams,
    state: Arc<SessionStateManager>,
    image: Arc<ImageSlot>,
    catalog: CatalogCache,
    generation: GenerationController,
    upscale: UpscaleController,
    backend: Arc<dyn Backend>,
    events: EventBus,
    output_dir: PathBuf,
    prompt_pending: AtomicBool,
    shut_down: AtomicBool,
    gpu_indicator: Mutex<Option<GpuIndicator>>,
}

impl Studio {
    pub fn new(backend: Arc<dyn Backend>, config: &ClientConfig) -> Self {
        let params: SharedParams = Arc::new(Mutex::new(ParameterModel::with_model(
            config.default_model.clone(),
        )));
        let state = Arc::new(SessionStateManager::new());
        let image = Arc::new(ImageSlot::new(BlobStore::new()));
        let events = EventBus::new();

        Self {
            catalog: CatalogCache::new(backend.clone()),
            generation: GenerationController::new(
                backend.clone(),
                params.clone(),
                state.clone(),
                image.clone(),
                events.clone(),
            ),
            upscale: UpscaleController::new(
                backend.clone(),
                state.clone(),
                image.clone(),
                events.clone(),
            ),
            params,
            state,
            image,
            backend,
            events,
            output_dir: config.output_dir.clone(),
            prompt_pending: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
            gpu_indicator: Mutex::new(None),
        }
    }

    /// Studio talking to the HTTP backend described by `config`
    pub fn connect(config: &ClientConfig) -> Result<Self, Error> {
        let backend = HttpBackend::new(config.backend_config())?;
        Ok(Self::new(Arc::new(backend), config))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionStateChanged> {
        self.events.subscribe()
    }

    /// Copy of the current parameters
    pub fn params(&self) -> ParameterModel {
        lock_params(&self.params).clone()
    }

    pub fn session_status(&self) -> SessionStatus {
        self.state.current()
    }

    pub fn status(&self) -> StatusIndicator {
        StatusIndicator::derive(StatusInputs {
            status: self.state.current(),
            upscaling: self.upscale.is_upscaling(),
            upscale_failed: self.upscale.last_failed(),
            offline: self.catalog.is_offline(),
        })
    }

    pub fn current_image(&self) -> Result<Option<ImageSnapshot>, Error> {
        Ok(self.image.snapshot()?)
    }

    /// Seed of the displayed image, `---` when unknown or nothing is shown
    pub fn seed_label(&self) -> String {
        seed_label(self.image.current_seed())
    }

    pub fn blob_stats(&self) -> BlobStats {
        self.image.store().stats()
    }

    pub fn last_gpu_indicator(&self) -> Option<GpuIndicator> {
        self.gpu_indicator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn reject(&self, err: ValidationError) -> ValidationError {
        warn!("Rejected: {}", err);
        self.events.emit(SessionStateChanged::ValidationRejected {
            user_message: err.user_message(),
        });
        err
    }

    // ===== Catalog =====

    /// Load the model catalog (once) and build the picker data
    pub async fn on_load(&self) -> ModelListView {
        match self.catalog.ensure_models().await {
            Ok(catalog) => ModelListView::from_catalog(catalog, lock_params(&self.params).model()),
            Err(e) => {
                error!("Failed to load models: {}", e);
                ModelListView::failed()
            }
        }
    }

    /// Picker data for the cached catalog, without fetching
    pub fn model_list(&self) -> ModelListView {
        match self.catalog.models() {
            Some(catalog) => {
                ModelListView::from_catalog(catalog, lock_params(&self.params).model())
            }
            None => ModelListView::failed(),
        }
    }

    /// GPU indicator for the upscale options, checked once per session
    pub async fn refresh_gpu_indicator(&self) -> GpuIndicator {
        self.set_gpu_indicator(GpuIndicator::Checking);
        let indicator = match self.catalog.ensure_gpu_info().await {
            Ok(info) => GpuIndicator::from(info),
            Err(_) => GpuIndicator::Unknown,
        };
        self.set_gpu_indicator(indicator.clone());
        indicator
    }

    fn set_gpu_indicator(&self, indicator: GpuIndicator) {
        *self.gpu_indicator.lock().unwrap_or_else(|e| e.into_inner()) = Some(indicator.clone());
        self.events.emit(SessionStateChanged::GpuStatus { indicator });
    }

    // ===== Parameters =====

    pub fn on_prompt(&self, prompt: &str) {
        lock_params(&self.params).set_prompt(prompt);
    }

    pub fn on_negative_prompt(&self, negative_prompt: &str) {
        lock_params(&self.params).set_negative_prompt(negative_prompt);
    }

    /// Select a model. Once the catalog is loaded only its ids are accepted.
    pub fn on_select_model(&self, id: &str) -> Result<(), ValidationError> {
        let id = id.trim();
        if let Some(catalog) = self.catalog.models() {
            if !catalog.contains(id) {
                return Err(self.reject(ValidationError::UnknownModel(id.to_string())));
            }
        }
        lock_params(&self.params).set_model(id);
        Ok(())
    }

    pub fn on_shape(&self, shape: Shape) {
        lock_params(&self.params).set_shape(shape);
    }

    pub fn on_guidance(&self, value: f64) {
        lock_params(&self.params).set_guidance_scale(value);
    }

    pub fn on_seed(&self, input: &str) {
        lock_params(&self.params).set_seed(input);
    }

    pub fn on_seed_random(&self) {
        lock_params(&self.params).randomize_seed();
    }

    /// Apply a resolution preset. Presets other than off also refresh the
    /// GPU indicator, which is returned.
    pub async fn on_resolution_preset(&self, preset: ResolutionPreset) -> Option<GpuIndicator> {
        lock_params(&self.params).apply_resolution_preset(preset);
        if preset.dimensions().is_none() {
            return None;
        }
        Some(self.refresh_gpu_indicator().await)
    }

    /// Select the upscale model from its UI value. Returns whether it was
    /// applied; it is ignored while upscaling is off.
    pub fn on_upscale_model(&self, value: &str) -> Result<bool, ValidationError> {
        let model = UpscaleModel::from_selection(value)
            .ok_or_else(|| self.reject(ValidationError::UnknownUpscaleModel(value.to_string())))?;
        Ok(lock_params(&self.params).set_upscale_strategy(model))
    }

    // ===== Requests =====

    /// Fill prompt and negative prompt from the backend
    pub async fn on_random_prompt(&self) -> RandomPromptOutcome {
        let result = {
            let Some(_guard) = InFlightGuard::acquire(&self.prompt_pending) else {
                return RandomPromptOutcome::Busy;
            };
            self.backend.random_prompt().await
        };

        match result {
            Ok(prompt) => {
                {
                    let mut params = lock_params(&self.params);
                    params.set_prompt(prompt.prompt.clone());
                    params.set_negative_prompt(prompt.negative_prompt.clone());
                }
                self.events.emit(SessionStateChanged::PromptRandomized {
                    prompt: prompt.prompt,
                    negative_prompt: prompt.negative_prompt,
                });
                RandomPromptOutcome::Applied
            }
            Err(e) => {
                error!("Random prompt failed: {}", e);
                RandomPromptOutcome::Failed
            }
        }
    }

    pub async fn on_generate(&self) -> Result<Generated, GenerationError> {
        self.generation.generate().await
    }

    /// Dialog values prefilled from the active resolution preset
    pub fn upscale_defaults(&self) -> UpscaleInput {
        let params = lock_params(&self.params);
        let model = match params.upscale_strategy() {
            UpscaleStrategy::Active(model) => model,
            UpscaleStrategy::Off => UpscaleModel::Balanced,
        };
        UpscaleInput {
            width: params.target_width(),
            height: params.target_height(),
            model,
        }
    }

    pub async fn on_upscale(&self, input: UpscaleInput) -> Result<UpscaleOutcome, UpscaleError> {
        self.upscale.upscale(input).await
    }

    /// Write the displayed image as PNG into the output directory. Returns
    /// `None` when nothing is displayed.
    pub fn on_download(&self) -> Result<Option<PathBuf>, Error> {
        let Some(image) = self.image.snapshot()? else {
            return Ok(None);
        };
        let path = self.output_dir.join(download_file_name(image.seed));
        write_png(&path, &image)?;
        info!("Saved image to {}", path.display());
        Ok(Some(path))
    }

    /// Copy the displayed image to the system clipboard. Returns `false`
    /// when nothing is displayed.
    pub fn on_copy(&self) -> Result<bool, Error> {
        let Some(image) = self.image.snapshot()? else {
            return Ok(false);
        };
        clipboard::copy_image(&image)?;
        Ok(true)
    }

    /// End the session, releasing the held image. A generation still in
    /// flight keeps its status and its result is dropped when it arrives.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.image.close() {
            info!("Session ended, image released");
        }
        if !self.state.is_generating() {
            self.state.reset();
        }
    }
}

impl Drop for Studio {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// `goblin-<seed>.png`, or the current unix time in milliseconds when the
/// seed is unknown
pub fn download_file_name(seed: Option<i64>) -> String {
    let stem = seed.map(|s| s.to_string()).unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
            .to_string()
    });
    format!("goblin-{}.png", stem)
}

fn write_png(path: &Path, image: &ImageSnapshot) -> Result<(), Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    if image.mime == "image/png" {
        std::fs::write(path, &image.bytes)?;
        return Ok(());
    }

    let decoded = image::load_from_memory(&image.bytes)?;
    let mut out = Cursor::new(Vec::new());
    decoded.write_to(&mut out, ImageFormat::Png)?;
    std::fs::write(path, out.into_inner())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CategoryInfo, GpuInfo, ModelCatalog, ModelCategory, ModelEntry};
    use crate::testing::{png_bytes, MockBackend};
    use bytes::Bytes;

    fn studio_with(backend: MockBackend) -> (Arc<MockBackend>, Studio) {
        let backend = Arc::new(backend);
        let studio = Studio::new(backend.clone(), &ClientConfig::default());
        (backend, studio)
    }

    fn catalog() -> ModelCatalog {
        ModelCatalog::new(
            vec![ModelCategory {
                key: "general".to_string(),
                info: CategoryInfo::default(),
                models: vec![
                    ModelEntry::new("goblin-sd", None, vec![]),
                    ModelEntry::new("goblin-xl", None, vec!["slow".to_string()]),
                ],
            }],
            None,
        )
    }

    #[tokio::test]
    async fn test_model_selection_checked_against_catalog() {
        let (backend, studio) = studio_with(MockBackend::new().with_catalog(catalog()));

        // Before the catalog loads any id is accepted
        studio.on_select_model("custom").unwrap();
        assert_eq!(studio.params().model(), "custom");

        studio.on_load().await;
        assert_eq!(
            studio.on_select_model("missing"),
            Err(ValidationError::UnknownModel("missing".to_string()))
        );
        assert_eq!(studio.params().model(), "custom");

        studio.on_select_model("goblin-xl").unwrap();
        let ModelListView::Loaded { groups, .. } = studio.model_list() else {
            panic!("catalog should be loaded");
        };
        assert!(groups[0].models[1].active);

        studio.on_load().await;
        assert_eq!(backend.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_catalog_failure_goes_offline() {
        let backend = MockBackend::new();
        backend.fail_catalog();
        let (_, studio) = studio_with(backend);

        assert_eq!(studio.on_load().await, ModelListView::failed());
        assert_eq!(studio.status(), StatusIndicator::Offline);
        assert_eq!(studio.status().tone(), crate::session::Tone::Error);
    }

    #[tokio::test]
    async fn test_resolution_preset_checks_gpu_once() {
        let (backend, studio) = studio_with(MockBackend::new().with_gpu(GpuInfo {
            available: true,
            device_name: None,
        }));

        assert_eq!(studio.on_resolution_preset(ResolutionPreset::Off).await, None);
        assert_eq!(backend.health_calls(), 0);

        let indicator = studio
            .on_resolution_preset(ResolutionPreset::Square(2048))
            .await
            .unwrap();
        assert_eq!(indicator.label(), "GPU: GPU");
        studio
            .on_resolution_preset(ResolutionPreset::Widescreen)
            .await
            .unwrap();
        assert_eq!(backend.health_calls(), 1);
        assert_eq!(studio.params().target_height(), Some(1080));
    }

    #[tokio::test]
    async fn test_gpu_failure_shows_unknown() {
        let backend = MockBackend::new();
        backend.fail_health();
        let (_, studio) = studio_with(backend);

        let indicator = studio.refresh_gpu_indicator().await;
        assert_eq!(indicator, GpuIndicator::Unknown);
        assert_eq!(indicator.label(), "Status unknown");
        assert_eq!(studio.last_gpu_indicator(), Some(GpuIndicator::Unknown));
    }

    #[tokio::test]
    async fn test_upscale_model_selection() {
        let (_, studio) = studio_with(MockBackend::new());

        assert_eq!(studio.on_upscale_model("default"), Ok(false));
        assert_eq!(
            studio.on_upscale_model("off"),
            Err(ValidationError::UnknownUpscaleModel("off".to_string()))
        );

        studio
            .on_resolution_preset(ResolutionPreset::Square(1024))
            .await;
        assert_eq!(studio.on_upscale_model("ultrasharp"), Ok(true));
        assert_eq!(studio.params().upscale_strategy().as_str(), "ultrasharp");
        assert_eq!(studio.on_upscale_model("default"), Ok(true));
        assert_eq!(studio.params().upscale_strategy().as_str(), "balanced");
    }

    #[tokio::test]
    async fn test_random_prompt_fills_both_fields() {
        let (_, studio) = studio_with(MockBackend::new().with_prompt("a goblin bard", "blurry"));
        studio.on_prompt("old");

        assert_eq!(studio.on_random_prompt().await, RandomPromptOutcome::Applied);
        let params = studio.params();
        assert_eq!(params.prompt(), "a goblin bard");
        assert_eq!(params.negative_prompt(), "blurry");
    }

    #[tokio::test]
    async fn test_random_prompt_failure_keeps_params() {
        let backend = MockBackend::new();
        backend.fail_prompt();
        let (_, studio) = studio_with(backend);
        studio.on_prompt("keep me");

        assert_eq!(studio.on_random_prompt().await, RandomPromptOutcome::Failed);
        assert_eq!(studio.params().prompt(), "keep me");
    }

    #[tokio::test]
    async fn test_random_prompt_single_flight() {
        let backend = Arc::new(MockBackend::new().with_prompt("p", "n").gated());
        let studio = Arc::new(Studio::new(backend.clone(), &ClientConfig::default()));

        let pending = {
            let studio = studio.clone();
            tokio::spawn(async move { studio.on_random_prompt().await })
        };
        backend.wait_until_prompting().await;

        assert_eq!(studio.on_random_prompt().await, RandomPromptOutcome::Busy);
        backend.open_gate();
        assert_eq!(pending.await.unwrap(), RandomPromptOutcome::Applied);
        assert_eq!(backend.prompt_calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_random_prompt_clears_pending() {
        let backend = Arc::new(MockBackend::new().with_prompt("p", "n").gated());
        let studio = Arc::new(Studio::new(backend.clone(), &ClientConfig::default()));

        let pending = {
            let studio = studio.clone();
            tokio::spawn(async move { studio.on_random_prompt().await })
        };
        backend.wait_until_prompting().await;
        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());

        backend.open_gate();
        assert_eq!(studio.on_random_prompt().await, RandomPromptOutcome::Applied);
        assert_eq!(backend.prompt_calls(), 2);
    }

    #[tokio::test]
    async fn test_status_follows_generation() {
        let (backend, studio) = studio_with(MockBackend::new());
        assert_eq!(studio.status(), StatusIndicator::Ready);

        studio.on_prompt("a goblin");
        studio.on_generate().await.unwrap();
        assert_eq!(studio.status(), StatusIndicator::Ready);

        backend.fail_generate(500, "boom");
        studio.on_generate().await.unwrap_err();
        assert_eq!(studio.status(), StatusIndicator::Error);
        assert_eq!(studio.session_status(), SessionStatus::Error);
    }

    #[tokio::test]
    async fn test_upscale_defaults_follow_preset() {
        let (_, studio) = studio_with(MockBackend::new());
        assert_eq!(
            studio.upscale_defaults(),
            UpscaleInput {
                width: None,
                height: None,
                model: UpscaleModel::Balanced,
            }
        );

        studio
            .on_resolution_preset(ResolutionPreset::Widescreen)
            .await;
        let input = studio.upscale_defaults();
        assert_eq!((input.width, input.height), (Some(1920), Some(1080)));
    }

    #[tokio::test]
    async fn test_download_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::new().with_image(png_bytes(3, 2), Some(1234)));
        let config = ClientConfig {
            output_dir: dir.path().to_path_buf(),
            ..ClientConfig::default()
        };
        let studio = Studio::new(backend, &config);

        assert_eq!(studio.on_download().unwrap(), None);

        studio.on_prompt("a goblin");
        studio.on_generate().await.unwrap();
        let path = studio.on_download().unwrap().unwrap();

        assert_eq!(path, dir.path().join("goblin-1234.png"));
        let written = image::open(&path).unwrap();
        assert_eq!((written.width(), written.height()), (3, 2));
    }

    #[tokio::test]
    async fn test_download_converts_upscaled_jpeg() {
        let dir = tempfile::tempdir().unwrap();

        let jpeg = {
            let img = image::RgbImage::from_pixel(5, 5, image::Rgb([200, 10, 10]));
            let mut out = Cursor::new(Vec::new());
            img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
            Bytes::from(out.into_inner())
        };
        let backend = Arc::new(MockBackend::new().with_upscaled(jpeg));
        let config = ClientConfig {
            output_dir: dir.path().to_path_buf(),
            ..ClientConfig::default()
        };
        let studio = Studio::new(backend, &config);

        studio.on_prompt("a goblin");
        studio.on_generate().await.unwrap();
        studio
            .on_upscale(UpscaleInput {
                width: Some(1024),
                height: Some(1024),
                model: UpscaleModel::Balanced,
            })
            .await
            .unwrap();

        let path = studio.on_download().unwrap().unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_download_file_name() {
        assert_eq!(download_file_name(Some(42)), "goblin-42.png");
        let name = download_file_name(None);
        assert!(name.starts_with("goblin-") && name.ends_with(".png"));
        let millis = &name["goblin-".len()..name.len() - ".png".len()];
        assert!(millis.parse::<u128>().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_shutdown_releases_image_once() {
        let (_, studio) = studio_with(MockBackend::new());
        studio.on_prompt("a goblin");
        studio.on_generate().await.unwrap();
        assert_eq!(studio.blob_stats().live, 1);

        studio.shutdown();
        studio.shutdown();
        let stats = studio.blob_stats();
        assert_eq!(stats.live, 0);
        assert_eq!(stats.released, 1);
        assert_eq!(studio.seed_label(), "---");
    }

    #[tokio::test]
    async fn test_shutdown_during_generation() {
        let backend = Arc::new(
            MockBackend::new()
                .with_image(png_bytes(2, 2), Some(5))
                .gated(),
        );
        let studio = Arc::new(Studio::new(backend.clone(), &ClientConfig::default()));
        studio.on_prompt("a goblin");

        let pending = {
            let studio = studio.clone();
            tokio::spawn(async move { studio.on_generate().await })
        };
        backend.wait_until_generating().await;

        studio.shutdown();
        assert_eq!(studio.session_status(), SessionStatus::Generating);
        assert_eq!(
            studio.on_generate().await.unwrap_err(),
            GenerationError::SessionClosed
        );
        assert_eq!(backend.generate_calls(), 1);

        backend.open_gate();
        assert_eq!(
            pending.await.unwrap().unwrap_err(),
            GenerationError::SessionClosed
        );
        assert_eq!(studio.session_status(), SessionStatus::Idle);
        let stats = studio.blob_stats();
        assert_eq!((stats.acquired, stats.released, stats.live), (0, 0, 0));
        assert!(studio.current_image().unwrap().is_none());
    }

    #[test]
    fn test_copy_without_image_is_noop() {
        let (_, studio) = studio_with(MockBackend::new());
        assert!(!studio.on_copy().unwrap());
    }
}
