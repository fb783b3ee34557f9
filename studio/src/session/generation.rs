use std::sync::Arc;

use goblin_blob::BlobId;
use log::{error, info, warn};

use super::events::{EventBus, SessionStateChanged};
use super::slot::{seed_label, ImageSlot};
use super::state_manager::{SessionEvent, SessionStateManager, TransitionRejection};
use super::{lock_params, SharedParams};
use crate::clients::{Backend, BackendError, Operation};
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Generation already in progress: {0}")]
    Busy(#[from] TransitionRejection),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Session has ended")]
    SessionClosed,
}

impl GenerationError {
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Validation(e) => e.user_message(),
            GenerationError::Busy(_) => "A generation is already running.".to_string(),
            GenerationError::Backend(e) => e.user_message(),
            GenerationError::SessionClosed => "The session has ended.".to_string(),
        }
    }
}

/// Image installed by a successful generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generated {
    pub image: BlobId,
    pub seed: Option<i64>,
}

/// Runs one generation request from parameter snapshot to installed image.
pub struct GenerationController {
    backend: Arc<dyn Backend>,
    params: SharedParams,
    state: Arc<SessionStateManager>,
    image: Arc<ImageSlot>,
    events: EventBus,
}

impl GenerationController {
    pub fn new(
        backend: Arc<dyn Backend>,
        params: SharedParams,
        state: Arc<SessionStateManager>,
        image: Arc<ImageSlot>,
        events: EventBus,
    ) -> Self {
        Self {
            backend,
            params,
            state,
            image,
            events,
        }
    }

    /// Generate an image from the current parameters.
    ///
    /// Rejected without a request when the prompt is blank or another
    /// generation is running. On failure the status becomes `Error` and the
    /// displayed image stays as it was. An image that arrives after the
    /// session ended is dropped.
    pub async fn generate(&self) -> Result<Generated, GenerationError> {
        if self.image.is_closed() {
            return Err(GenerationError::SessionClosed);
        }
        let request = lock_params(&self.params).to_request();

        if request.prompt.trim().is_empty() {
            let err = ValidationError::EmptyPrompt;
            warn!("Generation rejected: {}", err);
            self.events.emit(SessionStateChanged::ValidationRejected {
                user_message: err.user_message(),
            });
            return Err(err.into());
        }

        if let Err(rejection) = self.state.transition(SessionEvent::Generate) {
            warn!("{}", rejection);
            return Err(rejection.into());
        }
        self.events.emit(SessionStateChanged::Generating);

        match self.backend.generate(&request).await {
            Ok(generated) => {
                let seed = generated.seed;
                let Some(image) = self.image.install(generated.bytes, &generated.mime, seed) else {
                    info!("Discarding generated image: session has ended");
                    self.state.reset();
                    return Err(GenerationError::SessionClosed);
                };
                self.finish(SessionEvent::Succeeded);

                info!("Generated image {} (seed {})", image, seed_label(seed));
                self.events.emit(SessionStateChanged::ImageReady {
                    url: image.url(),
                    seed_label: seed_label(seed),
                });
                Ok(Generated { image, seed })
            }
            Err(e) => {
                error!("Generation failed: {}", e);
                self.finish(SessionEvent::Failed);
                self.events.emit(SessionStateChanged::Failed {
                    operation: Operation::Generate.to_string(),
                    error_message: e.to_string(),
                    user_message: e.user_message(),
                });
                Err(e.into())
            }
        }
    }

    fn finish(&self, event: SessionEvent) {
        if let Err(rejection) = self.state.transition(event) {
            // Only reachable if something reset the status mid-request
            error!("{}", rejection);
            self.state.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParameterModel, ResolutionPreset};
    use crate::session::SessionStatus;
    use crate::testing::MockBackend;
    use bytes::Bytes;
    use goblin_blob::BlobStore;
    use std::sync::Mutex;

    struct Fixture {
        backend: Arc<MockBackend>,
        params: SharedParams,
        state: Arc<SessionStateManager>,
        image: Arc<ImageSlot>,
        controller: Arc<GenerationController>,
    }

    fn fixture(backend: MockBackend) -> Fixture {
        let backend = Arc::new(backend);
        let params: SharedParams = Arc::new(Mutex::new(ParameterModel::new()));
        let state = Arc::new(SessionStateManager::new());
        let image = Arc::new(ImageSlot::new(BlobStore::new()));
        let controller = Arc::new(GenerationController::new(
            backend.clone(),
            params.clone(),
            state.clone(),
            image.clone(),
            EventBus::new(),
        ));
        Fixture {
            backend,
            params,
            state,
            image,
            controller,
        }
    }

    fn set_prompt(fixture: &Fixture, prompt: &str) {
        fixture.params.lock().unwrap().set_prompt(prompt);
    }

    #[tokio::test]
    async fn test_blank_prompt_rejected_before_request() {
        let fx = fixture(MockBackend::new());
        set_prompt(&fx, "   ");

        let err = fx.controller.generate().await.unwrap_err();
        assert_eq!(err, GenerationError::Validation(ValidationError::EmptyPrompt));
        assert_eq!(fx.backend.generate_calls(), 0);
        assert_eq!(fx.state.current(), SessionStatus::Idle);
        assert_eq!(fx.image.store().acquired_count(), 0);
    }

    #[tokio::test]
    async fn test_success_installs_image_and_seed() {
        let fx = fixture(MockBackend::new().with_image(Bytes::from_static(b"B"), Some(42)));
        set_prompt(&fx, "a goblin");

        let generated = fx.controller.generate().await.unwrap();

        assert_eq!(generated.seed, Some(42));
        assert_eq!(fx.state.current(), SessionStatus::Success);
        let snapshot = fx.image.snapshot().unwrap().unwrap();
        assert_eq!(snapshot.id, generated.image);
        assert_eq!(snapshot.bytes, Bytes::from_static(b"B"));
        assert_eq!(snapshot.seed, Some(42));
        assert_eq!(fx.backend.generate_calls(), 1);
    }

    #[tokio::test]
    async fn test_second_success_releases_previous_once() {
        let fx = fixture(MockBackend::new().with_image(Bytes::from_static(b"B"), None));
        set_prompt(&fx, "a goblin");

        let first = fx.controller.generate().await.unwrap();
        let second = fx.controller.generate().await.unwrap();

        assert_ne!(first.image, second.image);
        assert_eq!(fx.image.current_id(), Some(second.image));
        assert_eq!(fx.image.current_seed(), None);
        let stats = fx.image.store().stats();
        assert_eq!(stats.acquired, 2);
        assert_eq!(stats.released, 1);
        assert_eq!(stats.live, 1);
    }

    #[tokio::test]
    async fn test_failure_keeps_current_image() {
        let fx = fixture(MockBackend::new().with_image(Bytes::from_static(b"B"), Some(7)));
        set_prompt(&fx, "a goblin");
        let first = fx.controller.generate().await.unwrap();

        fx.backend.fail_generate(500, "CUDA out of memory");
        let err = fx.controller.generate().await.unwrap_err();

        assert_eq!(err.user_message(), "Generation failed: CUDA out of memory");
        assert_eq!(fx.state.current(), SessionStatus::Error);
        assert_eq!(fx.image.current_id(), Some(first.image));
        assert_eq!(fx.image.current_seed(), Some(7));
        assert_eq!(fx.image.store().released_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_rejected_while_in_flight() {
        let backend = MockBackend::new()
            .with_image(Bytes::from_static(b"B"), Some(1))
            .gated();
        let fx = fixture(backend);
        set_prompt(&fx, "a goblin");

        let controller = fx.controller.clone();
        let pending = tokio::spawn(async move { controller.generate().await });
        fx.backend.wait_until_generating().await;

        let err = fx.controller.generate().await.unwrap_err();
        assert!(matches!(err, GenerationError::Busy(_)));
        assert_eq!(fx.backend.generate_calls(), 1);
        assert_eq!(fx.image.store().acquired_count(), 0);

        fx.backend.open_gate();
        pending.await.unwrap().unwrap();
        assert_eq!(fx.state.current(), SessionStatus::Success);
    }

    #[tokio::test]
    async fn test_result_dropped_after_slot_closed() {
        let backend = MockBackend::new()
            .with_image(Bytes::from_static(b"B"), Some(1))
            .gated();
        let fx = fixture(backend);
        set_prompt(&fx, "a goblin");

        let controller = fx.controller.clone();
        let pending = tokio::spawn(async move { controller.generate().await });
        fx.backend.wait_until_generating().await;

        fx.image.close();
        fx.backend.open_gate();

        let err = pending.await.unwrap().unwrap_err();
        assert_eq!(err, GenerationError::SessionClosed);
        assert_eq!(fx.state.current(), SessionStatus::Idle);
        assert_eq!(fx.image.store().acquired_count(), 0);

        let err = fx.controller.generate().await.unwrap_err();
        assert_eq!(err, GenerationError::SessionClosed);
        assert_eq!(fx.backend.generate_calls(), 1);
    }

    #[tokio::test]
    async fn test_request_is_snapshot_at_start() {
        let backend = MockBackend::new()
            .with_image(Bytes::from_static(b"B"), None)
            .gated();
        let fx = fixture(backend);
        {
            let mut params = fx.params.lock().unwrap();
            params.set_prompt("a goblin");
            params.apply_resolution_preset(ResolutionPreset::Square(2048));
        }

        let controller = fx.controller.clone();
        let pending = tokio::spawn(async move { controller.generate().await });
        fx.backend.wait_until_generating().await;

        set_prompt(&fx, "something else");
        fx.backend.open_gate();
        pending.await.unwrap().unwrap();

        let sent = fx.backend.last_generate_request().unwrap();
        assert_eq!(sent.prompt, "a goblin");
        assert_eq!(sent.width, Some(2048));
        assert_eq!(sent.height, Some(2048));
    }
}
