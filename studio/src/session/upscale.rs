use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use goblin_blob::BlobId;
use image::ImageFormat;
use log::{debug, error, info, warn};

use super::events::{EventBus, SessionStateChanged};
use super::slot::{seed_label, ImageSlot};
use super::state_manager::SessionStateManager;
use super::InFlightGuard;
use crate::clients::{Backend, BackendError, Operation, UpscaleRequest};
use crate::error::{ValidationError, UPSCALE_MAX, UPSCALE_MIN};
use crate::params::UpscaleModel;

/// Content type of upscaled images
pub const UPSCALED_MIME: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UpscaleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("An upscale is already running")]
    InFlight,

    #[error("Cannot upscale while generating")]
    Generating,

    #[error("Current image could not be re-encoded: {0}")]
    Encode(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl UpscaleError {
    pub fn user_message(&self) -> String {
        match self {
            UpscaleError::Validation(e) => e.user_message(),
            UpscaleError::InFlight => "An upscale is already running.".to_string(),
            UpscaleError::Generating => "Wait for the current generation to finish.".to_string(),
            UpscaleError::Encode(_) => {
                "Upscale failed: could not read the current image".to_string()
            }
            UpscaleError::Backend(e) => e.user_message(),
        }
    }
}

/// What the user asked for in the upscale dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpscaleInput {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub model: UpscaleModel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpscaleOutcome {
    /// Nothing is displayed, so there is nothing to upscale
    NoImage,
    /// The upscaled image replaced the source, seed kept
    Upscaled { image: BlobId, seed: Option<i64> },
    /// A new generation replaced the source while the request was pending;
    /// the result was discarded
    Superseded,
}

fn validate_dimensions(
    width: Option<u32>,
    height: Option<u32>,
) -> Result<(u32, u32), ValidationError> {
    let (Some(width), Some(height)) = (width, height) else {
        return Err(ValidationError::MissingDimensions);
    };
    let range = UPSCALE_MIN..=UPSCALE_MAX;
    if !range.contains(&width) || !range.contains(&height) {
        return Err(ValidationError::DimensionsOutOfRange { width, height });
    }
    Ok((width, height))
}

/// Decode the displayed image and encode it as PNG
fn reencode_png(bytes: &[u8]) -> Result<Bytes, UpscaleError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| UpscaleError::Encode(e.to_string()))?;
    let mut out = Cursor::new(Vec::new());
    decoded
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| UpscaleError::Encode(e.to_string()))?;
    Ok(Bytes::from(out.into_inner()))
}

/// Upscales the displayed image in place.
pub struct UpscaleController {
    backend: Arc<dyn Backend>,
    state: Arc<SessionStateManager>,
    image: Arc<ImageSlot>,
    events: EventBus,
    in_flight: AtomicBool,
    /// Image whose last upscale failed
    failed_on: Mutex<Option<BlobId>>,
}

impl UpscaleController {
    pub fn new(
        backend: Arc<dyn Backend>,
        state: Arc<SessionStateManager>,
        image: Arc<ImageSlot>,
        events: EventBus,
    ) -> Self {
        Self {
            backend,
            state,
            image,
            events,
            in_flight: AtomicBool::new(false),
            failed_on: Mutex::new(None),
        }
    }

    pub fn is_upscaling(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Whether the last upscale of the displayed image failed
    pub fn last_failed(&self) -> bool {
        let failed_on = *self.failed_on.lock().unwrap_or_else(|e| e.into_inner());
        failed_on.is_some() && failed_on == self.image.current_id()
    }

    fn set_failed_on(&self, image: Option<BlobId>) {
        *self.failed_on.lock().unwrap_or_else(|e| e.into_inner()) = image;
    }

    pub async fn upscale(&self, input: UpscaleInput) -> Result<UpscaleOutcome, UpscaleError> {
        let source = self
            .image
            .snapshot()
            .map_err(|e| UpscaleError::Encode(e.to_string()))?;
        let Some(source) = source else {
            debug!("Upscale requested without an image");
            return Ok(UpscaleOutcome::NoImage);
        };

        let (width, height) = match validate_dimensions(input.width, input.height) {
            Ok(dims) => dims,
            Err(e) => {
                warn!("Upscale rejected: {}", e);
                self.events.emit(SessionStateChanged::ValidationRejected {
                    user_message: e.user_message(),
                });
                return Err(e.into());
            }
        };

        if self.state.is_generating() {
            return Err(UpscaleError::Generating);
        }
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            warn!("Upscale rejected: already in flight");
            return Err(UpscaleError::InFlight);
        };

        self.events.emit(SessionStateChanged::Upscaling);
        let result = self.request(&source.bytes, width, height, &input.model).await;

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Upscale failed: {}", e);
                self.set_failed_on(Some(source.id));
                self.events.emit(SessionStateChanged::Failed {
                    operation: Operation::Upscale.to_string(),
                    error_message: e.to_string(),
                    user_message: e.user_message(),
                });
                return Err(e);
            }
        };

        match self.image.replace_if_current(source.id, bytes, UPSCALED_MIME) {
            Some(image) => {
                self.set_failed_on(None);
                info!("Upscaled image {} to {}x{}", image, width, height);
                self.events.emit(SessionStateChanged::Upscaled {
                    url: image.url(),
                    seed_label: seed_label(source.seed),
                });
                Ok(UpscaleOutcome::Upscaled {
                    image,
                    seed: source.seed,
                })
            }
            None if self.image.is_closed() => {
                info!("Discarding upscale of {}: session has ended", source.id);
                Ok(UpscaleOutcome::Superseded)
            }
            None => {
                info!("Discarding upscale of {}: image was replaced", source.id);
                Ok(UpscaleOutcome::Superseded)
            }
        }
    }

    async fn request(
        &self,
        source: &[u8],
        width: u32,
        height: u32,
        model: &UpscaleModel,
    ) -> Result<Bytes, UpscaleError> {
        let request = UpscaleRequest {
            image: reencode_png(source)?,
            width,
            height,
            model: model.as_str().to_string(),
        };
        Ok(self.backend.upscale(&request).await?)
    }
}
