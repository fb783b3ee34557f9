use derive_more::From;

/// Lowest accepted upscale dimension, in pixels
pub const UPSCALE_MIN: u32 = 512;
/// Highest accepted upscale dimension, in pixels
pub const UPSCALE_MAX: u32 = 4096;

/// Local, pre-flight rejection. Never reaches the network and leaves all
/// state unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Prompt is empty")]
    EmptyPrompt,
    #[error("Upscale width and height are both required")]
    MissingDimensions,
    #[error(
        "Upscale dimensions {width}x{height} are outside {}-{}",
        UPSCALE_MIN,
        UPSCALE_MAX
    )]
    DimensionsOutOfRange { width: u32, height: u32 },
    #[error("Unknown model: {0}")]
    UnknownModel(String),
    #[error("Unknown resolution preset: {0}")]
    UnknownPreset(String),
    #[error("Unknown shape: {0}")]
    UnknownShape(String),
    #[error("Invalid guidance scale: {0}")]
    InvalidGuidance(String),
    #[error("Unknown upscale model: {0}")]
    UnknownUpscaleModel(String),
}

impl ValidationError {
    /// Returns a user-friendly message suitable for display in the UI
    pub fn user_message(&self) -> String {
        match self {
            ValidationError::EmptyPrompt => "Enter a prompt first.".to_string(),
            ValidationError::MissingDimensions | ValidationError::DimensionsOutOfRange { .. } => {
                format!(
                    "Please enter valid dimensions ({}-{})",
                    UPSCALE_MIN, UPSCALE_MAX
                )
            }
            ValidationError::UnknownModel(id) => format!("Model '{}' is not available.", id),
            ValidationError::UnknownPreset(value) => {
                format!("'{}' is not a resolution preset.", value)
            }
            ValidationError::UnknownShape(value) => format!("'{}' is not a shape.", value),
            ValidationError::InvalidGuidance(value) => {
                format!("'{}' is not a guidance value.", value)
            }
            ValidationError::UnknownUpscaleModel(value) => {
                format!("'{}' is not an upscale model.", value)
            }
        }
    }
}

#[derive(Debug, From)]
pub enum Error {
    #[from]
    Validation(ValidationError),

    #[from]
    Generation(crate::session::GenerationError),

    #[from]
    Upscale(crate::session::UpscaleError),

    #[from]
    Backend(crate::clients::BackendError),

    #[from]
    Config(crate::config::ConfigError),

    #[from]
    Copy(crate::clipboard::CopyError),

    #[from]
    Blob(goblin_blob::BlobError),

    #[from]
    Image(image::ImageError),

    #[from]
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Validation(e) => write!(f, "{}", e),
            Error::Generation(e) => write!(f, "{}", e),
            Error::Upscale(e) => write!(f, "{}", e),
            Error::Backend(e) => write!(f, "{}", e),
            Error::Config(e) => write!(f, "{}", e),
            Error::Copy(e) => write!(f, "{}", e),
            Error::Blob(e) => write!(f, "{}", e),
            Error::Image(e) => write!(f, "{}", e),
            Error::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Returns a user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(e) => e.user_message(),
            Error::Generation(e) => e.user_message(),
            Error::Upscale(e) => e.user_message(),
            Error::Backend(e) => e.user_message(),
            Error::Config(e) => e.user_message(),
            Error::Copy(e) => e.user_message(),
            Error::Blob(_) => "The current image is no longer available.".to_string(),
            Error::Image(e) => format!("Image could not be converted: {}", e),
            Error::Io(e) => format!("File error: {}", e),
        }
    }
}
