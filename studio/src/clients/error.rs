/// Remote operations offered by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Operation {
    #[strum(to_string = "Model catalog")]
    ListModels,
    #[strum(to_string = "Random prompt")]
    RandomPrompt,
    #[strum(to_string = "Health check")]
    Health,
    #[strum(to_string = "Generation")]
    Generate,
    #[strum(to_string = "Upscale")]
    Upscale,
}

impl Operation {
    /// Message used when a failed response carries no body
    pub fn fallback_message(self) -> &'static str {
        match self {
            Operation::ListModels => "Failed to fetch models",
            Operation::RandomPrompt => "Failed to fetch prompt",
            Operation::Health => "Failed to fetch GPU status",
            Operation::Generate => "Generation failed",
            Operation::Upscale => "Upscale failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("{operation} request failed with status {status_code}: {message}")]
    RequestFailed {
        operation: Operation,
        status_code: u16,
        message: String,
    },
    #[error("{operation} request could not be sent: {message}")]
    Transport {
        operation: Operation,
        message: String,
    },
    #[error("{operation} response could not be read: {message}")]
    InvalidResponse {
        operation: Operation,
        message: String,
    },
    #[error("HTTP client setup failed: {0}")]
    Setup(String),
}

impl BackendError {
    pub fn operation(&self) -> Option<Operation> {
        match self {
            BackendError::RequestFailed { operation, .. }
            | BackendError::Transport { operation, .. }
            | BackendError::InvalidResponse { operation, .. } => Some(*operation),
            BackendError::Setup(_) => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            BackendError::RequestFailed { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Returns a user-friendly error message naming the failed operation
    pub fn user_message(&self) -> String {
        match self {
            BackendError::RequestFailed {
                operation, message, ..
            } => format!("{} failed: {}", operation, message),
            BackendError::Transport { operation, .. } => {
                format!("{} failed: could not reach the backend", operation)
            }
            BackendError::InvalidResponse { operation, .. } => {
                format!("{} failed: unexpected response from the backend", operation)
            }
            BackendError::Setup(msg) => format!("Could not start the HTTP client: {}", msg),
        }
    }
}
