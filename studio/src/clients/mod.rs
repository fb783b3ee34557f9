mod backend;
mod config;
mod error;
mod http;
mod wire;

pub use backend::{Backend, GeneratedImage, RandomPrompt, UpscaleRequest};
pub use config::BackendConfig;
pub use error::{BackendError, Operation};
pub use http::HttpBackend;
