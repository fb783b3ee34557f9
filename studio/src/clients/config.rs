use std::fmt;
use std::time::Duration;

/// Connection settings for the image backend
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL without a trailing path, e.g. `http://127.0.0.1:8000`
    pub base_url: String,
    /// Per-request timeout. Generation can take minutes on CPU.
    pub timeout: Duration,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(300),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Join a path onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout.as_secs())
            .finish()
    }
}
