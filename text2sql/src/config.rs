//! Runtime configuration assembled from CLI flags and environment.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default port for the local server.
pub const DEFAULT_PORT: u16 = 58232;

/// Account seeded into the in-memory backend.
pub const DEMO_EMAIL: &str = "demo@text2sql.ai";
pub const DEMO_PASSWORD: &str = "demo";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("port must be non-zero")]
    ZeroPort,

    #[error("backend URL is set but no backend key was given")]
    MissingBackendKey,

    #[error("backend URL must start with http:// or https://: {0}")]
    InvalidBackendUrl(String),
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Hosted backend location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    pub key: String,
}

/// Email/password pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub open_browser: bool,
    pub reply_delay: Duration,
    pub processing_delay: Duration,
    pub redirect_delay: Duration,
    /// `None` runs against the in-memory backend.
    pub backend: Option<BackendConfig>,
    pub receipt_dir: PathBuf,
    /// Signs in against the in-memory backend.
    pub demo_account: Credentials,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            open_browser: false,
            reply_delay: Duration::from_millis(500),
            processing_delay: Duration::from_millis(2000),
            redirect_delay: Duration::from_millis(1000),
            backend: None,
            receipt_dir: default_receipt_dir(),
            demo_account: Credentials {
                email: DEMO_EMAIL.to_string(),
                password: DEMO_PASSWORD.to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Build from raw option values, checking consistency.
    pub fn from_parts(
        port: u16,
        backend_url: Option<String>,
        backend_key: Option<String>,
        receipt_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        if port == 0 {
            return Err(ConfigError::ZeroPort);
        }

        let backend = match (backend_url, backend_key) {
            (Some(url), Some(key)) => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::InvalidBackendUrl(url));
                }
                Some(BackendConfig { url, key })
            }
            (Some(_), None) => return Err(ConfigError::MissingBackendKey),
            (None, _) => None,
        };

        Ok(Self {
            port,
            backend,
            receipt_dir: receipt_dir.unwrap_or_else(default_receipt_dir),
            ..Self::default()
        })
    }

    /// Base URL the server is reachable at.
    pub fn site_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

/// The user's download directory, or the working directory when unknown.
fn default_receipt_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}
