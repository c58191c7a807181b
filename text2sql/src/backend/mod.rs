//! External collaborators: hosted auth provider and row store.
//!
//! Both sit behind traits so the server can run against the hosted service
//! or entirely in memory.

mod error;
mod hosted;
mod memory;
mod types;

use std::sync::Arc;

pub use error::BackendError;
pub use hosted::HostedBackend;
pub use memory::MemoryBackend;
pub use types::{AppMetadata, AuthEvent, AuthProvider, AuthSession, AuthUser, RowStore};

/// Auth provider and row store handles used by the application.
#[derive(Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthProvider>,
    pub store: Arc<dyn RowStore>,
}

impl Backend {
    /// Hosted service at `url` authenticated with `api_key`.
    pub fn hosted(url: &str, api_key: &str) -> Self {
        let backend = Arc::new(HostedBackend::new(url, api_key));
        Self {
            auth: backend.clone(),
            store: backend,
        }
    }

    /// Share one in-memory backend for both roles.
    pub fn memory(backend: Arc<MemoryBackend>) -> Self {
        Self {
            auth: backend.clone(),
            store: backend,
        }
    }
}
