use thiserror::Error;

/// Failures reported by the hosted auth provider or row store.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("insert into {table} rejected: {reason}")]
    Rejected { table: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
