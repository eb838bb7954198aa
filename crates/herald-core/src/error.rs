use thiserror::Error;

/// Error taxonomy shared by the feed, reaction, and search engines.
/// Validation failures carry user-facing text; store failures carry the
/// underlying report, which callers log rather than expose.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("{message}")]
    RateLimited { message: String },

    #[error("not found")]
    NotFound,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("store unavailable")]
    Store(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
