pub mod error;
pub mod feed;
pub mod notify;
pub mod ratelimit;
pub mod reactions;
pub mod redact;
pub mod search;

pub use error::{CoreError, Result};

/// Run a blocking store call off the async runtime, folding both join
/// failures and store failures into the core taxonomy.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CoreError::Store(anyhow::anyhow!("blocking task failed: {e}")))?
        .map_err(CoreError::Store)
}
