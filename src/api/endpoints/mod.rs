pub mod history;
pub mod patients;
pub mod predict;
pub mod reports;
pub mod status;

use crate::api::error::ApiError;

/// Run filesystem or pipeline work on the blocking pool.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}
