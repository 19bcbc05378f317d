//! Timeout enforcement.
//!
//! Every driver call made by the router or the health checker goes through
//! [`with_deadline`], so a hung socket surfaces as a `Timeout` instead of
//! parking the caller forever.

use std::future::Future;
use std::time::Duration;

use tokio::time;

use crate::pool::BackendError;

/// Run `fut`, failing with [`BackendError::Timeout`] once `deadline` elapses.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    match time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(deadline)),
    }
}
