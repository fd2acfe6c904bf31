//! Per-stage time limits for provider calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{RagError, Result, Stage};

/// Await `fut`, failing with [`RagError::Timeout`] if `limit` elapses first.
///
/// With no limit the future runs to completion. On timeout the future is
/// dropped, which releases any connection it holds.
pub(crate) async fn bounded<T, F>(stage: Stage, limit: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(limit) = limit else {
        return fut.await;
    };
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(%stage, limit_ms = limit.as_millis() as u64, "provider call timed out");
            Err(RagError::Timeout { stage, limit })
        }
    }
}
