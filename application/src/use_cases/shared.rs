//! Shared utilities for use cases.
//!
//! Cancellation checking and cancellable waits used by the agent loop.

use crate::use_cases::run_agent::RunAgentError;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Check if cancellation has been requested.
///
/// Returns `Err(RunAgentError::Cancelled)` if the token exists and is cancelled.
pub(crate) fn check_cancelled(token: &Option<CancellationToken>) -> Result<(), RunAgentError> {
    if let Some(token) = token
        && token.is_cancelled()
    {
        return Err(RunAgentError::Cancelled);
    }
    Ok(())
}

/// Await `future` unless the token fires first.
///
/// The future is dropped on cancellation, which cancels whatever it was
/// waiting on.
pub(crate) async fn cancellable<F: Future>(
    token: &Option<CancellationToken>,
    future: F,
) -> Result<F::Output, RunAgentError> {
    match token {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(RunAgentError::Cancelled),
            output = future => Ok(output),
        },
        None => Ok(future.await),
    }
}
