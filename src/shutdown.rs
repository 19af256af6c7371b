// src/shutdown.rs
use std::future::Future;

/// Resolves when `signal` reports an interrupt. If the handler could not be
/// installed the error is logged and this never resolves, so the run goes on.
pub async fn interrupted<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::warn!(error = ?e, "interrupt handler unavailable");
        std::future::pending::<()>().await;
    }
}
