//! OS signal handling.
//!
//! Resolves on the first Ctrl+C (SIGINT) or, on unix, SIGTERM.

use tokio::signal;

/// Wait for a shutdown signal.
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            res = signal::ctrl_c() => res?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    signal::ctrl_c().await?;

    tracing::info!("Shutdown signal received");
    Ok(())
}
