//! OS signal handling.
//!
//! # Design Decisions
//! - First Ctrl-C triggers graceful shutdown
//! - A second Ctrl-C exits immediately

use crate::lifecycle::shutdown::Shutdown;

/// Exit code used when a second interrupt forces termination.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Spawn a task that triggers `shutdown` on Ctrl-C.
pub fn listen_for_ctrl_c(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        tracing::warn!("Interrupt received, cancelling in-flight operations");
        shutdown.trigger();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::error!("Second interrupt received, exiting");
            std::process::exit(FORCED_EXIT_CODE);
        }
    })
}
