//! Signal handling for the brewbump CLI

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Install signal handlers that cancel the returned token.
///
/// The token is handed to the publisher so a pending retry wait stops
/// when SIGINT or SIGTERM is received.
pub fn install_signal_handlers() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.cancel();
    });

    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            return interrupt().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, cancelling"),
        () = interrupt() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    interrupt().await;
}

async fn interrupt() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received interrupt, cancelling"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for interrupt");
            std::future::pending::<()>().await;
        }
    }
}
