// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)

use std::sync::Arc;
use tokio::sync::watch;

use crate::logger;

/// Signal handler state
///
/// Shutdown is a latched flag: the accept loop and every open connection
/// subscribe to it and observe the request even if it happened before they
/// started waiting.
pub struct SignalHandler {
    shutdown: watch::Sender<bool>,
}

impl SignalHandler {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self { shutdown }
    }

    /// Ask the server loop and all connections to stop
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once shutdown has been requested (or the handler is gone)
pub async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|requested| *requested).await;
}

/// Start signal handlers (Unix only)
///
/// This spawns a background task that waits for SIGTERM or SIGINT and then
/// requests a graceful shutdown.
#[cfg(unix)]
pub fn start_signal_handler(handler: Arc<SignalHandler>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    logger::log_error(&format!("Failed to register signal handlers: {e}"));
                    return;
                }
            };

        logger::log_debug(&format!(
            "[SIGNAL] Handlers registered, process ID: {}",
            std::process::id()
        ));

        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };

        logger::log_info(&format!("[SIGNAL] {name} received, initiating graceful shutdown"));
        handler.request_shutdown();
    });
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(handler: Arc<SignalHandler>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            logger::log_info("[SIGNAL] Ctrl+C received, initiating graceful shutdown");
            handler.request_shutdown();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_request_before_wait_is_not_lost() {
        let handler = SignalHandler::new();
        handler.request_shutdown();
        assert!(*handler.subscribe().borrow());

        let woke = tokio::time::timeout(
            Duration::from_secs(1),
            wait_for_shutdown(handler.subscribe()),
        )
        .await;
        assert!(woke.is_ok());
    }

    #[tokio::test]
    async fn test_every_subscriber_is_woken() {
        let handler = SignalHandler::new();
        let first = tokio::spawn(wait_for_shutdown(handler.subscribe()));
        let second = tokio::spawn(wait_for_shutdown(handler.subscribe()));

        handler.request_shutdown();

        let both = tokio::time::timeout(Duration::from_secs(1), async {
            first.await.unwrap();
            second.await.unwrap();
        })
        .await;
        assert!(both.is_ok());
    }

    #[tokio::test]
    async fn test_waits_until_requested() {
        let handler = SignalHandler::new();
        let pending = tokio::time::timeout(
            Duration::from_millis(50),
            wait_for_shutdown(handler.subscribe()),
        )
        .await;
        assert!(pending.is_err());
        assert!(!*handler.subscribe().borrow());
    }
}
