// Server loop module
// Accepts connections until shutdown is requested, then drains

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::drain::wait_for_connections;
use super::signal::{wait_for_shutdown, SignalHandler};
use crate::config::AppState;
use crate::logger;

/// Pause after a failed accept (e.g. EMFILE) so the loop does not spin
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Accept and serve connections until `signals` requests shutdown.
///
/// After shutdown is requested the listener is closed at once, open
/// connections stop keep-alive, and they get
/// `performance.shutdown_grace_period` to finish.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    signals: Arc<SignalHandler>,
) {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let shutdown = wait_for_shutdown(signals.subscribe());
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections, &signals);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                }
            }

            () = &mut shutdown => break,
        }
    }

    drop(listener);
    logger::log_shutdown_started(active_connections.load(Ordering::SeqCst));

    let remaining = wait_for_connections(
        &active_connections,
        state.config.performance.shutdown_grace_period(),
    )
    .await;
    logger::log_shutdown_complete(remaining);
}
