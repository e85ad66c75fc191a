// 连接处理模块
// 处理单个 TCP 连接的接受和服务

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::watch;

use super::signal::{wait_for_shutdown, SignalHandler};
use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Holds one slot of the active connection count until dropped
struct ConnectionSlot(Arc<AtomicUsize>);

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Accept a connection, enforcing the connection limit, and serve it.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
/// * `conn_counter` - Active connection counter
/// * `signals` - Shutdown flag the connection watches
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    signals: &SignalHandler,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);
    let slot = ConnectionSlot(Arc::clone(conn_counter));

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);

    if let Err(e) = stream.set_nodelay(true) {
        logger::log_debug(&format!("Could not set TCP_NODELAY for {peer_addr}: {e}"));
    }

    handle_connection(stream, peer_addr, Arc::clone(state), slot, signals.subscribe());
}

/// Serve one connection on its own task.
///
/// The connection lives at most `performance.connection_timeout`; its slot
/// in the active count is released when the task ends, however it ends.
/// Once shutdown is requested the connection stops keep-alive: an idle one
/// closes at once, a busy one after its current response.
fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    slot: ConnectionSlot,
    shutdown: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let _slot = slot;
        let io = TokioIo::new(stream);
        let timeout_duration = state.config.performance.connection_timeout();

        let mut builder = http1::Builder::new();
        builder
            .keep_alive(state.config.performance.keep_alive)
            .timer(TokioTimer::new());

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&service_state);
                async move { handler::handle_request(req, state, peer_addr).await }
            }),
        );
        let mut conn = std::pin::pin!(conn);

        let serve = async {
            tokio::select! {
                result = conn.as_mut() => return result,
                () = wait_for_shutdown(shutdown) => conn.as_mut().graceful_shutdown(),
            }
            conn.as_mut().await
        };

        match tokio::time::timeout(timeout_duration, serve).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) if err.is_incomplete_message() => {
                logger::log_debug(&format!("Client {peer_addr} closed mid-request"));
            }
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_debug(&format!(
                    "Connection from {peer_addr} closed after {} seconds",
                    timeout_duration.as_secs()
                ));
            }
        }
    });
}
