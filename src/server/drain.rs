// Connection drain module
// Waits for in-flight connections during graceful shutdown

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Wait until `active` reaches zero or `grace` elapses.
///
/// Returns the number of connections still open when it gave up (0 when
/// everything finished in time). Connections left open are abandoned when
/// the runtime shuts down.
pub async fn wait_for_connections(active: &AtomicUsize, grace: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + grace;
    let mut ticker = tokio::time::interval(POLL_INTERVAL);

    loop {
        let remaining = active.load(Ordering::SeqCst);
        if remaining == 0 {
            return 0;
        }

        tokio::select! {
            _ = ticker.tick() => {}
            () = tokio::time::sleep_until(deadline) => {
                return active.load(Ordering::SeqCst);
            }
        }
    }
}
