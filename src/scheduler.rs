use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::debug;

/// Ticket for one polling loop. Dropping it does not stop the loop; teardown
/// is explicit via `stop`.
pub struct PollerHandle {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(self) {
        debug!("stopping poller {}", self.name);
        self.handle.abort();
    }
}

/// Fixed-period poller. Every tick spawns the loader as its own task, so a
/// slow response never delays or skips a tick and overlapping requests for
/// the same endpoint are possible; reads are idempotent and the last response
/// to land wins in the cache. No jitter, no backoff.
pub fn spawn_poller<F, Fut>(name: &'static str, period: Duration, mut load: F) -> PollerHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let mut ticker = interval(period);
        // The first interval tick completes immediately; the initial load is
        // the session's job, so swallow it and start on the next period.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            debug!("poller {} tick", name);
            tokio::spawn(load());
        }
    });

    PollerHandle { name, handle }
}
