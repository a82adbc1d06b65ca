//! Background revalidation of the thread list.

use crate::pager::ThreadPager;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Shortest interval the poller accepts.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Refresh `pager` every `every` until `cancel` fires.
///
/// The first refresh happens one interval after spawning; the caller is
/// expected to have loaded the list already.
pub fn spawn_poller(
    pager: ThreadPager,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let every = every.max(MIN_INTERVAL);
    tokio::spawn(async move {
        debug!(interval_secs = every.as_secs(), "thread list poller started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(every) => {}
            }

            if let Err(e) = pager.refresh().await {
                warn!(error = %e, "thread list refresh failed");
            }
        }
        debug!("thread list poller stopped");
    })
}
