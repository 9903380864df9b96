use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Coalesce bursts of updates into one vector per collection window.
///
/// A window opens with the first pending item and closes `window` later;
/// windows without items emit nothing. Items keep their arrival order, and
/// whatever is pending when the stream ends is flushed before returning.
pub async fn collect_by_time<T, S>(
    mut updates: S,
    window: Duration,
    batch_tx: mpsc::Sender<Vec<T>>,
    cancel: CancellationToken,
) where
    S: Stream<Item = Vec<T>> + Unpin,
{
    let mut pending: Vec<T> = Vec::new();
    let mut deadline = Instant::now();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep_until(deadline), if !pending.is_empty() => {
                trace!(items = pending.len(), "releasing batch");
                if batch_tx.send(std::mem::take(&mut pending)).await.is_err() {
                    debug!("batch receiver dropped; stopping batcher");
                    return;
                }
            }
            next = updates.next() => match next {
                Some(items) => {
                    if items.is_empty() {
                        continue;
                    }
                    if pending.is_empty() {
                        deadline = Instant::now() + window;
                    }
                    pending.extend(items);
                }
                None => {
                    if !pending.is_empty() {
                        let _ = batch_tx.send(std::mem::take(&mut pending)).await;
                    }
                    debug!("update stream ended; stopping batcher");
                    return;
                }
            },
        }
    }
}

/// Run [`collect_by_time`] on its own task.
pub fn spawn_batcher<T, S>(
    updates: S,
    window: Duration,
    batch_tx: mpsc::Sender<Vec<T>>,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    T: Send + 'static,
    S: Stream<Item = Vec<T>> + Unpin + Send + 'static,
{
    tokio::spawn(collect_by_time(updates, window, batch_tx, cancel))
}
