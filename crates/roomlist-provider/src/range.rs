//! Reactions to the visible range: pagination growth and subscription narrowing.
//!
//! Pagination is throttled (latest value wins, at most one decision per
//! interval) while subscriptions are debounced (act only once scrolling has
//! settled). They protect different costs and stay separate tasks.

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use roomlist_core::{PaginationAction, VisibleRange};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{sleep, timeout},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    remote::{RoomListController, RoomListService},
    store::StoreHandle,
};

/// Upper bound on one subscription request.
const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Controller of the attached room list; empty until the provider attaches.
pub(crate) type ControllerSlot = Arc<OnceLock<Arc<dyn RoomListController>>>;

/// Drives pagination and subscriptions from visible-range reports.
#[derive(Clone)]
pub(crate) struct RangeController {
    pub(crate) name: String,
    pub(crate) store: StoreHandle,
    pub(crate) controller: ControllerSlot,
    pub(crate) service: Arc<dyn RoomListService>,
    pub(crate) manage_subscriptions: bool,
    pub(crate) throttle: Duration,
    pub(crate) debounce: Duration,
}

impl RangeController {
    /// Spawn the pagination and subscription tasks.
    pub(crate) fn spawn(
        self,
        ranges: watch::Receiver<VisibleRange>,
        cancel: CancellationToken,
    ) -> [JoinHandle<()>; 2] {
        let pagination = tokio::spawn(
            self.clone()
                .run_pagination(ranges.clone(), cancel.child_token()),
        );
        let subscriptions = tokio::spawn(self.run_subscriptions(ranges, cancel.child_token()));
        [pagination, subscriptions]
    }

    async fn run_pagination(
        self,
        mut ranges: watch::Receiver<VisibleRange>,
        cancel: CancellationToken,
    ) {
        let mut last_handled: Option<VisibleRange> = None;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = ranges.changed() => if changed.is_err() { break },
            }

            let range = *ranges.borrow_and_update();
            if last_handled == Some(range) {
                trace!(provider = %self.name, ?range, "visible range unchanged");
            } else {
                last_handled = Some(range);
                self.paginate(range).await;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.throttle) => {}
            }
        }
        debug!(provider = %self.name, "pagination task exiting");
    }

    async fn paginate(&self, range: VisibleRange) {
        let count = match self.store.count().await {
            Ok(count) => count,
            Err(err) => {
                warn!(provider = %self.name, error = %err, "cannot read room count");
                return;
            }
        };
        let Some(controller) = self.controller.get() else {
            debug!(provider = %self.name, "room list not attached; skipping pagination");
            return;
        };

        info!(provider = %self.name, ?range, count, "updating visible range");
        match PaginationAction::for_range(range, count) {
            PaginationAction::AddOnePage => controller.add_one_page(),
            PaginationAction::ResetToOnePage => controller.reset_to_one_page(),
            PaginationAction::None => {}
        }
    }

    async fn run_subscriptions(
        self,
        mut ranges: watch::Receiver<VisibleRange>,
        cancel: CancellationToken,
    ) {
        let mut last_subscribed: Option<Vec<String>> = None;
        'outer: loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = ranges.changed() => if changed.is_err() { break },
            }

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break 'outer,
                    changed = ranges.changed() => if changed.is_err() { break 'outer },
                    _ = sleep(self.debounce) => break,
                }
            }

            let range = *ranges.borrow_and_update();
            if range.is_empty() || !self.manage_subscriptions {
                continue;
            }
            self.subscribe(range, &mut last_subscribed).await;
        }
        debug!(provider = %self.name, "subscription task exiting");
    }

    async fn subscribe(&self, range: VisibleRange, last_subscribed: &mut Option<Vec<String>>) {
        let room_ids = match self.store.ids(range).await {
            Ok(room_ids) => room_ids,
            Err(err) => {
                warn!(provider = %self.name, error = %err, "cannot resolve visible rooms");
                return;
            }
        };

        if last_subscribed.as_ref() == Some(&room_ids) {
            trace!(provider = %self.name, "visible rooms unchanged; skipping subscription");
            return;
        }
        *last_subscribed = Some(room_ids.clone());

        debug!(provider = %self.name, room_count = room_ids.len(), "subscribing to visible rooms");
        match timeout(SUBSCRIBE_TIMEOUT, self.service.subscribe_to_rooms(room_ids)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!(provider = %self.name, error = %err, "failed subscribing to rooms");
            }
            Err(_) => {
                error!(
                    provider = %self.name,
                    timeout_ms = SUBSCRIBE_TIMEOUT.as_millis() as u64,
                    "subscribing to rooms timed out"
                );
            }
        }
    }
}
