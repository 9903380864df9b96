//! In-memory room list collaborators.
//!
//! Used by the crate tests and by the smoke app to drive a provider without a
//! homeserver. Every control call is recorded for inspection.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use roomlist_core::{
    LatestEvent, RemoteFilterKind, RoomInfo, RoomListError, RoomListLoadingState,
};
use tokio::sync::{mpsc, watch};

use crate::remote::{
    LoadingStateSubscription, RemoteDiff, RemoteRoom, RoomListController, RoomListEntries,
    RoomListService, RoomListSource,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Room whose metadata can be changed or made unreadable at will.
#[derive(Debug)]
pub struct MockRoom {
    id: String,
    info: Mutex<RoomInfo>,
    latest_event: Mutex<Option<LatestEvent>>,
    fail_room_info: AtomicBool,
}

impl MockRoom {
    pub fn new(info: RoomInfo) -> Arc<Self> {
        Arc::new(Self {
            id: info.id.clone(),
            info: Mutex::new(info),
            latest_event: Mutex::new(None),
            fail_room_info: AtomicBool::new(false),
        })
    }

    /// Replace the metadata returned by subsequent reads. The room ID is kept.
    pub fn set_room_info(&self, mut info: RoomInfo) {
        info.id = self.id.clone();
        *lock(&self.info) = info;
    }

    pub fn set_latest_event(&self, event: Option<LatestEvent>) {
        *lock(&self.latest_event) = event;
    }

    /// Make metadata reads fail until called again with `false`.
    pub fn fail_room_info(&self, fail: bool) {
        self.fail_room_info.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteRoom for MockRoom {
    fn id(&self) -> &str {
        &self.id
    }

    async fn room_info(&self) -> Result<RoomInfo, RoomListError> {
        if self.fail_room_info.load(Ordering::SeqCst) {
            return Err(RoomListError::remote(
                "room_info_unavailable",
                format!("room info of {} is unavailable", self.id),
            ));
        }
        Ok(lock(&self.info).clone())
    }

    async fn latest_event(&self) -> Option<LatestEvent> {
        lock(&self.latest_event).clone()
    }
}

/// Control call received by [`MockRoomListController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerCall {
    AddOnePage,
    ResetToOnePage,
    SetFilter(RemoteFilterKind),
}

/// Controller recording every call.
#[derive(Debug, Default)]
pub struct MockRoomListController {
    calls: Mutex<Vec<ControllerCall>>,
}

impl MockRoomListController {
    pub fn calls(&self) -> Vec<ControllerCall> {
        lock(&self.calls).clone()
    }

    /// Pagination calls only, in order.
    pub fn pagination_calls(&self) -> Vec<ControllerCall> {
        lock(&self.calls)
            .iter()
            .filter(|call| !matches!(call, ControllerCall::SetFilter(_)))
            .cloned()
            .collect()
    }
}

impl RoomListController for MockRoomListController {
    fn add_one_page(&self) {
        lock(&self.calls).push(ControllerCall::AddOnePage);
    }

    fn reset_to_one_page(&self) {
        lock(&self.calls).push(ControllerCall::ResetToOnePage);
    }

    fn set_filter(&self, kind: RemoteFilterKind) -> bool {
        lock(&self.calls).push(ControllerCall::SetFilter(kind));
        true
    }
}

/// Room list fed by hand through [`MockRoomList::push_diffs`].
pub struct MockRoomList {
    diff_tx: mpsc::UnboundedSender<Vec<RemoteDiff>>,
    diff_rx: Mutex<Option<mpsc::UnboundedReceiver<Vec<RemoteDiff>>>>,
    loading_tx: watch::Sender<RoomListLoadingState>,
    controller: Arc<MockRoomListController>,
    entries_calls: AtomicUsize,
}

impl Default for MockRoomList {
    fn default() -> Self {
        let (diff_tx, diff_rx) = mpsc::unbounded_channel();
        let (loading_tx, _) = watch::channel(RoomListLoadingState::NotLoaded);
        Self {
            diff_tx,
            diff_rx: Mutex::new(Some(diff_rx)),
            loading_tx,
            controller: Arc::new(MockRoomListController::default()),
            entries_calls: AtomicUsize::new(0),
        }
    }
}

impl MockRoomList {
    /// Emit one remote update.
    pub fn push_diffs(&self, diffs: Vec<RemoteDiff>) {
        let _ = self.diff_tx.send(diffs);
    }

    pub fn set_loading_state(&self, state: RoomListLoadingState) {
        self.loading_tx.send_replace(state);
    }

    pub fn controller(&self) -> Arc<MockRoomListController> {
        Arc::clone(&self.controller)
    }

    /// Number of entries subscriptions requested so far.
    pub fn entries_calls(&self) -> usize {
        self.entries_calls.load(Ordering::SeqCst)
    }
}

impl RoomListSource for MockRoomList {
    fn entries(&self, _page_size: u32) -> Result<RoomListEntries, RoomListError> {
        self.entries_calls.fetch_add(1, Ordering::SeqCst);
        let Some(diff_rx) = lock(&self.diff_rx).take() else {
            return Err(RoomListError::remote(
                "entries_already_subscribed",
                "mock room list supports a single entries subscription",
            ));
        };

        let updates = stream::unfold(diff_rx, |mut rx| async move {
            rx.recv().await.map(|diffs| (diffs, rx))
        })
        .boxed();

        Ok(RoomListEntries {
            updates,
            controller: self.controller.clone(),
        })
    }

    fn loading_state(&self) -> Result<LoadingStateSubscription, RoomListError> {
        let rx = self.loading_tx.subscribe();
        let current = *rx.borrow();
        let updates = stream::unfold(rx, |mut rx| async move {
            rx.changed().await.ok()?;
            let state = *rx.borrow_and_update();
            Some((state, rx))
        })
        .boxed();

        Ok(LoadingStateSubscription { current, updates })
    }
}

/// Room list service recording subscription requests.
#[derive(Debug, Default)]
pub struct MockRoomListService {
    subscriptions: Mutex<Vec<Vec<String>>>,
    fail: AtomicBool,
    hang: AtomicBool,
}

impl MockRoomListService {
    /// Every `subscribe_to_rooms` call received, including failed ones.
    pub fn subscriptions(&self) -> Vec<Vec<String>> {
        lock(&self.subscriptions).clone()
    }

    pub fn fail_subscriptions(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent calls never complete.
    pub fn hang_subscriptions(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }
}

#[async_trait]
impl RoomListService for MockRoomListService {
    async fn subscribe_to_rooms(&self, room_ids: Vec<String>) -> Result<(), RoomListError> {
        lock(&self.subscriptions).push(room_ids);
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(RoomListError::remote(
                "subscribe_failed",
                "mock subscription failure",
            ));
        }
        Ok(())
    }
}
