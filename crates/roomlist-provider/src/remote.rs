//! Interfaces of the remote room list collaborators.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use roomlist_core::{
    LatestEvent, RemoteFilterKind, RoomInfo, RoomListDiff, RoomListError, RoomListLoadingState,
};

/// A room of the remote collection.
#[async_trait]
pub trait RemoteRoom: Send + Sync {
    /// Matrix room ID.
    fn id(&self) -> &str;

    /// Read the current metadata of the room.
    async fn room_info(&self) -> Result<RoomInfo, RoomListError>;

    /// Best-effort read of the latest event.
    async fn latest_event(&self) -> Option<LatestEvent>;
}

/// Shared handle to a remote room.
pub type RoomHandle = Arc<dyn RemoteRoom>;

impl fmt::Debug for dyn RemoteRoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RemoteRoom").field(&self.id()).finish()
    }
}

/// Diff on the wire, carrying remote room handles.
pub type RemoteDiff = RoomListDiff<RoomHandle>;

/// Control surface of a subscribed room list. All calls are fire-and-forget.
pub trait RoomListController: Send + Sync {
    /// Grow the paginated window by one page.
    fn add_one_page(&self);

    /// Shrink the paginated window back to its first page.
    fn reset_to_one_page(&self);

    /// Replace the active remote filter. Returns whether it was accepted.
    fn set_filter(&self, kind: RemoteFilterKind) -> bool;
}

/// Entries subscription of a room list.
pub struct RoomListEntries {
    /// Ordered diff vectors, one per remote update.
    pub updates: BoxStream<'static, Vec<RemoteDiff>>,
    pub controller: Arc<dyn RoomListController>,
}

/// Loading-state subscription of a room list.
pub struct LoadingStateSubscription {
    pub current: RoomListLoadingState,
    pub updates: BoxStream<'static, RoomListLoadingState>,
}

/// Remote room list the provider attaches to.
pub trait RoomListSource: Send + Sync {
    /// Subscribe to entry diffs, paginated by `page_size`.
    fn entries(&self, page_size: u32) -> Result<RoomListEntries, RoomListError>;

    /// Subscribe to the loading state.
    fn loading_state(&self) -> Result<LoadingStateSubscription, RoomListError>;
}

/// Room list service accepting subscription requests.
#[async_trait]
pub trait RoomListService: Send + Sync {
    /// Ask the remote side to keep `room_ids` actively synchronized.
    async fn subscribe_to_rooms(&self, room_ids: Vec<String>) -> Result<(), RoomListError>;
}
