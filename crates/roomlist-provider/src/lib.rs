//! Async runtime of the room list: keeps an ordered projection of a remote
//! room list in sync with its diff stream and drives pagination and room
//! subscriptions from what the user is looking at.

/// Time-window coalescing of diff updates.
pub mod batch;
/// In-memory remote room list for tests and demos.
pub mod mock;
pub mod provider;
mod range;
/// Interfaces of the remote collaborators.
pub mod remote;
pub mod store;
/// Room summary construction.
pub mod summary;

pub use batch::{collect_by_time, spawn_batcher};
pub use provider::{NotificationSettingsEvent, RoomSummaryProvider};
pub use remote::{
    LoadingStateSubscription, RemoteDiff, RemoteRoom, RoomHandle, RoomListController,
    RoomListEntries, RoomListService, RoomListSource,
};
pub use store::{StoreClosed, StoreHandle};
pub use summary::{EventStringBuilder, PlainEventStringBuilder, RoomListEntry, SummaryBuilder};
