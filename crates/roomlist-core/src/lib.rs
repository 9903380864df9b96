//! Core room list contract shared by the provider runtime and its consumers.
//!
//! This crate is free of I/O: it defines the room summary data model, the
//! diff algebra applied to the projected list, visible-range and pagination
//! math, filter translation and provider configuration.

/// Environment-backed provider configuration.
pub mod config;
/// Ordered-sequence diff operations and their application.
pub mod diff;
/// Stable room list error types.
pub mod error;
/// View-level filters and their remote description.
pub mod filter;
/// Latest-event classification for last-message previews.
pub mod normalization;
/// Visible range clamping and pagination decisions.
pub mod range;
/// Room summary data model and remote metadata types.
pub mod types;

pub use config::{ConfigError, ProviderConfig};
pub use diff::{DiffError, RoomListDiff, apply_diffs};
pub use error::{RoomListError, RoomListErrorCategory};
pub use filter::{FilterSettings, RemoteFilterKind, RoomCategory, RoomFilterKind, RoomListFilter};
pub use normalization::{
    NormalizedLatestEvent, PreviewSource, last_message_state, normalize_latest_event,
};
pub use range::{PaginationAction, VisibleRange};
pub use types::{
    JoinRequestType, LastMessage, LastMessageState, LatestEvent, LatestEventContent,
    LocalSendState, Membership, MessageType, ProviderState, RoomInfo, RoomListLoadingState,
    RoomMember, RoomNotificationMode, RoomSummary, UserProfile,
};
