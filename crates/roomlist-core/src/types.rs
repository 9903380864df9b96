use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Loading state of the projected room list, as exposed to the view layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ProviderState {
    /// The remote list has not produced its first page yet.
    #[default]
    NotLoaded,
    /// The remote list is loaded.
    Loaded {
        /// Total number of rooms on the remote side, when the server reports it.
        total_rooms: Option<u64>,
    },
}

/// Loading state reported by the remote room list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoomListLoadingState {
    /// No response received yet.
    NotLoaded,
    /// At least one response received.
    Loaded {
        /// Maximum number of rooms the server knows about.
        maximum_number_of_rooms: Option<u32>,
    },
}

impl From<RoomListLoadingState> for ProviderState {
    fn from(state: RoomListLoadingState) -> Self {
        match state {
            RoomListLoadingState::NotLoaded => Self::NotLoaded,
            RoomListLoadingState::Loaded {
                maximum_number_of_rooms,
            } => Self::Loaded {
                total_rooms: maximum_number_of_rooms.map(u64::from),
            },
        }
    }
}

/// Matrix message type of a latest-event preview.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessageType {
    /// Standard text message (`m.text`).
    Text,
    /// Notice message (`m.notice`).
    Notice,
    /// Emote message (`m.emote`).
    Emote,
    /// Image attachment (`m.image`).
    Image,
    /// Generic file attachment (`m.file`).
    File,
}

/// Minimal public profile of a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UserProfile {
    pub user_id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Display name when set, user ID otherwise.
    pub fn display_name_or_id(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.user_id)
    }
}

/// Member of a room, as reported for inviters.
pub type RoomMember = UserProfile;

/// Membership of the current user in a room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Membership {
    Invited,
    Joined,
    Left,
    Knocked,
    Banned,
}

/// User-defined notification mode of a room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoomNotificationMode {
    AllMessages,
    MentionsAndKeywordsOnly,
    Mute,
}

/// Current metadata of a remote room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomInfo {
    pub id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub heroes: Vec<UserProfile>,
    pub active_members_count: u64,
    pub num_unread_messages: u64,
    pub num_unread_mentions: u64,
    pub num_unread_notifications: u64,
    /// Cached notification mode the user chose for this room, if any.
    pub cached_user_defined_notification_mode: Option<RoomNotificationMode>,
    pub canonical_alias: Option<String>,
    pub alternative_aliases: Vec<String>,
    pub has_room_call: bool,
    pub is_marked_unread: bool,
    pub is_favourite: bool,
    pub is_direct: bool,
    pub is_space: bool,
    /// Room that replaced this one after a tombstone.
    pub successor_room: Option<String>,
    pub membership: Membership,
    pub inviter: Option<RoomMember>,
}

impl RoomInfo {
    /// Joined, non-direct room with no optional metadata.
    pub fn joined(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            avatar_url: None,
            heroes: Vec::new(),
            active_members_count: 0,
            num_unread_messages: 0,
            num_unread_mentions: 0,
            num_unread_notifications: 0,
            cached_user_defined_notification_mode: None,
            canonical_alias: None,
            alternative_aliases: Vec::new(),
            has_room_call: false,
            is_marked_unread: false,
            is_favourite: false,
            is_direct: false,
            is_space: false,
            successor_room: None,
            membership: Membership::Joined,
            inviter: None,
        }
    }
}

/// Content of the latest event in a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LatestEventContent {
    Message { msgtype: MessageType, body: String },
    Sticker { body: String },
    Poll { question: String },
    Redacted,
    /// Anything without a textual preview.
    Other,
}

/// Delivery state of a locally-originated event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LocalSendState {
    /// Waiting for the server to acknowledge.
    IsSending,
    /// Rejected by the server.
    CannotBeSent,
    /// Acknowledged by the server.
    HasBeenSent,
}

/// Latest event of a room, used to render the last-message preview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LatestEvent {
    /// Event sent from this device.
    Local {
        timestamp_ms: u64,
        sender: UserProfile,
        content: LatestEventContent,
        send_state: LocalSendState,
    },
    /// Event received from the server.
    Remote {
        timestamp_ms: u64,
        sender: UserProfile,
        is_own: bool,
        content: LatestEventContent,
    },
    /// Invite received from the server.
    RemoteInvite {
        timestamp_ms: u64,
        inviter: Option<UserProfile>,
    },
}

/// Send state shown next to the last message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum LastMessageState {
    Sending,
    Failed,
    #[default]
    Sent,
}

/// Render-ready last-message preview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LastMessage {
    /// Rendered preview; absent when the event has no textual form.
    pub text: Option<String>,
    pub timestamp_ms: u64,
    pub state: LastMessageState,
}

/// Pending join request attached to a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum JoinRequestType {
    /// The user was invited, optionally by a known member.
    Invite { inviter: Option<RoomMember> },
    /// The user knocked on the room.
    Knock,
}

/// Denormalized, render-ready room list row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomSummary {
    /// Matrix room ID. Unique within a projected list.
    pub id: String,
    /// Display name, falling back to the room ID.
    pub name: String,
    pub avatar_url: Option<String>,
    pub heroes: Vec<UserProfile>,
    pub active_members_count: u64,
    pub last_message: Option<LastMessage>,
    pub unread_messages_count: u64,
    pub unread_mentions_count: u64,
    pub unread_notifications_count: u64,
    pub notification_mode: Option<RoomNotificationMode>,
    pub canonical_alias: Option<String>,
    pub alternative_aliases: BTreeSet<String>,
    pub join_request_type: Option<JoinRequestType>,
    pub is_direct: bool,
    pub is_space: bool,
    pub is_tombstoned: bool,
    pub is_favourite: bool,
    pub is_marked_unread: bool,
    pub has_ongoing_call: bool,
}
