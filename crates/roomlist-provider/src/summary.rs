//! Building render-ready room summaries from remote room handles.

use std::sync::Arc;

use roomlist_core::{
    JoinRequestType, LastMessage, LatestEventContent, Membership, MessageType, PreviewSource,
    RoomListError, RoomSummary, UserProfile, normalize_latest_event,
};
use tracing::warn;

use crate::remote::RoomHandle;

/// Renders latest events into preview strings.
pub trait EventStringBuilder: Send + Sync {
    /// Preview for an event content. `None` when the event has no textual form.
    fn build(
        &self,
        content: &LatestEventContent,
        sender: &UserProfile,
        is_outgoing: bool,
    ) -> Option<String>;

    /// Preview for an invite sent by `inviter_name`.
    fn invited_you(&self, inviter_name: &str) -> String;
}

/// Plain-text preview renderer.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainEventStringBuilder;

impl EventStringBuilder for PlainEventStringBuilder {
    fn build(
        &self,
        content: &LatestEventContent,
        sender: &UserProfile,
        is_outgoing: bool,
    ) -> Option<String> {
        let sender_name = if is_outgoing {
            "You"
        } else {
            sender.display_name_or_id()
        };

        match content {
            LatestEventContent::Message {
                msgtype: MessageType::Emote,
                body,
            } => Some(format!("* {sender_name} {body}")),
            LatestEventContent::Message {
                msgtype: MessageType::Image,
                ..
            } => Some(format!("{sender_name}: Image")),
            LatestEventContent::Message {
                msgtype: MessageType::File,
                ..
            } => Some(format!("{sender_name}: File")),
            LatestEventContent::Message { body, .. } => Some(format!("{sender_name}: {body}")),
            LatestEventContent::Sticker { .. } => Some(format!("{sender_name}: Sticker")),
            LatestEventContent::Poll { question } => Some(format!("{sender_name}: Poll: {question}")),
            LatestEventContent::Redacted => Some(format!("{sender_name}: Message removed")),
            LatestEventContent::Other => None,
        }
    }

    fn invited_you(&self, inviter_name: &str) -> String {
        format!("{inviter_name} invited you")
    }
}

/// A built summary together with the handle it was built from.
///
/// The handle is kept so that summaries can be rebuilt when cross-cutting
/// settings change.
#[derive(Debug, Clone)]
pub struct RoomListEntry {
    pub room: RoomHandle,
    pub summary: RoomSummary,
}

/// Builds [`RoomSummary`] values from remote rooms.
#[derive(Clone)]
pub struct SummaryBuilder {
    strings: Arc<dyn EventStringBuilder>,
}

impl Default for SummaryBuilder {
    fn default() -> Self {
        Self::new(Arc::new(PlainEventStringBuilder))
    }
}

impl SummaryBuilder {
    pub fn new(strings: Arc<dyn EventStringBuilder>) -> Self {
        Self { strings }
    }

    /// Build the entry for one remote room.
    ///
    /// Fails only when the room metadata cannot be read; a missing latest
    /// event just leaves the preview empty.
    pub async fn build(&self, room: &RoomHandle) -> Result<RoomListEntry, RoomListError> {
        let latest_event = room.latest_event().await;
        let info = room.room_info().await.map_err(|err| {
            warn!(room_id = %room.id(), error = %err, "failed fetching room info");
            RoomListError::missing_room_info(room.id(), err.message)
        })?;

        let last_message = latest_event.as_ref().map(|event| {
            let normalized = normalize_latest_event(event);
            let text = match normalized.source {
                PreviewSource::Content {
                    content,
                    sender,
                    is_outgoing,
                } => self.strings.build(content, sender, is_outgoing),
                PreviewSource::Invite { inviter } => inviter
                    .map(|inviter| self.strings.invited_you(inviter.display_name_or_id())),
            };
            LastMessage {
                text,
                timestamp_ms: normalized.timestamp_ms,
                state: normalized.state,
            }
        });

        let join_request_type = match info.membership {
            Membership::Invited => Some(JoinRequestType::Invite {
                inviter: info.inviter.clone(),
            }),
            Membership::Knocked => Some(JoinRequestType::Knock),
            _ => None,
        };

        let summary = RoomSummary {
            name: info.display_name.clone().unwrap_or_else(|| info.id.clone()),
            id: info.id,
            avatar_url: info.avatar_url,
            heroes: info.heroes,
            active_members_count: info.active_members_count,
            last_message,
            unread_messages_count: info.num_unread_messages,
            unread_mentions_count: info.num_unread_mentions,
            unread_notifications_count: info.num_unread_notifications,
            notification_mode: info.cached_user_defined_notification_mode,
            canonical_alias: info.canonical_alias,
            alternative_aliases: info.alternative_aliases.into_iter().collect(),
            join_request_type,
            is_direct: info.is_direct,
            is_space: info.is_space,
            is_tombstoned: info.successor_room.is_some(),
            is_favourite: info.is_favourite,
            is_marked_unread: info.is_marked_unread,
            has_ongoing_call: info.has_room_call,
        };

        Ok(RoomListEntry {
            room: Arc::clone(room),
            summary,
        })
    }
}
