use crate::types::{
    LastMessageState, LatestEvent, LatestEventContent, LocalSendState, UserProfile,
};

/// What a last-message preview should be rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewSource<'a> {
    /// A regular event, rendered from its content.
    Content {
        content: &'a LatestEventContent,
        sender: &'a UserProfile,
        is_outgoing: bool,
    },
    /// An invite; rendered only when the inviter is known.
    Invite { inviter: Option<&'a UserProfile> },
}

/// Latest event reduced to what the summary needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedLatestEvent<'a> {
    pub timestamp_ms: u64,
    pub state: LastMessageState,
    pub source: PreviewSource<'a>,
}

/// Map the delivery state of a local event to the state shown in the list.
pub fn last_message_state(send_state: LocalSendState) -> LastMessageState {
    match send_state {
        LocalSendState::IsSending => LastMessageState::Sending,
        LocalSendState::CannotBeSent => LastMessageState::Failed,
        LocalSendState::HasBeenSent => LastMessageState::Sent,
    }
}

/// Classify a latest event. Local events are always outgoing; remote events
/// are outgoing when they were sent by the current user from another device.
pub fn normalize_latest_event(event: &LatestEvent) -> NormalizedLatestEvent<'_> {
    match event {
        LatestEvent::Local {
            timestamp_ms,
            sender,
            content,
            send_state,
        } => NormalizedLatestEvent {
            timestamp_ms: *timestamp_ms,
            state: last_message_state(*send_state),
            source: PreviewSource::Content {
                content,
                sender,
                is_outgoing: true,
            },
        },
        LatestEvent::Remote {
            timestamp_ms,
            sender,
            is_own,
            content,
        } => NormalizedLatestEvent {
            timestamp_ms: *timestamp_ms,
            state: LastMessageState::Sent,
            source: PreviewSource::Content {
                content,
                sender,
                is_outgoing: *is_own,
            },
        },
        LatestEvent::RemoteInvite {
            timestamp_ms,
            inviter,
        } => NormalizedLatestEvent {
            timestamp_ms: *timestamp_ms,
            state: LastMessageState::Sent,
            source: PreviewSource::Invite {
                inviter: inviter.as_ref(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageType;

    fn text(body: &str) -> LatestEventContent {
        LatestEventContent::Message {
            msgtype: MessageType::Text,
            body: body.to_owned(),
        }
    }

    #[test]
    fn maps_local_send_states() {
        assert_eq!(
            last_message_state(LocalSendState::IsSending),
            LastMessageState::Sending
        );
        assert_eq!(
            last_message_state(LocalSendState::CannotBeSent),
            LastMessageState::Failed
        );
        assert_eq!(
            last_message_state(LocalSendState::HasBeenSent),
            LastMessageState::Sent
        );
    }

    #[test]
    fn local_events_are_outgoing_and_keep_send_state() {
        let event = LatestEvent::Local {
            timestamp_ms: 42,
            sender: UserProfile::new("@me:example.org"),
            content: text("hi"),
            send_state: LocalSendState::CannotBeSent,
        };

        let normalized = normalize_latest_event(&event);
        assert_eq!(normalized.timestamp_ms, 42);
        assert_eq!(normalized.state, LastMessageState::Failed);
        assert!(matches!(
            normalized.source,
            PreviewSource::Content {
                is_outgoing: true,
                ..
            }
        ));
    }

    #[test]
    fn remote_events_have_no_special_state() {
        let event = LatestEvent::Remote {
            timestamp_ms: 7,
            sender: UserProfile::new("@bob:example.org"),
            is_own: false,
            content: text("yo"),
        };

        let normalized = normalize_latest_event(&event);
        assert_eq!(normalized.state, LastMessageState::Sent);
        assert!(matches!(
            normalized.source,
            PreviewSource::Content {
                is_outgoing: false,
                ..
            }
        ));
    }

    #[test]
    fn invites_carry_optional_inviter() {
        let event = LatestEvent::RemoteInvite {
            timestamp_ms: 9,
            inviter: None,
        };
        assert_eq!(
            normalize_latest_event(&event).source,
            PreviewSource::Invite { inviter: None }
        );
    }
}
