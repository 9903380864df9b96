mod logging;

use std::sync::Arc;

use futures_util::stream;
use roomlist_core::{
    LatestEvent, LatestEventContent, LocalSendState, Membership, MessageType, ProviderConfig,
    RoomFilterKind, RoomInfo, RoomListDiff, RoomListFilter, RoomListLoadingState, RoomSummary,
    UserProfile, VisibleRange,
};
use roomlist_provider::{
    NotificationSettingsEvent, PlainEventStringBuilder, RoomHandle, RoomSummaryProvider,
    mock::{MockRoom, MockRoomList, MockRoomListService},
};
use tracing::{error, info};

const DEMO_ROOMS: usize = 12;

#[tokio::main]
async fn main() {
    logging::init();

    let config = match ProviderConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid room list configuration");
            eprintln!("Invalid configuration: {err}");
            std::process::exit(1);
        }
    };
    let settle = config.batch_window()
        + config
            .pagination_throttle()
            .max(config.subscription_debounce());

    let service = Arc::new(MockRoomListService::default());
    let provider =
        RoomSummaryProvider::new(config, service.clone(), Arc::new(PlainEventStringBuilder));
    let source = MockRoomList::default();
    source.set_loading_state(RoomListLoadingState::Loaded {
        maximum_number_of_rooms: Some(DEMO_ROOMS as u32),
    });

    if let Err(err) = provider.attach(&source) {
        eprintln!("Failed to attach room list: {err}");
        std::process::exit(1);
    }
    let state = *provider.state().borrow();
    info!(provider = %provider.name(), ?state, "provider attached");

    let rooms: Vec<Arc<MockRoom>> = (0..DEMO_ROOMS).map(demo_room).collect();
    source.push_diffs(
        rooms
            .iter()
            .map(|room| RoomListDiff::PushBack(room.clone() as RoomHandle))
            .collect(),
    );
    source.push_diffs(vec![RoomListDiff::RemoveAt { index: 3 }]);
    tokio::time::sleep(settle).await;
    print_rooms("initial", &provider.room_list().borrow());

    provider.set_visible_range(VisibleRange::new(0, 5));
    tokio::time::sleep(settle).await;
    provider.set_visible_range(VisibleRange::new(6, DEMO_ROOMS - 1));
    tokio::time::sleep(settle * 2).await;

    let filter = RoomListFilter::All {
        filters: vec![RoomFilterKind::Unreads],
    };
    println!("Filter accepted: {}", provider.set_filter(&filter));

    let mut renamed = RoomInfo::joined("!room0:example.org");
    renamed.display_name = Some("Renamed lobby".to_owned());
    rooms[0].set_room_info(renamed);
    // Initial emission, then one real change.
    let settings = provider.follow_settings_changes(stream::iter([
        NotificationSettingsEvent::SettingsDidChange,
        NotificationSettingsEvent::SettingsDidChange,
    ]));
    let _ = settings.await;
    tokio::time::sleep(settle).await;
    print_rooms("after settings change", &provider.room_list().borrow());

    println!("Controller calls: {:?}", source.controller().pagination_calls());
    for (i, ids) in service.subscriptions().iter().enumerate() {
        println!("Subscription #{i}: {}", ids.join(", "));
    }
}

fn demo_room(index: usize) -> Arc<MockRoom> {
    let mut info = RoomInfo::joined(format!("!room{index}:example.org"));
    info.display_name = Some(format!("Room {index}"));
    info.num_unread_messages = (index % 4) as u64;
    if index % 5 == 4 {
        info.membership = Membership::Invited;
        info.inviter = Some(UserProfile::new("@alice:example.org"));
    }

    let room = MockRoom::new(info);
    room.set_latest_event(Some(if index % 5 == 4 {
        LatestEvent::RemoteInvite {
            timestamp_ms: 1_700_000_000_000 + index as u64,
            inviter: Some(UserProfile::new("@alice:example.org")),
        }
    } else {
        LatestEvent::Local {
            timestamp_ms: 1_700_000_000_000 + index as u64,
            sender: UserProfile::new("@smoke:example.org"),
            content: LatestEventContent::Message {
                msgtype: MessageType::Text,
                body: format!("hello from room {index}"),
            },
            send_state: if index % 3 == 0 {
                LocalSendState::CannotBeSent
            } else {
                LocalSendState::HasBeenSent
            },
        }
    }));
    room
}

fn print_rooms(label: &str, rooms: &[RoomSummary]) {
    println!("== {label} ({} rooms)", rooms.len());
    for summary in rooms {
        let preview = summary
            .last_message
            .as_ref()
            .and_then(|message| message.text.as_deref())
            .unwrap_or("-");
        println!(
            "{:<24} {:<16} unread={} {}",
            summary.id, summary.name, summary.unread_messages_count, preview
        );
    }
}
