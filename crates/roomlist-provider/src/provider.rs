//! The room summary provider: wires the batching stage, the store actor, the
//! diff pipeline and the range controller behind one facade.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures_util::{Stream, StreamExt, stream::BoxStream};
use roomlist_core::{
    ProviderConfig, ProviderState, RoomListDiff, RoomListError, RoomListFilter,
    RoomListLoadingState, RoomSummary, VisibleRange,
};
use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        watch,
    },
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, trace, warn};

use crate::{
    batch::spawn_batcher,
    range::{ControllerSlot, RangeController},
    remote::{
        LoadingStateSubscription, RemoteDiff, RoomHandle, RoomListEntries, RoomListService,
        RoomListSource,
    },
    store::StoreHandle,
    summary::{EventStringBuilder, RoomListEntry, SummaryBuilder},
};

const BATCH_BUFFER: usize = 16;

/// Change notification from the notification settings store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationSettingsEvent {
    SettingsDidChange,
}

/// Live, ordered projection of a remote room list.
///
/// Must be created inside a Tokio runtime. Dropping the provider stops every
/// task it spawned.
pub struct RoomSummaryProvider {
    config: ProviderConfig,
    controller: ControllerSlot,
    attached: AtomicBool,
    batch_tx: mpsc::Sender<Vec<RemoteDiff>>,
    rebuild_tx: mpsc::Sender<()>,
    range_tx: watch::Sender<VisibleRange>,
    room_list_tx: Arc<watch::Sender<Vec<RoomSummary>>>,
    state_tx: Arc<watch::Sender<ProviderState>>,
    cancel: CancellationToken,
}

impl RoomSummaryProvider {
    pub fn new(
        config: ProviderConfig,
        service: Arc<dyn RoomListService>,
        strings: Arc<dyn EventStringBuilder>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let store = StoreHandle::spawn(config.max_visible_range);
        let controller = ControllerSlot::default();

        let (batch_tx, batch_rx) = mpsc::channel(BATCH_BUFFER);
        // Capacity 1: requests arriving while one is queued collapse into it.
        let (rebuild_tx, rebuild_rx) = mpsc::channel(1);
        let (range_tx, range_rx) = watch::channel(VisibleRange::default());
        let (room_list_tx, _) = watch::channel(Vec::new());
        let room_list_tx = Arc::new(room_list_tx);
        let (state_tx, _) = watch::channel(ProviderState::NotLoaded);

        let pipeline = Pipeline {
            name: config.name.clone(),
            store: store.clone(),
            builder: SummaryBuilder::new(strings),
            room_list_tx: Arc::clone(&room_list_tx),
        };
        tokio::spawn(pipeline.run(batch_rx, rebuild_rx, cancel.child_token()));

        RangeController {
            name: config.name.clone(),
            store,
            controller: Arc::clone(&controller),
            service,
            manage_subscriptions: config.manage_subscriptions,
            throttle: config.pagination_throttle(),
            debounce: config.subscription_debounce(),
        }
        .spawn(range_rx, cancel.child_token());

        debug!(provider = %config.name, "room summary provider created");
        Self {
            config,
            controller,
            attached: AtomicBool::new(false),
            batch_tx,
            rebuild_tx,
            range_tx,
            room_list_tx,
            state_tx: Arc::new(state_tx),
            cancel,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Start following `source`. Later calls are no-ops.
    ///
    /// The default filter is pushed right away so that the remote list emits
    /// its first diffs without waiting for the view.
    pub fn attach(&self, source: &dyn RoomListSource) -> Result<(), RoomListError> {
        if self.attached.swap(true, Ordering::SeqCst) {
            debug!(provider = %self.name(), "room list already attached");
            return Ok(());
        }

        let subscriptions = source
            .loading_state()
            .and_then(|loading| Ok((loading, source.entries(self.config.page_size)?)));
        let (loading, entries) = match subscriptions {
            Ok(subscriptions) => subscriptions,
            Err(err) => {
                self.attached.store(false, Ordering::SeqCst);
                warn!(provider = %self.name(), error = %err, "failed attaching room list");
                return Err(err);
            }
        };

        let RoomListEntries {
            updates,
            controller,
        } = entries;
        let _ = self.controller.set(Arc::clone(&controller));

        spawn_batcher(
            updates,
            self.config.batch_window(),
            self.batch_tx.clone(),
            self.cancel.child_token(),
        );

        let accepted = controller.set_filter(
            RoomListFilter::default().to_remote(self.config.filter_settings),
        );
        if !accepted {
            warn!(provider = %self.name(), "remote list rejected the default filter");
        }

        let LoadingStateSubscription { current, updates } = loading;
        self.state_tx.send_replace(current.into());
        tokio::spawn(follow_loading_state(
            self.config.name.clone(),
            updates,
            Arc::clone(&self.state_tx),
            self.cancel.child_token(),
        ));

        info!(
            provider = %self.name(),
            page_size = self.config.page_size,
            "attached to room list"
        );
        Ok(())
    }

    /// Report the range of rows currently on screen.
    pub fn set_visible_range(&self, range: VisibleRange) {
        trace!(provider = %self.name(), ?range, "visible range reported");
        self.range_tx.send_replace(range);
    }

    /// Forward `filter` to the remote list. Returns `false` before attach or
    /// when the remote side rejects it.
    pub fn set_filter(&self, filter: &RoomListFilter) -> bool {
        let Some(controller) = self.controller.get() else {
            debug!(provider = %self.name(), "room list not attached; ignoring filter");
            return false;
        };
        let kind = filter.to_remote(self.config.filter_settings);
        debug!(provider = %self.name(), filter = ?kind, "setting room list filter");
        controller.set_filter(kind)
    }

    /// Queue a rebuild of every summary from fresh room metadata.
    pub fn report_settings_changed(&self) {
        request_rebuild(self.name(), &self.rebuild_tx);
    }

    /// Rebuild on every notification of `changes` until it ends or the
    /// provider is dropped.
    ///
    /// The first notification is the store's initial emission and is skipped.
    pub fn follow_settings_changes<S>(&self, mut changes: S) -> JoinHandle<()>
    where
        S: Stream<Item = NotificationSettingsEvent> + Unpin + Send + 'static,
    {
        let name = self.config.name.clone();
        let rebuild_tx = self.rebuild_tx.clone();
        let cancel = self.cancel.child_token();
        tokio::spawn(async move {
            let mut seen_initial = false;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    change = changes.next() => match change {
                        Some(NotificationSettingsEvent::SettingsDidChange) if !seen_initial => {
                            seen_initial = true;
                            trace!(provider = %name, "skipping initial settings notification");
                        }
                        Some(NotificationSettingsEvent::SettingsDidChange) => {
                            request_rebuild(&name, &rebuild_tx);
                        }
                        None => break,
                    },
                }
            }
            debug!(provider = %name, "settings change stream ended");
        })
    }

    /// Current projected list; the receiver always holds the latest value.
    pub fn room_list(&self) -> watch::Receiver<Vec<RoomSummary>> {
        self.room_list_tx.subscribe()
    }

    pub fn state(&self) -> watch::Receiver<ProviderState> {
        self.state_tx.subscribe()
    }
}

impl Drop for RoomSummaryProvider {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn request_rebuild(name: &str, rebuild_tx: &mpsc::Sender<()>) {
    match rebuild_tx.try_send(()) {
        Ok(()) => debug!(provider = %name, "summary rebuild queued"),
        Err(TrySendError::Full(())) => trace!(provider = %name, "summary rebuild already queued"),
        Err(TrySendError::Closed(())) => {
            warn!(provider = %name, "pipeline stopped; dropping rebuild request")
        }
    }
}

async fn follow_loading_state(
    name: String,
    mut updates: BoxStream<'static, RoomListLoadingState>,
    state_tx: Arc<watch::Sender<ProviderState>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            update = updates.next() => match update {
                Some(loading) => {
                    let state = ProviderState::from(loading);
                    debug!(provider = %name, ?state, "room list loading state changed");
                    state_tx.send_replace(state);
                }
                None => break,
            },
        }
    }
    debug!(provider = %name, "loading state task exiting");
}

/// Single writer of the store: diff batches and rebuilds run one at a time.
struct Pipeline {
    name: String,
    store: StoreHandle,
    builder: SummaryBuilder,
    room_list_tx: Arc<watch::Sender<Vec<RoomSummary>>>,
}

impl Pipeline {
    async fn run(
        self,
        mut batch_rx: mpsc::Receiver<Vec<RemoteDiff>>,
        mut rebuild_rx: mpsc::Receiver<()>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                Some(diffs) = batch_rx.recv() => {
                    let span = info_span!(
                        "process_room_list_diffs",
                        provider = %self.name,
                        diff_count = diffs.len()
                    );
                    self.process_batch(diffs).instrument(span).await;
                }
                Some(()) = rebuild_rx.recv() => {
                    let span = info_span!("rebuild_room_summaries", provider = %self.name);
                    self.rebuild().instrument(span).await;
                }
                else => break,
            }
        }
        debug!(provider = %self.name, "diff pipeline exiting");
    }

    async fn process_batch(&self, diffs: Vec<RemoteDiff>) {
        let mut entries = match self.store.snapshot().await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "cannot read room list; dropping batch");
                return;
            }
        };

        let mut skipped = 0usize;
        for diff in diffs {
            let op = diff.kind();
            // Validate first so a doomed op never pays for summary builds.
            if let Err(err) = diff.check(entries.len()) {
                warn!(op, error = %err, "skipping inconsistent room list diff");
                skipped += 1;
                continue;
            }
            let built = match self.build_diff(diff).await {
                Ok(built) => built,
                Err(err) => {
                    warn!(op, error = %err, "skipping room list diff");
                    skipped += 1;
                    continue;
                }
            };
            if let Err(err) = built.apply_to(&mut entries) {
                warn!(op, error = %err, "skipping inconsistent room list diff");
                skipped += 1;
            }
        }

        debug!(rooms = entries.len(), skipped, "room list diffs applied");
        self.publish(entries).await;
    }

    async fn build_diff(
        &self,
        diff: RemoteDiff,
    ) -> Result<RoomListDiff<RoomListEntry>, RoomListError> {
        Ok(match diff {
            RoomListDiff::Append(rooms) => RoomListDiff::Append(self.build_all(rooms).await?),
            RoomListDiff::Clear => RoomListDiff::Clear,
            RoomListDiff::InsertAt { index, value } => RoomListDiff::InsertAt {
                index,
                value: self.builder.build(&value).await?,
            },
            RoomListDiff::PopBack => RoomListDiff::PopBack,
            RoomListDiff::PopFront => RoomListDiff::PopFront,
            RoomListDiff::PushBack(room) => RoomListDiff::PushBack(self.builder.build(&room).await?),
            RoomListDiff::PushFront(room) => {
                RoomListDiff::PushFront(self.builder.build(&room).await?)
            }
            RoomListDiff::RemoveAt { index } => RoomListDiff::RemoveAt { index },
            RoomListDiff::Reset(rooms) => RoomListDiff::Reset(self.build_all(rooms).await?),
            RoomListDiff::SetAt { index, value } => RoomListDiff::SetAt {
                index,
                value: self.builder.build(&value).await?,
            },
            RoomListDiff::Truncate { length } => RoomListDiff::Truncate { length },
        })
    }

    async fn build_all(
        &self,
        rooms: Vec<RoomHandle>,
    ) -> Result<Vec<RoomListEntry>, RoomListError> {
        let mut entries = Vec::with_capacity(rooms.len());
        for room in &rooms {
            entries.push(self.builder.build(room).await?);
        }
        Ok(entries)
    }

    /// Rebuild every summary; entries whose metadata cannot be read keep
    /// their previous summary.
    async fn rebuild(&self) {
        let entries = match self.store.snapshot().await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "cannot read room list; skipping rebuild");
                return;
            }
        };

        let mut rebuilt = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.builder.build(&entry.room).await {
                Ok(fresh) => rebuilt.push(fresh),
                Err(err) => {
                    warn!(room_id = %entry.summary.id, error = %err, "keeping stale room summary");
                    rebuilt.push(entry);
                }
            }
        }

        info!(rooms = rebuilt.len(), "room summaries rebuilt");
        self.publish(rebuilt).await;
    }

    async fn publish(&self, entries: Vec<RoomListEntry>) {
        let summaries: Vec<RoomSummary> = entries.iter().map(|e| e.summary.clone()).collect();
        if let Err(err) = self.store.replace(entries).await {
            warn!(error = %err, "cannot store room list");
            return;
        }
        self.room_list_tx.send_replace(summaries);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::stream;
    use roomlist_core::{FilterSettings, RemoteFilterKind, RoomInfo, RoomFilterKind};
    use tokio::time::sleep;

    use super::*;
    use crate::{
        mock::{ControllerCall, MockRoom, MockRoomList, MockRoomListService},
        summary::PlainEventStringBuilder,
    };

    const SETTLE: Duration = Duration::from_millis(300);

    fn test_config() -> ProviderConfig {
        ProviderConfig {
            name: "test".to_owned(),
            manage_subscriptions: true,
            ..ProviderConfig::default()
        }
    }

    fn provider(config: ProviderConfig) -> (RoomSummaryProvider, Arc<MockRoomListService>) {
        let service = Arc::new(MockRoomListService::default());
        let provider =
            RoomSummaryProvider::new(config, service.clone(), Arc::new(PlainEventStringBuilder));
        (provider, service)
    }

    fn room(id: &str) -> Arc<MockRoom> {
        MockRoom::new(RoomInfo::joined(id))
    }

    fn named_room(id: &str, name: &str) -> Arc<MockRoom> {
        let mut info = RoomInfo::joined(id);
        info.display_name = Some(name.to_owned());
        MockRoom::new(info)
    }

    fn handle(room: &Arc<MockRoom>) -> RoomHandle {
        room.clone()
    }

    fn push_back(room: &Arc<MockRoom>) -> RemoteDiff {
        RoomListDiff::PushBack(handle(room))
    }

    fn listed_names(provider: &RoomSummaryProvider) -> Vec<String> {
        provider
            .room_list()
            .borrow()
            .iter()
            .map(|summary| summary.name.clone())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_batched_diffs_in_order() {
        let (provider, _) = provider(test_config());
        let list = MockRoomList::default();
        provider.attach(&list).expect("attach should work");
        let mut room_list = provider.room_list();

        list.push_diffs(vec![push_back(&room("!a:x")), push_back(&room("!b:x"))]);
        list.push_diffs(vec![push_back(&room("!c:x"))]);

        room_list.changed().await.expect("room list update expected");
        let ids: Vec<_> = room_list
            .borrow_and_update()
            .iter()
            .map(|summary| summary.id.clone())
            .collect();
        assert_eq!(ids, ["!a:x", "!b:x", "!c:x"]);

        sleep(SETTLE).await;
        assert!(!room_list.has_changed().expect("sender alive"));
    }

    #[tokio::test(start_paused = true)]
    async fn follows_the_diff_scenario() {
        let (provider, _) = provider(test_config());
        let list = MockRoomList::default();
        provider.attach(&list).expect("attach should work");

        list.push_diffs(vec![
            push_back(&named_room("!a:x", "A")),
            push_back(&named_room("!b:x", "B")),
            push_back(&named_room("!c:x", "C")),
        ]);
        sleep(SETTLE).await;
        assert_eq!(listed_names(&provider), ["A", "B", "C"]);

        list.push_diffs(vec![RoomListDiff::SetAt {
            index: 1,
            value: handle(&named_room("!b:x", "B'")),
        }]);
        sleep(SETTLE).await;
        assert_eq!(listed_names(&provider), ["A", "B'", "C"]);

        list.push_diffs(vec![RoomListDiff::RemoveAt { index: 0 }]);
        sleep(SETTLE).await;
        assert_eq!(listed_names(&provider), ["B'", "C"]);

        list.push_diffs(vec![RoomListDiff::Truncate { length: 0 }]);
        sleep(SETTLE).await;
        assert!(listed_names(&provider).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_room_skips_its_op_only() {
        let (provider, _) = provider(test_config());
        let list = MockRoomList::default();
        provider.attach(&list).expect("attach should work");

        let broken = room("!broken:x");
        broken.fail_room_info(true);
        list.push_diffs(vec![
            push_back(&named_room("!a:x", "A")),
            push_back(&broken),
            RoomListDiff::RemoveAt { index: 7 },
            push_back(&named_room("!c:x", "C")),
        ]);
        sleep(SETTLE).await;

        assert_eq!(listed_names(&provider), ["A", "C"]);
    }

    #[tokio::test(start_paused = true)]
    async fn attach_is_idempotent_and_pushes_default_filter() {
        let (provider, _) = provider(test_config());
        let list = MockRoomList::default();

        provider.attach(&list).expect("first attach should work");
        provider.attach(&list).expect("second attach should be a no-op");

        assert_eq!(list.entries_calls(), 1);
        assert_eq!(
            list.controller().calls(),
            vec![ControllerCall::SetFilter(
                RoomListFilter::default().to_remote(FilterSettings::default())
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_attach_can_be_retried() {
        let (provider, _) = provider(test_config());
        let list = MockRoomList::default();
        let used = MockRoomList::default();
        let _taken = used.entries(1).expect("entries should work");

        assert!(provider.attach(&used).is_err());
        provider.attach(&list).expect("retry should work");
        assert_eq!(list.entries_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn mirrors_remote_loading_state() {
        let (provider, _) = provider(test_config());
        let list = MockRoomList::default();
        list.set_loading_state(RoomListLoadingState::Loaded {
            maximum_number_of_rooms: Some(42),
        });

        assert_eq!(*provider.state().borrow(), ProviderState::NotLoaded);
        provider.attach(&list).expect("attach should work");
        assert_eq!(
            *provider.state().borrow(),
            ProviderState::Loaded {
                total_rooms: Some(42)
            }
        );

        list.set_loading_state(RoomListLoadingState::Loaded {
            maximum_number_of_rooms: None,
        });
        sleep(SETTLE).await;
        assert_eq!(
            *provider.state().borrow(),
            ProviderState::Loaded { total_rooms: None }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn settings_change_rebuilds_from_fresh_metadata() {
        let (provider, _) = provider(test_config());
        let list = MockRoomList::default();
        provider.attach(&list).expect("attach should work");

        let renamed = named_room("!a:x", "Before");
        let stale = named_room("!b:x", "Stale");
        list.push_diffs(vec![push_back(&renamed), push_back(&stale)]);
        sleep(SETTLE).await;
        assert_eq!(listed_names(&provider), ["Before", "Stale"]);

        let mut info = RoomInfo::joined("!a:x");
        info.display_name = Some("After".into());
        renamed.set_room_info(info);
        let mut info = RoomInfo::joined("!b:x");
        info.display_name = Some("Unreachable".into());
        stale.set_room_info(info);
        stale.fail_room_info(true);

        provider.report_settings_changed();
        provider.report_settings_changed();
        sleep(SETTLE).await;
        assert_eq!(listed_names(&provider), ["After", "Stale"]);

        stale.fail_room_info(false);
        let task = provider.follow_settings_changes(stream::iter([
            NotificationSettingsEvent::SettingsDidChange,
            NotificationSettingsEvent::SettingsDidChange,
        ]));
        task.await.expect("settings task should not panic");
        sleep(SETTLE).await;
        assert_eq!(listed_names(&provider), ["After", "Unreachable"]);
    }

    #[tokio::test(start_paused = true)]
    async fn initial_settings_notification_does_not_rebuild() {
        let (provider, _) = provider(test_config());
        let list = MockRoomList::default();
        provider.attach(&list).expect("attach should work");

        let lobby = named_room("!a:x", "Lobby");
        list.push_diffs(vec![push_back(&lobby)]);
        sleep(SETTLE).await;

        let mut info = RoomInfo::joined("!a:x");
        info.display_name = Some("Renamed".into());
        lobby.set_room_info(info);

        let task = provider.follow_settings_changes(stream::iter([
            NotificationSettingsEvent::SettingsDidChange,
        ]));
        task.await.expect("settings task should not panic");
        sleep(SETTLE).await;
        assert_eq!(listed_names(&provider), ["Lobby"]);
    }

    #[tokio::test(start_paused = true)]
    async fn forwards_translated_filters_after_attach() {
        let (provider, _) = provider(test_config());
        let list = MockRoomList::default();
        let filter = RoomListFilter::All {
            filters: vec![RoomFilterKind::Favourites],
        };

        assert!(!provider.set_filter(&filter));
        provider.attach(&list).expect("attach should work");
        assert!(provider.set_filter(&filter));
        assert!(provider.set_filter(&RoomListFilter::ExcludeAll));

        let calls = list.controller().calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[1],
            ControllerCall::SetFilter(filter.to_remote(FilterSettings::default()))
        );
        assert_eq!(calls[2], ControllerCall::SetFilter(RemoteFilterKind::None));
    }

    #[tokio::test(start_paused = true)]
    async fn visible_range_drives_pagination_and_subscriptions() {
        let (provider, service) = provider(test_config());
        let list = MockRoomList::default();
        provider.attach(&list).expect("attach should work");

        let rooms: Vec<_> = (0..10).map(|i| room(&format!("!{i}:x"))).collect();
        list.push_diffs(rooms.iter().map(push_back).collect());
        sleep(SETTLE).await;

        provider.set_visible_range(VisibleRange::new(0, 10));
        sleep(Duration::from_secs(2)).await;

        assert_eq!(
            list.controller().pagination_calls(),
            vec![ControllerCall::AddOnePage]
        );
        assert_eq!(
            service.subscriptions(),
            vec![(0..10).map(|i| format!("!{i}:x")).collect::<Vec<_>>()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_provider_stops_publishing() {
        let (provider, _) = provider(test_config());
        let list = MockRoomList::default();
        provider.attach(&list).expect("attach should work");
        let mut room_list = provider.room_list();
        drop(provider);
        sleep(SETTLE).await;

        list.push_diffs(vec![push_back(&room("!a:x"))]);
        sleep(SETTLE).await;
        assert!(room_list.changed().await.is_err());
    }
}
