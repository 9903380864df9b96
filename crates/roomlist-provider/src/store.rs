//! Actor owning the projected room list.
//!
//! Every read and write goes through one command channel, so callers never
//! observe a half-applied update and never race each other.

use roomlist_core::{RoomListError, RoomListErrorCategory, VisibleRange};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::summary::RoomListEntry;

const COMMAND_BUFFER: usize = 64;

/// The store actor has stopped.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("room store actor is closed")]
pub struct StoreClosed;

impl From<StoreClosed> for RoomListError {
    fn from(err: StoreClosed) -> Self {
        RoomListError::new(
            RoomListErrorCategory::Internal,
            "store_closed",
            err.to_string(),
        )
    }
}

enum StoreCommand {
    Snapshot(oneshot::Sender<Vec<RoomListEntry>>),
    Replace(Vec<RoomListEntry>, oneshot::Sender<()>),
    Count(oneshot::Sender<usize>),
    Ids(VisibleRange, oneshot::Sender<Vec<String>>),
}

/// Cloneable handle to the store actor.
#[derive(Clone, Debug)]
pub struct StoreHandle {
    command_tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    /// Spawn a store actor. It stops once every handle is dropped.
    pub fn spawn(max_visible_range: usize) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let store = RoomStore {
            entries: Vec::new(),
            max_visible_range: max_visible_range.max(1),
        };
        tokio::spawn(store.run(command_rx));
        Self { command_tx }
    }

    /// Copy of the current entries, in list order.
    pub async fn snapshot(&self) -> Result<Vec<RoomListEntry>, StoreClosed> {
        self.request(StoreCommand::Snapshot).await
    }

    /// Replace the whole list. Returns once the new list is visible to readers.
    pub async fn replace(&self, entries: Vec<RoomListEntry>) -> Result<(), StoreClosed> {
        self.request(|reply| StoreCommand::Replace(entries, reply))
            .await
    }

    pub async fn count(&self) -> Result<usize, StoreClosed> {
        self.request(StoreCommand::Count).await
    }

    /// Room IDs inside `range`, clamped to the maximum visible width.
    ///
    /// Indices past the end of the list are dropped; the view may have
    /// scrolled ahead of the data.
    pub async fn ids(&self, range: VisibleRange) -> Result<Vec<String>, StoreClosed> {
        self.request(|reply| StoreCommand::Ids(range, reply)).await
    }

    async fn request<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> StoreCommand,
    ) -> Result<R, StoreClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| StoreClosed)?;
        reply_rx.await.map_err(|_| StoreClosed)
    }
}

struct RoomStore {
    entries: Vec<RoomListEntry>,
    max_visible_range: usize,
}

impl RoomStore {
    async fn run(mut self, mut command_rx: mpsc::Receiver<StoreCommand>) {
        while let Some(command) = command_rx.recv().await {
            self.handle(command);
        }
        debug!("room store actor exiting");
    }

    fn handle(&mut self, command: StoreCommand) {
        match command {
            StoreCommand::Snapshot(reply) => {
                let _ = reply.send(self.entries.clone());
            }
            StoreCommand::Replace(entries, reply) => {
                self.entries = entries;
                let _ = reply.send(());
            }
            StoreCommand::Count(reply) => {
                let _ = reply.send(self.entries.len());
            }
            StoreCommand::Ids(range, reply) => {
                let _ = reply.send(self.ids(range));
            }
        }
    }

    fn ids(&self, range: VisibleRange) -> Vec<String> {
        let indices = range
            .clamped(self.max_visible_range)
            .indices_within(self.entries.len());
        self.entries[indices]
            .iter()
            .map(|entry| entry.summary.id.clone())
            .collect()
    }
}
