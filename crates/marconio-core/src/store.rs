//! The serial context everything runs on.
//!
//! One task owns the [`AppCoordinator`] and drains the inbox. After each
//! action the published snapshot is refreshed; readers get a cloned
//! [`AppSnapshot`] and a broadcast nudge whenever it changes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, info};

use marconio_proto::{Channel, Mixtape};

use crate::app::{AppAction, AppCoordinator};
use crate::dispatch::Dispatcher;
use crate::playback::PlaybackState;

/// Messages pushed to render-interface subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastMessage {
    StateUpdated,
    /// A WARN/ERROR log line.
    Log(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSnapshot {
    pub rev: u64,
    pub channels: Vec<Channel>,
    pub mixtapes: Vec<Mixtape>,
    pub playback: PlaybackState,
}

impl AppSnapshot {
    fn capture(app: &AppCoordinator) -> Self {
        Self {
            rev: 0,
            channels: app.channels().to_vec(),
            mixtapes: app.mixtapes().to_vec(),
            playback: app.playback().clone(),
        }
    }

    fn same_content(&self, other: &Self) -> bool {
        self.playback == other.playback
            && self.channels == other.channels
            && self.mixtapes == other.mixtapes
    }
}

/// The inbox, created before anything that needs to dispatch into it.
pub struct Inbox {
    tx: mpsc::UnboundedSender<AppAction>,
    rx: mpsc::UnboundedReceiver<AppAction>,
}

impl Inbox {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn dispatcher(&self) -> Dispatcher<AppAction> {
        Dispatcher::from_sender(self.tx.clone())
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Store {
    app: AppCoordinator,
    inbox_rx: mpsc::UnboundedReceiver<AppAction>,
    shared: Arc<RwLock<AppSnapshot>>,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
}

#[derive(Clone)]
pub struct StoreHandle {
    dispatcher: Dispatcher<AppAction>,
    shared: Arc<RwLock<AppSnapshot>>,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
}

impl Store {
    pub fn new(app: AppCoordinator, inbox: Inbox) -> (Self, StoreHandle) {
        let (broadcast_tx, _) = broadcast::channel(256);
        Self::with_broadcast(app, inbox, broadcast_tx)
    }

    /// Use an existing broadcast channel, e.g. one the log layer already
    /// writes into.
    pub fn with_broadcast(
        app: AppCoordinator,
        inbox: Inbox,
        broadcast_tx: broadcast::Sender<BroadcastMessage>,
    ) -> (Self, StoreHandle) {
        let shared = Arc::new(RwLock::new(AppSnapshot::capture(&app)));
        let handle = StoreHandle {
            dispatcher: Dispatcher::from_sender(inbox.tx),
            shared: Arc::clone(&shared),
            broadcast_tx: broadcast_tx.clone(),
        };
        let store = Self {
            app,
            inbox_rx: inbox.rx,
            shared,
            broadcast_tx,
        };
        (store, handle)
    }

    /// Process actions until `Shutdown` arrives or every sender is gone.
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("store: running");
        while let Some(action) = self.inbox_rx.recv().await {
            let shutdown = matches!(action, AppAction::Shutdown);
            self.app.send(action);
            self.publish().await;
            if shutdown {
                break;
            }
        }
        info!("store: stopped");
        Ok(())
    }

    async fn publish(&mut self) {
        let mut next = AppSnapshot::capture(&self.app);
        let mut shared = self.shared.write().await;
        if shared.same_content(&next) {
            return;
        }
        next.rev = shared.rev + 1;
        debug!("store: rev {}", next.rev);
        *shared = next;
        drop(shared);
        let _ = self.broadcast_tx.send(BroadcastMessage::StateUpdated);
    }
}

impl StoreHandle {
    pub fn dispatch(&self, action: AppAction) -> bool {
        self.dispatcher.send(action)
    }

    pub fn dispatcher(&self) -> Dispatcher<AppAction> {
        self.dispatcher.clone()
    }

    pub async fn snapshot(&self) -> AppSnapshot {
        self.shared.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.broadcast_tx.subscribe()
    }
}
