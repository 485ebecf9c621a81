//! Top-level coordinator: loads and polls the NTS catalogue, keeps the local
//! cache in sync, continues handed-off activities, and owns the playback
//! coordinator.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use marconio_proto::api::{ApiError, NtsApi};
use marconio_proto::models::{LiveBroadcastsResponse, MixtapesResponse};
use marconio_proto::{Channel, MediaPlayable, Mixtape};

use crate::clients::{UserActivity, UserActivityEvent};
use crate::db::{CacheContents, DatabaseClient, DbError};
use crate::dispatch::Dispatcher;
use crate::playback::{PlaybackAction, PlaybackCoordinator, PlaybackEnvironment, PlaybackState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbEvent {
    /// Startup read of whatever was cached by a previous run.
    Cached(CacheContents),
    /// The cache changed after a write.
    RealtimeUpdate(CacheContents),
    WriteFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    LoadInitialData,
    LoadChannels,
    ChannelsResponse(Result<LiveBroadcastsResponse, ApiError>),
    LoadMixtapes,
    MixtapesResponse(Result<MixtapesResponse, ApiError>),
    PlayChannel(String),
    PlayMixtape(String),
    ContinueActivity(UserActivity),
    Playback(PlaybackAction),
    Db(DbEvent),
    Shutdown,
}

/// What a UI can ask for. Deserialized from the render interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    Refresh,
    PlayChannel { name: String },
    PlayMixtape { alias: String },
    Pause,
    Resume,
    Toggle,
    Stop,
    UpdateNowPlaying,
    ContinueActivity { activity: UserActivity },
}

impl From<Intent> for AppAction {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Refresh => AppAction::LoadInitialData,
            Intent::PlayChannel { name } => AppAction::PlayChannel(name),
            Intent::PlayMixtape { alias } => AppAction::PlayMixtape(alias),
            Intent::Pause => AppAction::Playback(PlaybackAction::PausePlayback),
            Intent::Resume => AppAction::Playback(PlaybackAction::ResumePlayback),
            Intent::Toggle => AppAction::Playback(PlaybackAction::TogglePlayback),
            Intent::Stop => AppAction::Playback(PlaybackAction::StopPlayback),
            Intent::UpdateNowPlaying => AppAction::Playback(PlaybackAction::UpdateNowPlaying),
            Intent::ContinueActivity { activity } => AppAction::ContinueActivity(activity),
        }
    }
}

pub struct AppEnvironment {
    pub api: Arc<dyn NtsApi>,
    pub db: DatabaseClient,
    pub poll_floor: Duration,
    pub poll_ceiling: Duration,
    pub playback: PlaybackEnvironment,
}

pub struct AppCoordinator {
    channels: Vec<Channel>,
    mixtapes: Vec<Mixtape>,
    playback: PlaybackCoordinator,
    api: Arc<dyn NtsApi>,
    db: DatabaseClient,
    poll_floor: Duration,
    poll_ceiling: Duration,
    inbox: Dispatcher<AppAction>,
    poll: Option<JoinHandle<()>>,
    realtime: Option<JoinHandle<()>>,
    tasks: Vec<JoinHandle<()>>,
}

impl AppCoordinator {
    pub fn new(env: AppEnvironment, inbox: Dispatcher<AppAction>) -> Self {
        let playback = PlaybackCoordinator::new(env.playback, inbox.map(AppAction::Playback));
        Self {
            channels: Vec::new(),
            mixtapes: Vec::new(),
            playback,
            api: env.api,
            db: env.db,
            poll_floor: env.poll_floor,
            poll_ceiling: env.poll_ceiling,
            inbox,
            poll: None,
            realtime: None,
            tasks: Vec::new(),
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn mixtapes(&self) -> &[Mixtape] {
        &self.mixtapes
    }

    pub fn playback(&self) -> &PlaybackState {
        self.playback.state()
    }

    /// Must be called from within a tokio runtime: fetches and timers are
    /// spawned as tasks that report back through the inbox.
    pub fn send(&mut self, action: AppAction) {
        self.tasks.retain(|t| !t.is_finished());

        match action {
            AppAction::LoadInitialData => {
                info!("app: loading initial data");
                self.start_observing_db();
                self.read_cache();
                self.send(AppAction::LoadChannels);
                self.send(AppAction::LoadMixtapes);
            }

            AppAction::LoadChannels => {
                let api = Arc::clone(&self.api);
                let inbox = self.inbox.clone();
                self.tasks.push(tokio::spawn(async move {
                    inbox.send(AppAction::ChannelsResponse(api.live().await));
                }));
            }

            AppAction::LoadMixtapes => {
                let api = Arc::clone(&self.api);
                let inbox = self.inbox.clone();
                self.tasks.push(tokio::spawn(async move {
                    inbox.send(AppAction::MixtapesResponse(api.mixtapes().await));
                }));
            }

            AppAction::ChannelsResponse(Ok(response)) => {
                let interval =
                    response.next_update_interval(Utc::now(), self.poll_floor, self.poll_ceiling);
                debug!("app: {} channels, next poll in {:?}", response.results.len(), interval);
                self.persist(response.results.clone(), |db, channels| db.write_channels(&channels));
                self.channels = response.results;
                self.schedule_poll(interval);
            }

            AppAction::ChannelsResponse(Err(e)) => {
                warn!("app: failed to load channels: {}", e);
                self.schedule_poll(self.poll_ceiling);
            }

            AppAction::MixtapesResponse(Ok(response)) => {
                debug!("app: {} mixtapes", response.results.len());
                self.persist(response.results.clone(), |db, mixtapes| db.write_mixtapes(&mixtapes));
                self.mixtapes = response.results;
            }

            AppAction::MixtapesResponse(Err(e)) => {
                warn!("app: failed to load mixtapes: {}", e);
            }

            AppAction::PlayChannel(name) => match self.channels.iter().find(|c| c.id() == name) {
                Some(channel) => self.load(MediaPlayable::from(channel)),
                None => warn!("app: no channel named {:?}", name),
            },

            AppAction::PlayMixtape(alias) => match self.mixtapes.iter().find(|m| m.id() == alias) {
                Some(mixtape) => self.load(MediaPlayable::from(mixtape)),
                None => warn!("app: no mixtape with alias {:?}", alias),
            },

            AppAction::ContinueActivity(activity) => self.continue_activity(activity),

            AppAction::Playback(action) => self.playback.send(action),

            AppAction::Db(DbEvent::Cached(contents)) => {
                // anything fetched live already is newer than the cache
                if self.channels.is_empty() {
                    self.channels = contents.channels;
                }
                if self.mixtapes.is_empty() {
                    self.mixtapes = contents.mixtapes;
                }
            }

            AppAction::Db(DbEvent::RealtimeUpdate(contents)) => {
                self.channels = contents.channels;
                self.mixtapes = contents.mixtapes;
            }

            AppAction::Db(DbEvent::WriteFailure(reason)) => {
                warn!("app: cache write failed: {}", reason);
            }

            AppAction::Shutdown => self.shutdown(),
        }
    }

    /// Stop playback, release collaborators, and abort background work.
    pub fn shutdown(&mut self) {
        info!("app: shutting down");
        if let Some(poll) = self.poll.take() {
            poll.abort();
        }
        if let Some(realtime) = self.realtime.take() {
            realtime.abort();
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.playback.shutdown();
    }

    fn load(&mut self, playable: MediaPlayable) {
        self.playback.send(PlaybackAction::LoadPlayable(playable));
    }

    fn continue_activity(&mut self, activity: UserActivity) {
        match self.playback.handle_activity(activity) {
            UserActivityEvent::WillHandle(activity) => {
                match activity.resolve(&self.channels, &self.mixtapes) {
                    Some(playable) => {
                        info!("app: continuing activity {:?}", activity.title);
                        self.load(playable);
                    }
                    None => debug!(
                        "app: activity {:?} ({}) matches nothing we know",
                        activity.title, activity.playable_id
                    ),
                }
            }
            UserActivityEvent::WillNotHandle(activity) => {
                debug!("app: ignoring activity of type {:?}", activity.activity_type);
            }
            other => self.playback.send(PlaybackAction::UserActivity(other)),
        }
    }

    fn schedule_poll(&mut self, after: Duration) {
        if let Some(previous) = self.poll.take() {
            previous.abort();
        }
        let inbox = self.inbox.clone();
        self.poll = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            inbox.send(AppAction::LoadChannels);
        }));
    }

    fn start_observing_db(&mut self) {
        if self.realtime.is_some() {
            return;
        }
        let mut updates = self.db.observe();
        let inbox = self.inbox.clone();
        self.realtime = Some(tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(contents) => {
                        if !inbox.send(AppAction::Db(DbEvent::RealtimeUpdate(contents))) {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("app: skipped {} cache updates", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    fn read_cache(&mut self) {
        let db = self.db.clone();
        let inbox = self.inbox.clone();
        self.tasks.push(tokio::spawn(async move {
            match tokio::task::spawn_blocking(move || db.fetch_all()).await {
                Ok(Ok(contents)) => {
                    inbox.send(AppAction::Db(DbEvent::Cached(contents)));
                }
                Ok(Err(e)) => warn!("app: failed to read cache: {}", e),
                Err(e) => warn!("app: cache read task failed: {}", e),
            }
        }));
    }

    fn persist<T, F>(&mut self, records: T, write: F)
    where
        T: Send + 'static,
        F: FnOnce(&DatabaseClient, T) -> Result<(), DbError> + Send + 'static,
    {
        let db = self.db.clone();
        let inbox = self.inbox.clone();
        self.tasks.push(tokio::spawn(async move {
            let outcome = tokio::task::spawn_blocking(move || write(&db, records)).await;
            let failure = match outcome {
                Ok(Ok(())) => return,
                Ok(Err(e)) => e.to_string(),
                Err(e) => e.to_string(),
            };
            inbox.send(AppAction::Db(DbEvent::WriteFailure(failure)));
        }));
    }
}
