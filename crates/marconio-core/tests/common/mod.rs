#![allow(dead_code)]

//! Recording fakes for every collaborator seam, plus fixture loaders.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use marconio_core::clients::{
    AppTile, AudioEngine, AudioEngineEvent, ExternalCommand, LoadRequest, NowPlayingInfo,
    NowPlayingPublisher, NowPlayingStatus, RemoteCommandMonitor, RoutePicker, UserActivity,
    UserActivityBridge, UserActivityEvent,
};
use marconio_core::db::DatabaseClient;
use marconio_core::{
    AppCoordinator, AppEnvironment, AppSnapshot, Dispatcher, Inbox, PlaybackEnvironment,
    StoreHandle, Subscription,
};
use marconio_proto::api::{decode, ApiError, NtsApi};
use marconio_proto::models::{LiveBroadcastsResponse, MixtapesResponse};
use marconio_proto::MediaPlayable;

pub const LIVE: &[u8] = include_bytes!("../../../marconio-proto/tests/fixtures/live-broadcasts.json");
pub const MIXTAPES: &[u8] = include_bytes!("../../../marconio-proto/tests/fixtures/mixtapes.json");

pub fn live() -> LiveBroadcastsResponse {
    decode(LIVE).expect("live fixture")
}

pub fn mixtapes() -> MixtapesResponse {
    decode(MIXTAPES).expect("mixtapes fixture")
}

pub fn mixtape_playable(alias: &str) -> MediaPlayable {
    let tape = mixtapes()
        .results
        .into_iter()
        .find(|m| m.mixtape_alias == alias)
        .expect("mixtape in fixture");
    MediaPlayable::from(&tape)
}

pub fn channel_playable(name: &str) -> MediaPlayable {
    let channel = live()
        .results
        .into_iter()
        .find(|c| c.channel_name == name)
        .expect("channel in fixture");
    MediaPlayable::from(&channel)
}

/// One entry per collaborator call, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    EngineLoad { url: String, generation: u64 },
    EngineResume,
    EnginePause,
    EngineStop,
    EngineShutdown,
    Status(NowPlayingStatus),
    Info(NowPlayingInfo),
    Tile(String),
    MarkCurrent(String),
    Resign(String),
    StartMonitoring,
    StopMonitoring,
}

#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Call>>>);

impl Recorder {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

pub struct FakeEngine {
    rec: Recorder,
    /// When set, every load reports `DidLoad` straight away.
    events: Option<Dispatcher<AudioEngineEvent>>,
}

impl AudioEngine for FakeEngine {
    fn load(&mut self, request: LoadRequest) {
        self.rec.push(Call::EngineLoad {
            url: request.stream_url.to_string(),
            generation: request.generation,
        });
        if let Some(events) = &self.events {
            events.send(AudioEngineEvent::DidLoad {
                generation: request.generation,
                route: Some(fake_route()),
            });
        }
    }

    fn resume(&mut self) {
        self.rec.push(Call::EngineResume);
    }

    fn pause(&mut self) {
        self.rec.push(Call::EnginePause);
    }

    fn stop(&mut self) {
        self.rec.push(Call::EngineStop);
    }

    fn shutdown(&mut self) {
        self.rec.push(Call::EngineShutdown);
    }
}

pub fn fake_route() -> RoutePicker {
    RoutePicker {
        engine: "fake".into(),
        device: Some("speakers".into()),
    }
}

/// Lets a test press media keys on a running [`FakeRemote`].
#[derive(Clone, Default)]
pub struct RemoteKeys(Arc<Mutex<Option<Dispatcher<ExternalCommand>>>>);

impl RemoteKeys {
    pub fn press(&self, command: ExternalCommand) -> bool {
        match self.0.lock().unwrap().as_ref() {
            Some(sink) => sink.send(command),
            None => false,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.0.lock().unwrap().is_some()
    }
}

pub struct FakeRemote {
    rec: Recorder,
    keys: RemoteKeys,
    fail: bool,
}

impl RemoteCommandMonitor for FakeRemote {
    fn start_monitoring(
        &mut self,
        sink: Dispatcher<ExternalCommand>,
    ) -> anyhow::Result<Subscription> {
        self.rec.push(Call::StartMonitoring);
        if self.fail {
            anyhow::bail!("no media session available");
        }
        *self.keys.0.lock().unwrap() = Some(sink);

        let rec = self.rec.clone();
        let keys = self.keys.clone();
        Ok(Subscription::new(move || {
            keys.0.lock().unwrap().take();
            rec.push(Call::StopMonitoring);
        }))
    }
}

pub struct FakeNowPlaying(Recorder);

impl NowPlayingPublisher for FakeNowPlaying {
    fn publish_info(&mut self, info: &NowPlayingInfo) {
        self.0.push(Call::Info(info.clone()));
    }

    fn publish_status(&mut self, status: NowPlayingStatus) {
        self.0.push(Call::Status(status));
    }
}

pub struct FakeActivity(Recorder);

impl UserActivityBridge for FakeActivity {
    fn mark_current(&mut self, activity: &UserActivity) {
        self.0.push(Call::MarkCurrent(activity.title.clone()));
    }

    fn resign_current(&mut self, activity: &UserActivity) -> UserActivityEvent {
        self.0.push(Call::Resign(activity.title.clone()));
        UserActivityEvent::ResignCurrent
    }
}

pub struct FakeTile(Recorder);

impl AppTile for FakeTile {
    fn update_tile(&mut self, playable: &MediaPlayable) {
        self.0.push(Call::Tile(playable.title.clone()));
    }
}

pub struct Harness {
    pub rec: Recorder,
    pub keys: RemoteKeys,
}

#[derive(Default)]
pub struct HarnessOptions {
    pub engine_events: Option<Dispatcher<AudioEngineEvent>>,
    pub remote_fails: bool,
}

pub fn playback_env(options: HarnessOptions) -> (PlaybackEnvironment, Harness) {
    let rec = Recorder::default();
    let keys = RemoteKeys::default();
    let env = PlaybackEnvironment {
        engine: Box::new(FakeEngine {
            rec: rec.clone(),
            events: options.engine_events,
        }),
        remote: Box::new(FakeRemote {
            rec: rec.clone(),
            keys: keys.clone(),
            fail: options.remote_fails,
        }),
        now_playing: Box::new(FakeNowPlaying(rec.clone())),
        activity: Box::new(FakeActivity(rec.clone())),
        app_tile: Box::new(FakeTile(rec.clone())),
    };
    (env, Harness { rec, keys })
}

pub struct FakeApi {
    pub live: Mutex<Result<LiveBroadcastsResponse, ApiError>>,
    pub mixtapes: Mutex<Result<MixtapesResponse, ApiError>>,
    pub live_calls: AtomicUsize,
    pub mixtape_calls: AtomicUsize,
}

impl FakeApi {
    pub fn from_fixtures() -> Self {
        Self {
            live: Mutex::new(Ok(live())),
            mixtapes: Mutex::new(Ok(mixtapes())),
            live_calls: AtomicUsize::new(0),
            mixtape_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            live: Mutex::new(Err(ApiError::Network("connection refused".into()))),
            mixtapes: Mutex::new(Err(ApiError::Decode("unexpected token".into()))),
            live_calls: AtomicUsize::new(0),
            mixtape_calls: AtomicUsize::new(0),
        }
    }

    pub fn live_calls(&self) -> usize {
        self.live_calls.load(Ordering::SeqCst)
    }

    pub fn mixtape_calls(&self) -> usize {
        self.mixtape_calls.load(Ordering::SeqCst)
    }

    pub fn set_live(&self, response: Result<LiveBroadcastsResponse, ApiError>) {
        *self.live.lock().unwrap() = response;
    }
}

#[async_trait]
impl NtsApi for FakeApi {
    async fn live(&self) -> Result<LiveBroadcastsResponse, ApiError> {
        self.live_calls.fetch_add(1, Ordering::SeqCst);
        self.live.lock().unwrap().clone()
    }

    async fn mixtapes(&self) -> Result<MixtapesResponse, ApiError> {
        self.mixtape_calls.fetch_add(1, Ordering::SeqCst);
        self.mixtapes.lock().unwrap().clone()
    }
}

/// App coordinator over fakes, an in-memory cache, and the given API.
pub fn app(api: Arc<FakeApi>, db: DatabaseClient) -> (AppCoordinator, Inbox, Harness) {
    // keep the poll timer out of the way
    app_with_polling(api, db, Duration::from_secs(3600), Duration::from_secs(7200))
}

pub fn app_with_polling(
    api: Arc<FakeApi>,
    db: DatabaseClient,
    poll_floor: Duration,
    poll_ceiling: Duration,
) -> (AppCoordinator, Inbox, Harness) {
    let inbox = Inbox::new();
    let dispatcher = inbox.dispatcher();
    let (playback, harness) = playback_env(HarnessOptions {
        engine_events: Some(dispatcher.map(|e| {
            marconio_core::AppAction::Playback(marconio_core::PlaybackAction::AudioEngine(e))
        })),
        remote_fails: false,
    });
    let env = AppEnvironment {
        api,
        db,
        poll_floor,
        poll_ceiling,
        playback,
    };
    (AppCoordinator::new(env, dispatcher), inbox, harness)
}

/// Wait until the published snapshot satisfies `ready`.
pub async fn wait_for(
    handle: &StoreHandle,
    ready: impl Fn(&AppSnapshot) -> bool,
) -> AppSnapshot {
    let mut updates = handle.subscribe();
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = handle.snapshot().await;
            if ready(&snapshot) {
                return snapshot;
            }
            let _ = updates.recv().await;
        }
    })
    .await;
    waited.expect("snapshot never reached the expected state")
}

/// Spin until `ready` holds, yielding to the runtime between checks.
pub async fn eventually(what: &str, ready: impl Fn() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !ready() {
            tokio::task::yield_now().await;
        }
    })
    .await;
    if waited.is_err() {
        panic!("timed out waiting for {}", what);
    }
}
