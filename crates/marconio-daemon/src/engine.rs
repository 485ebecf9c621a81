//! [`AudioEngine`] over an mpv child process.
//!
//! Calls from the coordinator are queued to a single worker task, so they
//! are applied in issue order without ever blocking the store. mpv is only
//! spawned on the first load.

use marconio_core::clients::{AudioEngine, AudioEngineEvent, EngineError, LoadRequest, RoutePicker};
use marconio_core::Dispatcher;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::mpv::{MpvDriver, MpvEvent, MpvHandle, OBS_AUDIO_DEVICE};

pub const ENGINE_NAME: &str = "mpv";

#[derive(Debug)]
enum EngineCommand {
    Load(LoadRequest),
    Resume,
    Pause,
    Stop,
    Shutdown,
}

pub struct MpvEngine {
    tx: mpsc::UnboundedSender<EngineCommand>,
}

impl MpvEngine {
    /// Start the worker. Load outcomes are reported through `events`.
    pub fn spawn(volume: f32, events: Dispatcher<AudioEngineEvent>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (mpv_tx, mpv_rx) = mpsc::channel(64);
        let worker = Worker {
            driver: MpvDriver::new(volume),
            handle: None,
            mpv_tx,
            events,
            generation: 0,
            stream_url: String::new(),
            awaiting_load: false,
            loaded: false,
        };
        tokio::spawn(worker.run(rx, mpv_rx));
        Self { tx }
    }

    fn command(&self, command: EngineCommand) {
        if self.tx.send(command).is_err() {
            warn!("mpv engine: worker is gone, dropping command");
        }
    }
}

impl AudioEngine for MpvEngine {
    fn load(&mut self, request: LoadRequest) {
        self.command(EngineCommand::Load(request));
    }

    fn resume(&mut self) {
        self.command(EngineCommand::Resume);
    }

    fn pause(&mut self) {
        self.command(EngineCommand::Pause);
    }

    fn stop(&mut self) {
        self.command(EngineCommand::Stop);
    }

    fn shutdown(&mut self) {
        self.command(EngineCommand::Shutdown);
    }
}

struct Worker {
    driver: MpvDriver,
    handle: Option<MpvHandle>,
    mpv_tx: mpsc::Sender<MpvEvent>,
    events: Dispatcher<AudioEngineEvent>,
    /// Generation of the most recent load request.
    generation: u64,
    stream_url: String,
    /// A loadfile was accepted and mpv has not reported back yet.
    awaiting_load: bool,
    /// Something is loaded; device changes are reported as route updates.
    loaded: bool,
}

impl Worker {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<EngineCommand>,
        mut mpv_events: mpsc::Receiver<MpvEvent>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(EngineCommand::Shutdown) | None => break,
                    Some(command) => self.apply(command).await,
                },
                Some(event) = mpv_events.recv() => self.on_mpv_event(event).await,
            }
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.send(serde_json::json!(["quit"])).await;
        }
        self.driver.kill().await;
        info!("mpv engine: stopped");
    }

    async fn apply(&mut self, command: EngineCommand) {
        debug!("mpv engine: {:?}", command);
        match command {
            EngineCommand::Load(request) => self.load(request).await,
            EngineCommand::Resume => self.set_pause(false).await,
            EngineCommand::Pause => self.set_pause(true).await,
            EngineCommand::Stop => {
                self.awaiting_load = false;
                self.loaded = false;
                self.set_pause(true).await;
                if let Some(handle) = &self.handle {
                    if let Err(e) = handle.stop().await {
                        warn!("mpv engine: stop failed: {}", e);
                    }
                }
            }
            EngineCommand::Shutdown => {}
        }
    }

    async fn load(&mut self, request: LoadRequest) {
        self.generation = request.generation;
        self.awaiting_load = false;
        self.loaded = false;

        let url = request.stream_url.to_string();
        self.stream_url = url.clone();
        let result = match self.connection().await {
            Ok(handle) => handle.load_stream(&url, self.driver.volume).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                info!("mpv engine: loading {}", url);
                self.awaiting_load = true;
            }
            Err(e) => {
                warn!("mpv engine: could not load {}: {:#}", url, e);
                self.events.send(AudioEngineEvent::LoadFailed {
                    generation: request.generation,
                    error: EngineError::UnableToLoad {
                        url,
                        reason: format!("{:#}", e),
                    },
                });
            }
        }
    }

    async fn set_pause(&mut self, paused: bool) {
        let Some(handle) = &self.handle else {
            return;
        };
        if let Err(e) = handle.set_pause(paused).await {
            warn!("mpv engine: set pause={} failed: {}", paused, e);
        }
    }

    /// A live handle, reconnecting or respawning mpv as needed.
    async fn connection(&mut self) -> anyhow::Result<MpvHandle> {
        if let Some(handle) = &self.handle {
            if handle.ping().await.is_ok() {
                return Ok(handle.clone());
            }
            if self.driver.process_alive() {
                warn!("mpv engine: lost connection to mpv");
            } else {
                warn!("mpv engine: mpv process exited, respawning");
            }
            self.handle = None;
        }

        let reconnected = match self.driver.try_reconnect(self.mpv_tx.clone()).await {
            Some(handle) if handle.ping().await.is_ok() => Some(handle),
            _ => None,
        };
        let handle = match reconnected {
            Some(handle) => handle,
            None => self.driver.spawn_and_connect(self.mpv_tx.clone()).await?,
        };
        handle.observe_properties().await;
        self.handle = Some(handle.clone());
        Ok(handle)
    }

    async fn route(&self) -> RoutePicker {
        let device = match &self.handle {
            Some(handle) => handle.audio_device().await,
            None => None,
        };
        RoutePicker {
            engine: ENGINE_NAME.to_string(),
            device,
        }
    }

    async fn on_mpv_event(&mut self, event: MpvEvent) {
        if let Some((id, data)) = event.as_property_change() {
            if id == OBS_AUDIO_DEVICE && self.loaded {
                let route = RoutePicker {
                    engine: ENGINE_NAME.to_string(),
                    device: data.as_str().map(str::to_string),
                };
                self.events.send(AudioEngineEvent::DidLoad {
                    generation: self.generation,
                    route: Some(route),
                });
            }
            return;
        }

        match event.event_name() {
            Some("file-loaded") if self.awaiting_load => {
                self.awaiting_load = false;
                self.loaded = true;
                let route = self.route().await;
                self.events.send(AudioEngineEvent::DidLoad {
                    generation: self.generation,
                    route: Some(route),
                });
            }
            Some("end-file") if event.end_reason() == Some("error") => {
                let reason = event.file_error().unwrap_or("playback error").to_string();
                warn!("mpv engine: stream ended with error: {}", reason);
                self.awaiting_load = false;
                self.loaded = false;
                self.events.send(AudioEngineEvent::LoadFailed {
                    generation: self.generation,
                    error: EngineError::UnableToLoad {
                        url: self.stream_url.clone(),
                        reason,
                    },
                });
            }
            _ => {}
        }
    }
}
