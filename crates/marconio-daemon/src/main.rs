mod activity;
mod app_tile;
mod engine;
mod http;
mod media_controls;
mod mpv;

use std::sync::Arc;
use std::time::Duration;

use marconio_core::db::DatabaseClient;
use marconio_core::{
    AppAction, AppCoordinator, AppEnvironment, BroadcastMessage, Inbox, PlaybackAction,
    PlaybackEnvironment, Store,
};
use marconio_proto::api::LiveApi;
use marconio_proto::config::Config;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::activity::FileActivityBridge;
use crate::app_tile::LoggingAppTile;
use crate::engine::MpvEngine;
use crate::media_controls::MediaSession;

/// Forwards WARN and ERROR events to render-interface subscribers.
struct BroadcastLayer {
    sender: broadcast::Sender<BroadcastMessage>,
}

impl<S> tracing_subscriber::Layer<S> for BroadcastLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let level = event.metadata().level();
        if !matches!(*level, tracing::Level::WARN | tracing::Level::ERROR) {
            return;
        }

        let mut message = format!("{} [{}] ", chrono::Local::now().format("%H:%M:%S"), level);
        let mut visitor = MessageVisitor(&mut message);
        event.record(&mut visitor);

        // no receivers is fine
        let _ = self.sender.send(BroadcastMessage::Log(message));
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl<'a> tracing::field::Visit for MessageVisitor<'a> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0.push_str(&format!("{:?}", value));
        } else {
            self.0.push_str(&format!(" {}={:?}", field.name(), value));
        }
    }
}

fn init_logging(broadcast_tx: broadcast::Sender<BroadcastMessage>) -> anyhow::Result<()> {
    let data_dir = marconio_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("marconio.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(BroadcastLayer {
            sender: broadcast_tx,
        })
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,marconio_core=debug,marconio_daemon=debug")
            }),
        )
        .init();

    info!("Log file: {:?}", log_path);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // broadcast first so the log layer can feed it
    let (broadcast_tx, _) = broadcast::channel::<BroadcastMessage>(256);
    init_logging(broadcast_tx.clone())?;

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());

    // everything that dispatches needs the inbox before the store exists
    let inbox = Inbox::new();
    let dispatcher = inbox.dispatcher();

    let engine_events = dispatcher.map(|e| AppAction::Playback(PlaybackAction::AudioEngine(e)));
    let session = MediaSession::start()?;
    let playback = PlaybackEnvironment {
        engine: Box::new(MpvEngine::spawn(config.player.default_volume, engine_events)),
        remote: Box::new(session.clone()),
        now_playing: Box::new(session),
        activity: Box::new(FileActivityBridge::new(config.paths.activity_file.clone())),
        app_tile: Box::new(LoggingAppTile),
    };

    let (poll_floor, poll_ceiling) = config.api.poll_bounds();
    let env = AppEnvironment {
        api: Arc::new(LiveApi::new(&config.api)?),
        db: DatabaseClient::open(&config.paths.database)?,
        poll_floor,
        poll_ceiling,
        playback,
    };

    let app = AppCoordinator::new(env, dispatcher);
    let (store, handle) = Store::with_broadcast(app, inbox, broadcast_tx);

    if config.http.enabled {
        let _http_handle = http::start_server(config.http.bind_address.clone(), config.http.port, handle.clone());
    }

    let on_signal = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            on_signal.dispatch(AppAction::Shutdown);
        }
    });

    handle.dispatch(AppAction::LoadInitialData);

    info!("Marconio initialised, running event loop");
    store.run().await?;

    // let the engine worker ask mpv to quit before the runtime goes away
    tokio::time::sleep(Duration::from_millis(300)).await;
    Ok(())
}
