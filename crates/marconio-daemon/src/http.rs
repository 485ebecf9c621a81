use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use futures_util::stream::{self, Stream};
use marconio_core::clients::UserActivity;
use marconio_core::{AppAction, AppSnapshot, BroadcastMessage, Intent, PlaybackAction, StoreHandle};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

pub fn router(store: StoreHandle) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/events", get(events))
        .route("/api/action", post(post_intent))
        .route("/api/activity/continue", post(continue_activity))
        .route("/api/pause", post(pause))
        .route("/api/resume", post(resume))
        .route("/api/toggle", post(toggle))
        .route("/api/stop", post(stop))
        .route("/api/play/channel/:name", post(play_channel))
        .route("/api/play/mixtape/:alias", post(play_mixtape))
        .layer(CorsLayer::permissive())
        .with_state(store)
}

pub fn start_server(bind_address: String, port: u16, store: StoreHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(store);

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

fn dispatch(store: &StoreHandle, action: AppAction) -> StatusCode {
    debug!("HTTP API: {:?}", action);
    if store.dispatch(action) {
        StatusCode::ACCEPTED
    } else {
        error!("HTTP API: store inbox is closed");
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn get_state(State(store): State<StoreHandle>) -> Json<AppSnapshot> {
    Json(store.snapshot().await)
}

/// Server-sent events: `state` with the full snapshot after every change,
/// `log` for warnings and errors.
async fn events(State(store): State<StoreHandle>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = store.subscribe();
    let stream = stream::unfold((store, rx), |(store, mut rx)| async move {
        loop {
            let event = match rx.recv().await {
                Ok(BroadcastMessage::StateUpdated) => {
                    let snapshot = store.snapshot().await;
                    match Event::default().event("state").json_data(&snapshot) {
                        Ok(event) => event,
                        Err(e) => {
                            error!("HTTP API: failed to encode snapshot: {}", e);
                            continue;
                        }
                    }
                }
                Ok(BroadcastMessage::Log(line)) => Event::default().event("log").data(line),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            };
            return Some((Ok(event), (store, rx)));
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

async fn post_intent(State(store): State<StoreHandle>, Json(intent): Json<Intent>) -> StatusCode {
    info!("HTTP API: intent {:?}", intent);
    dispatch(&store, intent.into())
}

async fn continue_activity(
    State(store): State<StoreHandle>,
    Json(activity): Json<UserActivity>,
) -> StatusCode {
    info!("HTTP API: continue activity {:?}", activity.title);
    dispatch(&store, AppAction::ContinueActivity(activity))
}

async fn pause(State(store): State<StoreHandle>) -> StatusCode {
    dispatch(&store, AppAction::Playback(PlaybackAction::PausePlayback))
}

async fn resume(State(store): State<StoreHandle>) -> StatusCode {
    dispatch(&store, AppAction::Playback(PlaybackAction::ResumePlayback))
}

async fn toggle(State(store): State<StoreHandle>) -> StatusCode {
    dispatch(&store, AppAction::Playback(PlaybackAction::TogglePlayback))
}

async fn stop(State(store): State<StoreHandle>) -> StatusCode {
    dispatch(&store, AppAction::Playback(PlaybackAction::StopPlayback))
}

async fn play_channel(State(store): State<StoreHandle>, Path(name): Path<String>) -> StatusCode {
    info!("HTTP API: play channel {}", name);
    dispatch(&store, AppAction::PlayChannel(name))
}

async fn play_mixtape(State(store): State<StoreHandle>, Path(alias): Path<String>) -> StatusCode {
    info!("HTTP API: play mixtape {}", alias);
    dispatch(&store, AppAction::PlayMixtape(alias))
}
