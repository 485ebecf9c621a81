//! System media controls: remote commands in, now-playing metadata out.
//!
//! - macOS: MPNowPlayingInfoCenter / MPRemoteCommandCenter via souvlaki
//! - Windows: System Media Transport Controls via souvlaki
//! - elsewhere: headless, everything is logged
//!
//! The platform object lives on its own thread; [`MediaSession`] is a
//! cloneable handle that talks to it over a channel.

use std::sync::mpsc as std_mpsc;

use anyhow::Context;
use marconio_core::clients::{
    ExternalCommand, NowPlayingInfo, NowPlayingPublisher, NowPlayingStatus, RemoteCommandMonitor,
};
use marconio_core::{Dispatcher, Subscription};
use tracing::{debug, info, warn};

enum ControlMessage {
    Attach(Dispatcher<ExternalCommand>),
    Detach,
    Info(NowPlayingInfo),
    Status(NowPlayingStatus),
}

#[derive(Clone)]
pub struct MediaSession {
    tx: std_mpsc::Sender<ControlMessage>,
}

impl MediaSession {
    pub fn start() -> anyhow::Result<Self> {
        let (tx, rx) = std_mpsc::channel();
        std::thread::Builder::new()
            .name("media-controls".into())
            .spawn(move || {
                let mut backend = backend::Backend::new();
                while let Ok(message) = rx.recv() {
                    backend.handle(message);
                }
                debug!("media controls: thread exiting");
            })
            .context("failed to start media controls thread")?;
        Ok(Self { tx })
    }

    fn post(&self, message: ControlMessage) {
        if self.tx.send(message).is_err() {
            warn!("media controls: thread is gone");
        }
    }
}

impl RemoteCommandMonitor for MediaSession {
    /// Hands the sink to the platform thread without waiting on it; a
    /// platform that refuses to attach is logged there.
    fn start_monitoring(&mut self, sink: Dispatcher<ExternalCommand>) -> anyhow::Result<Subscription> {
        self.tx
            .send(ControlMessage::Attach(sink))
            .map_err(|_| anyhow::anyhow!("media controls thread is gone"))?;

        let session = self.clone();
        Ok(Subscription::new(move || session.post(ControlMessage::Detach)))
    }
}

impl NowPlayingPublisher for MediaSession {
    fn publish_info(&mut self, info: &NowPlayingInfo) {
        self.post(ControlMessage::Info(info.clone()));
    }

    fn publish_status(&mut self, status: NowPlayingStatus) {
        self.post(ControlMessage::Status(status));
    }
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
mod backend {
    use super::*;
    use souvlaki::{MediaControlEvent, MediaControls, MediaMetadata, MediaPlayback, PlatformConfig};

    pub struct Backend {
        controls: Option<MediaControls>,
    }

    impl Backend {
        pub fn new() -> Self {
            let config = PlatformConfig {
                display_name: "Marconio",
                dbus_name: "marconio",
                hwnd: None,
            };
            let controls = match MediaControls::new(config) {
                Ok(controls) => Some(controls),
                Err(e) => {
                    warn!("media controls: unavailable: {:?}", e);
                    None
                }
            };
            Self { controls }
        }

        pub fn handle(&mut self, message: ControlMessage) {
            match message {
                ControlMessage::Attach(sink) => {
                    if let Err(e) = self.attach(sink) {
                        warn!("media controls: {:#}", e);
                    }
                }
                ControlMessage::Detach => {
                    if let Some(controls) = self.controls.as_mut() {
                        if let Err(e) = controls.detach() {
                            warn!("media controls: detach failed: {:?}", e);
                        }
                    }
                    info!("media controls: detached");
                }
                ControlMessage::Info(info) => {
                    let Some(controls) = self.controls.as_mut() else {
                        return;
                    };
                    let cover_url = info.artwork.as_ref().map(|u| u.as_str());
                    let metadata = MediaMetadata {
                        title: Some(info.title.as_str()),
                        artist: Some(info.artist.as_str()),
                        album: Some(info.composer.as_str()),
                        cover_url,
                        duration: None,
                    };
                    if let Err(e) = controls.set_metadata(metadata) {
                        warn!("media controls: set_metadata failed: {:?}", e);
                    }
                }
                ControlMessage::Status(status) => {
                    let Some(controls) = self.controls.as_mut() else {
                        return;
                    };
                    let playback = match status {
                        NowPlayingStatus::Playing => MediaPlayback::Playing { progress: None },
                        NowPlayingStatus::Paused => MediaPlayback::Paused { progress: None },
                        NowPlayingStatus::Stopped => MediaPlayback::Stopped,
                    };
                    if let Err(e) = controls.set_playback(playback) {
                        warn!("media controls: set_playback failed: {:?}", e);
                    }
                }
            }
        }

        fn attach(&mut self, sink: Dispatcher<ExternalCommand>) -> anyhow::Result<()> {
            let controls = self
                .controls
                .as_mut()
                .ok_or_else(|| anyhow::anyhow!("system media controls unavailable"))?;
            controls
                .attach(move |event: MediaControlEvent| {
                    let command = match event {
                        MediaControlEvent::Play => ExternalCommand::Resume,
                        MediaControlEvent::Pause => ExternalCommand::Pause,
                        MediaControlEvent::Toggle => ExternalCommand::Toggle,
                        _ => return,
                    };
                    sink.send(command);
                })
                .map_err(|e| anyhow::anyhow!("failed to attach media controls: {:?}", e))?;
            info!("media controls: attached");
            Ok(())
        }
    }
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
mod backend {
    use super::*;

    /// No system surface to talk to; keeps the sink alive and logs.
    pub struct Backend {
        sink: Option<Dispatcher<ExternalCommand>>,
    }

    impl Backend {
        pub fn new() -> Self {
            info!("media controls: no system integration on this platform, running headless");
            Self { sink: None }
        }

        pub fn handle(&mut self, message: ControlMessage) {
            match message {
                ControlMessage::Attach(sink) => self.sink = Some(sink),
                ControlMessage::Detach => {
                    if self.sink.take().is_some() {
                        debug!("media controls: detached");
                    }
                }
                ControlMessage::Info(info) => {
                    info!("now playing: {} - {} ({})", info.artist, info.title, info.asset_url);
                }
                ControlMessage::Status(status) => debug!("now playing status: {:?}", status),
            }
        }
    }
}
