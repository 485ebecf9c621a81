//! `MediaPlayable` — the one streamable value the playback core deals in.
//!
//! Built by pure conversion from a [`Channel`] or a [`Mixtape`]; never
//! mutated afterwards.

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::models::{Channel, Mixtape};

pub const NTS_HOME: &str = "https://www.nts.live";
pub const STREAM_RELAY_HOST: &str = "stream-relay-geo.ntslive.net";
pub const DEFAULT_CHANNEL_DESCRIPTION: &str = "Description not provided by NTS or broadcaster.";

/// Where a playable came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum PlayableSource {
    Channel(Channel),
    Mixtape(Mixtape),
}

/// Discriminant of [`PlayableSource`], cheap to carry around in activity
/// payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Channel,
    Mixtape,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPlayable {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: String,
    pub artwork: Url,
    /// Canonical web page.
    pub url: Url,
    pub stream_url: Url,
    pub source: Option<PlayableSource>,
}

impl MediaPlayable {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        subtitle: Option<String>,
        description: impl Into<String>,
        artwork: Url,
        url: Url,
        stream_url: Url,
        source: Option<PlayableSource>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subtitle,
            description: description.into(),
            artwork,
            url,
            stream_url,
            source,
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        match self.source {
            Some(PlayableSource::Channel(_)) => SourceKind::Channel,
            Some(PlayableSource::Mixtape(_)) => SourceKind::Mixtape,
            None => SourceKind::None,
        }
    }
}

fn nts_home() -> Url {
    Url::parse(NTS_HOME).expect("NTS_HOME is a valid URL")
}

/// Relay URL for a live channel. Unknown channel names yield the bare relay
/// host, which will not stream.
pub fn channel_stream_url(channel_name: &str) -> Url {
    let mut url = Url::parse(&format!("https://{STREAM_RELAY_HOST}/"))
        .expect("stream relay host is a valid URL");
    match channel_name {
        "1" => url.set_path("/stream"),
        "2" => url.set_path("/stream2"),
        other => {
            warn!(
                "unknown NTS channel {:?}, its stream URL will not stream",
                other
            );
        }
    }
    url
}

impl From<&Channel> for MediaPlayable {
    fn from(channel: &Channel) -> Self {
        let details = channel.now.details();

        let description = details
            .map(|d| d.description.as_str())
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_CHANNEL_DESCRIPTION)
            .to_string();

        let artwork = details
            .map(|d| {
                d.media
                    .background_large
                    .clone()
                    .unwrap_or_else(|| d.media.picture_large.clone())
            })
            .unwrap_or_else(nts_home);

        let url = details.and_then(|d| d.web_url()).unwrap_or_else(nts_home);

        Self {
            id: channel.channel_name.clone(),
            title: format!("Channel {}", channel.channel_name),
            subtitle: Some(channel.now.broadcast_title.clone()),
            description,
            artwork,
            url,
            stream_url: channel_stream_url(&channel.channel_name),
            source: Some(PlayableSource::Channel(channel.clone())),
        }
    }
}

impl From<&Mixtape> for MediaPlayable {
    fn from(mixtape: &Mixtape) -> Self {
        let url = mixtape.web_url().unwrap_or_else(|| {
            let mut url = nts_home();
            url.set_path(&format!("/infinite-mixtapes/{}", mixtape.mixtape_alias));
            url
        });

        Self {
            id: mixtape.mixtape_alias.clone(),
            title: mixtape.title.clone(),
            subtitle: Some(mixtape.subtitle.clone()),
            description: mixtape.description.clone(),
            artwork: mixtape.media.picture_large.clone(),
            url,
            stream_url: mixtape.audio_stream_endpoint.clone(),
            source: Some(PlayableSource::Mixtape(mixtape.clone())),
        }
    }
}
