use serde::{Deserialize, Serialize};
use url::Url;

use marconio_proto::MediaPlayable;

pub const NOW_PLAYING_ARTIST: &str = "NTS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlayingInfo {
    pub title: String,
    pub artist: String,
    pub composer: String,
    pub is_live_stream: bool,
    pub asset_url: Url,
    pub artwork: Option<Url>,
}

impl NowPlayingInfo {
    pub fn for_playable(playable: &MediaPlayable) -> Self {
        Self {
            title: playable.title.clone(),
            artist: NOW_PLAYING_ARTIST.to_string(),
            composer: playable.subtitle.clone().unwrap_or_default(),
            is_live_stream: true,
            asset_url: playable.stream_url.clone(),
            artwork: Some(playable.artwork.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NowPlayingStatus {
    Playing,
    Paused,
    Stopped,
}

/// Pushes metadata to the system "now playing" surface. Fire-and-forget.
pub trait NowPlayingPublisher: Send {
    fn publish_info(&mut self, info: &NowPlayingInfo);
    fn publish_status(&mut self, status: NowPlayingStatus);
}
