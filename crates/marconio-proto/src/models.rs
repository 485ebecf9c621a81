//! NTS API records.
//!
//! These mirror the v2 JSON payloads of `/live` and `/mixtapes`. Optional
//! fields default rather than fail so partially-embedded upcoming broadcasts
//! still decode.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Static imagery attached to a show, broadcast, or mixtape.
///
/// `background_*` sizes are usually only present on broadcasts; `picture_*`
/// sizes are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub background_large: Option<Url>,
    #[serde(default)]
    pub background_medium_large: Option<Url>,
    #[serde(default)]
    pub background_medium: Option<Url>,
    #[serde(default)]
    pub background_small: Option<Url>,
    #[serde(default)]
    pub background_thumb: Option<Url>,
    pub picture_large: Url,
    pub picture_medium_large: Url,
    pub picture_medium: Url,
    pub picture_small: Url,
    pub picture_thumb: Url,
}

/// Hypermedia link to another API resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl Link {
    /// The public website URL for an API link: leading `api`/`v2` path
    /// segments are dropped. Links with two or fewer path segments have no
    /// website counterpart.
    pub fn href_with_api_removed(&self) -> Option<Url> {
        let mut url = Url::parse(&self.href).ok()?;
        let segments: Vec<String> = url
            .path_segments()?
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if segments.len() <= 2 {
            return None;
        }

        let kept: Vec<&str> = segments
            .iter()
            .map(String::as_str)
            .skip_while(|s| *s == "api" || *s == "v2")
            .collect();

        url.set_path(&format!("/{}", kept.join("/")));
        Some(url)
    }
}

fn self_link(links: &[Link]) -> Option<Url> {
    links
        .iter()
        .find(|l| l.rel == "self")
        .and_then(Link::href_with_api_removed)
}

/// The `details` embed of a broadcast: what the broadcast is actually playing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastEmbed {
    /// `published` or `pending`.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description_html: String,
    #[serde(default)]
    pub external_links: Vec<String>,
    #[serde(default)]
    pub location_short: Option<String>,
    #[serde(default)]
    pub location_long: Option<String>,
    pub media: Media,
    #[serde(default)]
    pub episode_alias: Option<String>,
    #[serde(default)]
    pub show_alias: String,
    #[serde(default)]
    pub broadcast: Option<DateTime<Utc>>,
    #[serde(default)]
    pub mixcloud: Option<Url>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl BroadcastEmbed {
    /// Public episode page on nts.live.
    pub fn web_url(&self) -> Option<Url> {
        self_link(&self.links)
    }
}

/// Something airing now or later on a [`Channel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Broadcast {
    pub broadcast_title: String,
    pub start_timestamp: DateTime<Utc>,
    pub end_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub embeds: HashMap<String, BroadcastEmbed>,
}

impl Broadcast {
    pub fn details(&self) -> Option<&BroadcastEmbed> {
        self.embeds.get("details")
    }
}

/// A live channel, typically named "1" or "2".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub channel_name: String,
    pub now: Broadcast,
    pub next: Broadcast,
}

impl Channel {
    pub fn id(&self) -> &str {
        &self.channel_name
    }
}

/// A curated infinite mixtape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mixtape {
    pub mixtape_alias: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description_html: String,
    pub audio_stream_endpoint: Url,
    pub media: Media,
    #[serde(default)]
    pub now_playing_topic: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Mixtape {
    pub fn id(&self) -> &str {
        &self.mixtape_alias
    }

    /// Public mixtape page on nts.live.
    pub fn web_url(&self) -> Option<Url> {
        self_link(&self.links)
    }
}

/// Response of `GET /live`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveBroadcastsResponse {
    pub results: Vec<Channel>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl LiveBroadcastsResponse {
    /// How long to wait before polling `/live` again: until the first
    /// current broadcast ends, kept within `[floor, ceiling]`. If the bounds
    /// are inverted the ceiling wins.
    pub fn next_update_interval(
        &self,
        now: DateTime<Utc>,
        floor: Duration,
        ceiling: Duration,
    ) -> Duration {
        let earliest_end = self.results.iter().map(|c| c.now.end_timestamp).min();
        match earliest_end {
            Some(end) => {
                let remaining = (end - now).to_std().unwrap_or(Duration::ZERO);
                remaining.max(floor).min(ceiling)
            }
            None => ceiling,
        }
    }
}

/// Response of `GET /mixtapes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixtapesResponse {
    pub results: Vec<Mixtape>,
    #[serde(default)]
    pub links: Vec<Link>,
}
