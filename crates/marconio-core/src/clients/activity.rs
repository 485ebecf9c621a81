//! Cross-device handoff. A [`UserActivity`] is the serializable descriptor
//! another device (or another process) hands back to resume what we were
//! playing.

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use marconio_proto::{Channel, MediaPlayable, Mixtape, SourceKind};

pub const PLAYBACK_ACTIVITY_TYPE: &str = "me.foureyes.Marconio.playback";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivity {
    pub id: Uuid,
    pub activity_type: String,
    pub title: String,
    pub playable_id: String,
    #[serde(default)]
    pub source_kind: SourceKind,
    pub stream_url: Url,
    pub web_url: Url,
}

impl UserActivity {
    pub fn for_playable(playable: &MediaPlayable) -> Self {
        Self {
            id: Uuid::new_v4(),
            activity_type: PLAYBACK_ACTIVITY_TYPE.to_string(),
            title: playable.title.clone(),
            playable_id: playable.id.clone(),
            source_kind: playable.source_kind(),
            stream_url: playable.stream_url.clone(),
            web_url: playable.url.clone(),
        }
    }

    pub fn is_playback(&self) -> bool {
        self.activity_type == PLAYBACK_ACTIVITY_TYPE
    }

    /// Find the playable this activity points at among the known records.
    /// Matches on source kind and id first, then falls back to the stream URL.
    pub fn resolve(&self, channels: &[Channel], mixtapes: &[Mixtape]) -> Option<MediaPlayable> {
        let by_id = match self.source_kind {
            SourceKind::Channel => channels
                .iter()
                .find(|c| c.id() == self.playable_id)
                .map(MediaPlayable::from),
            SourceKind::Mixtape => mixtapes
                .iter()
                .find(|m| m.id() == self.playable_id)
                .map(MediaPlayable::from),
            SourceKind::None => None,
        };
        if by_id.is_some() {
            return by_id;
        }

        channels
            .iter()
            .map(MediaPlayable::from)
            .chain(mixtapes.iter().map(MediaPlayable::from))
            .find(|p| p.stream_url == self.stream_url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserActivityEvent {
    BecomeCurrent(UserActivity),
    ResignCurrent,
    WillHandle(UserActivity),
    WillNotHandle(UserActivity),
}

pub trait UserActivityBridge: Send {
    fn become_current(&mut self, playable: &MediaPlayable) -> UserActivityEvent {
        UserActivityEvent::BecomeCurrent(UserActivity::for_playable(playable))
    }

    /// Publish `activity` as the process's current activity.
    fn mark_current(&mut self, activity: &UserActivity);

    fn resign_current(&mut self, activity: &UserActivity) -> UserActivityEvent;

    fn handle_activity(&mut self, incoming: UserActivity) -> UserActivityEvent {
        if incoming.is_playback() {
            UserActivityEvent::WillHandle(incoming)
        } else {
            UserActivityEvent::WillNotHandle(incoming)
        }
    }
}
