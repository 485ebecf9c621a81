use serde::{Deserialize, Serialize};

use marconio_proto::MediaPlayable;

use crate::clients::activity::{UserActivity, UserActivityEvent};
use crate::clients::audio::{AudioEngineEvent, RoutePicker};
use crate::clients::remote::ExternalCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackState {
    pub currently_playing: Option<MediaPlayable>,
    pub player_state: PlayerState,
    pub current_activity: Option<UserActivity>,
    pub route_picker: Option<RoutePicker>,
    pub monitoring_remote_commands: bool,
    /// Bumped on every load; engine events from older loads are dropped.
    pub load_generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackAction {
    LoadPlayable(MediaPlayable),
    PausePlayback,
    ResumePlayback,
    TogglePlayback,
    StopPlayback,
    UpdateNowPlaying,
    StartMonitoringRemoteCommands,
    ExternalCommand(ExternalCommand),
    UserActivity(UserActivityEvent),
    AudioEngine(AudioEngineEvent),
}
