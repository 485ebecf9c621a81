//! Collaborator seams. Each trait is implemented by a live adapter in the
//! daemon and by recording fakes in tests.

pub mod activity;
pub mod app_tile;
pub mod audio;
pub mod now_playing;
pub mod remote;

pub use activity::{UserActivity, UserActivityBridge, UserActivityEvent};
pub use app_tile::AppTile;
pub use audio::{AudioEngine, AudioEngineEvent, EngineError, LoadRequest, RoutePicker};
pub use now_playing::{NowPlayingInfo, NowPlayingPublisher, NowPlayingStatus};
pub use remote::{ExternalCommand, RemoteCommandMonitor};
