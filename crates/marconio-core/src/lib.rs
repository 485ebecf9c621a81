pub mod app;
pub mod clients;
pub mod db;
pub mod dispatch;
pub mod playback;
pub mod store;

pub use app::{AppAction, AppCoordinator, AppEnvironment, DbEvent, Intent};
pub use dispatch::{Dispatcher, Subscription};
pub use playback::{PlaybackAction, PlaybackCoordinator, PlaybackEnvironment, PlaybackState, PlayerState};
pub use store::{AppSnapshot, BroadcastMessage, Inbox, Store, StoreHandle};
