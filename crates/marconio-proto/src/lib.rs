pub mod api;
pub mod config;
pub mod models;
pub mod platform;
pub mod playable;

pub use models::{Broadcast, BroadcastEmbed, Channel, Link, Media, Mixtape};
pub use playable::{MediaPlayable, PlayableSource, SourceKind};
