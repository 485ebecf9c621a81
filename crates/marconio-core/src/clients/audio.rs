use serde::{Deserialize, Serialize};
use url::Url;

/// A stream to load, stamped with the coordinator's load generation so late
/// completions can be told apart from current ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub stream_url: Url,
    pub generation: u64,
}

/// Opaque description of the output route the engine is playing through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePicker {
    pub engine: String,
    pub device: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum EngineError {
    #[error("unable to load {url}: {reason}")]
    UnableToLoad { url: String, reason: String },
    #[error("audio engine unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioEngineEvent {
    DidLoad {
        generation: u64,
        route: Option<RoutePicker>,
    },
    LoadFailed {
        generation: u64,
        error: EngineError,
    },
}

impl AudioEngineEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::DidLoad { generation, .. } | Self::LoadFailed { generation, .. } => *generation,
        }
    }
}

/// Wraps the platform audio player. Calls return immediately; load results
/// come back through the dispatcher the engine was built with, and commands
/// are applied in the order they were issued.
pub trait AudioEngine: Send {
    fn load(&mut self, request: LoadRequest);
    fn resume(&mut self);
    fn pause(&mut self);
    /// Pause and drop the current source.
    fn stop(&mut self);
    /// Release the underlying player. Called once, on shutdown.
    fn shutdown(&mut self) {}
}
