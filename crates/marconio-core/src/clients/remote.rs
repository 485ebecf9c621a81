use serde::{Deserialize, Serialize};

use crate::dispatch::{Dispatcher, Subscription};

/// Transport command coming from outside the app (media keys, headset,
/// lock screen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalCommand {
    Resume,
    Pause,
    Toggle,
}

pub trait RemoteCommandMonitor: Send {
    /// Register the OS handlers. Commands flow into `sink` until the
    /// returned subscription is cancelled or dropped.
    fn start_monitoring(&mut self, sink: Dispatcher<ExternalCommand>) -> anyhow::Result<Subscription>;
}
