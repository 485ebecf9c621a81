//! Playback state machine and the executor that carries out its effects.

mod reducer;
mod state;

use std::collections::VecDeque;

use tracing::{debug, info, warn};

pub use reducer::{reduce, Effect};
pub use state::{PlaybackAction, PlaybackState, PlayerState};

use crate::clients::{
    AppTile, AudioEngine, NowPlayingPublisher, RemoteCommandMonitor, UserActivity,
    UserActivityBridge, UserActivityEvent,
};
use crate::dispatch::{Dispatcher, Subscription};

/// Everything the playback coordinator talks to.
pub struct PlaybackEnvironment {
    pub engine: Box<dyn AudioEngine>,
    pub remote: Box<dyn RemoteCommandMonitor>,
    pub now_playing: Box<dyn NowPlayingPublisher>,
    pub activity: Box<dyn UserActivityBridge>,
    pub app_tile: Box<dyn AppTile>,
}

pub struct PlaybackCoordinator {
    state: PlaybackState,
    env: PlaybackEnvironment,
    inbox: Dispatcher<PlaybackAction>,
    remote_commands: Option<Subscription>,
}

impl PlaybackCoordinator {
    /// `inbox` is where asynchronous callbacks (remote commands) re-enter.
    pub fn new(env: PlaybackEnvironment, inbox: Dispatcher<PlaybackAction>) -> Self {
        Self {
            state: PlaybackState::default(),
            env,
            inbox,
            remote_commands: None,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Apply `action` and every follow-up it produces before returning.
    pub fn send(&mut self, action: PlaybackAction) {
        let mut queue = VecDeque::from([action]);
        while let Some(action) = queue.pop_front() {
            for effect in reduce(&mut self.state, action) {
                self.execute(effect, &mut queue);
            }
        }
    }

    /// Ask the activity bridge whether an incoming activity is ours.
    pub fn handle_activity(&mut self, incoming: UserActivity) -> UserActivityEvent {
        self.env.activity.handle_activity(incoming)
    }

    /// Tear down the remote-command registration and stop the engine.
    pub fn shutdown(&mut self) {
        if let Some(subscription) = self.remote_commands.take() {
            debug!("playback: cancelling remote command subscription");
            subscription.cancel();
        }
        self.send(PlaybackAction::StopPlayback);
        self.env.engine.shutdown();
        info!("playback: shut down");
    }

    fn execute(&mut self, effect: Effect, queue: &mut VecDeque<PlaybackAction>) {
        debug!("playback effect: {:?}", effect);
        match effect {
            Effect::EngineLoad(request) => self.env.engine.load(request),
            Effect::EngineResume => self.env.engine.resume(),
            Effect::EnginePause => self.env.engine.pause(),
            Effect::EngineStop => self.env.engine.stop(),
            Effect::PublishStatus(status) => self.env.now_playing.publish_status(status),
            Effect::PublishInfo(info) => self.env.now_playing.publish_info(&info),
            Effect::UpdateAppTile(playable) => self.env.app_tile.update_tile(&playable),
            Effect::BecomeCurrentActivity(playable) => {
                let event = self.env.activity.become_current(&playable);
                queue.push_back(PlaybackAction::UserActivity(event));
            }
            Effect::MarkActivityCurrent(activity) => self.env.activity.mark_current(&activity),
            Effect::ResignCurrentActivity(activity) => {
                let event = self.env.activity.resign_current(&activity);
                queue.push_back(PlaybackAction::UserActivity(event));
            }
            Effect::StartRemoteCommands => {
                let sink = self.inbox.map(PlaybackAction::ExternalCommand);
                match self.env.remote.start_monitoring(sink) {
                    Ok(subscription) => {
                        info!("playback: monitoring remote commands");
                        self.remote_commands = Some(subscription);
                    }
                    Err(e) => warn!("playback: failed to start remote command monitoring: {:#}", e),
                }
            }
            Effect::Send(action) => queue.push_back(action),
        }
    }
}
