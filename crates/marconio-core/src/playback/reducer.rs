//! Pure transition function for the playback state machine.

use tracing::{debug, info, warn};

use marconio_proto::MediaPlayable;

use super::state::{PlaybackAction, PlaybackState, PlayerState};
use crate::clients::activity::{UserActivity, UserActivityEvent};
use crate::clients::audio::{AudioEngineEvent, LoadRequest};
use crate::clients::now_playing::{NowPlayingInfo, NowPlayingStatus};
use crate::clients::remote::ExternalCommand;

/// Work the coordinator performs against its collaborators, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    EngineLoad(LoadRequest),
    EngineResume,
    EnginePause,
    EngineStop,
    PublishStatus(NowPlayingStatus),
    PublishInfo(NowPlayingInfo),
    UpdateAppTile(MediaPlayable),
    BecomeCurrentActivity(MediaPlayable),
    MarkActivityCurrent(UserActivity),
    ResignCurrentActivity(UserActivity),
    StartRemoteCommands,
    /// Feed a follow-up action back into the coordinator.
    Send(PlaybackAction),
}

pub fn reduce(state: &mut PlaybackState, action: PlaybackAction) -> Vec<Effect> {
    match action {
        PlaybackAction::LoadPlayable(playable) => {
            info!("playback: loading {} ({})", playable.title, playable.stream_url);
            state.load_generation += 1;
            state.player_state = PlayerState::Playing;
            state.currently_playing = Some(playable.clone());

            let mut effects = vec![
                Effect::EngineLoad(LoadRequest {
                    stream_url: playable.stream_url.clone(),
                    generation: state.load_generation,
                }),
                Effect::PublishStatus(NowPlayingStatus::Playing),
                Effect::PublishInfo(NowPlayingInfo::for_playable(&playable)),
                Effect::UpdateAppTile(playable.clone()),
                Effect::BecomeCurrentActivity(playable),
            ];
            effects.extend(start_monitoring(state));
            effects
        }

        PlaybackAction::PausePlayback | PlaybackAction::ExternalCommand(ExternalCommand::Pause) => {
            state.player_state = PlayerState::Paused;
            vec![
                Effect::EnginePause,
                Effect::PublishStatus(NowPlayingStatus::Paused),
            ]
        }

        PlaybackAction::ResumePlayback | PlaybackAction::ExternalCommand(ExternalCommand::Resume) => {
            state.player_state = PlayerState::Playing;
            vec![
                Effect::EngineResume,
                Effect::PublishStatus(NowPlayingStatus::Playing),
            ]
        }

        PlaybackAction::TogglePlayback | PlaybackAction::ExternalCommand(ExternalCommand::Toggle) => {
            match state.player_state {
                PlayerState::Paused => vec![Effect::Send(PlaybackAction::ResumePlayback)],
                PlayerState::Playing => vec![Effect::Send(PlaybackAction::PausePlayback)],
                PlayerState::Stopped => Vec::new(),
            }
        }

        PlaybackAction::StopPlayback => {
            if state.currently_playing.is_some() {
                info!("playback: stopped");
            }
            // outstanding engine reports belong to the load being stopped
            state.load_generation += 1;
            state.player_state = PlayerState::Stopped;
            state.currently_playing = None;
            state.route_picker = None;

            let mut effects = vec![
                Effect::EngineStop,
                Effect::PublishStatus(NowPlayingStatus::Stopped),
            ];
            if let Some(activity) = state.current_activity.take() {
                effects.push(Effect::ResignCurrentActivity(activity));
            }
            effects
        }

        PlaybackAction::UpdateNowPlaying => match &state.currently_playing {
            Some(playable) => vec![Effect::PublishInfo(NowPlayingInfo::for_playable(playable))],
            None => Vec::new(),
        },

        PlaybackAction::StartMonitoringRemoteCommands => start_monitoring(state).into_iter().collect(),

        PlaybackAction::UserActivity(event) => {
            match event {
                UserActivityEvent::BecomeCurrent(activity) => {
                    state.current_activity = Some(activity.clone());
                    return vec![Effect::MarkActivityCurrent(activity)];
                }
                UserActivityEvent::ResignCurrent => state.current_activity = None,
                // resolution happens one level up
                UserActivityEvent::WillHandle(_) | UserActivityEvent::WillNotHandle(_) => {}
            }
            Vec::new()
        }

        PlaybackAction::AudioEngine(event) => {
            if event.generation() != state.load_generation {
                debug!(
                    "playback: dropping engine event for load {} (current {})",
                    event.generation(),
                    state.load_generation
                );
                return Vec::new();
            }
            match event {
                AudioEngineEvent::DidLoad { route, .. } => state.route_picker = route,
                AudioEngineEvent::LoadFailed { error, .. } => {
                    warn!("playback: engine failed to load stream: {}", error);
                }
            }
            Vec::new()
        }
    }
}

fn start_monitoring(state: &mut PlaybackState) -> Option<Effect> {
    if state.monitoring_remote_commands {
        return None;
    }
    state.monitoring_remote_commands = true;
    Some(Effect::StartRemoteCommands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::audio::{EngineError, RoutePicker};
    use url::Url;

    fn playable(id: &str) -> MediaPlayable {
        MediaPlayable::new(
            id,
            format!("Channel {id}"),
            Some("Morning show".into()),
            "desc",
            Url::parse("https://www.nts.live").unwrap(),
            Url::parse("https://www.nts.live").unwrap(),
            Url::parse(&format!("https://stream-relay-geo.ntslive.net/stream{id}")).unwrap(),
            None,
        )
    }

    fn playing() -> PlaybackState {
        let mut state = PlaybackState::default();
        reduce(&mut state, PlaybackAction::LoadPlayable(playable("1")));
        state
    }

    fn run(state: &mut PlaybackState, action: PlaybackAction) -> Vec<Effect> {
        // follows Send effects the way the coordinator does
        let mut pending = vec![action];
        let mut out = Vec::new();
        while let Some(next) = pending.pop() {
            for effect in reduce(state, next) {
                match effect {
                    Effect::Send(follow_up) => pending.push(follow_up),
                    other => out.push(other),
                }
            }
        }
        out
    }

    #[test]
    fn load_emits_effects_in_order() {
        let mut state = PlaybackState::default();
        let p = playable("1");
        let effects = reduce(&mut state, PlaybackAction::LoadPlayable(p.clone()));

        assert_eq!(
            effects,
            vec![
                Effect::EngineLoad(LoadRequest {
                    stream_url: p.stream_url.clone(),
                    generation: 1,
                }),
                Effect::PublishStatus(NowPlayingStatus::Playing),
                Effect::PublishInfo(NowPlayingInfo::for_playable(&p)),
                Effect::UpdateAppTile(p.clone()),
                Effect::BecomeCurrentActivity(p.clone()),
                Effect::StartRemoteCommands,
            ]
        );
        assert_eq!(state.player_state, PlayerState::Playing);
        assert_eq!(state.currently_playing, Some(p));
        assert!(state.monitoring_remote_commands);
    }

    #[test]
    fn second_load_does_not_restart_monitoring() {
        let mut state = playing();
        let effects = reduce(&mut state, PlaybackAction::LoadPlayable(playable("2")));
        assert!(!effects.contains(&Effect::StartRemoteCommands));
        assert_eq!(state.load_generation, 2);
        assert_eq!(state.currently_playing.unwrap().id, "2");
    }

    #[test]
    fn stop_from_any_state_clears_playback() {
        for setup in [PlaybackState::default(), playing(), {
            let mut s = playing();
            reduce(&mut s, PlaybackAction::PausePlayback);
            s
        }] {
            let mut state = setup;
            reduce(&mut state, PlaybackAction::StopPlayback);
            assert_eq!(state.player_state, PlayerState::Stopped);
            assert!(state.currently_playing.is_none());
            assert!(state.route_picker.is_none());
        }
    }

    #[test]
    fn stop_resigns_held_activity() {
        let mut state = playing();
        let activity = UserActivity::for_playable(&playable("1"));
        reduce(
            &mut state,
            PlaybackAction::UserActivity(UserActivityEvent::BecomeCurrent(activity.clone())),
        );

        let effects = reduce(&mut state, PlaybackAction::StopPlayback);
        assert_eq!(
            effects,
            vec![
                Effect::EngineStop,
                Effect::PublishStatus(NowPlayingStatus::Stopped),
                Effect::ResignCurrentActivity(activity),
            ]
        );
        assert!(state.current_activity.is_none());
    }

    #[test]
    fn toggle_twice_from_playing_returns_to_playing() {
        let mut state = playing();
        let first = run(&mut state, PlaybackAction::TogglePlayback);
        assert_eq!(state.player_state, PlayerState::Paused);
        assert_eq!(
            first,
            vec![Effect::EnginePause, Effect::PublishStatus(NowPlayingStatus::Paused)]
        );
        run(&mut state, PlaybackAction::TogglePlayback);
        assert_eq!(state.player_state, PlayerState::Playing);
    }

    #[test]
    fn toggle_while_stopped_does_nothing() {
        let mut state = PlaybackState::default();
        for _ in 0..3 {
            assert!(run(&mut state, PlaybackAction::TogglePlayback).is_empty());
        }
        assert_eq!(state, PlaybackState::default());
    }

    #[test]
    fn external_commands_match_local_actions() {
        let mut local = playing();
        let mut remote = local.clone();
        assert_eq!(
            run(&mut local, PlaybackAction::PausePlayback),
            run(&mut remote, PlaybackAction::ExternalCommand(ExternalCommand::Pause))
        );
        assert_eq!(local, remote);

        assert_eq!(
            run(&mut local, PlaybackAction::ResumePlayback),
            run(&mut remote, PlaybackAction::ExternalCommand(ExternalCommand::Toggle))
        );
        assert_eq!(local, remote);
    }

    #[test]
    fn update_now_playing_only_when_something_plays() {
        let mut idle = PlaybackState::default();
        assert!(reduce(&mut idle, PlaybackAction::UpdateNowPlaying).is_empty());

        let mut state = playing();
        let effects = reduce(&mut state, PlaybackAction::UpdateNowPlaying);
        assert!(matches!(&effects[..], [Effect::PublishInfo(info)] if info.artist == "NTS"));
    }

    #[test]
    fn explicit_monitoring_start_is_idempotent() {
        let mut state = PlaybackState::default();
        assert_eq!(
            reduce(&mut state, PlaybackAction::StartMonitoringRemoteCommands),
            vec![Effect::StartRemoteCommands]
        );
        assert!(reduce(&mut state, PlaybackAction::StartMonitoringRemoteCommands).is_empty());
    }

    #[test]
    fn stale_engine_events_are_ignored() {
        let mut state = playing();
        reduce(&mut state, PlaybackAction::LoadPlayable(playable("2")));

        let route = RoutePicker {
            engine: "mpv".into(),
            device: Some("auto".into()),
        };
        reduce(
            &mut state,
            PlaybackAction::AudioEngine(AudioEngineEvent::DidLoad {
                generation: 1,
                route: Some(route.clone()),
            }),
        );
        assert!(state.route_picker.is_none());

        reduce(
            &mut state,
            PlaybackAction::AudioEngine(AudioEngineEvent::DidLoad {
                generation: 2,
                route: Some(route.clone()),
            }),
        );
        assert_eq!(state.route_picker, Some(route));
    }

    #[test]
    fn late_engine_report_after_stop_is_ignored() {
        let mut state = playing();
        reduce(&mut state, PlaybackAction::StopPlayback);

        reduce(
            &mut state,
            PlaybackAction::AudioEngine(AudioEngineEvent::DidLoad {
                generation: 1,
                route: Some(RoutePicker {
                    engine: "mpv".into(),
                    device: Some("auto".into()),
                }),
            }),
        );
        assert_eq!(state.player_state, PlayerState::Stopped);
        assert!(state.currently_playing.is_none());
        assert!(state.route_picker.is_none());
    }

    #[test]
    fn load_failure_leaves_state_alone() {
        let mut state = playing();
        let before = state.clone();
        reduce(
            &mut state,
            PlaybackAction::AudioEngine(AudioEngineEvent::LoadFailed {
                generation: 1,
                error: EngineError::Unavailable("no player".into()),
            }),
        );
        assert_eq!(state, before);
    }
}
