mod common;

use tokio::sync::mpsc;

use common::{channel_playable, mixtape_playable, playback_env, Call, HarnessOptions};
use marconio_core::clients::{ExternalCommand, NowPlayingStatus};
use marconio_core::{Dispatcher, PlaybackAction, PlaybackCoordinator, PlayerState};

fn coordinator(
    options: HarnessOptions,
) -> (
    PlaybackCoordinator,
    common::Harness,
    mpsc::UnboundedReceiver<PlaybackAction>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (env, harness) = playback_env(options);
    (
        PlaybackCoordinator::new(env, Dispatcher::from_sender(tx)),
        harness,
        rx,
    )
}

#[test]
fn mixtape_session_scenario() {
    let (mut playback, harness, _rx) = coordinator(HarnessOptions::default());
    let x = mixtape_playable("poolside");

    playback.send(PlaybackAction::LoadPlayable(x.clone()));
    let state = playback.state();
    assert_eq!(state.player_state, PlayerState::Playing);
    assert_eq!(state.currently_playing.as_ref(), Some(&x));
    assert!(state.monitoring_remote_commands);

    let infos: Vec<_> = harness
        .rec
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Info(info) => Some(info),
            _ => None,
        })
        .collect();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].title, x.title);
    assert_eq!(infos[0].artist, "NTS");

    playback.send(PlaybackAction::PausePlayback);
    assert_eq!(playback.state().player_state, PlayerState::Paused);
    assert_eq!(
        harness.rec.calls().last(),
        Some(&Call::Status(NowPlayingStatus::Paused))
    );

    playback.send(PlaybackAction::TogglePlayback);
    assert_eq!(playback.state().player_state, PlayerState::Playing);
}

#[test]
fn load_drives_collaborators_in_order() {
    let (mut playback, harness, _rx) = coordinator(HarnessOptions::default());
    let p = channel_playable("1");
    playback.send(PlaybackAction::LoadPlayable(p.clone()));

    let calls = harness.rec.calls();
    assert_eq!(
        calls[..3],
        [
            Call::EngineLoad {
                url: p.stream_url.to_string(),
                generation: 1
            },
            Call::Status(NowPlayingStatus::Playing),
            Call::Info(marconio_core::clients::NowPlayingInfo::for_playable(&p)),
        ]
    );
    assert_eq!(
        calls[3..],
        [
            Call::Tile("Channel 1".into()),
            Call::StartMonitoring,
            // becoming current is a follow-up, so it lands after the direct effects
            Call::MarkCurrent("Channel 1".into()),
        ]
    );
    assert_eq!(
        playback.state().current_activity.as_ref().map(|a| a.playable_id.as_str()),
        Some("1")
    );
}

#[test]
fn loading_twice_monitors_remote_commands_once() {
    let (mut playback, harness, _rx) = coordinator(HarnessOptions::default());
    playback.send(PlaybackAction::LoadPlayable(channel_playable("1")));
    playback.send(PlaybackAction::LoadPlayable(channel_playable("2")));

    assert!(playback.state().monitoring_remote_commands);
    assert_eq!(harness.rec.count(|c| *c == Call::StartMonitoring), 1);
    assert_eq!(playback.state().load_generation, 2);
}

#[test]
fn failed_monitor_start_is_not_retried() {
    let (mut playback, harness, _rx) = coordinator(HarnessOptions {
        remote_fails: true,
        ..HarnessOptions::default()
    });
    playback.send(PlaybackAction::LoadPlayable(channel_playable("1")));
    playback.send(PlaybackAction::LoadPlayable(channel_playable("2")));

    assert_eq!(playback.state().player_state, PlayerState::Playing);
    assert!(playback.state().monitoring_remote_commands);
    assert_eq!(harness.rec.count(|c| *c == Call::StartMonitoring), 1);
}

#[test]
fn remote_keys_reenter_through_the_inbox() {
    let (mut playback, harness, mut rx) = coordinator(HarnessOptions::default());
    playback.send(PlaybackAction::LoadPlayable(channel_playable("2")));

    assert!(harness.keys.press(ExternalCommand::Toggle));
    let action = rx.try_recv().expect("toggle should be queued");
    assert_eq!(action, PlaybackAction::ExternalCommand(ExternalCommand::Toggle));

    playback.send(action);
    assert_eq!(playback.state().player_state, PlayerState::Paused);

    harness.keys.press(ExternalCommand::Toggle);
    playback.send(rx.try_recv().unwrap());
    assert_eq!(playback.state().player_state, PlayerState::Playing);
}

#[test]
fn stop_resigns_activity_and_clears_playback() {
    let (mut playback, harness, _rx) = coordinator(HarnessOptions::default());
    playback.send(PlaybackAction::LoadPlayable(mixtape_playable("slow-focus")));
    harness.rec.clear();

    playback.send(PlaybackAction::StopPlayback);
    assert_eq!(
        harness.rec.calls(),
        vec![
            Call::EngineStop,
            Call::Status(NowPlayingStatus::Stopped),
            Call::Resign("Slow Focus".into()),
        ]
    );
    let state = playback.state();
    assert_eq!(state.player_state, PlayerState::Stopped);
    assert!(state.currently_playing.is_none());
    assert!(state.current_activity.is_none());
    // monitoring stays registered for the lifetime of the coordinator
    assert!(state.monitoring_remote_commands);
}

#[test]
fn shutdown_tears_down_remote_commands_once() {
    let (mut playback, harness, _rx) = coordinator(HarnessOptions::default());
    playback.send(PlaybackAction::LoadPlayable(channel_playable("1")));
    assert!(harness.keys.is_registered());

    playback.shutdown();
    assert!(!harness.keys.is_registered());
    assert_eq!(harness.rec.count(|c| *c == Call::StopMonitoring), 1);
    assert_eq!(harness.rec.calls().last(), Some(&Call::EngineShutdown));

    drop(playback);
    assert_eq!(harness.rec.count(|c| *c == Call::StopMonitoring), 1);
}

#[test]
fn toggle_while_stopped_touches_nothing() {
    let (mut playback, harness, _rx) = coordinator(HarnessOptions::default());
    for _ in 0..4 {
        playback.send(PlaybackAction::TogglePlayback);
    }
    assert_eq!(playback.state().player_state, PlayerState::Stopped);
    assert!(harness.rec.calls().is_empty());
}
