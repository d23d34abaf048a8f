use super::*;
use crate::audio::fake::{EngineCall, FakeEngine};
use crate::error::PlayerError;
use crate::library::{Playlist, Track};
use proptest::prelude::*;
use std::path::PathBuf;
use std::time::Duration;

fn t(name: &str, secs: Option<u64>) -> Track {
    Track {
        path: PathBuf::from(format!("/music/{name}.mp3")),
        title: name.into(),
        artist: None,
        album: None,
        duration: secs.map(Duration::from_secs),
        cover: None,
        display: name.into(),
    }
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn player_with(tracks: Vec<Track>, engine: FakeEngine) -> Player<FakeEngine> {
    Player::new(Playlist::new(tracks), Ok(engine))
}

fn player(tracks: Vec<Track>) -> Player<FakeEngine> {
    player_with(tracks, FakeEngine::default())
}

fn two_tracks() -> Player<FakeEngine> {
    player(vec![t("a", Some(180)), t("b", Some(200))])
}

fn engine(p: &Player<FakeEngine>) -> &FakeEngine {
    p.engine().unwrap()
}

fn advance(p: &mut Player<FakeEngine>, by: Duration) {
    p.engine_mut().unwrap().advance(by);
}

#[test]
fn select_sets_index_resets_position_and_loads_without_playing() {
    let mut p = two_tracks();
    p.select(1).unwrap();

    assert_eq!(p.current_index(), Some(1));
    assert_eq!(p.position(), Duration::ZERO);
    assert_eq!(p.state(), PlaybackState::Stopped);
    assert_eq!(
        engine(&p).calls,
        vec![EngineCall::Load(PathBuf::from("/music/b.mp3"))]
    );
    assert!(!engine(&p).is_running());
}

#[test]
fn select_on_empty_playlist_fails() {
    let mut p = player(Vec::new());
    assert!(matches!(p.select(0), Err(PlayerError::EmptyPlaylist)));
    assert_eq!(p.current_index(), None);
    assert!(!p.transport_enabled());
}

#[test]
fn select_out_of_range_is_rejected() {
    let mut p = two_tracks();
    assert!(matches!(
        p.select(2),
        Err(PlayerError::TrackOutOfRange { index: 2, len: 2 })
    ));
    assert!(engine(&p).calls.is_empty());
}

#[test]
fn select_while_playing_stops_on_the_new_track() {
    let mut p = two_tracks();
    p.play().unwrap();
    advance(&mut p, secs(30));
    p.tick().unwrap();

    p.select(1).unwrap();
    assert_eq!(p.state(), PlaybackState::Stopped);
    assert_eq!(p.position(), Duration::ZERO);
    assert!(!engine(&p).is_running());
}

#[test]
fn play_pause_play_resumes_at_paused_position() {
    let mut p = two_tracks();
    p.select(0).unwrap();
    p.play().unwrap();
    advance(&mut p, secs(42));
    p.tick().unwrap();
    p.pause().unwrap();

    assert_eq!(p.state(), PlaybackState::Paused);
    assert_eq!(p.position(), secs(42));

    advance(&mut p, secs(10));
    p.play().unwrap();
    assert_eq!(p.state(), PlaybackState::Playing);
    assert_eq!(engine(&p).calls.last(), Some(&EngineCall::Resume));
    assert_eq!(p.position(), secs(42));

    advance(&mut p, secs(1));
    p.tick().unwrap();
    assert_eq!(p.position(), secs(43));
}

#[test]
fn play_while_playing_issues_no_second_start() {
    let mut p = two_tracks();
    p.select(0).unwrap();
    p.play().unwrap();
    p.play().unwrap();
    p.play().unwrap();

    assert_eq!(engine(&p).count(&EngineCall::Play), 1);
    assert_eq!(engine(&p).count(&EngineCall::Resume), 0);
}

#[test]
fn pause_when_not_playing_is_a_noop() {
    let mut p = two_tracks();
    p.select(0).unwrap();
    p.pause().unwrap();
    assert_eq!(p.state(), PlaybackState::Stopped);
    assert_eq!(engine(&p).count(&EngineCall::Pause), 0);
}

#[test]
fn toggle_alternates_between_playing_and_paused() {
    let mut p = two_tracks();
    p.toggle().unwrap();
    assert_eq!(p.state(), PlaybackState::Playing);
    p.toggle().unwrap();
    assert_eq!(p.state(), PlaybackState::Paused);
    p.toggle().unwrap();
    assert_eq!(p.state(), PlaybackState::Playing);
}

#[test]
fn play_with_nothing_selected_starts_the_first_track() {
    let mut p = two_tracks();
    p.play().unwrap();
    assert_eq!(p.current_index(), Some(0));
    assert_eq!(p.state(), PlaybackState::Playing);
    assert_eq!(
        engine(&p).calls,
        vec![
            EngineCall::Load(PathBuf::from("/music/a.mp3")),
            EngineCall::Play
        ]
    );
}

#[test]
fn play_on_empty_playlist_fails() {
    let mut p = player(Vec::new());
    assert!(matches!(p.play(), Err(PlayerError::EmptyPlaylist)));
}

#[test]
fn seek_clamps_to_track_bounds() {
    let mut p = two_tracks();
    p.select(0).unwrap();

    p.seek(secs(500)).unwrap();
    assert_eq!(p.position(), secs(180));

    p.seek(secs(61)).unwrap();
    assert_eq!(p.position(), secs(61));

    p.seek_by(-600).unwrap();
    assert_eq!(p.position(), Duration::ZERO);
    assert_eq!(engine(&p).calls.last(), Some(&EngineCall::Seek(Duration::ZERO)));
}

#[test]
fn seek_with_unknown_duration_only_clamps_below() {
    let mut p = player(vec![t("x", None)]);
    p.select(0).unwrap();
    p.seek(secs(5000)).unwrap();
    assert_eq!(p.position(), secs(5000));
}

#[test]
fn seek_preserves_paused_state() {
    let mut p = two_tracks();
    p.play().unwrap();
    p.pause().unwrap();
    p.seek(secs(90)).unwrap();
    assert_eq!(p.state(), PlaybackState::Paused);
    assert_eq!(p.position(), secs(90));

    p.seek_by(5).unwrap();
    assert_eq!(p.position(), secs(95));
}

#[test]
fn seek_without_selection_is_a_noop() {
    let mut p = two_tracks();
    p.seek(secs(10)).unwrap();
    assert!(engine(&p).calls.is_empty());
    assert_eq!(p.position(), Duration::ZERO);
}

#[test]
fn next_on_last_track_wraps_to_first() {
    let mut p = two_tracks();
    p.select(1).unwrap();
    p.next().unwrap();
    assert_eq!(p.current_index(), Some(0));
    assert_eq!(p.state(), PlaybackState::Stopped);
}

#[test]
fn previous_on_first_track_wraps_to_last() {
    let mut p = two_tracks();
    p.select(0).unwrap();
    p.previous().unwrap();
    assert_eq!(p.current_index(), Some(1));
}

#[test]
fn next_and_previous_without_selection_pick_the_ends() {
    let mut p = player(vec![t("a", Some(1)), t("b", Some(1)), t("c", Some(1))]);
    p.next().unwrap();
    assert_eq!(p.current_index(), Some(0));

    let mut p = player(vec![t("a", Some(1)), t("b", Some(1)), t("c", Some(1))]);
    p.previous().unwrap();
    assert_eq!(p.current_index(), Some(2));
}

#[test]
fn next_while_playing_keeps_playing_new_track_from_zero() {
    let mut p = two_tracks();
    p.play().unwrap();
    advance(&mut p, secs(50));
    p.tick().unwrap();

    p.next().unwrap();
    assert_eq!(p.current_index(), Some(1));
    assert_eq!(p.position(), Duration::ZERO);
    assert_eq!(p.state(), PlaybackState::Playing);
    assert!(engine(&p).is_running());
}

#[test]
fn next_while_paused_lands_stopped() {
    let mut p = two_tracks();
    p.play().unwrap();
    p.pause().unwrap();
    p.next().unwrap();
    assert_eq!(p.state(), PlaybackState::Stopped);
    assert_eq!(p.current_index(), Some(1));
}

#[test]
fn next_on_empty_playlist_fails() {
    let mut p = player(Vec::new());
    assert!(matches!(p.next(), Err(PlayerError::EmptyPlaylist)));
    assert!(matches!(p.previous(), Err(PlayerError::EmptyPlaylist)));
}

#[test]
fn track_end_advances_and_keeps_playing() {
    let mut p = two_tracks();
    p.select(0).unwrap();
    p.play().unwrap();

    for _ in 0..179 {
        advance(&mut p, secs(1));
        p.tick().unwrap();
        assert_eq!(p.current_index(), Some(0));
    }
    advance(&mut p, secs(1));
    p.tick().unwrap();

    assert_eq!(p.current_index(), Some(1));
    assert_eq!(p.position(), Duration::ZERO);
    assert_eq!(p.state(), PlaybackState::Playing);
    assert_eq!(
        engine(&p).loaded(),
        Some(PathBuf::from("/music/b.mp3").as_path())
    );
    assert!(engine(&p).is_running());
}

#[test]
fn track_end_on_last_track_wraps_with_loop_all() {
    let mut p = two_tracks();
    p.set_loop_mode(LoopMode::LoopAll);
    p.select(1).unwrap();
    p.play().unwrap();
    advance(&mut p, secs(200));
    p.tick().unwrap();

    assert_eq!(p.current_index(), Some(0));
    assert_eq!(p.state(), PlaybackState::Playing);
}

#[test]
fn track_end_on_last_track_stops_with_no_loop() {
    let mut p = two_tracks();
    p.set_loop_mode(LoopMode::NoLoop);
    p.select(1).unwrap();
    p.play().unwrap();
    p.drain_events();
    advance(&mut p, secs(200));
    p.tick().unwrap();

    assert_eq!(p.current_index(), Some(1));
    assert_eq!(p.state(), PlaybackState::Stopped);
    assert_eq!(p.position(), Duration::ZERO);
    assert_eq!(engine(&p).calls.last(), Some(&EngineCall::Stop));
    assert!(p.drain_events().contains(&PlayerEvent::PlaylistEnded));
}

#[test]
fn track_end_in_middle_advances_with_no_loop() {
    let mut p = two_tracks();
    p.set_loop_mode(LoopMode::NoLoop);
    p.play().unwrap();
    advance(&mut p, secs(180));
    p.tick().unwrap();
    assert_eq!(p.current_index(), Some(1));
    assert_eq!(p.state(), PlaybackState::Playing);
}

#[test]
fn track_end_repeats_with_loop_one() {
    let mut p = two_tracks();
    p.set_loop_mode(LoopMode::LoopOne);
    p.play().unwrap();
    advance(&mut p, secs(180));
    p.tick().unwrap();

    assert_eq!(p.current_index(), Some(0));
    assert_eq!(p.position(), Duration::ZERO);
    assert_eq!(p.state(), PlaybackState::Playing);
    assert_eq!(
        engine(&p).count(&EngineCall::Load(PathBuf::from("/music/a.mp3"))),
        2
    );
}

#[test]
fn finished_stream_advances_when_duration_is_unknown() {
    let mut p = player(vec![t("a", None), t("b", None)]);
    p.play().unwrap();
    advance(&mut p, secs(3));
    p.tick().unwrap();
    assert_eq!(p.current_index(), Some(0));

    p.engine_mut().unwrap().finished = true;
    p.tick().unwrap();
    assert_eq!(p.current_index(), Some(1));
    assert_eq!(p.state(), PlaybackState::Playing);
}

#[test]
fn tick_does_nothing_unless_playing() {
    let mut p = two_tracks();
    p.select(0).unwrap();
    p.engine_mut().unwrap().finished = true;
    p.tick().unwrap();
    assert_eq!(p.current_index(), Some(0));
    assert_eq!(p.state(), PlaybackState::Stopped);
}

#[test]
fn unloadable_track_is_skipped_on_next() {
    let tracks = vec![t("a", Some(10)), t("b", Some(10)), t("c", Some(10))];
    let mut p = player_with(tracks, FakeEngine::failing_on(&["/music/b.mp3"]));
    p.play().unwrap();
    p.drain_events();

    p.next().unwrap();
    assert_eq!(p.current_index(), Some(2));
    assert_eq!(p.state(), PlaybackState::Playing);

    let events = p.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, PlayerEvent::Skipped { index: 1, .. })));
    assert!(events.contains(&PlayerEvent::TrackChanged { index: 2 }));
}

#[test]
fn unloadable_track_is_skipped_backwards_on_previous() {
    let tracks = vec![t("a", Some(10)), t("b", Some(10)), t("c", Some(10))];
    let mut p = player_with(tracks, FakeEngine::failing_on(&["/music/b.mp3"]));
    p.select(2).unwrap();
    p.previous().unwrap();
    assert_eq!(p.current_index(), Some(0));
}

#[test]
fn every_track_failing_stops_with_load_error() {
    let tracks = vec![t("a", Some(10)), t("b", Some(10))];
    let mut p = player_with(
        tracks,
        FakeEngine::failing_on(&["/music/a.mp3", "/music/b.mp3"]),
    );
    let err = p.play().unwrap_err();
    assert!(matches!(err, PlayerError::AudioLoad { .. }));
    assert_eq!(p.state(), PlaybackState::Stopped);
    assert_eq!(p.current_index(), Some(0));
}

#[test]
fn select_reports_load_failure_and_stays_stopped() {
    let tracks = vec![t("a", Some(10)), t("b", Some(10))];
    let mut p = player_with(tracks, FakeEngine::failing_on(&["/music/b.mp3"]));
    assert!(matches!(p.select(1), Err(PlayerError::AudioLoad { .. })));
    assert_eq!(p.current_index(), Some(1));
    assert_eq!(p.state(), PlaybackState::Stopped);
}

#[test]
fn play_on_unloadable_selection_skips_to_next_track() {
    let tracks = vec![t("a", Some(10)), t("b", Some(10))];
    let mut p = player_with(tracks, FakeEngine::failing_on(&["/music/a.mp3"]));
    assert!(p.select(0).is_err());
    p.drain_events();

    p.play().unwrap();
    assert_eq!(p.current_index(), Some(1));
    assert_eq!(p.state(), PlaybackState::Playing);
    assert_eq!(engine(&p).loaded(), Some(PathBuf::from("/music/b.mp3").as_path()));

    let events = p.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, PlayerEvent::Skipped { index: 0, .. })));
    assert!(events.contains(&PlayerEvent::TrackChanged { index: 1 }));
}

#[test]
fn play_on_unloadable_selection_stays_put_when_nothing_loads() {
    let tracks = vec![t("a", Some(10)), t("b", Some(10)), t("c", Some(10))];
    let mut p = player_with(
        tracks,
        FakeEngine::failing_on(&["/music/a.mp3", "/music/b.mp3", "/music/c.mp3"]),
    );
    let _ = p.select(1);

    let err = p.play().unwrap_err();
    assert!(matches!(err, PlayerError::AudioLoad { .. }));
    assert_eq!(p.current_index(), Some(1));
    assert_eq!(p.state(), PlaybackState::Stopped);
    // Each track once from play, plus the initial select of b.
    assert_eq!(
        engine(&p).count(&EngineCall::Load(PathBuf::from("/music/b.mp3"))),
        2
    );
    assert_eq!(
        engine(&p).count(&EngineCall::Load(PathBuf::from("/music/a.mp3"))),
        1
    );
}

#[test]
fn play_on_single_unloadable_track_reports_the_error() {
    let mut p = player_with(
        vec![t("a", Some(10))],
        FakeEngine::failing_on(&["/music/a.mp3"]),
    );
    let _ = p.select(0);
    p.drain_events();

    assert!(matches!(p.play(), Err(PlayerError::AudioLoad { .. })));
    assert_eq!(p.state(), PlaybackState::Stopped);
    assert!(p
        .drain_events()
        .iter()
        .any(|e| matches!(e, PlayerEvent::Skipped { index: 0, .. })));
}

#[test]
fn play_track_starts_the_row_and_skips_unloadable_ones() {
    let tracks = vec![t("a", Some(10)), t("b", Some(10)), t("c", Some(10))];
    let mut p = player_with(tracks, FakeEngine::failing_on(&["/music/b.mp3"]));

    p.play_track(2).unwrap();
    assert_eq!(p.current_index(), Some(2));
    assert_eq!(p.state(), PlaybackState::Playing);

    p.play_track(1).unwrap();
    assert_eq!(p.current_index(), Some(2));
    assert_eq!(p.state(), PlaybackState::Playing);
    assert_eq!(
        engine(&p).count(&EngineCall::Load(PathBuf::from("/music/b.mp3"))),
        1
    );

    assert!(matches!(
        p.play_track(3),
        Err(PlayerError::TrackOutOfRange { index: 3, len: 3 })
    ));
}

#[test]
fn failed_seek_stops_playback_and_next_play_reloads() {
    let mut p = two_tracks();
    p.play().unwrap();
    advance(&mut p, secs(20));
    p.tick().unwrap();
    p.engine_mut().unwrap().failing_seek = true;

    assert!(matches!(p.seek(secs(60)), Err(PlayerError::AudioLoad { .. })));
    assert_eq!(p.state(), PlaybackState::Stopped);
    assert_eq!(p.position(), Duration::ZERO);
    assert_eq!(p.current_index(), Some(0));

    p.engine_mut().unwrap().failing_seek = false;
    p.play().unwrap();
    assert_eq!(p.state(), PlaybackState::Playing);
    assert_eq!(
        engine(&p).count(&EngineCall::Load(PathBuf::from("/music/a.mp3"))),
        2
    );
    assert!(engine(&p).is_running());
}

#[test]
fn seek_by_micros_uses_the_engine_clock_while_playing() {
    let mut p = two_tracks();
    p.play().unwrap();
    // No tick: the recorded position is stale.
    advance(&mut p, secs(20));
    assert_eq!(p.position(), Duration::ZERO);

    p.seek_by_micros(5_000_000).unwrap();
    assert_eq!(p.position(), secs(25));
    p.seek_by_micros(-500_000).unwrap();
    assert_eq!(p.position(), Duration::from_millis(24_500));
}

#[test]
fn degraded_player_allows_selection_but_not_playback() {
    let mut p: Player<FakeEngine> = Player::new(
        Playlist::new(vec![t("a", Some(10)), t("b", Some(10))]),
        Err(PlayerError::AudioUnavailable("no output device".into())),
    );

    assert!(p.is_degraded());
    assert!(!p.transport_enabled());
    assert_eq!(p.unavailable_reason(), Some("no output device"));

    p.select(1).unwrap();
    assert_eq!(p.current_index(), Some(1));
    p.next().unwrap();
    assert_eq!(p.current_index(), Some(0));

    assert!(matches!(p.play(), Err(PlayerError::AudioUnavailable(_))));
    assert!(matches!(p.play_track(1), Err(PlayerError::AudioUnavailable(_))));
    assert_eq!(p.current_index(), Some(1));
    assert!(matches!(p.pause(), Err(PlayerError::AudioUnavailable(_))));
    assert!(matches!(p.seek(secs(1)), Err(PlayerError::AudioUnavailable(_))));
    assert_eq!(p.state(), PlaybackState::Stopped);

    p.set_volume(0.3);
    assert_eq!(p.volume(), 0.3);
}

#[test]
fn set_volume_clamps_and_forwards() {
    let mut p = two_tracks();
    p.set_volume(1.7);
    assert_eq!(p.volume(), 1.0);
    p.set_volume(-2.0);
    assert_eq!(p.volume(), 0.0);
    p.set_volume(f32::NAN);
    assert_eq!(p.volume(), 0.0);
    p.set_volume(0.25);
    assert_eq!(engine(&p).calls.last(), Some(&EngineCall::SetVolume(0.25)));
}

#[test]
fn stop_releases_stream_and_play_reloads() {
    let mut p = two_tracks();
    p.play().unwrap();
    advance(&mut p, secs(20));
    p.tick().unwrap();

    p.stop().unwrap();
    assert_eq!(p.state(), PlaybackState::Stopped);
    assert_eq!(p.position(), Duration::ZERO);
    assert_eq!(p.current_index(), Some(0));
    assert!(engine(&p).loaded().is_none());

    p.play().unwrap();
    assert_eq!(
        engine(&p).count(&EngineCall::Load(PathBuf::from("/music/a.mp3"))),
        2
    );
    assert!(engine(&p).is_running());
}

#[test]
fn seek_after_stop_is_applied_when_playback_restarts() {
    let mut p = two_tracks();
    p.play().unwrap();
    p.stop().unwrap();
    p.seek(secs(30)).unwrap();
    assert_eq!(engine(&p).count(&EngineCall::Seek(secs(30))), 0);

    p.play().unwrap();
    let calls = &engine(&p).calls;
    let n = calls.len();
    assert_eq!(
        &calls[n - 3..],
        &[
            EngineCall::Load(PathBuf::from("/music/a.mp3")),
            EngineCall::Seek(secs(30)),
            EngineCall::Play,
        ]
    );
}

#[test]
fn snapshot_reflects_state() {
    let mut p = two_tracks();
    p.set_volume(0.5);
    p.play().unwrap();
    advance(&mut p, secs(90));
    p.tick().unwrap();

    let snap = p.snapshot();
    assert_eq!(snap.current_index, Some(0));
    assert!(snap.is_playing());
    assert_eq!(snap.position, secs(90));
    assert_eq!(snap.duration, Some(secs(180)));
    assert_eq!(snap.volume, 0.5);
    assert_eq!(snap.progress(), Some(0.5));
}

#[test]
fn events_record_state_and_track_changes() {
    let mut p = two_tracks();
    p.select(0).unwrap();
    p.play().unwrap();
    p.next().unwrap();

    assert_eq!(
        p.drain_events(),
        vec![
            PlayerEvent::TrackChanged { index: 0 },
            PlayerEvent::StateChanged {
                state: PlaybackState::Playing
            },
            PlayerEvent::TrackChanged { index: 1 },
        ]
    );
    assert!(p.drain_events().is_empty());
}

#[test]
fn loop_mode_cycles_three_states() {
    assert_eq!(LoopMode::default(), LoopMode::LoopAll);
    assert_eq!(LoopMode::LoopAll.cycle(), LoopMode::LoopOne);
    assert_eq!(LoopMode::LoopOne.cycle(), LoopMode::NoLoop);
    assert_eq!(LoopMode::NoLoop.cycle(), LoopMode::LoopAll);
}

proptest! {
    #[test]
    fn select_any_valid_index_resets_position(len in 1usize..20, pick in 0usize..20) {
        let index = pick % len;
        let tracks = (0..len).map(|i| t(&format!("t{i}"), Some(60))).collect();
        let mut p = player(tracks);
        p.play().unwrap();
        advance(&mut p, secs(10));
        p.tick().unwrap();

        p.select(index).unwrap();
        prop_assert_eq!(p.current_index(), Some(index));
        prop_assert_eq!(p.position(), Duration::ZERO);
    }

    #[test]
    fn seek_never_leaves_track_bounds(total in 1u64..600, target_ms in 0u64..2_000_000) {
        let mut p = player(vec![t("a", Some(total))]);
        p.select(0).unwrap();
        p.seek(Duration::from_millis(target_ms)).unwrap();
        prop_assert!(p.position() <= secs(total));
        prop_assert_eq!(p.position(), Duration::from_millis(target_ms).min(secs(total)));
    }

    #[test]
    fn volume_always_in_unit_range(v in -10.0f32..10.0) {
        let mut p = two_tracks();
        p.set_volume(v);
        prop_assert!((0.0..=1.0).contains(&p.volume()));
    }
}
