use crate::app::App;
use crate::audio::AudioEngine;
use crate::mpris::MprisHandle;
use crate::player::PlaybackState;

/// What was last published to MPRIS, to avoid redundant change signals.
#[derive(Debug, Default, PartialEq)]
pub struct Published {
    index: Option<usize>,
    playback: PlaybackState,
    volume: Option<f32>,
    can_control: Option<bool>,
}

/// Push the app's playback state to MPRIS, signalling only what changed.
pub fn update_mpris<E: AudioEngine>(mpris: &MprisHandle, app: &App<E>, last: &mut Published) {
    let snapshot = app.snapshot();

    if snapshot.current_index != last.index || last.volume.is_none() {
        mpris.set_track_metadata(snapshot.current_index, app.player.current_track());
        last.index = snapshot.current_index;
    }
    if snapshot.state != last.playback {
        mpris.set_playback(snapshot.state);
        last.playback = snapshot.state;
    }
    if last.volume != Some(snapshot.volume) {
        mpris.set_volume(snapshot.volume);
        last.volume = Some(snapshot.volume);
    }
    let can_control = app.transport_enabled();
    if last.can_control != Some(can_control) {
        mpris.set_can_control(can_control);
        last.can_control = Some(can_control);
    }
    mpris.set_position(snapshot.position);
}
