use std::time::Duration;

use tracing::info;

use crate::app::App;
use crate::audio::AudioEngine;
use crate::config;
use crate::player::LoopMode;

/// Apply the playback defaults from config to a freshly built `App`.
pub fn apply_playback_defaults<E: AudioEngine>(app: &mut App<E>, settings: &config::Settings) {
    app.player.set_loop_mode(LoopMode::from(settings.playback.loop_mode));
    app.player.set_volume(settings.audio.initial_volume);

    if settings.playback.autoplay && app.transport_enabled() {
        info!("autoplay");
        app.on_play_selected();
    }
}

/// Refresh interval of the event loop.
pub fn tick_interval(settings: &config::Settings) -> Duration {
    Duration::from_millis(settings.ui.tick_ms.max(1))
}
