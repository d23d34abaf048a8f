//! MPRIS service on the session bus, so media keys and `playerctl` can drive
//! the player.
//!
//! The service runs on its own thread. Incoming calls are forwarded to the
//! event loop as `ControlCmd`s; the event loop publishes playback state back
//! through `MprisHandle`.

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    mpsc::{self, Receiver, Sender},
};
use std::time::Duration;

use async_io::{Timer, block_on};
use tracing::{debug, info, warn};
use zbus::{Connection, interface, object_server::InterfaceRef};
use zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use crate::library::Track;
use crate::player::PlaybackState;

const BUS_NAME: &str = "org.mpris.MediaPlayer2.waltz";
const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";

#[derive(Clone, Debug, PartialEq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Prev,
    /// Relative seek in microseconds.
    SeekBy(i64),
    /// Absolute position in microseconds.
    SetPosition(i64),
    SetVolume(f64),
}

#[derive(Debug)]
struct SharedState {
    playback: PlaybackState,
    title: Option<String>,
    artist: Vec<String>,
    album: Option<String>,
    url: Option<String>,
    length_micros: Option<i64>,
    track_id: Option<ObjectPath<'static>>,
    position_micros: i64,
    volume: f64,
    can_control: bool,
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            playback: PlaybackState::Stopped,
            title: None,
            artist: Vec::new(),
            album: None,
            url: None,
            length_micros: None,
            track_id: None,
            position_micros: 0,
            volume: 1.0,
            can_control: true,
        }
    }
}

/// Publishes player state to the MPRIS service.
pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
    notify: Sender<()>,
}

impl MprisHandle {
    /// Describe the current track, or clear the metadata with `None`.
    pub fn set_track_metadata(&self, index: Option<usize>, track: Option<&Track>) {
        if let Ok(mut s) = self.state.lock() {
            match (index, track) {
                (Some(i), Some(t)) => {
                    s.title = Some(t.title.clone());
                    s.artist = t.artist.iter().cloned().collect();
                    s.album = t.album.clone();
                    s.url = Some(format!("file://{}", t.path.display()));
                    s.length_micros = t
                        .duration
                        .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX));
                    s.track_id = ObjectPath::try_from(format!("{OBJECT_PATH}/track/{i}"))
                        .ok()
                        .map(|p| p.to_owned());
                }
                _ => {
                    s.title = None;
                    s.artist.clear();
                    s.album = None;
                    s.url = None;
                    s.length_micros = None;
                    s.track_id = None;
                }
            }
        }
        let _ = self.notify.send(());
    }

    pub fn set_playback(&self, playback: PlaybackState) {
        if let Ok(mut s) = self.state.lock() {
            s.playback = playback;
        }
        let _ = self.notify.send(());
    }

    pub fn set_volume(&self, volume: f32) {
        if let Ok(mut s) = self.state.lock() {
            s.volume = f64::from(volume);
        }
        let _ = self.notify.send(());
    }

    pub fn set_can_control(&self, can_control: bool) {
        if let Ok(mut s) = self.state.lock() {
            s.can_control = can_control;
        }
        let _ = self.notify.send(());
    }

    /// Position is polled by clients, so no change signal is sent.
    pub fn set_position(&self, position: Duration) {
        if let Ok(mut s) = self.state.lock() {
            s.position_micros = i64::try_from(position.as_micros()).unwrap_or(i64::MAX);
        }
    }
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // No-op for TUI.
    }

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "waltz"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".to_string()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

impl PlayerIface {
    fn can_control_now(&self) -> bool {
        self.state.lock().map(|s| s.can_control).unwrap_or(false)
    }
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        let _ = self.tx.send(ControlCmd::Prev);
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Stop);
    }

    fn seek(&self, offset: i64) {
        let _ = self.tx.send(ControlCmd::SeekBy(offset));
    }

    /// Ignored unless `track_id` names the current track.
    fn set_position(&self, track_id: OwnedObjectPath, position: i64) {
        let current = self
            .state
            .lock()
            .ok()
            .and_then(|s| s.track_id.as_ref().map(|p| p.as_str() == track_id.as_str()));
        if current == Some(true) && position >= 0 {
            let _ = self.tx.send(ControlCmd::SetPosition(position));
        }
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        let Ok(s) = self.state.lock() else {
            return "Stopped";
        };
        match s.playback {
            PlaybackState::Stopped => "Stopped",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
        }
    }

    #[zbus(property)]
    fn position(&self) -> i64 {
        self.state.lock().map(|s| s.position_micros).unwrap_or(0)
    }

    #[zbus(property)]
    fn volume(&self) -> f64 {
        self.state.lock().map(|s| s.volume).unwrap_or(1.0)
    }

    #[zbus(property)]
    fn set_volume(&mut self, volume: f64) {
        let _ = self.tx.send(ControlCmd::SetVolume(volume));
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        self.can_control_now()
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        self.can_control_now()
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        self.can_control_now()
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        self.can_control_now()
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        self.can_control_now()
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Ok(s) = self.state.lock() else {
            return map;
        };

        if let Some(id) = &s.track_id {
            insert_value(&mut map, "mpris:trackid", Value::from(id.clone()));
        }
        if let Some(title) = &s.title {
            insert_value(&mut map, "xesam:title", Value::from(title.clone()));
        }
        if !s.artist.is_empty() {
            insert_value(&mut map, "xesam:artist", Value::from(s.artist.clone()));
        }
        if let Some(album) = &s.album {
            insert_value(&mut map, "xesam:album", Value::from(album.clone()));
        }
        if let Some(url) = &s.url {
            insert_value(&mut map, "xesam:url", Value::from(url.clone()));
        }
        if let Some(length) = s.length_micros {
            insert_value(&mut map, "mpris:length", Value::from(length));
        }
        map
    }
}

fn insert_value(map: &mut HashMap<String, OwnedValue>, key: &str, value: Value<'_>) {
    match OwnedValue::try_from(value) {
        Ok(v) => {
            map.insert(key.to_string(), v);
        }
        Err(e) => debug!(key, error = %e, "dropping metadata entry"),
    }
}

/// Start the MPRIS service thread. Failing to reach the session bus is
/// logged; the returned handle keeps working either way.
pub fn spawn_mpris(tx: Sender<ControlCmd>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify_tx, notify_rx) = mpsc::channel::<()>();

    let state_for_thread = state.clone();
    let spawned = std::thread::Builder::new()
        .name("mpris".into())
        .spawn(move || block_on(serve(tx, state_for_thread, notify_rx)));
    if let Err(e) = spawned {
        warn!(error = %e, "MPRIS: failed to spawn service thread");
    }

    MprisHandle {
        state,
        notify: notify_tx,
    }
}

async fn serve(tx: Sender<ControlCmd>, state: Arc<Mutex<SharedState>>, notify: Receiver<()>) {
    let connection = match Connection::session().await {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "MPRIS: failed to connect to session bus");
            return;
        }
    };

    if let Err(e) = connection.request_name(BUS_NAME).await {
        warn!(error = %e, "MPRIS: failed to acquire name");
        return;
    }

    let object_server = connection.object_server();

    if let Err(e) = object_server
        .at(OBJECT_PATH, RootIface { tx: tx.clone() })
        .await
    {
        warn!(error = %e, "MPRIS: failed to register root iface");
        return;
    }

    if let Err(e) = object_server
        .at(OBJECT_PATH, PlayerIface { tx, state })
        .await
    {
        warn!(error = %e, "MPRIS: failed to register player iface");
        return;
    }

    let iface: InterfaceRef<PlayerIface> = match object_server.interface(OBJECT_PATH).await {
        Ok(i) => i,
        Err(e) => {
            warn!(error = %e, "MPRIS: player iface lookup failed");
            return;
        }
    };
    info!(name = BUS_NAME, "MPRIS service running");

    // Batch state updates from the event loop into one PropertiesChanged round.
    loop {
        Timer::after(Duration::from_millis(250)).await;

        let mut changed = false;
        loop {
            match notify.try_recv() {
                Ok(()) => changed = true,
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => return,
            }
        }
        if changed {
            emit_changes(&iface).await;
        }
    }
}

async fn emit_changes(iface: &InterfaceRef<PlayerIface>) {
    let emitter = iface.signal_emitter();
    let player = iface.get().await;
    let results = [
        player.playback_status_changed(emitter).await,
        player.metadata_changed(emitter).await,
        player.volume_changed(emitter).await,
        player.can_play_changed(emitter).await,
        player.can_pause_changed(emitter).await,
        player.can_seek_changed(emitter).await,
        player.can_go_next_changed(emitter).await,
        player.can_go_previous_changed(emitter).await,
    ];
    for result in results {
        if let Err(e) = result {
            debug!(error = %e, "MPRIS: property change signal failed");
        }
    }
}
