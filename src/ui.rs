//! UI rendering for the terminal user interface.
//!
//! `draw` renders a snapshot of the `App` with `ratatui`; it never mutates
//! playback state.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock, time::Duration};

use crate::app::App;
use crate::audio::AudioEngine;
use crate::config::{ControlsSettings, TimeField, UiSettings};
use crate::library::{Cover, Track};
use crate::player::{LoopMode, PlaybackSnapshot, PlaybackState};

static CONTROLS_MAP: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = BTreeMap::new();
    map.insert("j/k", "up/down");
    map.insert("gg/G", "top/bottom");
    map.insert("enter", "play selected song");
    map.insert("space/p", "play/pause");
    map.insert("h/l", "prev/next song");
    // H/L and -/+ are filled from config.
    map.insert("s", "stop");
    map.insert("r", "loop mode");
    map.insert("q", "quit");
    map
});

/// Render the controls help text, incorporating the configured steps.
fn controls_text(controls: &ControlsSettings) -> String {
    let order = [
        "j/k", "h/l", "H/L", "enter", "space/p", "-/+", "gg/G", "s", "r", "q",
    ];
    order
        .iter()
        .filter_map(|k| match *k {
            "H/L" => Some(format!("[H/L] scrub -/+{}s", controls.scrub_seconds)),
            "-/+" => Some(format!(
                "[-/+] volume -/+{}%",
                (controls.volume_step * 100.0).round()
            )),
            _ => CONTROLS_MAP.get(*k).map(|v| format!("[{k}] {v}")),
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Build the time text (elapsed/total/remaining) shown on the progress bar.
fn time_text(elapsed: Duration, total: Option<Duration>, ui: &UiSettings) -> String {
    let mut parts: Vec<String> = Vec::new();
    for f in &ui.time_fields {
        match f {
            TimeField::Elapsed => parts.push(format_mmss(elapsed)),
            TimeField::Total => {
                parts.push(total.map(format_mmss).unwrap_or_else(|| "--:--".into()));
            }
            TimeField::Remaining => {
                if let Some(t) = total {
                    parts.push(format!("-{}", format_mmss(t.saturating_sub(elapsed))));
                }
            }
        }
    }
    parts.join(&ui.time_separator)
}

fn loop_label(mode: LoopMode) -> &'static str {
    match mode {
        LoopMode::NoLoop => "No-loop",
        LoopMode::LoopAll => "Loop-around",
        LoopMode::LoopOne => "Repeat-one",
    }
}

/// Text for the album art box: the art itself is not rasterised, only
/// described.
fn cover_lines(track: Option<&Track>) -> Vec<Line<'static>> {
    let Some(track) = track else {
        return vec![Line::from("♪"), Line::from("no track")];
    };
    match &track.cover {
        Some(Cover::Embedded { mime, bytes }) => vec![
            Line::from("♪ embedded art"),
            Line::from(mime.clone().unwrap_or_else(|| "image".into())),
            Line::from(format!("{} KiB", bytes.div_ceil(1024))),
        ],
        Some(Cover::File(path)) => vec![
            Line::from("♪ cover file"),
            Line::from(
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            ),
        ],
        None => vec![Line::from("♪"), Line::from("no art")],
    }
}

fn song_lines(track: Option<&Track>) -> Vec<Line<'static>> {
    let Some(track) = track else {
        return vec![Line::from("Nothing selected")];
    };
    vec![
        Line::styled(
            track.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Line::from(track.artist.clone().unwrap_or_else(|| "Unknown artist".into())),
        Line::styled(
            track.album.clone().unwrap_or_default(),
            Style::default().add_modifier(Modifier::ITALIC),
        ),
    ]
}

fn transport_line(snapshot: &PlaybackSnapshot, enabled: bool) -> Line<'static> {
    let toggle = if snapshot.is_playing() {
        "[space] ⏸ pause"
    } else {
        "[space] ▶ play"
    };
    let state = match snapshot.state {
        PlaybackState::Stopped => "Stopped",
        PlaybackState::Playing => "Playing",
        PlaybackState::Paused => "Paused",
    };
    let style = if enabled {
        Style::default()
    } else {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM)
    };
    Line::from(vec![
        Span::styled(format!("[h] ⏮ prev   {toggle}   [s] ⏹ stop   [l] ⏭ next"), style),
        Span::raw("   "),
        Span::styled(
            state.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ])
}

/// The line under the progress bar: the current notice, otherwise the
/// degraded-mode warning.
fn notice_line<E: AudioEngine>(app: &App<E>) -> Line<'static> {
    if let Some(notice) = &app.notice {
        return Line::styled(notice.text.clone(), Style::default().fg(Color::Yellow));
    }
    if let Some(reason) = app.player.unavailable_reason() {
        return Line::styled(
            format!("audio unavailable ({reason}); playback disabled"),
            Style::default().fg(Color::Red),
        );
    }
    Line::default()
}

/// Render the entire UI into the provided `frame`.
pub fn draw<E: AudioEngine>(
    frame: &mut Frame,
    app: &App<E>,
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(8),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" waltz ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    draw_now_playing(frame, chunks[1], app, ui_settings);
    draw_playlist(frame, chunks[2], app);

    let footer = Paragraph::new(controls_text(controls_settings))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding::left(1)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[3]);
}

fn draw_now_playing<E: AudioEngine>(
    frame: &mut Frame,
    area: Rect,
    app: &App<E>,
    ui_settings: &UiSettings,
) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(22), Constraint::Min(1)])
        .split(area);

    let track = app.player.current_track();
    let art = Paragraph::new(cover_lines(track))
        .alignment(Alignment::Center)
        .block(Block::bordered().title(" art "))
        .wrap(Wrap { trim: true });
    frame.render_widget(art, cols[0]);

    let block = Block::bordered()
        .title(" now playing ")
        .padding(Padding::horizontal(1));
    let inner = block.inner(cols[1]);
    frame.render_widget(block, cols[1]);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let snapshot = app.snapshot();
    let enabled = app.transport_enabled();

    frame.render_widget(Paragraph::new(song_lines(track)), rows[0]);
    frame.render_widget(Paragraph::new(transport_line(&snapshot, enabled)), rows[1]);

    let gauge_style = if enabled {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let gauge = Gauge::default()
        .gauge_style(gauge_style)
        .ratio(snapshot.progress().unwrap_or(0.0))
        .label(time_text(snapshot.position, snapshot.duration, ui_settings));
    frame.render_widget(gauge, rows[2]);

    let status = format!(
        "VOL {:>3}% • PLAYBACK: {}",
        (snapshot.volume * 100.0).round(),
        loop_label(snapshot.loop_mode)
    );
    frame.render_widget(Paragraph::new(status), rows[3]);
    frame.render_widget(Paragraph::new(notice_line(app)), rows[4]);
}

fn draw_playlist<E: AudioEngine>(frame: &mut Frame, area: Rect, app: &App<E>) {
    let tracks = app.tracks();
    let title = format!(" tracks ({}) ", tracks.len());

    if tracks.is_empty() {
        let dir = app.current_dir.as_deref().unwrap_or(".");
        let empty = Paragraph::new(format!("No audio files found in {dir}"))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(empty, area);
        return;
    }

    // Only build ListItems for the visible window, centred on the cursor.
    let total = tracks.len();
    let list_height = area.height.saturating_sub(2) as usize;
    let sel = app.selected.min(total - 1);
    let (start, end) = if total <= list_height || list_height == 0 {
        (0, total)
    } else {
        let half = list_height / 2;
        let start = sel.saturating_sub(half).min(total - list_height);
        (start, start + list_height)
    };

    let active = app.player.current_index();
    let items: Vec<ListItem> = tracks[start..end]
        .iter()
        .enumerate()
        .map(|(offset, track)| {
            let index = start + offset;
            if Some(index) == active {
                ListItem::new(format!("▶ {}", track.display))
                    .style(Style::default().add_modifier(Modifier::BOLD))
            } else {
                ListItem::new(format!("  {}", track.display))
            }
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default();
    state.select(Some(sel - start));
    frame.render_stateful_widget(list, area, &mut state);
}
