use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lofty::prelude::{Accessor, AudioFile, TaggedFileExt};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::display::{display_from_fields, split_artist_title};
use super::model::{Cover, Playlist, Track};

const COVER_STEMS: [&str; 4] = ["cover", "folder", "front", "album"];
const COVER_EXTS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Configured extensions, lowercased and without leading dots or blanks.
fn normalized_extensions(settings: &LibrarySettings) -> Vec<String> {
    settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn is_audio_file(path: &Path, exts: &[String]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_cover_image(path: &Path) -> bool {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase);
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase);
    match (stem, ext) {
        (Some(stem), Some(ext)) => {
            COVER_STEMS.contains(&stem.as_str()) && COVER_EXTS.contains(&ext.as_str())
        }
        _ => false,
    }
}

/// Look for a cover image in `dir`, remembering the answer per directory.
fn folder_cover(dir: &Path, cache: &mut HashMap<PathBuf, Option<PathBuf>>) -> Option<PathBuf> {
    cache
        .entry(dir.to_path_buf())
        .or_insert_with(|| {
            let mut found: Vec<PathBuf> = std::fs::read_dir(dir)
                .ok()?
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_file() && is_cover_image(p))
                .collect();
            found.sort();
            found.into_iter().next()
        })
        .clone()
}

struct TagInfo {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    duration: Option<Duration>,
    cover: Option<Cover>,
}

fn read_tags(path: &Path) -> Option<TagInfo> {
    let tagged = match lofty::read_from_path(path) {
        Ok(t) => t,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no readable tags");
            return None;
        }
    };

    let duration = Some(tagged.properties().duration()).filter(|d| !d.is_zero());
    let mut info = TagInfo {
        title: None,
        artist: None,
        album: None,
        duration,
        cover: None,
    };

    if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
        let clean = |v: Option<std::borrow::Cow<'_, str>>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        info.title = clean(tag.title());
        info.artist = clean(tag.artist());
        info.album = clean(tag.album());
        info.cover = tag.pictures().first().map(|p| Cover::Embedded {
            mime: p.mime_type().map(|m| m.as_str().to_string()),
            bytes: p.data().len(),
        });
    }

    Some(info)
}

/// Walk `dir` and build a playlist from every eligible audio file.
///
/// Metadata comes from tags when present; otherwise the filename stem is read
/// as `Artist - Title`. Tracks are ordered by display string, ignoring case.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Playlist {
    let mut tracks: Vec<Track> = Vec::new();
    let mut covers: HashMap<PathBuf, Option<PathBuf>> = HashMap::new();
    let exts = normalized_extensions(settings);

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file() || !is_audio_file(path, &exts) {
            continue;
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN");
        let (stem_artist, stem_title) = split_artist_title(stem);

        let tags = read_tags(path);
        let (title, artist, album, duration, embedded) = match tags {
            Some(t) => match t.title {
                Some(title) => (title, t.artist, t.album, t.duration, t.cover),
                None => (
                    stem_title,
                    t.artist.or(stem_artist),
                    t.album,
                    t.duration,
                    t.cover,
                ),
            },
            None => (stem_title, stem_artist, None, None, None),
        };

        let cover = embedded.or_else(|| {
            path.parent()
                .and_then(|parent| folder_cover(parent, &mut covers))
                .map(Cover::File)
        });

        let display = display_from_fields(
            path,
            &title,
            artist.as_deref(),
            album.as_deref(),
            &settings.display_fields,
            &settings.display_separator,
        );

        tracks.push(Track {
            path: path.to_path_buf(),
            title,
            artist,
            album,
            duration,
            cover,
            display,
        });
    }

    tracks.sort_by(|a, b| a.display.to_lowercase().cmp(&b.display.to_lowercase()));
    info!(dir = %dir.display(), tracks = tracks.len(), "library scanned");
    Playlist::new(tracks)
}
