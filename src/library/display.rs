use std::path::Path;

use crate::config::TrackDisplayField;

/// Build a display string for a track according to the provided `fields` and separator.
///
/// This composes metadata fields (artist, title, album, filename, path) in the
/// configured order and falls back to `title` when no parts were produced.
pub fn display_from_fields(
    path: &Path,
    title: &str,
    artist: Option<&str>,
    album: Option<&str>,
    fields: &[TrackDisplayField],
    sep: &str,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    for f in fields {
        let part = match f {
            TrackDisplayField::Title => non_blank(Some(title)),
            TrackDisplayField::Artist => non_blank(artist),
            TrackDisplayField::Album => non_blank(album),
            TrackDisplayField::Filename => non_blank(path.file_stem().and_then(|s| s.to_str())),
            TrackDisplayField::Path => Some(path.display().to_string()),
        };
        parts.extend(part);
    }

    if parts.is_empty() {
        title.to_string()
    } else {
        parts.join(sep)
    }
}

/// Split a file stem following the `Artist - Title` naming convention.
///
/// Returns `(None, stem)` when the stem does not contain the separator or
/// one of the halves is blank.
pub fn split_artist_title(stem: &str) -> (Option<String>, String) {
    if let Some((artist, title)) = stem.split_once(" - ") {
        let (artist, title) = (artist.trim(), title.trim());
        if !artist.is_empty() && !title.is_empty() {
            return (Some(artist.to_string()), title.to_string());
        }
    }
    (None, stem.trim().to_string())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
