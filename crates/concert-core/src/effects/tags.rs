//! Build a [`Track`] from a local audio file's tags.
//!
//! Title falls back to the file stem, duration to 0. Embedded cover art
//! becomes a `data:` URI thumbnail.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use lofty::prelude::*;
use lofty::probe::Probe;

use crate::models::Track;

/// Read tags from `path`. Unreadable files still yield a track named after
/// the file.
pub fn read_track(path: &Path, playedby: &str) -> Track {
    let fallback_title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown")
        .to_string();
    let stream = path.to_string_lossy().into_owned();

    let tagged = match Probe::open(path).and_then(|p| p.read()) {
        Ok(t) => t,
        Err(e) => {
            log::debug!("concert: no tags for {}: {}", stream, e);
            return Track::new(fallback_title, stream, 0).with_playedby(playedby);
        }
    };

    let tag = tagged.primary_tag().or_else(|| tagged.first_tag());
    let title = tag
        .and_then(|t| t.title().map(|s| s.to_string()))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(fallback_title);
    let duration = tagged.properties().duration().as_secs();

    let thumbnail = tag
        .and_then(|t| t.pictures().first())
        .map(|pic| {
            let mime = pic
                .mime_type()
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "image/jpeg".to_string());
            data_uri(&mime, pic.data())
        })
        .unwrap_or_default();

    Track::new(title, stream, duration)
        .with_thumbnail(thumbnail)
        .with_playedby(playedby)
}

fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}
