//! Track record supplied by the caller.

use serde::{Deserialize, Serialize};

/// Metadata for one playable stream.
///
/// `duration` is in whole seconds. `thumbnail` and `playedby` are free-form
/// strings and default to empty when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    /// URL or local path handed to the engine.
    pub stream: String,
    pub duration: u64,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub playedby: String,
}

/// How a stream locator reaches the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorKind {
    /// `http://` or `https://`. Gated by a reachability probe.
    Network,
    /// Bare filesystem path or `file://` URI.
    File,
    /// Any other `scheme://`. Passed to the engine as-is.
    Other,
}

impl LocatorKind {
    pub fn of(locator: &str) -> Self {
        if crate::effects::http::is_http_url(locator) {
            LocatorKind::Network
        } else if locator.starts_with("file://") || !locator.contains("://") {
            LocatorKind::File
        } else {
            LocatorKind::Other
        }
    }
}

impl Track {
    pub fn new(title: impl Into<String>, stream: impl Into<String>, duration: u64) -> Self {
        Self {
            title: title.into(),
            stream: stream.into(),
            duration,
            thumbnail: String::new(),
            playedby: String::new(),
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = thumbnail.into();
        self
    }

    pub fn with_playedby(mut self, playedby: impl Into<String>) -> Self {
        self.playedby = playedby.into();
        self
    }

    pub fn locator_kind(&self) -> LocatorKind {
        LocatorKind::of(&self.stream)
    }
}

/// Strip a `file://` prefix, leaving bare paths untouched.
pub fn file_path(locator: &str) -> &str {
    locator.strip_prefix("file://").unwrap_or(locator)
}
