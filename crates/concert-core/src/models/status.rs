//! Status payloads returned by controller operations.
//!
//! Every payload serializes to a flat JSON object. Optional groups of fields
//! are omitted entirely rather than written as nulls, except `media`, which
//! is always present.

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::PlaybackError;
use crate::models::state::EngineState;

/// Reply to `set_volume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VolumeStatus {
    pub volume: i32,
}

/// Full status snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub audio_status: EngineState,
    pub volume: i32,
    pub is_playing: bool,
    /// Locator of the media loaded in the engine.
    pub media: Option<String>,
    /// Present only when media is loaded.
    #[serde(flatten)]
    pub loaded: Option<LoadedMedia>,
}

/// Fields reported while the engine has media loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedMedia {
    /// Engine position in milliseconds.
    pub current_time: i64,
    /// Title of the tracked song, if one is tracked.
    pub current_track: Option<String>,
    /// Seconds, or -1 when no track is tracked.
    pub duration: i64,
    pub thumbnail: String,
    pub playedby: String,
}

impl StatusSnapshot {
    pub fn current_track(&self) -> Option<&str> {
        self.loaded.as_ref().and_then(|l| l.current_track.as_deref())
    }

    pub fn current_time(&self) -> Option<i64> {
        self.loaded.as_ref().map(|l| l.current_time)
    }

    pub fn duration(&self) -> i64 {
        self.loaded.as_ref().map(|l| l.duration).unwrap_or(-1)
    }

    pub fn thumbnail(&self) -> &str {
        self.loaded.as_ref().map(|l| l.thumbnail.as_str()).unwrap_or("")
    }

    pub fn playedby(&self) -> &str {
        self.loaded.as_ref().map(|l| l.playedby.as_str()).unwrap_or("")
    }
}

/// Reply to `pause`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PauseStatus {
    pub audio_status: EngineState,
    pub is_playing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

/// A status payload plus the failure, if any, that produced it.
///
/// Serializes as the flat status object with an extra `"error"` code when
/// the operation failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    #[serde(flatten)]
    pub status: T,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "error_code")]
    pub error: Option<PlaybackError>,
}

impl<T: Serialize> Outcome<T> {
    pub fn ok(status: T) -> Self {
        Self { status, error: None }
    }

    pub fn failed(status: T, error: PlaybackError) -> Self {
        Self { status, error: Some(error) }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<T, (T, PlaybackError)> {
        match self.error {
            None => Ok(self.status),
            Some(e) => Err((self.status, e)),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn error_code<S: Serializer>(error: &Option<PlaybackError>, s: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => s.serialize_str(e.code()),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle() -> StatusSnapshot {
        StatusSnapshot {
            audio_status: EngineState::NothingSpecial,
            volume: 70,
            is_playing: false,
            media: None,
            loaded: None,
        }
    }

    #[test]
    fn idle_snapshot_has_only_four_fields() {
        let v = serde_json::to_value(idle()).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert_eq!(v["audio_status"], "NothingSpecial");
        assert_eq!(v["volume"], 70);
        assert_eq!(v["is_playing"], false);
        assert!(v["media"].is_null());
    }

    #[test]
    fn idle_snapshot_accessors_default() {
        let s = idle();
        assert_eq!(s.duration(), -1);
        assert_eq!(s.thumbnail(), "");
        assert_eq!(s.playedby(), "");
        assert_eq!(s.current_track(), None);
        assert_eq!(s.current_time(), None);
    }

    #[test]
    fn loaded_snapshot_flattens() {
        let s = StatusSnapshot {
            audio_status: EngineState::Playing,
            volume: 40,
            is_playing: true,
            media: Some("https://radio.example.com/live".into()),
            loaded: Some(LoadedMedia {
                current_time: 1500,
                current_track: Some("Morning Set".into()),
                duration: 3600,
                thumbnail: "https://img.example.com/1.png".into(),
                playedby: "dj-ana".into(),
            }),
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["media"], "https://radio.example.com/live");
        assert_eq!(v["current_time"], 1500);
        assert_eq!(v["current_track"], "Morning Set");
        assert_eq!(v["duration"], 3600);
        assert_eq!(v["playedby"], "dj-ana");
        assert!(v.get("loaded").is_none());
    }

    #[test]
    fn pause_status_omits_absent_fields() {
        let p = PauseStatus {
            audio_status: EngineState::Stopped,
            is_playing: false,
            current_time: None,
            duration: None,
        };
        let v = serde_json::to_value(p).unwrap();
        assert_eq!(v.as_object().unwrap().len(), 2);
    }

    #[test]
    fn outcome_adds_error_code_only_on_failure() {
        let ok = Outcome::ok(VolumeStatus { volume: 10 });
        assert!(ok.to_value().get("error").is_none());

        let failed = Outcome::failed(idle(), PlaybackError::NoMediaLoaded);
        let v = failed.to_value();
        assert_eq!(v["error"], "no_media_loaded");
        assert_eq!(v["volume"], 70);
        assert!(!failed.is_ok());
    }
}
