//! concert-core: single-stream playback control over a native media engine.
//!
//! The controller tracks which song is loaded, orchestrates bounded start-up
//! retries against an engine whose state changes asynchronously, and answers
//! every call with a flat JSON-serializable status.
//!
//! # Architecture
//!
//! ```text
//! Layer 0: Engine seam (MediaEngine, Reachability)
//! Layer 1: Effects (native symphonia + cpal engine, HTTP probe, tag reader)
//! Layer 2: Controller (reconcile, retries, snapshots)
//! Layer 3: Surfaces (C FFI, CLI)
//! ```

pub mod config;
pub mod controller;
pub mod effects;
pub mod error;
pub mod models;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ControllerConfig;
pub use controller::Controller;
pub use effects::{MediaEngine, Reachability};
pub use error::{ConfigError, PlaybackError};
pub use models::*;
pub use retry::{CancelToken, Retry, RetryOutcome};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_config, ScriptedEngine, ScriptedProbe};
    use std::sync::Arc;

    fn controller(engine: ScriptedEngine, probe: ScriptedProbe) -> (Arc<ScriptedEngine>, Controller) {
        let engine = Arc::new(engine);
        let c = Controller::with_engine(engine.clone(), Arc::new(probe), fast_config());
        (engine, c)
    }

    fn track_json() -> serde_json::Value {
        serde_json::json!({
            "title": "Evening Mix",
            "stream": "http://stream.example.com:8000/evening",
            "duration": 3600,
            "thumbnail": "http://img.example.com/evening.jpg",
            "playedby": "sam"
        })
    }

    #[test]
    fn play_payload_has_full_shape() {
        let (_engine, c) = controller(ScriptedEngine::healthy(), ScriptedProbe::reachable());
        let track: Track = serde_json::from_value(track_json()).unwrap();

        let payload = c.play(&track).to_value();

        assert_eq!(payload["audio_status"], "Playing");
        assert_eq!(payload["volume"], 70);
        assert_eq!(payload["is_playing"], true);
        assert_eq!(payload["media"], "http://stream.example.com:8000/evening");
        assert_eq!(payload["current_time"], 0);
        assert_eq!(payload["current_track"], "Evening Mix");
        assert_eq!(payload["duration"], 3600);
        assert_eq!(payload["thumbnail"], "http://img.example.com/evening.jpg");
        assert_eq!(payload["playedby"], "sam");
        assert!(payload.get("error").is_none());
    }

    #[test]
    fn failed_play_payload_carries_error_code() {
        let (_engine, c) = controller(ScriptedEngine::healthy(), ScriptedProbe::unreachable());
        let track: Track = serde_json::from_value(track_json()).unwrap();

        let payload = c.play(&track).to_value();

        assert_eq!(payload["is_playing"], false);
        assert_eq!(payload["error"], "unreachable");
        assert!(payload["media"].is_null());
        assert_eq!(payload.as_object().unwrap().len(), 5);
    }

    #[test]
    fn idle_state_payload_is_minimal() {
        let (_engine, c) = controller(ScriptedEngine::healthy(), ScriptedProbe::reachable());
        let v = serde_json::to_value(c.cur_state()).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "audio_status": "NothingSpecial",
                "volume": 70,
                "is_playing": false,
                "media": null,
            })
        );
    }

    #[test]
    fn track_ended_between_calls_is_cleaned_up_on_next_read() {
        let (engine, c) = controller(ScriptedEngine::healthy(), ScriptedProbe::reachable());
        let track: Track = serde_json::from_value(track_json()).unwrap();
        c.play(&track);

        engine.set_state(EngineState::Ended);
        let v = serde_json::to_value(c.cur_state()).unwrap();

        assert_eq!(v["audio_status"], "Ended");
        assert_eq!(v["is_playing"], false);
        assert_eq!(v["media"], "http://stream.example.com:8000/evening");
        assert!(v["current_track"].is_null());
        assert_eq!(v["duration"], -1);
        assert!(c.current_track().is_none());

        let v = serde_json::to_value(c.cur_state()).unwrap();
        assert_eq!(v["audio_status"], "NothingSpecial");
        assert!(v["media"].is_null());
    }

    #[test]
    fn failed_start_payload_reports_engine_error() {
        let (_engine, c) = controller(ScriptedEngine::broken(), ScriptedProbe::reachable());
        let track: Track = serde_json::from_value(track_json()).unwrap();

        let payload = c.play(&track).to_value();

        assert_eq!(payload["audio_status"], "Error");
        assert_eq!(payload["error"], "engine_start_failed");
        assert_eq!(payload["is_playing"], false);
        assert_eq!(payload["media"], "http://stream.example.com:8000/evening");
        assert_eq!(payload["duration"], -1);
    }

    #[test]
    fn volume_payload() {
        let (_engine, c) = controller(ScriptedEngine::healthy(), ScriptedProbe::reachable());
        let v = serde_json::to_value(c.set_volume(250)).unwrap();
        assert_eq!(v, serde_json::json!({"volume": 100}));
    }
}
