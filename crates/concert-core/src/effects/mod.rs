use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::models::EngineState;

/// A native media-playback engine session.
///
/// The controller drives playback through this seam. All methods take `&self`;
/// engines manage their own concurrency. Calls are fire-and-forget: an engine
/// reports the effect of a call through [`state`](MediaEngine::state), usually
/// some time later.
pub trait MediaEngine: Send + Sync {
    /// Load a locator as the current media, replacing any previous one.
    fn load(&self, locator: &str);
    /// Drop the loaded media. The engine returns to `NothingSpecial`.
    fn unload(&self);
    /// Locator of the loaded media.
    fn media(&self) -> Option<String>;
    /// Start (or resume) the loaded media.
    fn play(&self);
    fn stop(&self);
    /// Pause when playing, resume when paused.
    fn toggle_pause(&self);
    fn seek(&self, position: Duration);
    fn set_volume(&self, volume: i32);
    fn state(&self) -> EngineState;
    /// Playback position in milliseconds, -1 when nothing is loaded.
    fn time_ms(&self) -> i64;

    /// Block until `until(state)` holds or `timeout` passes, then return the
    /// current state.
    ///
    /// The default sleeps for the whole timeout and reads once, which suits
    /// engines that can only be polled. Engines with change notifications
    /// should override it to return early.
    fn wait_for_state(&self, timeout: Duration, until: &dyn Fn(EngineState) -> bool) -> EngineState {
        let state = self.state();
        if until(state) || timeout.is_zero() {
            return state;
        }
        thread::sleep(timeout);
        self.state()
    }
}

/// Reachability checks run before a stream is handed to the engine.
pub trait Reachability: Send + Sync {
    /// One network round trip to `url`, bounded by `timeout`.
    fn ping(&self, url: &str, timeout: Duration) -> bool;

    fn file_exists(&self, path: &str) -> bool {
        Path::new(path).is_file()
    }
}

#[cfg(feature = "native")]
pub mod audio;
pub mod http;
pub mod tags;
