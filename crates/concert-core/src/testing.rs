//! Scripted engine and probe for controller tests.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::ControllerConfig;
use crate::effects::{MediaEngine, Reachability};
use crate::models::EngineState;
use crate::retry::CancelToken;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load(String),
    Unload,
    Play,
    Stop,
    TogglePause,
    Seek(Duration),
    SetVolume(i32),
}

/// Engine whose reaction to `play` is scripted per call.
///
/// Each `play` pops the next scripted state; once the script runs out,
/// `fallback` is used. Stop moves to `Stopped` while media is loaded.
pub struct ScriptedEngine {
    inner: Mutex<Inner>,
}

struct Inner {
    state: EngineState,
    media: Option<String>,
    time_ms: i64,
    script: VecDeque<EngineState>,
    fallback: EngineState,
    calls: Vec<Call>,
}

impl ScriptedEngine {
    /// Starts playing on every `play`.
    pub fn healthy() -> Self {
        Self::scripted(Vec::new(), EngineState::Playing)
    }

    /// Never leaves the terminal set after `play`.
    pub fn broken() -> Self {
        Self::scripted(Vec::new(), EngineState::Error)
    }

    pub fn scripted(script: Vec<EngineState>, fallback: EngineState) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: EngineState::NothingSpecial,
                media: None,
                time_ms: 0,
                script: script.into(),
                fallback,
                calls: Vec::new(),
            }),
        }
    }

    /// Force a state, as the engine would on its own (end of stream, error).
    pub fn set_state(&self, state: EngineState) {
        self.inner.lock().state = state;
    }

    pub fn set_time_ms(&self, ms: i64) {
        self.inner.lock().time_ms = ms;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.inner.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn seeks(&self) -> Vec<Duration> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Seek(d) => Some(*d),
                _ => None,
            })
            .collect()
    }
}

impl MediaEngine for ScriptedEngine {
    fn load(&self, locator: &str) {
        let mut inner = self.inner.lock();
        inner.calls.push(Call::Load(locator.to_string()));
        inner.media = Some(locator.to_string());
        inner.state = EngineState::NothingSpecial;
    }

    fn unload(&self) {
        let mut inner = self.inner.lock();
        inner.calls.push(Call::Unload);
        inner.media = None;
        inner.time_ms = 0;
        inner.state = EngineState::NothingSpecial;
    }

    fn media(&self) -> Option<String> {
        self.inner.lock().media.clone()
    }

    fn play(&self) {
        let mut inner = self.inner.lock();
        inner.calls.push(Call::Play);
        if inner.media.is_none() {
            return;
        }
        let next = inner.script.pop_front().unwrap_or(inner.fallback);
        inner.state = next;
    }

    fn stop(&self) {
        let mut inner = self.inner.lock();
        inner.calls.push(Call::Stop);
        if inner.media.is_some() {
            inner.state = EngineState::Stopped;
        }
    }

    fn toggle_pause(&self) {
        let mut inner = self.inner.lock();
        inner.calls.push(Call::TogglePause);
        inner.state = match inner.state {
            EngineState::Playing => EngineState::Paused,
            EngineState::Paused => EngineState::Playing,
            other => other,
        };
    }

    fn seek(&self, position: Duration) {
        self.inner.lock().calls.push(Call::Seek(position));
    }

    fn set_volume(&self, volume: i32) {
        self.inner.lock().calls.push(Call::SetVolume(volume));
    }

    fn state(&self) -> EngineState {
        self.inner.lock().state
    }

    fn time_ms(&self) -> i64 {
        let inner = self.inner.lock();
        if inner.media.is_some() {
            inner.time_ms
        } else {
            -1
        }
    }
}

/// Probe with a fixed answer that counts pings.
pub struct ScriptedProbe {
    reachable: bool,
    files: HashSet<String>,
    pings: AtomicU32,
    cancel_on_ping: Mutex<Option<CancelToken>>,
}

impl ScriptedProbe {
    pub fn reachable() -> Self {
        Self::new(true)
    }

    pub fn unreachable() -> Self {
        Self::new(false)
    }

    fn new(reachable: bool) -> Self {
        Self {
            reachable,
            files: HashSet::new(),
            pings: AtomicU32::new(0),
            cancel_on_ping: Mutex::new(None),
        }
    }

    pub fn with_file(mut self, path: &str) -> Self {
        self.files.insert(path.to_string());
        self
    }

    /// Cancel `token` from inside the first ping, as a second thread would.
    pub fn cancel_during_ping(&self, token: CancelToken) {
        *self.cancel_on_ping.lock() = Some(token);
    }

    pub fn pings(&self) -> u32 {
        self.pings.load(Ordering::SeqCst)
    }
}

impl Reachability for ScriptedProbe {
    fn ping(&self, _url: &str, _timeout: Duration) -> bool {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = self.cancel_on_ping.lock().as_ref() {
            token.cancel();
        }
        self.reachable
    }

    fn file_exists(&self, path: &str) -> bool {
        self.files.contains(path)
    }
}

/// Production defaults with every wait set to zero.
pub fn fast_config() -> ControllerConfig {
    ControllerConfig {
        network_attempt_timeout_ms: 0,
        play_attempt_delay_ms: 0,
        pause_delay_ms: 0,
        ..ControllerConfig::default()
    }
}
