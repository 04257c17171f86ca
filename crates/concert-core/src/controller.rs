//! Playback controller.
//!
//! Owns one engine session and the track loaded into it. Every public
//! operation runs under a single lock, reconciles engine state once, and
//! answers with a status snapshot.
//!
//! Reconcile is the only place that releases media: when the engine reports
//! a terminal state, the loaded media and the current track are dropped
//! together, so no caller ever sees one without the other. The reply to the
//! call that releases them still reports the state and media it observed.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::config::ControllerConfig;
use crate::effects::{MediaEngine, Reachability};
use crate::error::PlaybackError;
use crate::models::track::file_path;
use crate::models::{
    EngineState, LoadedMedia, LocatorKind, Outcome, PauseStatus, StatusSnapshot, Track, VolumeStatus,
};
use crate::retry::{CancelToken, Retry, RetryOutcome};

/// The concert playback controller.
pub struct Controller {
    engine: Arc<dyn MediaEngine>,
    probe: Arc<dyn Reachability>,
    config: ControllerConfig,
    session: Mutex<Session>,
    cancel: CancelToken,
}

struct Session {
    volume: i32,
    current_track: Option<Track>,
}

/// What reconcile saw before any cleanup.
struct Observed {
    state: EngineState,
    media: Option<String>,
    released: bool,
}

impl Controller {
    /// Controller over the native (symphonia + cpal) engine with HTTP probes.
    #[cfg(feature = "native")]
    pub fn new(config: ControllerConfig) -> Self {
        let engine = crate::effects::audio::NativeEngine::new(
            config.network_caching(),
            config.stream_open_timeout(),
        );
        Self::with_engine(
            Arc::new(engine),
            Arc::new(crate::effects::http::HttpProbe::new()),
            config,
        )
    }

    /// Controller over a custom engine and probe.
    pub fn with_engine(
        engine: Arc<dyn MediaEngine>,
        probe: Arc<dyn Reachability>,
        config: ControllerConfig,
    ) -> Self {
        let volume = config.default_volume;
        engine.set_volume(volume);
        Self {
            engine,
            probe,
            config,
            session: Mutex::new(Session { volume, current_track: None }),
            cancel: CancelToken::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Clamp to `max_volume` and apply. Values below zero pass through.
    pub fn set_volume(&self, value: i32) -> VolumeStatus {
        let mut session = self.session.lock();
        let volume = value.min(self.config.max_volume);
        session.volume = volume;
        self.engine.set_volume(volume);
        log::debug!("concert: volume set to {}", volume);
        VolumeStatus { volume }
    }

    /// Stop whatever is playing, gate the stream on reachability, then start
    /// it with bounded confirmation retries.
    pub fn play(&self, track: &Track) -> Outcome<StatusSnapshot> {
        let mut session = self.session.lock();
        self.cancel.reset();
        self.engine.stop();

        if let Err(e) = self.ensure_reachable(&track.stream) {
            let status = self.snapshot(&mut session);
            return Outcome::failed(status, e);
        }

        let delay = self.config.play_attempt_delay();
        let outcome = Retry::new(self.config.max_play_attempts)
            .deadline(self.config.play_start_deadline())
            .cancel_on(&self.cancel)
            .run(|attempt| {
                self.engine.stop();
                self.engine.load(&track.stream);
                self.engine.play();
                session.current_track = Some(track.clone());
                let state = self.engine.wait_for_state(delay, &EngineState::is_active);
                log::debug!("concert: start attempt {} for {}: {}", attempt, track.stream, state);
                state.is_active()
            });

        let error = match outcome {
            RetryOutcome::Succeeded { .. } => {
                log::info!("concert: NOW PLAYING: {}", track.title);
                None
            }
            RetryOutcome::Cancelled { .. } => {
                log::info!("concert: start of {} cancelled", track.title);
                Some(PlaybackError::Cancelled)
            }
            RetryOutcome::Exhausted { attempts } | RetryOutcome::TimedOut { attempts } => {
                log::warn!(
                    "concert: engine did not start {} after {} attempt(s)",
                    track.stream,
                    attempts
                );
                Some(PlaybackError::EngineStartFailed { attempts })
            }
        };

        if error.is_some() && self.engine.state().is_active() {
            // A late start after giving up would leave media playing untracked.
            self.engine.stop();
        }

        let status = self.snapshot(&mut session);
        match error {
            None => Outcome::ok(status),
            Some(e) => Outcome::failed(status, e),
        }
    }

    /// Toggle pause/resume and report the settled state.
    pub fn pause(&self) -> Outcome<PauseStatus> {
        let mut session = self.session.lock();

        if self.engine.media().is_none() {
            let seen = self.reconcile_locked(&mut session);
            let status = self.pause_status(seen, &session);
            return Outcome::failed(status, PlaybackError::NoMediaLoaded);
        }

        let before = self.engine.state();
        self.engine.toggle_pause();
        log::info!("concert: play/pause toggled");
        self.engine
            .wait_for_state(self.config.pause_delay(), &|s| s != before);

        let seen = self.reconcile_locked(&mut session);
        Outcome::ok(self.pause_status(seen, &session))
    }

    pub fn stop(&self) -> StatusSnapshot {
        let mut session = self.session.lock();
        if session.current_track.take().is_some() {
            self.engine.stop();
            log::info!("concert: playback stopped");
        }
        self.snapshot(&mut session)
    }

    /// Seek to `percent` (0..=1) of the current track's duration.
    pub fn set_time(&self, percent: f64) -> Outcome<StatusSnapshot> {
        let mut session = self.session.lock();
        let seen = self.reconcile_locked(&mut session);

        let Some(duration) = session.current_track.as_ref().map(|t| t.duration) else {
            let status = self.describe(seen, &session);
            return Outcome::failed(status, PlaybackError::NoMediaLoaded);
        };
        let position = Some(percent)
            .filter(|p| p.is_finite())
            .and_then(|p| std::time::Duration::try_from_secs_f64(duration as f64 * p.clamp(0.0, 1.0)).ok());
        let Some(position) = position else {
            let status = self.describe(seen, &session);
            return Outcome::failed(status, PlaybackError::InvalidSeek(percent));
        };

        self.engine.seek(position);
        log::debug!("concert: seek to {:?}", position);

        Outcome::ok(self.describe(seen, &session))
    }

    pub fn cur_state(&self) -> StatusSnapshot {
        let mut session = self.session.lock();
        self.snapshot(&mut session)
    }

    /// Reconcile, then report whether the engine is in an active state.
    pub fn is_playing(&self) -> bool {
        let mut session = self.session.lock();
        self.reconcile_locked(&mut session).state.is_active()
    }

    /// Release media and the current track if the engine has reached a
    /// terminal state. Returns true when something was released.
    pub fn reconcile(&self) -> bool {
        let mut session = self.session.lock();
        self.reconcile_locked(&mut session).released
    }

    /// Engine state as reported, without cleanup.
    pub fn engine_state(&self) -> EngineState {
        self.engine.state()
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn current_track(&self) -> Option<Track> {
        self.session.lock().current_track.clone()
    }

    pub fn volume(&self) -> i32 {
        self.session.lock().volume
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Token that aborts an in-flight `play` from another thread.
    pub fn cancel_handle(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn engine(&self) -> &dyn MediaEngine {
        &*self.engine
    }

    // -----------------------------------------------------------------------
    // Internals (session lock held)
    // -----------------------------------------------------------------------

    fn reconcile_locked(&self, session: &mut MutexGuard<'_, Session>) -> Observed {
        let state = self.engine.state();
        let media = self.engine.media();
        if state.is_active() {
            return Observed { state, media, released: false };
        }
        let had_track = session.current_track.take().is_some();
        if media.is_some() {
            self.engine.unload();
        }
        let released = media.is_some() || had_track;
        if released {
            log::debug!("concert: released media on terminal state {}", state);
        }
        Observed { state, media, released }
    }

    fn snapshot(&self, session: &mut MutexGuard<'_, Session>) -> StatusSnapshot {
        let seen = self.reconcile_locked(session);
        self.describe(seen, session)
    }

    /// Status as observed by reconcile. Media released by that reconcile is
    /// still reported, with the untracked defaults.
    fn describe(&self, seen: Observed, session: &Session) -> StatusSnapshot {
        let loaded = seen.media.as_ref().map(|_| {
            let current_time = self.engine.time_ms();
            match session.current_track.as_ref() {
                Some(track) => LoadedMedia {
                    current_time,
                    current_track: Some(track.title.clone()),
                    duration: track.duration as i64,
                    thumbnail: track.thumbnail.clone(),
                    playedby: track.playedby.clone(),
                },
                None => LoadedMedia {
                    current_time,
                    current_track: None,
                    duration: -1,
                    thumbnail: String::new(),
                    playedby: String::new(),
                },
            }
        });

        StatusSnapshot {
            audio_status: seen.state,
            volume: session.volume,
            is_playing: seen.state.is_active(),
            media: seen.media,
            loaded,
        }
    }

    fn pause_status(&self, seen: Observed, session: &Session) -> PauseStatus {
        let loaded = seen.media.is_some();
        PauseStatus {
            audio_status: seen.state,
            is_playing: seen.state.is_active(),
            current_time: loaded.then(|| self.engine.time_ms()),
            duration: session
                .current_track
                .as_ref()
                .filter(|_| loaded)
                .map(|t| t.duration as i64),
        }
    }

    fn ensure_reachable(&self, locator: &str) -> Result<(), PlaybackError> {
        match LocatorKind::of(locator) {
            LocatorKind::Other => Ok(()),
            LocatorKind::File => {
                if self.probe.file_exists(file_path(locator)) {
                    Ok(())
                } else {
                    log::warn!("concert: media file not found: {}", locator);
                    Err(PlaybackError::Unreachable {
                        locator: locator.to_string(),
                        attempts: 1,
                    })
                }
            }
            LocatorKind::Network => {
                let timeout = self.config.network_attempt_timeout();
                let outcome = Retry::new(self.config.max_network_pings)
                    .deadline(self.config.network_deadline())
                    .cancel_on(&self.cancel)
                    .run(|_| self.probe.ping(locator, timeout));
                match outcome {
                    RetryOutcome::Succeeded { .. } => Ok(()),
                    RetryOutcome::Cancelled { .. } => Err(PlaybackError::Cancelled),
                    RetryOutcome::Exhausted { attempts } | RetryOutcome::TimedOut { attempts } => {
                        log::warn!(
                            "concert: giving up on {} after {} ping(s)",
                            locator,
                            attempts
                        );
                        Err(PlaybackError::Unreachable {
                            locator: locator.to_string(),
                            attempts,
                        })
                    }
                }
            }
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.engine.stop();
    }
}
