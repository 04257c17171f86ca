//! Native media engine: symphonia decode + cpal output.
//!
//! Pipeline per started media:
//! 1. decoder thread opens the locator (file or HTTP), probes and decodes
//! 2. samples flow through a bounded ring
//! 3. output thread feeds cpal once enough pre-roll is buffered
//!
//! Every start builds a fresh `Pipeline`. Halting marks it stopped under the
//! status lock, so a halted pipeline can never change engine state again. The
//! output thread is joined; a decoder still blocked in network I/O after a
//! short grace period is detached and only ever touches its own ring.

mod convert;
mod decode;
mod output;
mod ring;

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::effects::http::is_http_url;
use crate::effects::MediaEngine;
use crate::models::EngineState;

use ring::SampleRing;

/// ~4s of 48kHz stereo.
const RING_CAPACITY: usize = 48_000 * 2 * 4;

/// How long `halt` waits for the decoder before detaching it.
const DECODER_GRACE: Duration = Duration::from_millis(250);

pub struct NativeEngine {
    shared: Arc<Shared>,
    current: Mutex<Option<Running>>,
    /// Pre-roll applied to network streams.
    network_caching: Duration,
    stream_open_timeout: Option<Duration>,
}

/// Engine-wide state, shared with every pipeline.
pub(crate) struct Shared {
    status: Mutex<EngineState>,
    changed: Condvar,
    /// True only while `Playing`; the output callback emits silence otherwise.
    audible: AtomicBool,
    media: Mutex<Option<String>>,
    /// 0-100.
    volume: AtomicU32,
}

/// State owned by one start of the loaded media.
pub(crate) struct Pipeline {
    engine: Arc<Shared>,
    stop_signal: AtomicBool,
    /// Decoder reached end of stream.
    drained: AtomicBool,
    failed: AtomicBool,
    /// Decoder position; runs ahead of what is audible by the ring contents.
    decoded_ms: AtomicU64,
    seek_to_ms: Mutex<Option<u64>>,
    sample_rate: AtomicU32,
    channels: AtomicU32,
    /// Rate of the samples in the ring.
    ring_rate: AtomicU32,
    preroll_ms: u64,
    samples: Mutex<SampleRing>,
}

struct Running {
    pipeline: Arc<Pipeline>,
    decoder: JoinHandle<()>,
    output: JoinHandle<()>,
}

impl Shared {
    fn new() -> Self {
        Self {
            status: Mutex::new(EngineState::NothingSpecial),
            changed: Condvar::new(),
            audible: AtomicBool::new(false),
            media: Mutex::new(None),
            volume: AtomicU32::new(100),
        }
    }

    fn status(&self) -> EngineState {
        *self.status.lock()
    }

    fn set_status(&self, next: EngineState) {
        let mut status = self.status.lock();
        if *status != next {
            self.apply(&mut status, next);
        }
    }

    fn apply(&self, status: &mut MutexGuard<'_, EngineState>, next: EngineState) {
        log::debug!("concert: engine {} -> {}", **status, next);
        **status = next;
        self.audible.store(next == EngineState::Playing, Ordering::SeqCst);
        self.changed.notify_all();
    }

    /// Move to `next` only from one of `from`. Returns whether it moved.
    fn transition(&self, from: &[EngineState], next: EngineState) -> bool {
        let mut status = self.status.lock();
        if !from.contains(&*status) {
            return false;
        }
        self.apply(&mut status, next);
        true
    }
}

impl Pipeline {
    fn new(engine: Arc<Shared>, preroll: Duration) -> Self {
        Self {
            engine,
            stop_signal: AtomicBool::new(false),
            drained: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            decoded_ms: AtomicU64::new(0),
            seek_to_ms: Mutex::new(None),
            sample_rate: AtomicU32::new(44_100),
            channels: AtomicU32::new(2),
            ring_rate: AtomicU32::new(44_100),
            preroll_ms: preroll.as_millis() as u64,
            samples: Mutex::new(SampleRing::new(RING_CAPACITY)),
        }
    }

    fn stopped(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }

    fn halted(&self) -> bool {
        self.stopped() || self.failed.load(Ordering::SeqCst)
    }

    /// Like `Shared::transition`, but a no-op once this pipeline is stopped.
    fn transition(&self, from: &[EngineState], next: EngineState) -> bool {
        let mut status = self.engine.status.lock();
        if self.stopped() || !from.contains(&*status) {
            return false;
        }
        self.engine.apply(&mut status, next);
        true
    }

    fn fail(&self, context: &str, err: &dyn std::fmt::Display) {
        let mut status = self.engine.status.lock();
        if self.stopped() {
            log::debug!("concert: {} error after stop: {}", context, err);
            return;
        }
        log::error!("concert: {} error: {}", context, err);
        self.failed.store(true, Ordering::SeqCst);
        if *status != EngineState::Error {
            self.engine.apply(&mut status, EngineState::Error);
        }
    }

    /// Mark stopped while holding the status lock, so no transition from this
    /// pipeline can land after the caller sets the next state.
    fn stop(&self) {
        let _status = self.engine.status.lock();
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Block until the status leaves `Opening`, or the pipeline is halted.
    fn wait_while_opening(&self) {
        let mut status = self.engine.status.lock();
        while *status == EngineState::Opening && !self.halted() {
            self.engine.changed.wait_for(&mut status, Duration::from_millis(25));
        }
    }

    fn set_format(&self, sample_rate: u32, channels: usize, ring_rate: u32) {
        self.sample_rate.store(sample_rate, Ordering::SeqCst);
        self.channels.store(channels as u32, Ordering::SeqCst);
        self.ring_rate.store(ring_rate, Ordering::SeqCst);
    }

    /// Audible position: the decoder position minus what still sits in the ring.
    fn position_ms(&self) -> u64 {
        let channels = self.channels.load(Ordering::SeqCst).max(1) as u64;
        let rate = self.ring_rate.load(Ordering::SeqCst).max(1) as u64;
        let buffered_ms = self.samples.lock().len() as u64 / channels * 1000 / rate;
        self.decoded_ms
            .load(Ordering::SeqCst)
            .saturating_sub(buffered_ms)
    }
}

impl NativeEngine {
    pub fn new(network_caching: Duration, stream_open_timeout: Option<Duration>) -> Self {
        Self {
            shared: Arc::new(Shared::new()),
            current: Mutex::new(None),
            network_caching,
            stream_open_timeout,
        }
    }

    /// Stop the running pipeline. The output thread is joined; the decoder is
    /// given `DECODER_GRACE` to notice and is detached if it is blocked.
    fn halt(&self) {
        let Some(run) = self.current.lock().take() else {
            return;
        };
        run.pipeline.stop();
        self.shared.audible.store(false, Ordering::SeqCst);
        run.pipeline.samples.lock().clear();

        if run.output.join().is_err() {
            log::error!("concert: output thread panicked");
        }

        let deadline = Instant::now() + DECODER_GRACE;
        while !run.decoder.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if !run.decoder.is_finished() {
            log::warn!("concert: decoder still blocked on its source, detaching it");
        } else if run.decoder.join().is_err() {
            log::error!("concert: decoder thread panicked");
        }
    }

    fn start(&self, locator: String) {
        self.halt();

        let preroll = if is_http_url(&locator) { self.network_caching } else { Duration::ZERO };
        let pipeline = Arc::new(Pipeline::new(Arc::clone(&self.shared), preroll));
        self.shared.set_status(EngineState::Opening);

        let dec = Arc::clone(&pipeline);
        let open_timeout = self.stream_open_timeout;
        let decoder = thread::spawn(move || {
            if let Err(e) = decode::run(&locator, &dec, open_timeout) {
                dec.fail("decode", &e);
            }
            dec.drained.store(true, Ordering::SeqCst);
        });

        let out = Arc::clone(&pipeline);
        let output = thread::spawn(move || {
            if let Err(e) = output::run(&out) {
                out.fail("output", &e);
            }
        });

        self.install(pipeline, decoder, output);
    }

    fn install(&self, pipeline: Arc<Pipeline>, decoder: JoinHandle<()>, output: JoinHandle<()>) {
        *self.current.lock() = Some(Running { pipeline, decoder, output });
    }

    fn pipeline(&self) -> Option<Arc<Pipeline>> {
        self.current.lock().as_ref().map(|run| Arc::clone(&run.pipeline))
    }
}

impl MediaEngine for NativeEngine {
    fn load(&self, locator: &str) {
        self.halt();
        *self.shared.media.lock() = Some(locator.to_string());
        self.shared.set_status(EngineState::NothingSpecial);
    }

    fn unload(&self) {
        self.halt();
        *self.shared.media.lock() = None;
        self.shared.set_status(EngineState::NothingSpecial);
    }

    fn media(&self) -> Option<String> {
        self.shared.media.lock().clone()
    }

    fn play(&self) {
        match self.shared.status() {
            EngineState::Paused => {
                self.shared.set_status(EngineState::Playing);
            }
            EngineState::Opening | EngineState::Buffering | EngineState::Playing => {}
            _ => match self.media() {
                Some(locator) => self.start(locator),
                None => log::warn!("concert: play with no media loaded"),
            },
        }
    }

    fn stop(&self) {
        self.halt();
        let next = if self.media().is_some() {
            EngineState::Stopped
        } else {
            EngineState::NothingSpecial
        };
        self.shared.set_status(next);
    }

    fn toggle_pause(&self) {
        let s = &self.shared;
        if !s.transition(&[EngineState::Playing], EngineState::Paused) {
            s.transition(&[EngineState::Paused], EngineState::Playing);
        }
    }

    fn seek(&self, position: Duration) {
        match self.pipeline() {
            Some(pipeline) => *pipeline.seek_to_ms.lock() = Some(position.as_millis() as u64),
            None => log::debug!("concert: seek ignored, nothing started"),
        }
    }

    fn set_volume(&self, volume: i32) {
        self.shared
            .volume
            .store(volume.clamp(0, 100) as u32, Ordering::SeqCst);
    }

    fn state(&self) -> EngineState {
        self.shared.status()
    }

    fn time_ms(&self) -> i64 {
        if self.media().is_none() {
            return -1;
        }
        self.pipeline().map(|p| p.position_ms() as i64).unwrap_or(0)
    }

    fn wait_for_state(&self, timeout: Duration, until: &dyn Fn(EngineState) -> bool) -> EngineState {
        let deadline = Instant::now() + timeout;
        let mut status = self.shared.status.lock();
        while !until(*status) {
            if self.shared.changed.wait_until(&mut status, deadline).timed_out() {
                break;
            }
        }
        *status
    }
}

impl Drop for NativeEngine {
    fn drop(&mut self) {
        self.halt();
    }
}
