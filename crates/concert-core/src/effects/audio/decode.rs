//! Decoder thread: locator -> symphonia -> sample ring.

use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;

use super::convert::Resampler;
use super::output::device_rate;
use super::Pipeline;
use crate::effects::http::{extension_from_url, is_http_url, open_url};
use crate::error::log_err;
use crate::models::track::file_path;
use crate::models::EngineState;

fn open_source(
    locator: &str,
    open_timeout: Option<Duration>,
) -> Result<(MediaSourceStream, Hint), Box<dyn Error>> {
    let mut hint = Hint::new();
    if is_http_url(locator) {
        if let Some(ext) = extension_from_url(locator) {
            hint.with_extension(&ext);
        }
        return Ok((open_url(locator, open_timeout)?, hint));
    }

    let path = Path::new(file_path(locator));
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }
    let file = File::open(path)?;
    Ok((MediaSourceStream::new(Box::new(file), Default::default()), hint))
}

pub(super) fn run(
    locator: &str,
    pipeline: &Pipeline,
    open_timeout: Option<Duration>,
) -> Result<(), Box<dyn Error>> {
    let (mss, hint) = open_source(locator, open_timeout)?;
    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;
    let track = format.default_track().ok_or("no default track")?;
    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);
    let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let target_rate = device_rate(sample_rate, channels as u16);
    pipeline.set_format(sample_rate, channels, target_rate);
    let mut resampler = Resampler::new(sample_rate, target_rate, channels);
    if resampler.is_some() {
        log::info!("concert: resampling {}Hz -> {}Hz", sample_rate, target_rate);
    }

    pipeline.transition(&[EngineState::Opening], EngineState::Buffering);

    let mut decoded_frames: u64 = 0;
    while !pipeline.stopped() {
        if let Some(ms) = pipeline.seek_to_ms.lock().take() {
            let time = Time::new(ms / 1000, (ms % 1000) as f64 / 1000.0);
            let to = SeekTo::Time { time, track_id: Some(track_id) };
            if log_err(format.seek(SeekMode::Accurate, to), "seek") {
                decoder.reset();
                pipeline.samples.lock().clear();
                decoded_frames = ms * sample_rate as u64 / 1000;
                pipeline.decoded_ms.store(ms, Ordering::SeqCst);
            }
        }

        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                log::debug!("concert: skipping bad packet: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let frames = decoded.frames();
        let mut buf = SampleBuffer::<f32>::new(frames as u64, *decoded.spec());
        buf.copy_interleaved_ref(decoded);

        decoded_frames += frames as u64;
        pipeline
            .decoded_ms
            .store(decoded_frames * 1000 / sample_rate as u64, Ordering::SeqCst);

        match resampler.as_mut() {
            Some(rs) => feed(pipeline, &rs.process(buf.samples())),
            None => feed(pipeline, buf.samples()),
        }
    }

    Ok(())
}

/// Push all of `samples`, waiting for room. Gives up on stop.
fn feed(pipeline: &Pipeline, mut samples: &[f32]) {
    while !samples.is_empty() {
        if pipeline.stopped() {
            return;
        }
        let taken = pipeline.samples.lock().push(samples);
        samples = &samples[taken..];
        if !samples.is_empty() {
            thread::sleep(Duration::from_millis(5));
        }
    }
}
