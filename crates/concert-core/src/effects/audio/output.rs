//! Output thread: sample ring -> cpal, plus the buffering/ended transitions.

use std::error::Error;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::convert::adapt_channels;
use super::Pipeline;
use crate::models::EngineState;

const TICK: Duration = Duration::from_millis(25);

/// Rate the default output device will run at for a track at `track_rate`.
pub(super) fn device_rate(track_rate: u32, channels: u16) -> u32 {
    let Some(device) = cpal::default_host().default_output_device() else {
        return track_rate;
    };
    if supports(&device, track_rate, channels) {
        return track_rate;
    }
    device
        .default_output_config()
        .map(|c| c.sample_rate().0)
        .unwrap_or(track_rate)
}

fn supports(device: &cpal::Device, rate: u32, channels: u16) -> bool {
    device
        .supported_output_configs()
        .map(|mut configs| {
            configs.any(|range| {
                range.sample_format() == cpal::SampleFormat::F32
                    && range.channels() >= channels
                    && range.min_sample_rate().0 <= rate
                    && range.max_sample_rate().0 >= rate
            })
        })
        .unwrap_or(false)
}

fn stream_config(device: &cpal::Device, rate: u32, channels: u16) -> Result<cpal::StreamConfig, Box<dyn Error>> {
    if supports(device, rate, channels) {
        return Ok(cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(rate),
            buffer_size: cpal::BufferSize::Default,
        });
    }
    let default = device.default_output_config()?;
    if default.sample_format() != cpal::SampleFormat::F32 {
        return Err(format!("device does not support f32 output (got {:?})", default.sample_format()).into());
    }
    Ok(default.into())
}

pub(super) fn run(pipeline: &Arc<Pipeline>) -> Result<(), Box<dyn Error>> {
    pipeline.wait_while_opening();
    if pipeline.halted() {
        return Ok(());
    }

    let device = cpal::default_host()
        .default_output_device()
        .ok_or("no output device")?;
    let track_rate = pipeline.sample_rate.load(Ordering::SeqCst);
    let ring_ch = pipeline.channels.load(Ordering::SeqCst).max(1) as usize;
    let config = stream_config(&device, track_rate, ring_ch as u16)?;
    let out_ch = config.channels.max(1) as usize;

    let cb = Arc::clone(pipeline);
    let mut scratch: Vec<f32> = Vec::new();
    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            if !cb.engine.audible.load(Ordering::SeqCst) {
                data.fill(0.0);
                return;
            }
            if ring_ch == out_ch {
                cb.samples.lock().pull(data);
            } else {
                scratch.resize(data.len() / out_ch * ring_ch, 0.0);
                cb.samples.lock().pull(&mut scratch);
                adapt_channels(&scratch, ring_ch, data, out_ch);
            }
            let gain = cb.engine.volume.load(Ordering::SeqCst) as f32 / 100.0;
            data.iter_mut().for_each(|s| *s *= gain);
        },
        |err| log::error!("concert: cpal error: {}", err),
        None,
    )?;
    stream.play()?;

    let preroll = {
        let wanted = pipeline.preroll_ms as usize * config.sample_rate.0 as usize / 1000 * ring_ch;
        wanted.clamp(1, pipeline.samples.lock().capacity() / 2)
    };

    while !pipeline.halted() {
        let buffered = pipeline.samples.lock().len();
        let drained = pipeline.drained.load(Ordering::SeqCst);

        if buffered >= preroll || drained {
            pipeline.transition(&[EngineState::Buffering], EngineState::Playing);
        }
        if drained && buffered == 0 {
            let finished = [EngineState::Buffering, EngineState::Playing];
            if pipeline.transition(&finished, EngineState::Ended) {
                log::info!("concert: end of stream");
                break;
            }
        }
        thread::sleep(TICK);
    }

    Ok(())
}
