//! Sample-rate and channel-layout conversion for interleaved f32.

/// Linear-interpolating resampler that carries its last input frame across
/// chunks, so packet boundaries don't click.
pub(crate) struct Resampler {
    /// Source frames advanced per output frame.
    step: f64,
    /// Read position, relative to the first frame of `carry ++ input`.
    pos: f64,
    channels: usize,
    carry: Vec<f32>,
}

impl Resampler {
    /// `None` when the rates already match.
    pub(crate) fn new(src_rate: u32, dst_rate: u32, channels: usize) -> Option<Self> {
        if src_rate == 0 || dst_rate == 0 || src_rate == dst_rate {
            return None;
        }
        Some(Self {
            step: src_rate as f64 / dst_rate as f64,
            pos: 0.0,
            channels: channels.max(1),
            carry: Vec::new(),
        })
    }

    pub(crate) fn process(&mut self, input: &[f32]) -> Vec<f32> {
        let ch = self.channels;
        let mut frames = std::mem::take(&mut self.carry);
        frames.extend_from_slice(input);
        let n = frames.len() / ch;
        if n < 2 {
            self.carry = frames;
            return Vec::new();
        }

        let mut out = Vec::with_capacity(((n as f64) / self.step).ceil() as usize * ch);
        while self.pos + 1.0 < n as f64 {
            let i = self.pos as usize;
            let frac = (self.pos - i as f64) as f32;
            let a = &frames[i * ch..(i + 1) * ch];
            let b = &frames[(i + 1) * ch..(i + 2) * ch];
            out.extend(a.iter().zip(b).map(|(x, y)| x + (y - x) * frac));
            self.pos += self.step;
        }

        let last = n - 1;
        self.carry = frames[last * ch..n * ch].to_vec();
        self.pos -= last as f64;
        out
    }
}

/// Up/down-mix interleaved frames from `src_ch` to `dst_ch` channels.
///
/// Mono is copied to every output channel; anything to mono is averaged;
/// otherwise channels are copied by index and missing ones are silent.
pub(crate) fn adapt_channels(src: &[f32], src_ch: usize, dst: &mut [f32], dst_ch: usize) {
    let (src_ch, dst_ch) = (src_ch.max(1), dst_ch.max(1));
    dst.fill(0.0);
    for (inp, out) in src.chunks(src_ch).zip(dst.chunks_mut(dst_ch)) {
        if src_ch == 1 {
            out.fill(inp[0]);
        } else if dst_ch == 1 {
            out[0] = inp.iter().sum::<f32>() / inp.len() as f32;
        } else {
            for (slot, s) in out.iter_mut().zip(inp) {
                *slot = *s;
            }
        }
    }
}
