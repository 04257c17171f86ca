//! Bounded f32 sample queue between decoder and output callback.

use std::collections::VecDeque;

pub(crate) struct SampleRing {
    buf: VecDeque<f32>,
    capacity: usize,
}

impl SampleRing {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn free(&self) -> usize {
        self.capacity - self.buf.len()
    }

    /// Append as much of `samples` as fits. Returns how many were taken.
    pub(crate) fn push(&mut self, samples: &[f32]) -> usize {
        let n = samples.len().min(self.free());
        self.buf.extend(&samples[..n]);
        n
    }

    /// Fill `out` from the front; the unfilled tail is zeroed.
    pub(crate) fn pull(&mut self, out: &mut [f32]) -> usize {
        let n = out.len().min(self.buf.len());
        for (slot, sample) in out.iter_mut().zip(self.buf.drain(..n)) {
            *slot = sample;
        }
        out[n..].fill(0.0);
        n
    }

    pub(crate) fn clear(&mut self) {
        self.buf.clear();
    }
}
