//! One-pole high-pass filter
//!
//! The high-pass output is the input minus a one-pole lowpass of it:
//!
//! ```text
//! lp[n] = x[n] + coeff * (lp[n-1] - x[n])
//! y[n]  = x[n] - lp[n]
//! ```
//!
//! where `coeff = exp(-2π * cutoff / sample_rate)`.

use crate::node::{ProcessBlock, ProcessContext, Stage};

/// A 6 dB/oct high-pass filter, one state per channel.
pub struct Filter {
    cutoff: f32,
    coeff: f32,
    state: Vec<f32>,
}

impl Filter {
    /// High-pass at 1 kHz.
    pub fn new() -> Self {
        Self::with_cutoff(1000.0)
    }

    pub fn with_cutoff(cutoff: f32) -> Self {
        Self {
            cutoff: cutoff.max(0.0),
            coeff: 0.0,
            state: Vec::new(),
        }
    }

    #[inline]
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for Filter {
    fn name(&self) -> &'static str {
        "Filter"
    }

    fn prepare(&mut self, ctx: &ProcessContext) {
        self.coeff = (-core::f64::consts::TAU * self.cutoff as f64 / ctx.sample_rate).exp() as f32;
        self.state.clear();
        self.state.resize(ctx.channels, 0.0);
    }

    fn process(&mut self, _ctx: &ProcessContext, block: ProcessBlock<'_>) {
        let frames = block.frames;
        let coeff = self.coeff;

        for (buffer, lp) in block.audio.iter_mut().zip(self.state.iter_mut()) {
            for sample in buffer[..frames].iter_mut() {
                *lp = *sample + coeff * (*lp - *sample);
                *sample -= *lp;
            }
        }
    }

    fn reset(&mut self) {
        self.state.iter_mut().for_each(|s| *s = 0.0);
    }
}
