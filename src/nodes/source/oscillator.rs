//! Sine wave oscillator

use crate::node::{ProcessBlock, ProcessContext, Stage};

/// A sine tone generator.
///
/// Overwrites every channel of its block with the same tone; whatever audio
/// was gathered from upstream is discarded.
pub struct Oscillator {
    frequency: f32,
    amplitude: f32,
    phase: f32,
    phase_inc: f32,
}

impl Oscillator {
    /// A full-scale 440 Hz sine.
    pub fn new() -> Self {
        Self::with_frequency(440.0)
    }

    pub fn with_frequency(frequency: f32) -> Self {
        Self {
            frequency: frequency.max(0.0),
            amplitude: 1.0,
            phase: 0.0,
            phase_inc: 0.0,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    #[inline]
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for Oscillator {
    fn name(&self) -> &'static str {
        "Oscillator"
    }

    fn prepare(&mut self, ctx: &ProcessContext) {
        self.phase_inc = (self.frequency as f64 / ctx.sample_rate) as f32;
        self.phase = 0.0;
    }

    fn process(&mut self, _ctx: &ProcessContext, block: ProcessBlock<'_>) {
        let Some((first, rest)) = block.audio.split_first_mut() else {
            return;
        };

        let frames = block.frames;
        let amplitude = self.amplitude;

        for sample in first[..frames].iter_mut() {
            *sample = (self.phase * core::f32::consts::TAU).sin() * amplitude;

            self.phase += self.phase_inc;
            // Branchless phase wrap (phase is always positive)
            self.phase -= (self.phase >= 1.0) as u32 as f32;
        }

        // Same tone on every other channel
        for buffer in rest.iter_mut() {
            buffer[..frames].copy_from_slice(&first[..frames]);
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}
