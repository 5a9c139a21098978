//! Gain/volume control effect

use crate::node::{ProcessBlock, ProcessContext, Stage};

/// Convert decibels to a linear amplitude factor.
#[inline]
fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Scales audio by a fixed gain.
///
/// Supports any number of channels; every channel gets the same gain. Gain
/// changes glide towards the new value to avoid clicks.
pub struct Gain {
    gain: f32,
    /// Smoothing to prevent clicks on rapid gain changes
    smoothed_gain: f32,
    /// Smoothing coefficient (0.0 = instant, 1.0 = no change)
    smooth_coeff: f32,
}

impl Gain {
    /// -6 dB.
    pub fn new() -> Self {
        Self::with_gain_db(-6.0)
    }

    pub fn with_gain_db(db: f32) -> Self {
        Self::with_gain(db_to_linear(db))
    }

    /// Create a new gain stage with the specified linear gain
    pub fn with_gain(gain: f32) -> Self {
        Self {
            gain,
            smoothed_gain: gain,
            smooth_coeff: 0.995, // ~7ms at 48kHz
        }
    }

    /// Move the target gain; the output glides there.
    pub fn set_gain_db(&mut self, db: f32) {
        self.gain = db_to_linear(db);
    }

    /// Disable smoothing for instant gain changes
    pub fn without_smoothing(mut self) -> Self {
        self.smooth_coeff = 0.0;
        self
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for Gain {
    fn name(&self) -> &'static str {
        "Gain"
    }

    fn process(&mut self, _ctx: &ProcessContext, block: ProcessBlock<'_>) {
        let frames = block.frames;
        let smooth_coeff = self.smooth_coeff;
        let target_gain = self.gain;
        let mut current_gain = self.smoothed_gain;

        for (ch, buffer) in block.audio.iter_mut().enumerate() {
            // Channels track together from the same starting point
            let mut gain = self.smoothed_gain;

            for sample in buffer[..frames].iter_mut() {
                gain = target_gain + smooth_coeff * (gain - target_gain);
                *sample *= gain;
            }

            if ch == 0 {
                current_gain = gain;
            }
        }

        self.smoothed_gain = current_gain;
    }

    fn reset(&mut self) {
        self.smoothed_gain = self.gain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MidiBuffer;
    use approx::assert_relative_eq;
    use dasp_graph::Buffer;

    #[test]
    fn default_is_minus_six_db() {
        assert_relative_eq!(Gain::new().gain(), 0.501_187, epsilon = 1e-5);
    }

    #[test]
    fn scales_every_channel() {
        let ctx = ProcessContext::new(48000.0, 64, 2);
        let mut gain = Gain::with_gain(0.5);
        let mut audio = vec![Buffer::default(); 2];
        audio.iter_mut().for_each(|b| b.iter_mut().for_each(|s| *s = 1.0));
        let mut events = MidiBuffer::new();

        gain.process(&ctx, ProcessBlock { audio: &mut audio, frames: 10, events: &mut events });

        assert_relative_eq!(audio[0][0], 0.5);
        assert_relative_eq!(audio[1][9], 0.5);
        // Past `frames` is left alone
        assert_relative_eq!(audio[0][10], 1.0);
    }

    #[test]
    fn gain_changes_are_smoothed() {
        let ctx = ProcessContext::new(48000.0, 64, 1);
        let mut gain = Gain::with_gain(1.0);
        gain.set_gain_db(-120.0);

        let mut audio = vec![Buffer::default()];
        audio[0].iter_mut().for_each(|s| *s = 1.0);
        let mut events = MidiBuffer::new();
        gain.process(&ctx, ProcessBlock { audio: &mut audio, frames: Buffer::LEN, events: &mut events });

        assert!(audio[0][0] > 0.9);
        assert!(audio[0][Buffer::LEN - 1] < audio[0][0]);
    }
}
