//! Audio source stages (generators that ignore their audio input)

mod oscillator;

pub use oscillator::Oscillator;
