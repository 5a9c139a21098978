//! Built-in stages
//!
//! Stages are organized into two categories plus the graph's own ports:
//! - `source`: Generate audio, overwriting whatever was gathered - oscillators
//! - `effect`: Process audio in place - gain, filters
//! - `io`: Sentinels standing in for the host's audio and MIDI buses

pub mod effect;
mod io;
pub mod source;

// Re-export common types at the top level for convenience
pub use effect::{Filter, Gain, PassThrough};
pub use io::GraphIo;
pub use source::Oscillator;
