use crate::node::{ProcessBlock, ProcessContext, Stage, StageRole};

/// The graph's own input and output ports.
///
/// A graph has (at most) one of each. The renderer fills input sentinels from
/// the host and copies output sentinels back to it; their `process` is never
/// called.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum GraphIo {
    AudioInput,
    AudioOutput,
    MidiInput,
    MidiOutput,
}

impl Stage for GraphIo {
    fn name(&self) -> &'static str {
        match self {
            GraphIo::AudioInput => "Audio Input",
            GraphIo::AudioOutput => "Audio Output",
            GraphIo::MidiInput => "MIDI Input",
            GraphIo::MidiOutput => "MIDI Output",
        }
    }

    fn process(&mut self, _ctx: &ProcessContext, _block: ProcessBlock<'_>) {}

    fn role(&self) -> StageRole {
        match self {
            GraphIo::AudioInput => StageRole::AudioInput,
            GraphIo::AudioOutput => StageRole::AudioOutput,
            GraphIo::MidiInput => StageRole::MidiInput,
            GraphIo::MidiOutput => StageRole::MidiOutput,
        }
    }
}
