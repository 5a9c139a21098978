//! Core stage trait, node identity and per-node runtime state.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use atomic_refcell::AtomicRefCell;
use dasp_graph::Buffer;

use crate::midi::MidiBuffer;

/// Information available while preparing and processing a stage.
///
/// Passed to every [`Stage::prepare`] and [`Stage::process`] call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProcessContext {
    /// Sample rate of the graph in Hz (e.g., 44100.0, 48000.0)
    pub sample_rate: f64,
    /// Largest block the host will deliver to [`Renderer::render`](crate::Renderer::render)
    pub max_block_size: usize,
    /// Number of samples per sub-block handed to a stage (always [`Buffer::LEN`])
    pub buffer_size: usize,
    /// Number of audio channels every node carries
    pub channels: usize,
}

impl ProcessContext {
    pub(crate) fn new(sample_rate: f64, max_block_size: usize, channels: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            buffer_size: Buffer::LEN,
            channels,
        }
    }
}

/// Unique identifier for a node within a graph.
///
/// Ids are handed out sequentially by [`ProcessGraph::add_node`](crate::ProcessGraph::add_node)
/// and never reused by the same graph, even when a batch is discarded.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a stage means to the graph.
///
/// Ordinary stages are [`StageRole::Processor`]. The four sentinel roles mark
/// the graph's own I/O ports; the renderer feeds them from (or drains them to)
/// the host instead of calling [`Stage::process`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum StageRole {
    Processor,
    AudioInput,
    AudioOutput,
    MidiInput,
    MidiOutput,
}

impl StageRole {
    /// True for the sentinels that receive data from the host.
    #[inline]
    pub fn is_input(self) -> bool {
        matches!(self, StageRole::AudioInput | StageRole::MidiInput)
    }
}

/// One sub-block of audio and events, processed in place.
pub struct ProcessBlock<'a> {
    /// One buffer per channel. Only the first `frames` samples are meaningful.
    pub audio: &'a mut [Buffer],
    /// Number of valid frames in each buffer (at most [`Buffer::LEN`]).
    pub frames: usize,
    /// Events for this sub-block, with frame offsets relative to its start.
    pub events: &'a mut MidiBuffer,
}

/// The core trait for processing units in the graph.
///
/// A stage receives the audio gathered from its incoming connections and
/// rewrites it in place:
/// - **Sources** ignore their input and overwrite it (oscillators)
/// - **Effects** transform it (gain, filters)
/// - **Sentinels** stand in for the graph's own inputs and outputs
///
/// ```
/// use slotgraph::{ProcessBlock, ProcessContext, Stage};
///
/// struct Invert;
///
/// impl Stage for Invert {
///     fn name(&self) -> &'static str {
///         "Invert"
///     }
///
///     fn process(&mut self, _ctx: &ProcessContext, block: ProcessBlock<'_>) {
///         let frames = block.frames;
///         for channel in block.audio.iter_mut() {
///             for sample in channel[..frames].iter_mut() {
///                 *sample = -*sample;
///             }
///         }
///     }
/// }
/// ```
///
/// # Real-time rules
///
/// [`process`](Stage::process) runs on the audio thread. Allocate in
/// [`prepare`](Stage::prepare), never in `process`.
pub trait Stage: Send + Sync + 'static {
    /// Short display name; slot policy compares stages by kind, not by name.
    fn name(&self) -> &'static str;

    /// Called before the first block and whenever the format changes.
    fn prepare(&mut self, _ctx: &ProcessContext) {}

    /// Process one sub-block in place.
    fn process(&mut self, ctx: &ProcessContext, block: ProcessBlock<'_>);

    /// Clear internal state (phase, filter memory, ...).
    fn reset(&mut self) {}

    /// Role of this stage in the graph. Defaults to [`StageRole::Processor`].
    fn role(&self) -> StageRole {
        StageRole::Processor
    }
}

/// Mutable per-node state, touched by the renderer every block.
pub(crate) struct NodeState {
    pub(crate) stage: Box<dyn Stage>,
    pub(crate) audio: Vec<Buffer>,
    pub(crate) events: MidiBuffer,
}

impl NodeState {
    /// Silence `frames` samples of every channel and drop pending events.
    #[inline]
    pub(crate) fn clear(&mut self, frames: usize) {
        for buffer in self.audio.iter_mut() {
            buffer[..frames].iter_mut().for_each(|s| *s = 0.0);
        }
        self.events.clear();
    }
}

/// A stage bound into a graph.
///
/// Shared between the control side and every render plan that references it,
/// so a removed node stays alive until the renderer has let go of it.
pub(crate) struct Node {
    id: NodeId,
    name: &'static str,
    role: StageRole,
    bypassed: AtomicBool,
    pub(crate) state: AtomicRefCell<NodeState>,
}

impl Node {
    pub(crate) fn new(id: NodeId, stage: Box<dyn Stage>, channels: usize) -> Self {
        Self {
            id,
            name: stage.name(),
            role: stage.role(),
            bypassed: AtomicBool::new(false),
            state: AtomicRefCell::new(NodeState {
                stage,
                audio: vec![Buffer::default(); channels],
                events: MidiBuffer::new(),
            }),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub(crate) fn role(&self) -> StageRole {
        self.role
    }

    #[inline]
    pub(crate) fn is_bypassed(&self) -> bool {
        self.bypassed.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_bypassed(&self, bypassed: bool) {
        self.bypassed.store(bypassed, Ordering::Relaxed);
    }
}
