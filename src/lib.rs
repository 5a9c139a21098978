//! slotgraph - runtime-mutable audio graph with lock-free topology publishing
//!
//! Design principles:
//! - The control thread owns the topology; the audio thread only sees complete,
//!   immutable render plans handed over through wait-free queues
//! - Nothing is freed on the audio thread: replaced plans travel back to the
//!   control thread to be dropped there
//! - Topology changes are validated up front and applied in all-or-nothing batches
//! - A slot controller turns per-slot choices into graph rebuilds

mod connection;
mod editor;
mod error;
mod graph;
mod layout;
mod midi;
mod node;
pub mod nodes;
pub mod params;
mod plan;
mod render;
mod slots;

/// Fixed-size channel buffer stages process in (`Buffer::LEN` samples).
pub use dasp_graph::Buffer;

pub use connection::{Channel, Connection, Port};
pub use editor::TopologyEditor;
pub use error::{ConnectionFault, GraphError, ParamError};
pub use graph::ProcessGraph;
pub use layout::{BusLayout, ChannelSet};
pub use midi::{MidiBuffer, MidiEvent, MIDI_BUFFER_CAPACITY};
pub use node::{NodeId, ProcessBlock, ProcessContext, Stage, StageRole};
pub use params::{GraphParams, ParamSnapshot, SlotEvent};
pub use plan::DEFAULT_PLAN_QUEUE_CAPACITY;
pub use render::Renderer;
pub use slots::{IoNodes, SlotAssignment, SlotController, SlotKind, DEFAULT_SLOT_COUNT};
