//! Slot controller - maps per-slot choices onto graph rebuilds
//!
//! A fixed number of ordered slots sits between the graph's audio input and
//! output. Each slot holds nothing or one stage. Whenever a slot's kind
//! changes the controller swaps its node and rewires the whole chain in one
//! batch; bypass and mute flags are pushed to the nodes on every update.

use core::iter;

use itertools::Itertools;
use tracing::{debug, info};

use crate::connection::Connection;
use crate::error::GraphError;
use crate::graph::ProcessGraph;
use crate::layout::BusLayout;
use crate::node::{NodeId, Stage};
use crate::nodes::{Filter, Gain, GraphIo, Oscillator};
use crate::params::{GraphParams, ParamSnapshot};
use crate::render::Renderer;

/// Number of slots a [`SlotController`] gets from [`SlotController::new`].
pub const DEFAULT_SLOT_COUNT: usize = 3;

/// What a slot holds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum SlotKind {
    #[default]
    Empty,
    Oscillator,
    Gain,
    Filter,
}

impl SlotKind {
    pub const ALL: [SlotKind; 4] = [SlotKind::Empty, SlotKind::Oscillator, SlotKind::Gain, SlotKind::Filter];

    /// Display names, in [`index`](Self::index) order.
    pub const CHOICES: [&'static str; 4] = ["Empty", "Oscillator", "Gain", "Filter"];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        Self::CHOICES[self.index()]
    }

    /// A fresh stage of this kind, or `None` for an empty slot.
    pub fn create_stage(self) -> Option<Box<dyn Stage>> {
        match self {
            SlotKind::Empty => None,
            SlotKind::Oscillator => Some(Box::new(Oscillator::new())),
            SlotKind::Gain => Some(Box::new(Gain::new())),
            SlotKind::Filter => Some(Box::new(Filter::new())),
        }
    }
}

/// State of one slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct SlotAssignment {
    /// Kind most recently requested
    pub chosen_kind: SlotKind,
    pub bypass: bool,
    /// Node currently occupying the slot
    pub bound_node: Option<NodeId>,
    /// Kind of `bound_node` (`Empty` when unbound)
    pub bound_kind: SlotKind,
}

/// The sentinel nodes a controller wires its chain between.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct IoNodes {
    pub audio_input: NodeId,
    pub audio_output: NodeId,
    pub midi_input: NodeId,
    pub midi_output: NodeId,
}

/// Drives a [`ProcessGraph`] from slot parameters.
///
/// ```
/// use slotgraph::params::ParamSnapshot;
/// use slotgraph::{BusLayout, SlotController, SlotKind};
///
/// let (mut slots, _renderer) = SlotController::new(BusLayout::stereo()).unwrap();
///
/// let snapshot = ParamSnapshot::new(3).with_kind(0, SlotKind::Oscillator);
/// assert!(slots.update(&snapshot).unwrap());
/// // Nothing changed, nothing rebuilt
/// assert!(!slots.update(&snapshot).unwrap());
/// ```
pub struct SlotController {
    graph: ProcessGraph,
    io: IoNodes,
    slots: Vec<SlotAssignment>,
}

impl SlotController {
    pub fn new(layout: BusLayout) -> Result<(Self, Renderer), GraphError> {
        Self::with_slot_count(layout, DEFAULT_SLOT_COUNT)
    }

    /// A controller with `count` slots, all empty: audio input straight to audio
    /// output, MIDI input straight to MIDI output.
    pub fn with_slot_count(layout: BusLayout, count: usize) -> Result<(Self, Renderer), GraphError> {
        let (mut graph, renderer) = ProcessGraph::new(layout)?;
        let channels = layout.channels();

        let io = graph.edit(|tx| {
            let io = IoNodes {
                audio_input: tx.add_node(GraphIo::AudioInput),
                audio_output: tx.add_node(GraphIo::AudioOutput),
                midi_input: tx.add_node(GraphIo::MidiInput),
                midi_output: tx.add_node(GraphIo::MidiOutput),
            };
            for channel in 0..channels {
                tx.connect(Connection::audio(io.audio_input, io.audio_output, channel))?;
            }
            tx.connect(Connection::events(io.midi_input, io.midi_output))?;
            Ok(io)
        })?;

        let controller = Self {
            graph,
            io,
            slots: vec![SlotAssignment::default(); count],
        };

        Ok((controller, renderer))
    }

    /// Bring the graph in line with `snapshot`. Returns whether the topology
    /// was rebuilt.
    ///
    /// Slots whose kind did not change keep their node (and its state). Bypass
    /// flags and the input mute are applied on every call.
    pub fn update(&mut self, snapshot: &ParamSnapshot) -> Result<bool, GraphError> {
        for (slot, params) in self.slots.iter_mut().zip(&snapshot.slots) {
            slot.chosen_kind = params.kind;
            slot.bypass = params.bypass;
        }

        let changed: Vec<usize> = self
            .slots
            .iter()
            .positions(|slot| slot.chosen_kind != slot.bound_kind)
            .collect();

        let rebuilt = !changed.is_empty();
        if rebuilt {
            self.rebuild(&changed)?;
        }

        for slot in &self.slots {
            if let Some(node) = slot.bound_node {
                self.graph.set_bypassed(node, slot.bypass)?;
            }
        }
        self.graph.set_bypassed(self.io.audio_input, snapshot.mute)?;

        Ok(rebuilt)
    }

    /// One control tick: reclaim retired plans, read `params`, update.
    pub fn tick(&mut self, params: &GraphParams) -> Result<bool, GraphError> {
        self.graph.collect_garbage();
        let snapshot = params.snapshot();
        self.update(&snapshot)
    }

    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<(), GraphError> {
        self.graph.prepare(sample_rate, max_block_size)
    }

    pub fn release(&mut self) -> Result<(), GraphError> {
        self.graph.release()
    }

    pub fn slot(&self, index: usize) -> Option<&SlotAssignment> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[SlotAssignment] {
        &self.slots
    }

    pub fn io(&self) -> IoNodes {
        self.io
    }

    pub fn graph(&self) -> &ProcessGraph {
        &self.graph
    }

    /// Swap the nodes of `changed` slots and rewire everything, as one batch.
    fn rebuild(&mut self, changed: &[usize]) -> Result<(), GraphError> {
        let io = self.io;
        let channels = self.graph.layout().channels();
        let chosen: Vec<SlotKind> = self.slots.iter().map(|slot| slot.chosen_kind).collect();
        let mut bound: Vec<Option<NodeId>> = self.slots.iter().map(|slot| slot.bound_node).collect();

        self.graph.edit(|tx| {
            for &index in changed {
                if let Some(old) = bound[index].take() {
                    tx.remove_node(old)?;
                }
                bound[index] = chosen[index].create_stage().map(|stage| tx.add_boxed_node(stage));
                debug!(slot = index, kind = chosen[index].name(), "rebound slot");
            }

            tx.disconnect_all();

            let chain: Vec<NodeId> = iter::once(io.audio_input)
                .chain(bound.iter().flatten().copied())
                .chain(iter::once(io.audio_output))
                .collect();

            for (&from, &to) in chain.iter().tuple_windows() {
                for channel in 0..channels {
                    tx.connect(Connection::audio(from, to, channel))?;
                }
            }
            tx.connect(Connection::events(io.midi_input, io.midi_output))?;
            Ok(())
        })?;

        for ((slot, node), kind) in self.slots.iter_mut().zip(bound).zip(chosen) {
            slot.bound_node = node;
            slot.bound_kind = kind;
        }

        info!(changed = changed.len(), nodes = self.graph.node_count(), "rebuilt slot chain");
        Ok(())
    }
}
