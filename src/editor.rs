//! Batched topology edits

use crate::connection::{Connection, Port};
use crate::error::GraphError;
use crate::graph::{ProcessGraph, Topology};
use crate::node::{NodeId, Stage};

/// An all-or-nothing batch of topology mutations.
///
/// Every operation is validated and applied to a private copy of the
/// topology right away, so later operations see earlier ones and failures
/// are reported where they happen. Nothing reaches the graph (or the
/// renderer) until [`commit`](Self::commit); dropping the editor discards
/// the whole batch.
///
/// ```
/// use slotgraph::nodes::{Gain, GraphIo};
/// use slotgraph::{BusLayout, Connection, ProcessGraph};
///
/// let (mut graph, _renderer) = ProcessGraph::new(BusLayout::mono()).unwrap();
/// let input = graph.add_node(GraphIo::AudioInput);
/// let output = graph.add_node(GraphIo::AudioOutput);
///
/// let mut edit = graph.begin_edit();
/// let gain = edit.add_node(Gain::new());
/// edit.connect(Connection::audio(input, gain, 0)).unwrap();
/// edit.connect(Connection::audio(gain, output, 0)).unwrap();
/// edit.commit().unwrap();
///
/// assert_eq!(graph.render_sequence(), &[input, gain, output]);
/// ```
pub struct TopologyEditor<'g> {
    graph: &'g mut ProcessGraph,
    staged: Topology,
}

impl<'g> TopologyEditor<'g> {
    pub(crate) fn new(graph: &'g mut ProcessGraph) -> Self {
        let staged = graph.topology.clone();
        Self { graph, staged }
    }

    pub fn add_node<S: Stage>(&mut self, stage: S) -> NodeId {
        self.add_boxed_node(Box::new(stage))
    }

    pub fn add_boxed_node(&mut self, stage: Box<dyn Stage>) -> NodeId {
        let id = self.staged.add_node(stage);
        // Ids from a discarded batch stay spent
        self.graph.topology.skip_ids(self.staged.next_id());
        id
    }

    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.staged.remove_node(id)
    }

    pub fn add_connection(&mut self, source: Port, destination: Port) -> Result<(), GraphError> {
        self.staged.add_connection(Connection::new(source, destination))
    }

    pub fn connect(&mut self, connection: Connection) -> Result<(), GraphError> {
        self.staged.add_connection(connection)
    }

    pub fn remove_connection(&mut self, source: Port, destination: Port) -> bool {
        self.staged.remove_connection(Connection::new(source, destination))
    }

    /// Remove every connection, keeping the nodes. Returns how many were removed.
    pub fn disconnect_all(&mut self) -> usize {
        self.staged.disconnect_all()
    }

    /// Connections of the staged topology, sorted.
    pub fn connections(&self) -> Vec<Connection> {
        self.staged.connections()
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.staged.contains_node(id)
    }

    /// Replace the graph's topology with the staged one and publish a single
    /// new render plan for it.
    pub fn commit(self) -> Result<(), GraphError> {
        self.graph.commit_topology(self.staged)
    }
}
