//! Audio graph - owns topology and publishes render plans

use std::sync::Arc;

use hashbrown::HashMap;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use tracing::{debug, info, instrument, trace, warn};

use crate::connection::{Channel, Connection, Port};
use crate::editor::TopologyEditor;
use crate::error::{ConnectionFault, GraphError};
use crate::layout::BusLayout;
use crate::node::{Node, NodeId, ProcessContext, Stage, StageRole};
use crate::plan::{self, PlanPublisher, RenderPlan, DEFAULT_PLAN_QUEUE_CAPACITY};
use crate::render::Renderer;

type InnerGraph = StableGraph<Arc<Node>, Connection>;

/// Node and connection sets of a graph.
///
/// Cheap to clone (nodes are shared), which is what lets a
/// [`TopologyEditor`] stage a whole batch on a copy and swap it in at the end.
#[derive(Clone)]
pub(crate) struct Topology {
    graph: InnerGraph,
    node_indices: HashMap<NodeId, NodeIndex>,
    next_node_id: u32,
    channels: usize,
    ctx: Option<ProcessContext>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl Topology {
    fn new(channels: usize) -> Self {
        Self {
            graph: InnerGraph::with_capacity(16, 32),
            node_indices: HashMap::new(),
            next_node_id: 0,
            channels,
            ctx: None,
        }
    }

    pub(crate) fn add_node(&mut self, mut stage: Box<dyn Stage>) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;

        // A node joining a prepared graph must never render unprepared
        if let Some(ctx) = &self.ctx {
            stage.prepare(ctx);
        }

        let node = Node::new(id, stage, self.channels);
        debug!(node = %id, name = node.name(), "added node");

        let idx = self.graph.add_node(Arc::new(node));
        self.node_indices.insert(id, idx);
        id
    }

    pub(crate) fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        let idx = self.node_indices.remove(&id).ok_or(GraphError::UnknownNode(id))?;

        let cascaded = self.graph.edges_directed(idx, Direction::Incoming).count()
            + self.graph.edges_directed(idx, Direction::Outgoing).count();

        // petgraph drops every edge touching the node along with it
        self.graph.remove_node(idx);
        debug!(node = %id, cascaded, "removed node");
        Ok(())
    }

    pub(crate) fn add_connection(&mut self, connection: Connection) -> Result<(), GraphError> {
        let (from, to) = self.validate(connection)?;
        let edge = self.graph.add_edge(from, to, connection);

        if self.render_order().is_err() {
            self.graph.remove_edge(edge);
            return Err(GraphError::CyclicGraph(connection));
        }

        debug!(%connection, "connected");
        Ok(())
    }

    pub(crate) fn remove_connection(&mut self, connection: Connection) -> bool {
        let Some(&from) = self.node_indices.get(&connection.source.node) else {
            return false;
        };

        let edge = self
            .graph
            .edges_directed(from, Direction::Outgoing)
            .find(|e| *e.weight() == connection)
            .map(|e| e.id());

        match edge {
            Some(edge) => {
                self.graph.remove_edge(edge);
                debug!(%connection, "disconnected");
                true
            }
            None => false,
        }
    }

    pub(crate) fn disconnect_all(&mut self) -> usize {
        let edges: Vec<_> = self.graph.edge_references().map(|e| e.id()).collect();
        for &edge in &edges {
            self.graph.remove_edge(edge);
        }
        debug!(removed = edges.len(), "disconnected everything");
        edges.len()
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&Arc<Node>> {
        self.node_indices.get(&id).map(|&idx| &self.graph[idx])
    }

    pub(crate) fn contains_node(&self, id: NodeId) -> bool {
        self.node_indices.contains_key(&id)
    }

    pub(crate) fn node_count(&self) -> usize {
        self.node_indices.len()
    }

    pub(crate) fn connection_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Every connection, sorted.
    pub(crate) fn connections(&self) -> Vec<Connection> {
        let mut connections: Vec<_> = self.graph.edge_references().map(|e| *e.weight()).collect();
        connections.sort_unstable();
        connections
    }

    /// Connections arriving at `id`, sorted.
    pub(crate) fn incoming(&self, id: NodeId) -> Vec<Connection> {
        let Some(&idx) = self.node_indices.get(&id) else {
            return Vec::new();
        };

        let mut connections: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| *e.weight())
            .collect();
        connections.sort_unstable();
        connections
    }

    pub(crate) fn next_id(&self) -> u32 {
        self.next_node_id
    }

    /// Never hand out ids below `next` again.
    pub(crate) fn skip_ids(&mut self, next: u32) {
        self.next_node_id = self.next_node_id.max(next);
    }

    pub(crate) fn context(&self) -> Option<ProcessContext> {
        self.ctx
    }

    /// Topological order by depth-first search with three-colour marking.
    ///
    /// Input sentinels are used as roots first, then every other node; roots and
    /// successors are both taken in id order, so identical topologies always
    /// produce identical orders. Meeting a node that is still in progress means
    /// the edge just followed closes a cycle.
    pub(crate) fn render_order(&self) -> Result<Vec<NodeId>, GraphError> {
        let mut ids: Vec<NodeId> = self.node_indices.keys().copied().collect();
        ids.sort_unstable();

        let position: HashMap<NodeId, usize> =
            ids.iter().enumerate().map(|(pos, &id)| (id, pos)).collect();

        let successors: Vec<Vec<usize>> = ids
            .iter()
            .map(|id| {
                let idx = self.node_indices[id];
                let mut next: Vec<usize> = self
                    .graph
                    .edges_directed(idx, Direction::Outgoing)
                    .map(|e| position[&e.weight().destination.node])
                    .collect();
                next.sort_unstable();
                next.dedup();
                next
            })
            .collect();

        let is_input = |pos: &usize| self.graph[self.node_indices[&ids[*pos]]].role().is_input();
        let roots: Vec<usize> = (0..ids.len())
            .filter(is_input)
            .chain((0..ids.len()).filter(|pos| !is_input(pos)))
            .collect();

        let mut marks = vec![Mark::Unvisited; ids.len()];
        let mut postorder = Vec::with_capacity(ids.len());
        let mut stack: Vec<(usize, usize)> = Vec::new();

        // Walking roots and successors backwards makes the reversed postorder
        // list them forwards.
        for &root in roots.iter().rev() {
            if marks[root] != Mark::Unvisited {
                continue;
            }

            marks[root] = Mark::InProgress;
            stack.push((root, 0));

            while let Some((node, cursor)) = stack.last_mut() {
                let node = *node;
                let next = &successors[node];

                if *cursor < next.len() {
                    let succ = next[next.len() - 1 - *cursor];
                    *cursor += 1;

                    match marks[succ] {
                        Mark::Unvisited => {
                            marks[succ] = Mark::InProgress;
                            stack.push((succ, 0));
                        }
                        Mark::InProgress => {
                            return Err(GraphError::CyclicGraph(self.back_edge(ids[node], ids[succ])));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[node] = Mark::Done;
                    postorder.push(ids[node]);
                    stack.pop();
                }
            }
        }

        postorder.reverse();
        Ok(postorder)
    }

    fn back_edge(&self, from: NodeId, to: NodeId) -> Connection {
        self.node_indices
            .get(&from)
            .and_then(|&idx| {
                self.graph
                    .edges_directed(idx, Direction::Outgoing)
                    .map(|e| *e.weight())
                    .find(|c| c.destination.node == to)
            })
            .unwrap_or_else(|| Connection::events(from, to))
    }

    fn validate(&self, connection: Connection) -> Result<(NodeIndex, NodeIndex), GraphError> {
        let fault = |reason| GraphError::invalid(connection, reason);
        let Connection { source, destination } = connection;

        let from = *self
            .node_indices
            .get(&source.node)
            .ok_or_else(|| fault(ConnectionFault::MissingEndpoint(source.node)))?;
        let to = *self
            .node_indices
            .get(&destination.node)
            .ok_or_else(|| fault(ConnectionFault::MissingEndpoint(destination.node)))?;

        match (source.channel, destination.channel) {
            (Channel::Audio(a), Channel::Audio(b)) => {
                for channel in [a, b] {
                    if channel >= self.channels {
                        return Err(fault(ConnectionFault::ChannelOutOfRange {
                            channel,
                            channels: self.channels,
                        }));
                    }
                }
            }
            (Channel::Events, Channel::Events) => {}
            _ => return Err(fault(ConnectionFault::KindMismatch)),
        }

        if let Some(reason) = port_fault(self.graph[from].role(), source, false)
            .or_else(|| port_fault(self.graph[to].role(), destination, true))
        {
            return Err(fault(reason));
        }

        for existing in self.graph.edges_directed(to, Direction::Incoming) {
            let existing = existing.weight();
            if *existing == connection {
                return Err(fault(ConnectionFault::Duplicate));
            }
            if destination.channel.is_audio() && existing.destination.channel == destination.channel {
                return Err(fault(ConnectionFault::FanIn));
            }
        }

        Ok((from, to))
    }
}

/// Sentinels only carry their own kind of data, in their own direction.
fn port_fault(role: StageRole, port: Port, as_destination: bool) -> Option<ConnectionFault> {
    let audio = port.channel.is_audio();
    match role {
        StageRole::Processor => None,
        StageRole::AudioInput | StageRole::MidiInput if as_destination => {
            Some(ConnectionFault::WrongDirection)
        }
        StageRole::AudioOutput | StageRole::MidiOutput if !as_destination => {
            Some(ConnectionFault::WrongDirection)
        }
        StageRole::AudioInput | StageRole::AudioOutput if !audio => Some(ConnectionFault::KindMismatch),
        StageRole::MidiInput | StageRole::MidiOutput if audio => Some(ConnectionFault::KindMismatch),
        _ => None,
    }
}

/// The control half of a runtime-mutable processing graph.
///
/// `ProcessGraph` owns the topology: nodes, connections, and the render sequence
/// derived from them. Every mutation is validated here, on the control thread.
/// The audio thread only ever sees complete render plan snapshots, handed to
/// its [`Renderer`] through a lock-free queue by
/// [`rebuild_render_sequence`](Self::rebuild_render_sequence).
///
/// # Building a graph
///
/// ```
/// use slotgraph::nodes::{Gain, GraphIo, Oscillator};
/// use slotgraph::{BusLayout, Connection, ProcessGraph};
///
/// let (mut graph, mut renderer) = ProcessGraph::new(BusLayout::stereo()).unwrap();
///
/// let input = graph.add_node(GraphIo::AudioInput);
/// let output = graph.add_node(GraphIo::AudioOutput);
/// let osc = graph.add_node(Oscillator::new());
/// let gain = graph.add_node(Gain::new());
///
/// for channel in 0..2 {
///     graph.connect(Connection::audio(input, osc, channel)).unwrap();
///     graph.connect(Connection::audio(osc, gain, channel)).unwrap();
///     graph.connect(Connection::audio(gain, output, channel)).unwrap();
/// }
///
/// graph.prepare(44100.0, 512).unwrap();
///
/// let mut left = vec![0.0f32; 512];
/// let mut right = vec![0.0f32; 512];
/// let mut events = slotgraph::MidiBuffer::new();
/// renderer.render(&mut [&mut left[..], &mut right[..]], &mut events).unwrap();
/// ```
///
/// # Deferred destruction
///
/// Removing a node only drops the graph's own reference. Plans the renderer may
/// still be using keep the node alive; they come back through the retire queue
/// and are dropped by [`collect_garbage`](Self::collect_garbage), so no stage is
/// ever freed on the audio thread.
pub struct ProcessGraph {
    pub(crate) topology: Topology,
    layout: BusLayout,
    sequence: Vec<NodeId>,
    version: u64,
    publisher: PlanPublisher,
}

impl ProcessGraph {
    /// Create a graph for the given host layout, and the renderer that plays it.
    pub fn new(layout: BusLayout) -> Result<(Self, Renderer), GraphError> {
        Self::with_queue_capacity(layout, DEFAULT_PLAN_QUEUE_CAPACITY)
    }

    /// Create a graph whose plan queues hold `capacity` plans (at least 2).
    pub fn with_queue_capacity(layout: BusLayout, capacity: usize) -> Result<(Self, Renderer), GraphError> {
        if !layout.is_supported() {
            return Err(GraphError::UnsupportedLayout(layout));
        }

        let (publisher, renderer) = plan::queue(capacity.max(2), RenderPlan::empty());
        let graph = Self {
            topology: Topology::new(layout.channels()),
            layout,
            sequence: Vec::new(),
            version: 0,
            publisher,
        };

        Ok((graph, renderer))
    }

    /// Add a stage, returning the id of its node.
    ///
    /// Not rendered until the next [`rebuild_render_sequence`](Self::rebuild_render_sequence).
    pub fn add_node<S: Stage>(&mut self, stage: S) -> NodeId {
        self.add_boxed_node(Box::new(stage))
    }

    pub fn add_boxed_node(&mut self, stage: Box<dyn Stage>) -> NodeId {
        self.topology.add_node(stage)
    }

    /// Remove a node and every connection that references it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.topology.remove_node(id)
    }

    /// Connect `source` to `destination`.
    ///
    /// Fails with [`GraphError::InvalidConnection`] for a missing endpoint, a bad
    /// channel, or a destination audio channel that already has a source, and
    /// with [`GraphError::CyclicGraph`] if the edge would close a loop. On failure
    /// nothing changes.
    pub fn add_connection(&mut self, source: Port, destination: Port) -> Result<(), GraphError> {
        self.topology.add_connection(Connection::new(source, destination))
    }

    /// Shorthand for [`add_connection`](Self::add_connection) with a prebuilt [`Connection`].
    pub fn connect(&mut self, connection: Connection) -> Result<(), GraphError> {
        self.topology.add_connection(connection)
    }

    /// Remove a connection. Returns `false` if it did not exist.
    pub fn remove_connection(&mut self, source: Port, destination: Port) -> bool {
        self.topology.remove_connection(Connection::new(source, destination))
    }

    /// Recompute the render sequence and publish it to the renderer.
    ///
    /// The renderer picks the new plan up at the start of its next block and
    /// sees either the old plan or the new one, never a mix.
    #[instrument(skip(self))]
    pub fn rebuild_render_sequence(&mut self) -> Result<&[NodeId], GraphError> {
        let order = self.topology.render_order()?;
        self.publish(order);
        Ok(&self.sequence)
    }

    /// Prepare every stage for `sample_rate` and `max_block_size`, then publish
    /// the current topology as renderable.
    ///
    /// Fails with [`GraphError::InvalidFormat`] for a sample rate that is not
    /// finite and positive, or a zero block size. The host must not be
    /// rendering while this runs.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<(), GraphError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) || max_block_size == 0 {
            return Err(GraphError::InvalidFormat);
        }

        self.collect_garbage();

        let order = self.topology.render_order()?;
        let ctx = ProcessContext::new(sample_rate, max_block_size, self.layout.channels());

        for &id in &order {
            let Some(node) = self.topology.node(id) else { continue };
            let mut state = node.state.try_borrow_mut().map_err(|_| GraphError::Busy(id))?;
            state.stage.prepare(&ctx);
        }

        info!(sample_rate, max_block_size, nodes = order.len(), "prepared graph");
        self.topology.ctx = Some(ctx);
        self.publish(order);
        Ok(())
    }

    /// Reset every stage and stop rendering until the next [`prepare`](Self::prepare).
    pub fn release(&mut self) -> Result<(), GraphError> {
        self.collect_garbage();

        let order = self.topology.render_order()?;
        for &id in &order {
            let Some(node) = self.topology.node(id) else { continue };
            let mut state = node.state.try_borrow_mut().map_err(|_| GraphError::Busy(id))?;
            state.stage.reset();
        }

        info!("released graph");
        self.topology.ctx = None;
        self.publish(order);
        Ok(())
    }

    /// Start an all-or-nothing batch of mutations.
    pub fn begin_edit(&mut self) -> TopologyEditor<'_> {
        TopologyEditor::new(self)
    }

    /// Run `f` as one batch: committed if it returns `Ok`, discarded otherwise.
    pub fn edit<T, F>(&mut self, f: F) -> Result<T, GraphError>
    where
        F: FnOnce(&mut TopologyEditor<'_>) -> Result<T, GraphError>,
    {
        let mut editor = self.begin_edit();
        match f(&mut editor) {
            Ok(value) => {
                editor.commit()?;
                Ok(value)
            }
            Err(error) => {
                warn!(%error, "discarded topology batch");
                Err(error)
            }
        }
    }

    /// Skip (or resume) processing of a node from the next block on.
    ///
    /// Never touches topology or the render sequence.
    pub fn set_bypassed(&self, id: NodeId, bypassed: bool) -> Result<(), GraphError> {
        let node = self.topology.node(id).ok_or(GraphError::UnknownNode(id))?;
        node.set_bypassed(bypassed);
        Ok(())
    }

    pub fn is_bypassed(&self, id: NodeId) -> Option<bool> {
        self.topology.node(id).map(|node| node.is_bypassed())
    }

    /// Drop plans the renderer has finished with. Returns how many were reclaimed.
    pub fn collect_garbage(&mut self) -> usize {
        let reclaimed = self.publisher.reclaim();
        if reclaimed > 0 {
            trace!(reclaimed, "reclaimed retired plans");
        }
        reclaimed
    }

    /// The most recently published render sequence.
    pub fn render_sequence(&self) -> &[NodeId] {
        &self.sequence
    }

    /// Every connection in the current topology, sorted.
    pub fn connections(&self) -> Vec<Connection> {
        self.topology.connections()
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.topology.contains_node(id)
    }

    pub fn node_name(&self, id: NodeId) -> Option<&'static str> {
        self.topology.node(id).map(|node| node.name())
    }

    pub fn node_count(&self) -> usize {
        self.topology.node_count()
    }

    pub fn connection_count(&self) -> usize {
        self.topology.connection_count()
    }

    pub fn layout(&self) -> BusLayout {
        self.layout
    }

    /// The context stages were last prepared with, if the graph is prepared.
    pub fn context(&self) -> Option<ProcessContext> {
        self.topology.context()
    }

    /// Number of plans published so far.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn commit_topology(&mut self, topology: Topology) -> Result<(), GraphError> {
        let order = topology.render_order()?;
        self.topology = topology;
        self.publish(order);
        Ok(())
    }

    fn publish(&mut self, order: Vec<NodeId>) {
        self.version += 1;
        let plan = RenderPlan::build(&self.topology, &order, self.version);
        info!(
            version = self.version,
            nodes = order.len(),
            connections = self.topology.connection_count(),
            prepared = plan.is_prepared(),
            "published render plan"
        );

        self.sequence = order;
        self.publisher.publish(plan);
    }
}
