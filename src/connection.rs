//! Ports and connections.
//!
//! A [`Connection`] joins a `(node, channel)` pair to another one. Connections
//! store node ids rather than references, so removing a node can never leave a
//! dangling edge behind: the graph drops every connection naming it.

use core::fmt;

use crate::node::NodeId;

/// A channel on a node: an audio channel index or the dedicated event channel.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Channel {
    Audio(usize),
    Events,
}

impl Channel {
    #[inline]
    pub fn is_audio(self) -> bool {
        matches!(self, Channel::Audio(_))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Audio(index) => write!(f, "{}", index),
            Channel::Events => f.write_str("events"),
        }
    }
}

/// A connection endpoint.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Port {
    pub node: NodeId,
    pub channel: Channel,
}

impl Port {
    pub fn new(node: NodeId, channel: Channel) -> Self {
        Self { node, channel }
    }

    /// Audio channel `index` of `node`.
    pub fn audio(node: NodeId, index: usize) -> Self {
        Self::new(node, Channel::Audio(index))
    }

    /// The event channel of `node`.
    pub fn events(node: NodeId) -> Self {
        Self::new(node, Channel::Events)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.node, self.channel)
    }
}

/// A directed edge from one port to another.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Connection {
    pub source: Port,
    pub destination: Port,
}

impl Connection {
    pub fn new(source: Port, destination: Port) -> Self {
        Self { source, destination }
    }

    /// Audio edge between the same channel index on two nodes.
    pub fn audio(from: NodeId, to: NodeId, channel: usize) -> Self {
        Self::new(Port::audio(from, channel), Port::audio(to, channel))
    }

    /// Event edge between two nodes.
    pub fn events(from: NodeId, to: NodeId) -> Self {
        Self::new(Port::events(from), Port::events(to))
    }

    /// True if either endpoint is on `node`.
    #[inline]
    pub fn involves(&self, node: NodeId) -> bool {
        self.source.node == node || self.destination.node == node
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}
