//! Error types for graph operations.

use thiserror::Error;

use crate::connection::Connection;
use crate::layout::BusLayout;
use crate::node::NodeId;

/// Why a connection was refused.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum ConnectionFault {
    /// One of the endpoints names a node that is not in the graph
    #[error("endpoint {0} is not in the graph")]
    MissingEndpoint(NodeId),

    /// Audio channel index beyond the node's channel count
    #[error("channel {channel} is out of range for {channels} channels")]
    ChannelOutOfRange {
        /// Offending channel index.
        channel: usize,
        /// Channels carried by the node.
        channels: usize,
    },

    /// Audio port joined to an event port (or vice versa)
    #[error("cannot join an audio port to an event port")]
    KindMismatch,

    /// Into a graph input, or out of a graph output
    #[error("sentinel port used in the wrong direction")]
    WrongDirection,

    /// The exact same edge already exists
    #[error("connection already exists")]
    Duplicate,

    /// The destination audio channel already has a source
    #[error("destination channel already has a source")]
    FanIn,
}

/// Errors raised by control-path graph operations.
///
/// The render path never returns these except [`GraphError::NotPrepared`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum GraphError {
    /// A mutation referenced a node id that is not in the graph
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// The connection cannot be added
    #[error("invalid connection {connection}: {reason}")]
    InvalidConnection {
        /// The refused connection.
        connection: Connection,
        /// Why it was refused.
        reason: ConnectionFault,
    },

    /// Adding the connection would close a cycle
    #[error("connection {0} would create a cycle")]
    CyclicGraph(Connection),

    /// Rendering was requested before `prepare`
    #[error("graph has not been prepared")]
    NotPrepared,

    /// A node's state was in use by the renderer during `prepare`/`release`
    #[error("node {0} is in use by the renderer")]
    Busy(NodeId),

    /// `prepare` was given a sample rate or block size no stage can run at
    #[error("cannot prepare for this stream format (sample rate must be finite and positive, block size non-zero)")]
    InvalidFormat,

    /// The host bus layout cannot be driven by the graph
    #[error("unsupported bus layout {0}")]
    UnsupportedLayout(BusLayout),
}

impl GraphError {
    pub(crate) fn invalid(connection: Connection, reason: ConnectionFault) -> Self {
        GraphError::InvalidConnection { connection, reason }
    }
}

/// Errors raised by the parameter store.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum ParamError {
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),

    #[error("slot {slot} is out of range for {slots} slots")]
    SlotOutOfRange {
        slot: usize,
        slots: usize,
    },
}
