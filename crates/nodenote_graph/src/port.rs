// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use crate::id::{NodeId, PipeId, PortId};
use crate::style::PortStyle;
use serde::{Deserialize, Serialize};

/// Port kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    /// Input port
    Input,
    /// Output port
    Output,
}

impl PortKind {
    /// The kind a compatible partner port must have
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// Boolean branch a port belongs to
///
/// Attribute nodes carry one input/output pair per channel, logic nodes only
/// use [`Channel::True`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// The "true" branch
    True,
    /// The "false" branch
    False,
}

/// A port on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Unique port ID
    pub id: PortId,
    /// Port kind
    pub kind: PortKind,
    /// Branch channel
    pub channel: Channel,
    /// Owning node
    pub node: NodeId,
    /// Pipes attached to this port, in attachment order
    pipes: Vec<PipeId>,
    /// Local style overrides
    pub style: PortStyle,
}

impl Port {
    /// Create a new port with a fresh id
    pub fn new(node: NodeId, kind: PortKind, channel: Channel) -> Self {
        Self::with_id(PortId::new(), node, kind, channel)
    }

    /// Create a port with a known id
    pub fn with_id(id: PortId, node: NodeId, kind: PortKind, channel: Channel) -> Self {
        Self {
            id,
            kind,
            channel,
            node,
            pipes: Vec::new(),
            style: PortStyle::default(),
        }
    }

    /// Pipes attached to this port
    pub fn pipes(&self) -> &[PipeId] {
        &self.pipes
    }

    /// Whether the pipe is attached to this port
    pub fn has_pipe(&self, pipe: PipeId) -> bool {
        self.pipes.contains(&pipe)
    }

    /// Attach a pipe (idempotent)
    pub(crate) fn add_pipe(&mut self, pipe: PipeId) {
        if !self.has_pipe(pipe) {
            self.pipes.push(pipe);
        }
    }

    /// Detach a pipe, returning whether it was attached
    pub(crate) fn remove_pipe(&mut self, pipe: PipeId) -> bool {
        let before = self.pipes.len();
        self.pipes.retain(|p| *p != pipe);
        before != self.pipes.len()
    }

    /// Whether both ports already hold a common pipe
    pub fn shares_pipe_with(&self, other: &Port) -> bool {
        self.pipes.iter().any(|p| other.has_pipe(*p))
    }

    /// Check if a connection to another port is valid
    ///
    /// Kinds must differ and the ports must not already share a pipe.
    pub fn can_connect(&self, other: &Port) -> bool {
        self.kind != other.kind && !self.shares_pipe_with(other)
    }
}
