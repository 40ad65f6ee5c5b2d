// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pipe (edge) definitions for the graph.

use crate::id::{PipeId, PortId};
use crate::style::PipeStyle;
use serde::{Deserialize, Serialize};

/// A pipe between two ports
///
/// While the user is dragging a new pipe only one end is set. Such a pipe is
/// in dragging state and is never written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipe {
    /// Unique pipe ID
    pub id: PipeId,
    /// Port the pipe was started from
    pub start_port: Option<PortId>,
    /// Port the pipe ends at
    pub end_port: Option<PortId>,
    /// Free-floating label text
    pub label: String,
    /// Offset of the control point near the start port
    pub start_offset: [f32; 2],
    /// Offset of the control point near the end port
    pub end_offset: [f32; 2],
    /// Local style overrides
    pub style: PipeStyle,
}

impl Pipe {
    /// Create a dragging pipe anchored at a port
    pub fn dragging_from(port: PortId) -> Self {
        Self::with_id(PipeId::new(), Some(port), None)
    }

    /// Create a fully connected pipe
    pub fn between(start: PortId, end: PortId) -> Self {
        Self::with_id(PipeId::new(), Some(start), Some(end))
    }

    /// Create a pipe with a known id
    pub fn with_id(id: PipeId, start_port: Option<PortId>, end_port: Option<PortId>) -> Self {
        Self {
            id,
            start_port,
            end_port,
            label: String::new(),
            start_offset: [0.0, 0.0],
            end_offset: [0.0, 0.0],
            style: PipeStyle::default(),
        }
    }

    /// Whether both ends are connected
    pub fn is_connected(&self) -> bool {
        self.start_port.is_some() && self.end_port.is_some()
    }

    /// Whether only one end is connected
    pub fn is_dragging(&self) -> bool {
        self.start_port.is_some() != self.end_port.is_some()
    }

    /// Check if this pipe involves a specific port
    pub fn involves_port(&self, port: PortId) -> bool {
        self.start_port == Some(port) || self.end_port == Some(port)
    }

    /// The single connected end of a dragging pipe
    pub fn anchor(&self) -> Option<PortId> {
        match (self.start_port, self.end_port) {
            (Some(p), None) | (None, Some(p)) => Some(p),
            _ => None,
        }
    }

    /// The end opposite to `port`
    pub fn other_end(&self, port: PortId) -> Option<PortId> {
        if self.start_port == Some(port) {
            self.end_port
        } else if self.end_port == Some(port) {
            self.start_port
        } else {
            None
        }
    }

    /// Both ends, start first
    pub fn ends(&self) -> impl Iterator<Item = PortId> + '_ {
        self.start_port.into_iter().chain(self.end_port)
    }

    /// Fill the free end with `port`, returning false if both ends are taken
    pub(crate) fn attach(&mut self, port: PortId) -> bool {
        if self.start_port.is_none() {
            self.start_port = Some(port);
            true
        } else if self.end_port.is_none() {
            self.end_port = Some(port);
            true
        } else {
            false
        }
    }

    /// Clear whichever end references `port`
    pub(crate) fn detach(&mut self, port: PortId) -> bool {
        if self.start_port == Some(port) {
            self.start_port = None;
            true
        } else if self.end_port == Some(port) {
            self.end_port = None;
            true
        } else {
            false
        }
    }

    /// Replace the end referencing `old` with `new`
    pub(crate) fn rewire(&mut self, old: PortId, new: PortId) -> bool {
        if self.start_port == Some(old) {
            self.start_port = Some(new);
            true
        } else if self.end_port == Some(old) {
            self.end_port = Some(new);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dragging_state() {
        let a = PortId::new();
        let b = PortId::new();
        let mut pipe = Pipe::dragging_from(a);
        assert!(pipe.is_dragging());
        assert_eq!(pipe.anchor(), Some(a));

        assert!(pipe.attach(b));
        assert!(pipe.is_connected());
        assert!(!pipe.attach(PortId::new()));
        assert_eq!(pipe.other_end(a), Some(b));

        assert!(pipe.detach(a));
        assert!(pipe.is_dragging());
        assert_eq!(pipe.anchor(), Some(b));
    }

    #[test]
    fn test_rewire() {
        let a = PortId::new();
        let b = PortId::new();
        let c = PortId::new();
        let mut pipe = Pipe::between(a, b);
        assert!(pipe.rewire(b, c));
        assert!(pipe.involves_port(c));
        assert!(!pipe.involves_port(b));
        assert!(!pipe.rewire(b, a));
    }
}
