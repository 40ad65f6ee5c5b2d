// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph.
//!
//! A node is either an attribute node (rich content, nestable, four ports) or
//! a logic node (boolean operator, two ports). Both keep the `next_*` /
//! `last_*` adjacency sets that mirror pipe connectivity.

use crate::grid::{Grid, GridPos};
use crate::id::{DocumentId, NodeId, PortId};
use crate::port::{Channel, Port, PortKind};
use crate::style::NodeStyle;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Default size of a freshly created attribute node
pub const ATTRIBUTE_SIZE: [f32; 2] = [150.0, 70.0];

/// Default size of a freshly created logic node
pub const LOGIC_SIZE: [f32; 2] = [120.0, 40.0];

/// Node variant without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeVariant {
    /// Attribute node
    Attribute,
    /// Logic node
    Logic,
}

/// Boolean operator of a logic node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogicOp {
    /// Logical and
    #[default]
    And,
    /// Logical or
    Or,
    /// Logical not
    Not,
}

/// The four ports of an attribute node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributePorts {
    /// True branch input
    pub true_input: PortId,
    /// True branch output
    pub true_output: PortId,
    /// False branch input
    pub false_input: PortId,
    /// False branch output
    pub false_output: PortId,
}

/// The two ports of a logic node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicPorts {
    /// Input port
    pub input: PortId,
    /// Output port
    pub output: PortId,
}

/// Attribute-node payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeData {
    /// Port ids
    pub ports: AttributePorts,
    /// Child grid
    pub grid: Grid,
    /// Owned nested document
    pub sub_document: Option<DocumentId>,
}

/// Logic-node payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicData {
    /// Port ids
    pub ports: LogicPorts,
    /// Operator applied to incoming values
    pub input_op: LogicOp,
    /// Operator applied to outgoing values
    pub output_op: LogicOp,
}

/// Variant payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Attribute node
    Attribute(AttributeData),
    /// Logic node
    Logic(LogicData),
}

/// Link from a nested node to its parent cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    /// Parent attribute node
    pub node: NodeId,
    /// Cell in the parent grid
    pub cell: GridPos,
}

/// Next/last adjacency sets, split by neighbour variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Adjacency {
    /// Attribute nodes downstream
    pub next_attribute: IndexSet<NodeId>,
    /// Attribute nodes upstream
    pub last_attribute: IndexSet<NodeId>,
    /// Logic nodes downstream
    pub next_logic: IndexSet<NodeId>,
    /// Logic nodes upstream
    pub last_logic: IndexSet<NodeId>,
}

impl Adjacency {
    fn next_set(&mut self, variant: NodeVariant) -> &mut IndexSet<NodeId> {
        match variant {
            NodeVariant::Attribute => &mut self.next_attribute,
            NodeVariant::Logic => &mut self.next_logic,
        }
    }

    fn last_set(&mut self, variant: NodeVariant) -> &mut IndexSet<NodeId> {
        match variant {
            NodeVariant::Attribute => &mut self.last_attribute,
            NodeVariant::Logic => &mut self.last_logic,
        }
    }

    /// Record a downstream neighbour
    pub fn add_next(&mut self, variant: NodeVariant, node: NodeId) {
        self.next_set(variant).insert(node);
    }

    /// Record an upstream neighbour
    pub fn add_last(&mut self, variant: NodeVariant, node: NodeId) {
        self.last_set(variant).insert(node);
    }

    /// Forget a downstream neighbour
    pub fn remove_next(&mut self, variant: NodeVariant, node: NodeId) -> bool {
        self.next_set(variant).shift_remove(&node)
    }

    /// Forget an upstream neighbour
    pub fn remove_last(&mut self, variant: NodeVariant, node: NodeId) -> bool {
        self.last_set(variant).shift_remove(&node)
    }

    /// Whether `node` is downstream
    pub fn has_next(&self, node: NodeId) -> bool {
        self.next_attribute.contains(&node) || self.next_logic.contains(&node)
    }

    /// Whether `node` is upstream
    pub fn has_last(&self, node: NodeId) -> bool {
        self.last_attribute.contains(&node) || self.last_logic.contains(&node)
    }

    /// Drop `node` from every set
    pub fn forget(&mut self, node: NodeId) {
        self.next_attribute.shift_remove(&node);
        self.last_attribute.shift_remove(&node);
        self.next_logic.shift_remove(&node);
        self.last_logic.shift_remove(&node);
    }

    /// Every neighbour in every set
    pub fn neighbours(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.next_attribute
            .iter()
            .chain(&self.last_attribute)
            .chain(&self.next_logic)
            .chain(&self.last_logic)
            .copied()
    }

    /// Whether all sets are empty
    pub fn is_empty(&self) -> bool {
        self.next_attribute.is_empty()
            && self.last_attribute.is_empty()
            && self.next_logic.is_empty()
            && self.last_logic.is_empty()
    }
}

/// A node instance in a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Position of the top-left corner in document space
    pub position: [f32; 2],
    /// Laid-out size
    pub size: [f32; 2],
    /// Display text
    pub text: String,
    /// Local style overrides
    pub style: NodeStyle,
    /// Parent cell, for nested nodes
    pub parent: Option<ParentLink>,
    /// Adjacency mirroring pipe connectivity
    pub adjacency: Adjacency,
    /// Variant payload
    pub kind: NodeKind,
}

impl Node {
    /// Create a node of the given variant together with its ports
    pub fn new(variant: NodeVariant, position: [f32; 2]) -> (Self, Vec<Port>) {
        let id = NodeId::new();
        match variant {
            NodeVariant::Attribute => {
                let true_input = Port::new(id, PortKind::Input, Channel::True);
                let true_output = Port::new(id, PortKind::Output, Channel::True);
                let false_input = Port::new(id, PortKind::Input, Channel::False);
                let false_output = Port::new(id, PortKind::Output, Channel::False);
                let ports = AttributePorts {
                    true_input: true_input.id,
                    true_output: true_output.id,
                    false_input: false_input.id,
                    false_output: false_output.id,
                };
                let node = Self::with_kind(
                    id,
                    NodeKind::Attribute(AttributeData {
                        ports,
                        grid: Grid::new(),
                        sub_document: None,
                    }),
                    position,
                    ATTRIBUTE_SIZE,
                );
                (node, vec![true_input, true_output, false_input, false_output])
            }
            NodeVariant::Logic => {
                let input = Port::new(id, PortKind::Input, Channel::True);
                let output = Port::new(id, PortKind::Output, Channel::True);
                let node = Self::with_kind(
                    id,
                    NodeKind::Logic(LogicData {
                        ports: LogicPorts {
                            input: input.id,
                            output: output.id,
                        },
                        input_op: LogicOp::default(),
                        output_op: LogicOp::default(),
                    }),
                    position,
                    LOGIC_SIZE,
                );
                (node, vec![input, output])
            }
        }
    }

    /// Create a node from an already built payload
    pub fn with_kind(id: NodeId, kind: NodeKind, position: [f32; 2], size: [f32; 2]) -> Self {
        Self {
            id,
            position,
            size,
            text: String::new(),
            style: NodeStyle::default(),
            parent: None,
            adjacency: Adjacency::default(),
            kind,
        }
    }

    /// Set the display text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Variant of this node
    pub fn variant(&self) -> NodeVariant {
        match self.kind {
            NodeKind::Attribute(_) => NodeVariant::Attribute,
            NodeKind::Logic(_) => NodeVariant::Logic,
        }
    }

    /// Attribute payload
    pub fn attribute(&self) -> Option<&AttributeData> {
        match &self.kind {
            NodeKind::Attribute(data) => Some(data),
            NodeKind::Logic(_) => None,
        }
    }

    /// Mutable attribute payload
    pub fn attribute_mut(&mut self) -> Option<&mut AttributeData> {
        match &mut self.kind {
            NodeKind::Attribute(data) => Some(data),
            NodeKind::Logic(_) => None,
        }
    }

    /// Logic payload
    pub fn logic(&self) -> Option<&LogicData> {
        match &self.kind {
            NodeKind::Logic(data) => Some(data),
            NodeKind::Attribute(_) => None,
        }
    }

    /// Child grid, for attribute nodes
    pub fn grid(&self) -> Option<&Grid> {
        self.attribute().map(|a| &a.grid)
    }

    /// Mutable child grid, for attribute nodes
    pub fn grid_mut(&mut self) -> Option<&mut Grid> {
        self.attribute_mut().map(|a| &mut a.grid)
    }

    /// Owned nested document
    pub fn sub_document(&self) -> Option<DocumentId> {
        self.attribute().and_then(|a| a.sub_document)
    }

    /// All port ids, inputs before outputs
    pub fn port_ids(&self) -> Vec<PortId> {
        match &self.kind {
            NodeKind::Attribute(a) => vec![
                a.ports.true_input,
                a.ports.false_input,
                a.ports.true_output,
                a.ports.false_output,
            ],
            NodeKind::Logic(l) => vec![l.ports.input, l.ports.output],
        }
    }

    /// Port for a kind and channel
    ///
    /// Logic nodes only have the true channel.
    pub fn port(&self, kind: PortKind, channel: Channel) -> Option<PortId> {
        match (&self.kind, kind, channel) {
            (NodeKind::Attribute(a), PortKind::Input, Channel::True) => Some(a.ports.true_input),
            (NodeKind::Attribute(a), PortKind::Output, Channel::True) => Some(a.ports.true_output),
            (NodeKind::Attribute(a), PortKind::Input, Channel::False) => Some(a.ports.false_input),
            (NodeKind::Attribute(a), PortKind::Output, Channel::False) => Some(a.ports.false_output),
            (NodeKind::Logic(l), PortKind::Input, Channel::True) => Some(l.ports.input),
            (NodeKind::Logic(l), PortKind::Output, Channel::True) => Some(l.ports.output),
            (NodeKind::Logic(_), _, Channel::False) => None,
        }
    }

    /// Port for a kind and channel, falling back to the true channel
    pub fn port_or_true(&self, kind: PortKind, channel: Channel) -> Option<PortId> {
        self.port(kind, channel).or_else(|| self.port(kind, Channel::True))
    }

    /// Whether the port belongs to this node
    pub fn owns_port(&self, port: PortId) -> bool {
        self.port_ids().contains(&port)
    }
}
