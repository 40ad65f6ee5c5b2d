// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph document: the arena of nodes, ports and pipes of one scene.
//!
//! Every node of the scene lives in the same arena, including nodes nested in
//! another node's grid. Root nodes are the ones without a parent link. All
//! mutators keep port pipe lists, node adjacency sets and grid/parent links in
//! agreement, and validate before touching anything.

use crate::geometry::Rect;
use crate::grid::{Cell, Grid, GridPos, Leaf};
use crate::id::{DocumentId, NodeId, PipeId, PortId};
use crate::node::{Node, NodeVariant, ParentLink};
use crate::pipe::Pipe;
use crate::port::{Port, PortKind};
use crate::style::DocumentStyle;
use indexmap::IndexMap;

/// Node and document that own a nested document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentOwner {
    /// Document holding the owner node
    pub document: DocumentId,
    /// Attribute node owning the nested document
    pub node: NodeId,
}

/// Where a nested entry goes in its parent grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Exactly this cell, which must be a placeholder or out of bounds
    At(GridPos),
    /// First placeholder in row-major order, else the append slot
    FirstEmpty,
    /// Next append slot
    Append {
        /// Start a new row
        new_line: bool,
    },
}

/// Everything removed by a cascading delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovedSubtree {
    /// Removed nodes, the deleted node first
    pub nodes: Vec<NodeId>,
    /// Removed pipes
    pub pipes: Vec<PipeId>,
    /// Nested documents that must be dropped with the subtree
    pub documents: Vec<DocumentId>,
}

/// A node graph document
#[derive(Debug, Clone)]
pub struct GraphDocument {
    /// Document ID
    pub id: DocumentId,
    /// Label shown in the document tree
    pub label: String,
    /// Owner node, for nested documents
    pub owner: Option<DocumentOwner>,
    /// Document-level style overrides
    pub style: DocumentStyle,
    nodes: IndexMap<NodeId, Node>,
    ports: IndexMap<PortId, Port>,
    pipes: IndexMap<PipeId, Pipe>,
}

impl GraphDocument {
    /// Create a new empty document
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_id(DocumentId::new(), label)
    }

    /// Create an empty document with a known id
    pub fn with_id(id: DocumentId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            owner: None,
            style: DocumentStyle::default(),
            nodes: IndexMap::new(),
            ports: IndexMap::new(),
            pipes: IndexMap::new(),
        }
    }

    /// Add a root node of the given variant
    pub fn add_node(&mut self, variant: NodeVariant, position: [f32; 2]) -> NodeId {
        let (node, ports) = Node::new(variant, position);
        tracing::debug!("Added {:?} node {} to {}", variant, node.id, self.id);
        self.insert_node(node, ports)
    }

    /// Insert a node together with its ports, as-is
    pub(crate) fn insert_node(&mut self, node: Node, ports: Vec<Port>) -> NodeId {
        let id = node.id;
        for port in ports {
            self.ports.insert(port.id, port);
        }
        self.nodes.insert(id, node);
        id
    }

    /// Insert a pipe without touching ports or adjacency
    pub(crate) fn insert_pipe(&mut self, pipe: Pipe) -> PipeId {
        let id = pipe.id;
        self.pipes.insert(id, pipe);
        id
    }

    /// Move every entity of `other` into this document
    ///
    /// Ids of `other` must not clash with ours. Returns the root nodes it
    /// contributed, in creation order.
    pub fn absorb(&mut self, other: GraphDocument) -> Vec<NodeId> {
        let roots: Vec<NodeId> = other.root_nodes().map(|n| n.id).collect();
        self.nodes.extend(other.nodes);
        self.ports.extend(other.ports);
        self.pipes.extend(other.pipes);
        tracing::debug!("Absorbed {} root nodes from {} into {}", roots.len(), other.id, self.id);
        roots
    }

    /// Get a node by ID
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// All nodes in creation order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All node IDs in creation order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the node lives in this document
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Root-level nodes
    pub fn root_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.parent.is_none())
    }

    /// Creation index of a node, for tie-breaking
    pub fn creation_index(&self, id: NodeId) -> Option<usize> {
        self.nodes.get_index_of(&id)
    }

    /// Get a port by ID
    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(&id)
    }

    /// Get a mutable port by ID
    pub(crate) fn port_mut(&mut self, id: PortId) -> Option<&mut Port> {
        self.ports.get_mut(&id)
    }

    /// All ports
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    /// Get the number of ports
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// Get a pipe by ID
    pub fn pipe(&self, id: PipeId) -> Option<&Pipe> {
        self.pipes.get(&id)
    }

    /// Get a mutable pipe by ID
    pub fn pipe_mut(&mut self, id: PipeId) -> Option<&mut Pipe> {
        self.pipes.get_mut(&id)
    }

    /// All pipes
    pub fn pipes(&self) -> impl Iterator<Item = &Pipe> {
        self.pipes.values()
    }

    /// Get the number of pipes
    pub fn pipe_count(&self) -> usize {
        self.pipes.len()
    }

    /// Laid-out bounds of a node
    pub fn node_rect(&self, id: NodeId) -> Option<Rect> {
        self.nodes.get(&id).map(|n| Rect::from_pos_size(n.position, n.size))
    }

    /// Parent of a nested node
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent).map(|link| link.node)
    }

    /// Ancestors of a node, nearest first
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.parent_of(id);
        while let Some(parent) = current {
            if chain.contains(&parent) {
                tracing::warn!("Parent chain of {} loops at {}", id, parent);
                break;
            }
            chain.push(parent);
            current = self.parent_of(parent);
        }
        chain
    }

    /// Nesting depth, 0 for root nodes
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).len()
    }

    /// Whether `ancestor` is a strict ancestor of `node`
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).contains(&ancestor)
    }

    /// Descendants of a node in grid pre-order, excluding the node itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = self.grid_children(id);
        stack.reverse();
        while let Some(next) = stack.pop() {
            if out.contains(&next) || next == id {
                continue;
            }
            out.push(next);
            let mut children = self.grid_children(next);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    fn grid_children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&id)
            .and_then(Node::grid)
            .map(|g| g.children().collect())
            .unwrap_or_default()
    }

    fn grid(&self, id: NodeId) -> Option<&Grid> {
        self.nodes.get(&id).and_then(Node::grid)
    }

    fn resolve_placement(grid: &Grid, placement: Placement, moving: Option<NodeId>) -> Option<GridPos> {
        match placement {
            Placement::At(pos) => match grid.get(pos) {
                None | Some(Cell::Empty) => Some(pos),
                Some(Cell::Child(id)) if Some(*id) == moving => Some(pos),
                Some(Cell::Child(_) | Cell::Leaf(_)) => None,
            },
            Placement::FirstEmpty => Some(grid.first_empty().unwrap_or_else(|| grid.append_slot(false))),
            Placement::Append { new_line } => Some(grid.append_slot(new_line)),
        }
    }

    /// Nest `child` into the grid of `parent`, moving it out of its old cell
    pub fn nest(&mut self, child: NodeId, parent: NodeId, placement: Placement) -> Result<GridPos, NestError> {
        let child_node = self.nodes.get(&child).ok_or(NestError::NodeNotFound(child))?;
        if child_node.variant() != NodeVariant::Attribute {
            return Err(NestError::NotNestable(child));
        }
        let grid = self.grid(parent).ok_or(NestError::NotAnAttribute(parent))?;
        if child == parent || self.is_ancestor(child, parent) {
            return Err(NestError::CyclicNesting { child, parent });
        }
        if let Placement::At(cell) = placement {
            if Self::resolve_placement(grid, placement, Some(child)).is_none() {
                return Err(NestError::CellOccupied { parent, cell });
            }
        }

        self.unnest(child);
        let grid = self
            .nodes
            .get_mut(&parent)
            .and_then(Node::grid_mut)
            .ok_or(NestError::NotAnAttribute(parent))?;
        let pos = Self::resolve_placement(grid, placement, None).ok_or(NestError::CellOccupied {
            parent,
            cell: grid.append_slot(false),
        })?;
        match placement {
            Placement::Append { new_line } => {
                grid.append(Cell::Child(child), new_line);
            }
            Placement::At(_) | Placement::FirstEmpty => {
                grid.place(pos, Cell::Child(child));
            }
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(ParentLink { node: parent, cell: pos });
        }
        tracing::debug!("Nested {} into {} at {:?}", child, parent, pos);
        Ok(pos)
    }

    /// Move a nested node back to root, leaving a placeholder in its old cell
    pub fn unnest(&mut self, child: NodeId) -> Option<ParentLink> {
        let link = self.nodes.get_mut(&child)?.parent.take()?;
        if let Some(grid) = self.nodes.get_mut(&link.node).and_then(Node::grid_mut) {
            if grid.get(link.cell).and_then(Cell::child) == Some(child) {
                grid.take(link.cell);
            } else if let Some(pos) = grid.find_child(child) {
                tracing::warn!("Grid of {} held {} at {:?}, not {:?}", link.node, child, pos, link.cell);
                grid.take(pos);
            }
        }
        tracing::debug!("Unnested {} from {}", child, link.node);
        Some(link)
    }

    /// Put a leaf into a node's grid
    pub fn add_leaf(&mut self, node: NodeId, leaf: Leaf, placement: Placement) -> Result<GridPos, NestError> {
        let grid = self
            .nodes
            .get_mut(&node)
            .ok_or(NestError::NodeNotFound(node))?
            .grid_mut()
            .ok_or(NestError::NotAnAttribute(node))?;
        let pos = Self::resolve_placement(grid, placement, None).ok_or(match placement {
            Placement::At(cell) => NestError::CellOccupied { parent: node, cell },
            Placement::FirstEmpty | Placement::Append { .. } => NestError::NotAnAttribute(node),
        })?;
        match placement {
            Placement::Append { new_line } => {
                grid.append(Cell::Leaf(leaf), new_line);
            }
            Placement::At(_) | Placement::FirstEmpty => {
                grid.place(pos, Cell::Leaf(leaf));
            }
        }
        Ok(pos)
    }

    /// Take a leaf out of a grid, leaving a placeholder
    ///
    /// Cells holding a child node are removed through [`Self::delete_node`].
    pub fn remove_cell(&mut self, node: NodeId, cell: GridPos) -> Result<Leaf, NestError> {
        let grid = self
            .nodes
            .get_mut(&node)
            .ok_or(NestError::NodeNotFound(node))?
            .grid_mut()
            .ok_or(NestError::NotAnAttribute(node))?;
        match grid.get(cell) {
            Some(Cell::Leaf(_)) => {}
            Some(Cell::Child(child)) => return Err(NestError::CellHoldsNode(*child)),
            Some(Cell::Empty) | None => return Err(NestError::EmptyCell { parent: node, cell }),
        }
        match grid.take(cell) {
            Some(Cell::Leaf(leaf)) => Ok(leaf),
            Some(_) | None => Err(NestError::EmptyCell { parent: node, cell }),
        }
    }

    /// Delete a node with its ports, pipes and nested subtree
    pub fn delete_node(&mut self, id: NodeId) -> Option<RemovedSubtree> {
        if !self.nodes.contains_key(&id) {
            return None;
        }
        self.unnest(id);

        let mut doomed = vec![id];
        doomed.extend(self.descendants(id));
        let mut removed = RemovedSubtree::default();

        for node_id in &doomed {
            let Some(node) = self.nodes.get(node_id) else {
                continue;
            };
            removed.documents.extend(node.sub_document());
            if let Some(grid) = node.grid() {
                removed
                    .documents
                    .extend(grid.leaves().filter_map(|(_, leaf)| leaf.embedded_document()));
            }
            let pipes: Vec<PipeId> = node
                .port_ids()
                .iter()
                .filter_map(|p| self.ports.get(p))
                .flat_map(|p| p.pipes().iter().copied())
                .collect();
            for pipe in pipes {
                if self.remove_pipe(pipe).is_some() {
                    removed.pipes.push(pipe);
                }
            }
        }

        for node_id in &doomed {
            if let Some(node) = self.nodes.shift_remove(node_id) {
                for port in node.port_ids() {
                    self.ports.shift_remove(&port);
                }
                removed.nodes.push(*node_id);
            }
        }
        for node in self.nodes.values_mut() {
            for gone in &doomed {
                node.adjacency.forget(*gone);
            }
        }

        tracing::debug!(
            "Deleted {} ({} nodes, {} pipes, {} documents)",
            id,
            removed.nodes.len(),
            removed.pipes.len(),
            removed.documents.len()
        );
        Some(removed)
    }

    /// Whether two ports could be joined by a new pipe
    pub fn endpoints_compatible(&self, a: PortId, b: PortId) -> bool {
        match (self.ports.get(&a), self.ports.get(&b)) {
            (Some(a), Some(b)) => a.can_connect(b),
            _ => false,
        }
    }

    /// Validate that ports `a` and `b` may be joined
    fn check_pair(&self, a: PortId, b: PortId) -> Result<(), ConnectError> {
        let a = self.ports.get(&a).ok_or(ConnectError::PortNotFound(a))?;
        let b = self.ports.get(&b).ok_or(ConnectError::PortNotFound(b))?;
        if a.kind == b.kind {
            return Err(ConnectError::IncompatiblePortKinds(a.id, b.id));
        }
        if a.node == b.node {
            return Err(ConnectError::SelfLoop(a.node));
        }
        if a.shares_pipe_with(b) {
            return Err(ConnectError::DuplicatePipe(a.id, b.id));
        }
        Ok(())
    }

    /// Start a dragging pipe at a port
    pub fn begin_pipe(&mut self, port: PortId) -> Result<PipeId, ConnectError> {
        let anchor = self.ports.get_mut(&port).ok_or(ConnectError::PortNotFound(port))?;
        let pipe = Pipe::dragging_from(port);
        let id = pipe.id;
        anchor.add_pipe(id);
        self.pipes.insert(id, pipe);
        tracing::debug!("Began {} at {}", id, port);
        Ok(id)
    }

    /// Connect the free end of a dragging pipe to a port
    pub fn connect(&mut self, pipe_id: PipeId, port_id: PortId) -> Result<(), ConnectError> {
        let pipe = self.pipes.get(&pipe_id).ok_or(ConnectError::PipeNotFound(pipe_id))?;
        let anchor = pipe.anchor().ok_or(ConnectError::PipeComplete(pipe_id))?;
        self.check_pair(anchor, port_id)?;

        if let Some(pipe) = self.pipes.get_mut(&pipe_id) {
            pipe.attach(port_id);
        }
        if let Some(port) = self.ports.get_mut(&port_id) {
            port.add_pipe(pipe_id);
        }
        self.link(anchor, port_id);
        tracing::debug!("Connected {} from {} to {}", pipe_id, anchor, port_id);
        Ok(())
    }

    /// Release one end of a pipe
    ///
    /// A complete pipe drops back into dragging state. A dragging pipe losing
    /// its only end is removed.
    pub fn disconnect(&mut self, pipe_id: PipeId, port_id: PortId) -> Result<(), ConnectError> {
        let pipe = self.pipes.get(&pipe_id).ok_or(ConnectError::PipeNotFound(pipe_id))?;
        if !pipe.involves_port(port_id) {
            return Err(ConnectError::PortNotOnPipe(pipe_id, port_id));
        }
        if let (Some(start), Some(end)) = (pipe.start_port, pipe.end_port) {
            self.unlink(start, end, pipe_id);
        }
        let now_empty = match self.pipes.get_mut(&pipe_id) {
            Some(pipe) => {
                pipe.detach(port_id);
                pipe.start_port.is_none() && pipe.end_port.is_none()
            }
            None => false,
        };
        if let Some(port) = self.ports.get_mut(&port_id) {
            port.remove_pipe(pipe_id);
        }
        if now_empty {
            self.pipes.shift_remove(&pipe_id);
        }
        tracing::debug!("Disconnected {} from {}", pipe_id, port_id);
        Ok(())
    }

    /// Pick up one end of a complete pipe, returning the port it stays anchored at
    pub fn detach_pipe_end(&mut self, pipe_id: PipeId, port_id: PortId) -> Result<PortId, ConnectError> {
        let pipe = self.pipes.get(&pipe_id).ok_or(ConnectError::PipeNotFound(pipe_id))?;
        if !pipe.is_connected() {
            return Err(ConnectError::NotConnected(pipe_id));
        }
        let anchor = pipe
            .other_end(port_id)
            .ok_or(ConnectError::PortNotOnPipe(pipe_id, port_id))?;
        self.disconnect(pipe_id, port_id)?;
        Ok(anchor)
    }

    /// Drop a dragging pipe and its port reference
    pub fn abort_pipe(&mut self, pipe_id: PipeId) -> Result<(), ConnectError> {
        let pipe = self.pipes.get(&pipe_id).ok_or(ConnectError::PipeNotFound(pipe_id))?;
        if !pipe.is_dragging() {
            return Err(ConnectError::PipeComplete(pipe_id));
        }
        self.remove_pipe(pipe_id);
        tracing::debug!("Aborted {}", pipe_id);
        Ok(())
    }

    /// Remove a pipe in any state
    pub fn remove_pipe(&mut self, pipe_id: PipeId) -> Option<Pipe> {
        let pipe = self.pipes.get(&pipe_id)?;
        if let (Some(start), Some(end)) = (pipe.start_port, pipe.end_port) {
            self.unlink(start, end, pipe_id);
        }
        let pipe = self.pipes.shift_remove(&pipe_id)?;
        for port in pipe.ends() {
            if let Some(port) = self.ports.get_mut(&port) {
                port.remove_pipe(pipe_id);
            }
        }
        Some(pipe)
    }

    /// Splice a node into a complete pipe
    ///
    /// The pipe `A.out -> B.in` becomes `A.out -> node.in` and a new pipe
    /// `node.out -> B.in` is created. The node's ports are taken from the
    /// channel of `B.in`, or the true channel if the node has no such port.
    pub fn splice(&mut self, node_id: NodeId, pipe_id: PipeId) -> Result<PipeId, ConnectError> {
        let pipe = self.pipes.get(&pipe_id).ok_or(ConnectError::PipeNotFound(pipe_id))?;
        let (out_port, in_port) = match (pipe.start_port, pipe.end_port) {
            (Some(start), Some(end)) => self
                .oriented(start, end)
                .ok_or(ConnectError::IncompatiblePortKinds(start, end))?,
            _ => return Err(ConnectError::NotConnected(pipe_id)),
        };
        let channel = self
            .ports
            .get(&in_port)
            .ok_or(ConnectError::PortNotFound(in_port))?
            .channel;
        let node = self.nodes.get(&node_id).ok_or(ConnectError::NodeNotFound(node_id))?;
        let node_in = node
            .port_or_true(PortKind::Input, channel)
            .ok_or(ConnectError::NodeNotFound(node_id))?;
        let node_out = node
            .port_or_true(PortKind::Output, channel)
            .ok_or(ConnectError::NodeNotFound(node_id))?;
        self.check_pair(out_port, node_in)?;
        self.check_pair(node_out, in_port)?;

        self.unlink(out_port, in_port, pipe_id);
        if let Some(pipe) = self.pipes.get_mut(&pipe_id) {
            pipe.rewire(in_port, node_in);
        }
        if let Some(port) = self.ports.get_mut(&in_port) {
            port.remove_pipe(pipe_id);
        }
        if let Some(port) = self.ports.get_mut(&node_in) {
            port.add_pipe(pipe_id);
        }
        self.link(out_port, node_in);

        let new_pipe = Pipe::between(node_out, in_port);
        let new_id = new_pipe.id;
        self.pipes.insert(new_id, new_pipe);
        for port in [node_out, in_port] {
            if let Some(port) = self.ports.get_mut(&port) {
                port.add_pipe(new_id);
            }
        }
        self.link(node_out, in_port);
        tracing::debug!("Spliced {} into {}, new pipe {}", node_id, pipe_id, new_id);
        Ok(new_id)
    }

    /// Order two ports as (output, input)
    fn oriented(&self, a: PortId, b: PortId) -> Option<(PortId, PortId)> {
        let kind_a = self.ports.get(&a)?.kind;
        let kind_b = self.ports.get(&b)?.kind;
        match (kind_a, kind_b) {
            (PortKind::Output, PortKind::Input) => Some((a, b)),
            (PortKind::Input, PortKind::Output) => Some((b, a)),
            (PortKind::Input, PortKind::Input) | (PortKind::Output, PortKind::Output) => None,
        }
    }

    /// Output-side and input-side node of a complete pipe
    pub fn pipe_nodes(&self, pipe_id: PipeId) -> Option<(NodeId, NodeId)> {
        let pipe = self.pipes.get(&pipe_id)?;
        let (out_port, in_port) = self.oriented(pipe.start_port?, pipe.end_port?)?;
        Some((self.ports.get(&out_port)?.node, self.ports.get(&in_port)?.node))
    }

    fn link(&mut self, a: PortId, b: PortId) {
        let Some((out_node, in_node)) = self.sides(a, b) else {
            return;
        };
        let (Some(out_variant), Some(in_variant)) = (self.variant(out_node), self.variant(in_node)) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&out_node) {
            node.adjacency.add_next(in_variant, in_node);
        }
        if let Some(node) = self.nodes.get_mut(&in_node) {
            node.adjacency.add_last(out_variant, out_node);
        }
    }

    /// Undo the adjacency of one pipe, unless another pipe still joins the nodes
    fn unlink(&mut self, a: PortId, b: PortId, pipe_id: PipeId) {
        let Some((out_node, in_node)) = self.sides(a, b) else {
            return;
        };
        let still_linked = self
            .pipes
            .keys()
            .filter(|id| **id != pipe_id)
            .any(|id| self.pipe_nodes(*id) == Some((out_node, in_node)));
        if still_linked {
            return;
        }
        let (Some(out_variant), Some(in_variant)) = (self.variant(out_node), self.variant(in_node)) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&out_node) {
            node.adjacency.remove_next(in_variant, in_node);
        }
        if let Some(node) = self.nodes.get_mut(&in_node) {
            node.adjacency.remove_last(out_variant, out_node);
        }
    }

    fn sides(&self, a: PortId, b: PortId) -> Option<(NodeId, NodeId)> {
        let (out_port, in_port) = self.oriented(a, b)?;
        Some((self.ports.get(&out_port)?.node, self.ports.get(&in_port)?.node))
    }

    fn variant(&self, id: NodeId) -> Option<NodeVariant> {
        self.nodes.get(&id).map(Node::variant)
    }
}

/// Error when connecting or rewiring pipes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(PortId),

    /// Pipe not found
    #[error("Pipe not found: {0}")]
    PipeNotFound(PipeId),

    /// Both ports have the same kind
    #[error("Incompatible port kinds: {0} and {1}")]
    IncompatiblePortKinds(PortId, PortId),

    /// The ports already share a pipe
    #[error("Ports {0} and {1} are already connected")]
    DuplicatePipe(PortId, PortId),

    /// Both ends on the same node
    #[error("Self-loop not allowed on {0}")]
    SelfLoop(NodeId),

    /// The pipe has no free end
    #[error("Pipe {0} is already complete")]
    PipeComplete(PipeId),

    /// The pipe is not fully connected
    #[error("Pipe {0} is not connected")]
    NotConnected(PipeId),

    /// The port is not an end of the pipe
    #[error("Port {1} is not an end of {0}")]
    PortNotOnPipe(PipeId, PortId),
}

/// Error when nesting nodes or editing grids
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NestError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Only attribute nodes have grids
    #[error("Node {0} has no grid")]
    NotAnAttribute(NodeId),

    /// Only attribute nodes can be nested
    #[error("Node {0} cannot be nested")]
    NotNestable(NodeId),

    /// The parent is the child or one of its descendants
    #[error("Cannot nest {child} into its own descendant {parent}")]
    CyclicNesting {
        /// Node being nested
        child: NodeId,
        /// Requested parent
        parent: NodeId,
    },

    /// The requested cell is taken
    #[error("Cell {cell:?} of {parent} is occupied")]
    CellOccupied {
        /// Parent node
        parent: NodeId,
        /// Requested cell
        cell: GridPos,
    },

    /// The cell holds a child node
    #[error("Cell holds node {0}")]
    CellHoldsNode(NodeId),

    /// The cell holds nothing
    #[error("Cell {cell:?} of {parent} is empty")]
    EmptyCell {
        /// Parent node
        parent: NodeId,
        /// Requested cell
        cell: GridPos,
    },
}
