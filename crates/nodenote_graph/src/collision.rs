// SPDX-License-Identifier: MIT OR Apache-2.0
//! Drag-and-drop classification and reparenting.
//!
//! While a node is dragged, [`classify`] ranks everything its bounds overlap
//! and picks one [`DropTarget`]. On release [`finish`] applies that target and
//! reports a [`ReparentOutcome`]. Ranking, highest first:
//!
//! 1. another attribute node (deepest, then latest created)
//! 2. a complete pipe not touching the dragged subtree
//! 3. an empty placeholder cell
//! 4. only the node's own ancestors (no-op)
//! 5. nothing (detach or move at root)

use crate::document::{GraphDocument, NestError, Placement};
use crate::geometry::Rect;
use crate::grid::GridPos;
use crate::id::{NodeId, PipeId};
use crate::layout::{self, LayoutConfig};
use crate::node::{NodeVariant, ParentLink};
use serde::{Deserialize, Serialize};

/// State of an in-progress node drag
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    /// Dragged node
    pub node: NodeId,
    /// Position when the drag started
    pub origin: [f32; 2],
    /// Parent cell when the drag started
    pub start_parent: Option<ParentLink>,
    /// Append on a new grid row when nesting at the cursor
    pub new_line: bool,
}

impl DragSession {
    /// Start dragging a node
    pub fn begin(doc: &GraphDocument, node: NodeId) -> Option<Self> {
        let n = doc.node(node)?;
        Some(Self {
            node,
            origin: n.position,
            start_parent: n.parent,
            new_line: false,
        })
    }

    /// Move the dragged node
    pub fn update(&self, doc: &mut GraphDocument, position: [f32; 2]) {
        if let Some(node) = doc.node_mut(self.node) {
            node.position = position;
        }
    }

    /// Put the node back where it started
    pub fn cancel(&self, doc: &mut GraphDocument) {
        self.update(doc, self.origin);
    }
}

/// What a drop would do
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DropTarget {
    /// Nest into another attribute node
    Node(NodeId),
    /// Splice into a pipe
    Pipe(PipeId),
    /// Fill an empty placeholder cell
    Placeholder {
        /// Grid owner
        parent: NodeId,
        /// Placeholder cell
        cell: GridPos,
    },
    /// Only the current ancestors are under the node
    Ancestor(NodeId),
    /// Nothing under the node
    None,
}

/// Result of a drop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReparentOutcome {
    /// Nested as a child of the node
    NestedInto(NodeId),
    /// Moved into a specific placeholder
    PlacedAt {
        /// Grid owner
        parent: NodeId,
        /// Row of the cell
        row: usize,
        /// Column of the cell
        column: usize,
    },
    /// Inserted into a pipe
    Spliced {
        /// The original pipe, now ending at the dragged node
        pipe: PipeId,
        /// The new pipe from the dragged node to the old far end
        new_pipe: PipeId,
    },
    /// Taken out of its parent to the root level
    Detached {
        /// Drop position
        position: [f32; 2],
    },
    /// Moved at the root level
    Moved {
        /// Drop position
        position: [f32; 2],
    },
    /// Nothing changed
    Unchanged,
}

/// Dragged node plus its descendants
fn subtree(doc: &GraphDocument, node: NodeId) -> Vec<NodeId> {
    let mut nodes = vec![node];
    nodes.extend(doc.descendants(node));
    nodes
}

fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.overlap_area(b) > 0.0
}

/// Best placeholder under `dragged` inside `parent`
fn overlapped_placeholder(
    doc: &GraphDocument,
    parent: NodeId,
    dragged: &Rect,
    config: &LayoutConfig,
) -> Option<(GridPos, f32)> {
    layout::placeholder_rects(doc, parent, config)
        .into_iter()
        .map(|(pos, rect)| (pos, rect.overlap_area(dragged)))
        .filter(|(_, area)| *area > 0.0)
        .fold(None, |best: Option<(GridPos, f32)>, candidate| match best {
            Some(b) if b.1 >= candidate.1 => Some(b),
            _ => Some(candidate),
        })
}

/// Rank everything under the dragged node and pick a target
pub fn classify(doc: &GraphDocument, session: &DragSession, config: &LayoutConfig) -> DropTarget {
    let Some(dragged) = doc.node_rect(session.node) else {
        return DropTarget::None;
    };
    let nestable = doc
        .node(session.node)
        .is_some_and(|n| n.variant() == NodeVariant::Attribute);
    let excluded = subtree(doc, session.node);
    let ancestors = doc.ancestors(session.node);

    if nestable {
        let target = doc
            .nodes()
            .filter(|n| n.variant() == NodeVariant::Attribute)
            .filter(|n| !excluded.contains(&n.id) && !ancestors.contains(&n.id))
            .filter(|n| overlaps(&dragged, &Rect::from_pos_size(n.position, n.size)))
            .map(|n| (doc.depth(n.id), doc.creation_index(n.id).unwrap_or(0), n.id))
            .max();
        if let Some((_, _, target)) = target {
            return DropTarget::Node(target);
        }
    }

    let pipe = doc
        .pipes()
        .filter(|p| p.is_connected())
        .filter(|p| {
            p.ends().all(|port| {
                doc.port(port).is_some_and(|port| !excluded.contains(&port.node))
            })
        })
        .filter(|p| layout::pipe_bounds(doc, p.id, config).is_some_and(|b| overlaps(&dragged, &b)))
        .last();
    if let Some(pipe) = pipe {
        return DropTarget::Pipe(pipe.id);
    }

    if nestable {
        let placeholder = doc
            .nodes()
            .filter(|n| n.variant() == NodeVariant::Attribute && !excluded.contains(&n.id))
            .filter_map(|n| {
                overlapped_placeholder(doc, n.id, &dragged, config).map(|(cell, area)| (n.id, cell, area))
            })
            .fold(None, |best: Option<(NodeId, GridPos, f32)>, candidate| match best {
                Some(b) if b.2 >= candidate.2 => Some(b),
                _ => Some(candidate),
            });
        if let Some((parent, cell, _)) = placeholder {
            return DropTarget::Placeholder { parent, cell };
        }
    }

    let ancestor = ancestors
        .iter()
        .copied()
        .find(|a| doc.node_rect(*a).is_some_and(|r| overlaps(&dragged, &r)));
    match ancestor {
        Some(a) => DropTarget::Ancestor(a),
        None => DropTarget::None,
    }
}

fn rejected(doc: &mut GraphDocument, session: &DragSession, reason: &dyn std::fmt::Display) -> ReparentOutcome {
    tracing::debug!("Drop of {} rejected: {}", session.node, reason);
    session.cancel(doc);
    ReparentOutcome::Unchanged
}

/// Apply a drop target
pub fn apply(
    doc: &mut GraphDocument,
    session: &DragSession,
    target: DropTarget,
    config: &LayoutConfig,
) -> ReparentOutcome {
    let Some(dragged) = doc.node_rect(session.node) else {
        return ReparentOutcome::Unchanged;
    };
    match target {
        DropTarget::Node(parent) => {
            let placement = match overlapped_placeholder(doc, parent, &dragged, config) {
                Some((cell, _)) => Placement::At(cell),
                None => match doc.node(parent).and_then(|n| n.grid()).and_then(|g| g.first_empty()) {
                    Some(cell) => Placement::At(cell),
                    None => Placement::Append {
                        new_line: session.new_line,
                    },
                },
            };
            match doc.nest(session.node, parent, placement) {
                Ok(_) => ReparentOutcome::NestedInto(parent),
                Err(err @ NestError::CyclicNesting { .. }) => rejected(doc, session, &err),
                Err(err) => {
                    tracing::warn!("Nesting {} into {} failed: {}", session.node, parent, err);
                    rejected(doc, session, &err)
                }
            }
        }
        DropTarget::Placeholder { parent, cell } => match doc.nest(session.node, parent, Placement::At(cell)) {
            Ok(pos) => ReparentOutcome::PlacedAt {
                parent,
                row: pos.row,
                column: pos.column,
            },
            Err(err) => rejected(doc, session, &err),
        },
        DropTarget::Pipe(pipe) => match doc.splice(session.node, pipe) {
            Ok(new_pipe) => {
                doc.unnest(session.node);
                ReparentOutcome::Spliced { pipe, new_pipe }
            }
            Err(err) => rejected(doc, session, &err),
        },
        DropTarget::Ancestor(_) => {
            session.cancel(doc);
            ReparentOutcome::Unchanged
        }
        DropTarget::None => {
            let position = dragged.min;
            if doc.unnest(session.node).is_some() {
                ReparentOutcome::Detached { position }
            } else if position != session.origin {
                ReparentOutcome::Moved { position }
            } else {
                ReparentOutcome::Unchanged
            }
        }
    }
}

/// Classify and apply the drop of a session
pub fn finish(doc: &mut GraphDocument, session: &DragSession, config: &LayoutConfig) -> ReparentOutcome {
    let target = classify(doc, session, config);
    let outcome = apply(doc, session, target, config);
    tracing::debug!("Dropped {} on {:?}: {:?}", session.node, target, outcome);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, Leaf};
    use crate::layout::relayout;
    use crate::port::{Channel, PortKind};

    fn setup() -> (GraphDocument, LayoutConfig) {
        (GraphDocument::new("root"), LayoutConfig::default())
    }

    fn drag_to(doc: &mut GraphDocument, config: &LayoutConfig, node: NodeId, to: [f32; 2]) -> ReparentOutcome {
        let session = DragSession::begin(doc, node).unwrap();
        session.update(doc, to);
        let outcome = finish(doc, &session, config);
        relayout(doc, config);
        outcome
    }

    #[test]
    fn test_drop_on_node_nests_into_placeholder() {
        let (mut doc, config) = setup();
        let a = doc.add_node(NodeVariant::Attribute, [0.0, 0.0]);
        let c = doc.add_node(NodeVariant::Attribute, [600.0, 600.0]);
        doc.add_leaf(a, Leaf::todo("t"), Placement::At(GridPos::new(0, 1))).unwrap();
        relayout(&mut doc, &config);
        let hole = layout::placeholder_rects(&doc, a, &config)[0];
        assert_eq!(hole.0, GridPos::new(0, 0));

        let outcome = drag_to(&mut doc, &config, c, hole.1.min);
        assert_eq!(outcome, ReparentOutcome::NestedInto(a));
        let grid = doc.node(a).unwrap().grid().unwrap();
        assert_eq!(grid.get(GridPos::new(0, 0)), Some(&Cell::Child(c)));
        assert!(doc.root_nodes().all(|n| n.id != c));
    }

    #[test]
    fn test_drop_prefers_deepest_node() {
        let (mut doc, config) = setup();
        let outer = doc.add_node(NodeVariant::Attribute, [0.0, 0.0]);
        let inner = doc.add_node(NodeVariant::Attribute, [0.0, 0.0]);
        let dragged = doc.add_node(NodeVariant::Attribute, [900.0, 900.0]);
        doc.nest(inner, outer, Placement::Append { new_line: false }).unwrap();
        relayout(&mut doc, &config);
        let inner_pos = doc.node(inner).unwrap().position;

        let outcome = drag_to(&mut doc, &config, dragged, [inner_pos[0] + 5.0, inner_pos[1] + 5.0]);
        assert_eq!(outcome, ReparentOutcome::NestedInto(inner));
        assert_eq!(doc.parent_of(dragged), Some(inner));
    }

    #[test]
    fn test_drop_onto_own_descendant_is_excluded() {
        let (mut doc, config) = setup();
        let parent = doc.add_node(NodeVariant::Attribute, [0.0, 0.0]);
        let child = doc.add_node(NodeVariant::Attribute, [0.0, 0.0]);
        doc.nest(child, parent, Placement::FirstEmpty).unwrap();
        relayout(&mut doc, &config);

        let outcome = drag_to(&mut doc, &config, parent, [20.0, 20.0]);
        assert_eq!(outcome, ReparentOutcome::Moved { position: [20.0, 20.0] });
        assert_eq!(doc.parent_of(child), Some(parent));
        assert!(doc.node(parent).unwrap().parent.is_none());
    }

    #[test]
    fn test_drop_inside_own_parent_is_noop() {
        let (mut doc, config) = setup();
        let parent = doc.add_node(NodeVariant::Attribute, [0.0, 0.0]);
        let child = doc.add_node(NodeVariant::Attribute, [0.0, 0.0]);
        doc.nest(child, parent, Placement::FirstEmpty).unwrap();
        relayout(&mut doc, &config);
        let before = doc.node(child).unwrap().position;

        let outcome = drag_to(&mut doc, &config, child, [before[0] + 4.0, before[1] + 4.0]);
        assert_eq!(outcome, ReparentOutcome::Unchanged);
        assert_eq!(doc.parent_of(child), Some(parent));
        assert_eq!(doc.node(child).unwrap().position, before);
    }

    #[test]
    fn test_drop_on_empty_space_detaches() {
        let (mut doc, config) = setup();
        let parent = doc.add_node(NodeVariant::Attribute, [0.0, 0.0]);
        let child = doc.add_node(NodeVariant::Attribute, [0.0, 0.0]);
        doc.nest(child, parent, Placement::FirstEmpty).unwrap();
        relayout(&mut doc, &config);

        let outcome = drag_to(&mut doc, &config, child, [1000.0, 1000.0]);
        assert_eq!(outcome, ReparentOutcome::Detached { position: [1000.0, 1000.0] });
        assert!(doc.node(child).unwrap().parent.is_none());
        let grid = doc.node(parent).unwrap().grid().unwrap();
        assert_eq!(grid.get(GridPos::new(0, 0)), Some(&Cell::Empty));
    }

    #[test]
    fn test_drop_on_pipe_splices() {
        let (mut doc, config) = setup();
        let a = doc.add_node(NodeVariant::Attribute, [0.0, 0.0]);
        let b = doc.add_node(NodeVariant::Attribute, [800.0, 0.0]);
        let d = doc.add_node(NodeVariant::Logic, [0.0, 600.0]);
        relayout(&mut doc, &config);
        let out = doc.node(a).unwrap().port(PortKind::Output, Channel::True).unwrap();
        let input = doc.node(b).unwrap().port(PortKind::Input, Channel::True).unwrap();
        let pipe = doc.begin_pipe(out).unwrap();
        doc.connect(pipe, input).unwrap();

        let y = layout::port_position(&doc, out, &config).unwrap()[1];
        let outcome = drag_to(&mut doc, &config, d, [400.0, y - 10.0]);
        let ReparentOutcome::Spliced { pipe: spliced, new_pipe } = outcome else {
            panic!("expected splice, got {outcome:?}");
        };
        assert_eq!(spliced, pipe);
        assert_eq!(doc.pipe_nodes(pipe), Some((a, d)));
        assert_eq!(doc.pipe_nodes(new_pipe), Some((d, b)));
    }

    #[test]
    fn test_node_target_beats_pipe_target() {
        let (mut doc, config) = setup();
        let a = doc.add_node(NodeVariant::Attribute, [0.0, 0.0]);
        let b = doc.add_node(NodeVariant::Attribute, [400.0, 0.0]);
        let dragged = doc.add_node(NodeVariant::Attribute, [0.0, 600.0]);
        relayout(&mut doc, &config);
        let out = doc.node(a).unwrap().port(PortKind::Output, Channel::True).unwrap();
        let input = doc.node(b).unwrap().port(PortKind::Input, Channel::True).unwrap();
        let pipe = doc.begin_pipe(out).unwrap();
        doc.connect(pipe, input).unwrap();

        let session = DragSession::begin(&doc, dragged).unwrap();
        session.update(&mut doc, [100.0, 5.0]);
        assert_eq!(classify(&doc, &session, &config), DropTarget::Node(a));
        session.cancel(&mut doc);
        assert_eq!(doc.node(dragged).unwrap().position, [0.0, 600.0]);
    }
}
