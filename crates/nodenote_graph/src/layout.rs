// SPDX-License-Identifier: MIT OR Apache-2.0
//! Grid layout of nested nodes and pipe geometry.
//!
//! Root nodes keep the position they were given. Everything nested is placed
//! by its parent's grid: a column is as wide as its widest cell, a row as high
//! as its tallest cell. Layout is a pure function of the document, so a
//! document laid out twice gets identical positions and sizes.

use crate::document::GraphDocument;
use crate::geometry::{sample_cubic, Rect};
use crate::grid::{Cell, FileDisplay, Grid, GridPos, LeafContent};
use crate::id::{NodeId, PipeId, PortId};
use crate::node::{Node, NodeVariant, ATTRIBUTE_SIZE, LOGIC_SIZE};
use crate::port::{Channel, PortKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Layout metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Height of the title strip above the grid
    pub header_height: f32,
    /// Horizontal room reserved for the port columns on each side
    pub port_margin: f32,
    /// Gap between grid cells
    pub cell_spacing: f32,
    /// Size of an empty placeholder cell
    pub placeholder_size: [f32; 2],
    /// Size of a todo leaf
    pub todo_size: [f32; 2],
    /// Size of a file leaf
    pub file_size: [f32; 2],
    /// Size of an image leaf
    pub image_size: [f32; 2],
    /// Size of an embedded document view
    pub embedded_size: [f32; 2],
    /// Minimum attribute node size
    pub attribute_min_size: [f32; 2],
    /// Logic node size
    pub logic_size: [f32; 2],
    /// Line segments used to approximate a pipe curve
    pub curve_segments: usize,
    /// Padding added to a pipe curve's bounding box for hit testing
    pub pipe_hit_width: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            header_height: 24.0,
            port_margin: 12.0,
            cell_spacing: 10.0,
            placeholder_size: [60.0, 30.0],
            todo_size: [160.0, 28.0],
            file_size: [120.0, 28.0],
            image_size: [100.0, 100.0],
            embedded_size: [300.0, 200.0],
            attribute_min_size: ATTRIBUTE_SIZE,
            logic_size: LOGIC_SIZE,
            curve_segments: 16,
            pipe_hit_width: 8.0,
        }
    }
}

/// Column widths and row heights of one grid
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridMetrics {
    /// Width of each column
    pub columns: Vec<f32>,
    /// Height of each row
    pub rows: Vec<f32>,
    spacing: f32,
}

impl GridMetrics {
    /// Measure a grid given the size of each child node
    pub fn measure(grid: &Grid, config: &LayoutConfig, child_size: impl Fn(NodeId) -> [f32; 2]) -> Self {
        let mut columns = vec![0.0_f32; grid.columns()];
        let mut rows = vec![0.0_f32; grid.rows()];
        for (pos, cell) in grid.cells() {
            let size = match cell {
                Cell::Child(id) => child_size(*id),
                Cell::Leaf(leaf) => leaf_size(&leaf.content, config),
                Cell::Empty => config.placeholder_size,
            };
            columns[pos.column] = columns[pos.column].max(size[0]);
            rows[pos.row] = rows[pos.row].max(size[1]);
        }
        Self {
            columns,
            rows,
            spacing: config.cell_spacing,
        }
    }

    /// Total content size
    pub fn content_size(&self) -> [f32; 2] {
        let gaps = |n: usize| n.saturating_sub(1) as f32;
        [
            self.columns.iter().sum::<f32>() + self.spacing * gaps(self.columns.len()),
            self.rows.iter().sum::<f32>() + self.spacing * gaps(self.rows.len()),
        ]
    }

    /// Offset of a cell from the grid origin
    pub fn cell_offset(&self, pos: GridPos) -> [f32; 2] {
        let x: f32 = self.columns.iter().take(pos.column).sum::<f32>() + self.spacing * pos.column as f32;
        let y: f32 = self.rows.iter().take(pos.row).sum::<f32>() + self.spacing * pos.row as f32;
        [x, y]
    }

    /// Size of a cell slot
    pub fn cell_size(&self, pos: GridPos) -> [f32; 2] {
        [
            self.columns.get(pos.column).copied().unwrap_or(0.0),
            self.rows.get(pos.row).copied().unwrap_or(0.0),
        ]
    }
}

fn leaf_size(content: &LeafContent, config: &LayoutConfig) -> [f32; 2] {
    match content {
        LeafContent::File {
            display: FileDisplay::Image,
            ..
        } => config.image_size,
        LeafContent::File {
            display: FileDisplay::File,
            ..
        } => config.file_size,
        LeafContent::Todo { .. } => config.todo_size,
        LeafContent::Embedded { .. } => config.embedded_size,
    }
}

/// Top-left corner of the grid inside a node
fn grid_origin(node: &Node, config: &LayoutConfig) -> [f32; 2] {
    [
        node.position[0] + config.port_margin,
        node.position[1] + config.header_height,
    ]
}

fn node_size(metrics: Option<&GridMetrics>, variant: NodeVariant, config: &LayoutConfig) -> [f32; 2] {
    match (variant, metrics) {
        (NodeVariant::Logic, _) => config.logic_size,
        (NodeVariant::Attribute, None) => config.attribute_min_size,
        (NodeVariant::Attribute, Some(m)) if m.columns.is_empty() => config.attribute_min_size,
        (NodeVariant::Attribute, Some(m)) => {
            let content = m.content_size();
            [
                config.attribute_min_size[0].max(content[0] + 2.0 * config.port_margin),
                config.attribute_min_size[1].max(content[1] + config.header_height + config.cell_spacing),
            ]
        }
    }
}

fn measure(
    doc: &GraphDocument,
    id: NodeId,
    config: &LayoutConfig,
    sizes: &mut HashMap<NodeId, [f32; 2]>,
    path: &mut Vec<NodeId>,
) -> [f32; 2] {
    if let Some(size) = sizes.get(&id) {
        return *size;
    }
    let Some(node) = doc.node(id) else {
        return config.placeholder_size;
    };
    if path.contains(&id) {
        tracing::warn!("Grid cycle through {}, measuring as empty", id);
        return config.attribute_min_size;
    }
    path.push(id);
    let metrics = node.grid().map(|grid| {
        let children: Vec<NodeId> = grid.children().collect();
        for child in children {
            let size = measure(doc, child, config, sizes, path);
            sizes.insert(child, size);
        }
        GridMetrics::measure(grid, config, |child| {
            sizes.get(&child).copied().unwrap_or(config.placeholder_size)
        })
    });
    path.pop();
    let size = node_size(metrics.as_ref(), node.variant(), config);
    sizes.insert(id, size);
    size
}

fn place(
    doc: &mut GraphDocument,
    id: NodeId,
    position: [f32; 2],
    config: &LayoutConfig,
    sizes: &HashMap<NodeId, [f32; 2]>,
    path: &mut Vec<NodeId>,
) {
    if path.contains(&id) {
        return;
    }
    let Some(node) = doc.node_mut(id) else {
        return;
    };
    node.position = position;
    if let Some(size) = sizes.get(&id) {
        node.size = *size;
    }
    let origin = grid_origin(node, config);
    let Some(grid) = node.grid() else {
        return;
    };
    let metrics = GridMetrics::measure(grid, config, |child| {
        sizes.get(&child).copied().unwrap_or(config.placeholder_size)
    });
    let children: Vec<(GridPos, NodeId)> = grid
        .cells()
        .filter_map(|(pos, cell)| cell.child().map(|c| (pos, c)))
        .collect();
    path.push(id);
    for (pos, child) in children {
        let offset = metrics.cell_offset(pos);
        place(doc, child, [origin[0] + offset[0], origin[1] + offset[1]], config, sizes, path);
    }
    path.pop();
}

/// Recompute sizes of every node and positions of every nested node
pub fn relayout(doc: &mut GraphDocument, config: &LayoutConfig) {
    let roots: Vec<(NodeId, [f32; 2])> = doc.root_nodes().map(|n| (n.id, n.position)).collect();
    let mut sizes = HashMap::new();
    for (root, _) in &roots {
        measure(doc, *root, config, &mut sizes, &mut Vec::new());
    }
    for (root, position) in roots {
        place(doc, root, position, config, &sizes, &mut Vec::new());
    }
}

/// Rectangles of every cell of a node's grid, from the current layout
pub fn cell_rects(doc: &GraphDocument, id: NodeId, config: &LayoutConfig) -> Vec<(GridPos, Rect)> {
    let Some(node) = doc.node(id) else {
        return Vec::new();
    };
    let Some(grid) = node.grid() else {
        return Vec::new();
    };
    let metrics = GridMetrics::measure(grid, config, |child| {
        doc.node(child).map_or(config.placeholder_size, |c| c.size)
    });
    let origin = grid_origin(node, config);
    grid.cells()
        .map(|(pos, _)| {
            let offset = metrics.cell_offset(pos);
            let rect = Rect::from_pos_size([origin[0] + offset[0], origin[1] + offset[1]], metrics.cell_size(pos));
            (pos, rect)
        })
        .collect()
}

/// Rectangles of a node's placeholder cells
pub fn placeholder_rects(doc: &GraphDocument, id: NodeId, config: &LayoutConfig) -> Vec<(GridPos, Rect)> {
    let Some(grid) = doc.node(id).and_then(Node::grid) else {
        return Vec::new();
    };
    cell_rects(doc, id, config)
        .into_iter()
        .filter(|(pos, _)| grid.get(*pos).is_some_and(Cell::is_empty))
        .collect()
}

/// Anchor point of a port on its node's outline
///
/// Inputs sit on the left edge, outputs on the right. The true channel is
/// level with the header, the false channel near the bottom edge.
pub fn port_position(doc: &GraphDocument, port: PortId, config: &LayoutConfig) -> Option<[f32; 2]> {
    let port = doc.port(port)?;
    let node = doc.node(port.node)?;
    let rect = Rect::from_pos_size(node.position, node.size);
    let x = match port.kind {
        PortKind::Input => rect.min[0],
        PortKind::Output => rect.max[0],
    };
    let half = config.header_height / 2.0;
    let y = match (node.variant(), port.channel) {
        (NodeVariant::Logic, _) => (rect.min[1] + rect.max[1]) / 2.0,
        (NodeVariant::Attribute, Channel::True) => rect.min[1] + half,
        (NodeVariant::Attribute, Channel::False) => rect.max[1] - half,
    };
    Some([x, y])
}

/// Sampled curve of a complete pipe, start port first
pub fn pipe_curve(doc: &GraphDocument, pipe: PipeId, config: &LayoutConfig) -> Option<Vec<[f32; 2]>> {
    let pipe = doc.pipe(pipe)?;
    let start = pipe.start_port?;
    let end = pipe.end_port?;
    let p0 = port_position(doc, start, config)?;
    let p1 = port_position(doc, end, config)?;
    let reach = ((p1[0] - p0[0]).abs() / 2.0).max(config.cell_spacing);
    let direction = |port: PortId| match doc.port(port).map(|p| p.kind) {
        Some(PortKind::Input) => -1.0,
        Some(PortKind::Output) | None => 1.0,
    };
    let c0 = [
        p0[0] + reach * direction(start) + pipe.start_offset[0],
        p0[1] + pipe.start_offset[1],
    ];
    let c1 = [
        p1[0] + reach * direction(end) + pipe.end_offset[0],
        p1[1] + pipe.end_offset[1],
    ];
    Some(sample_cubic(p0, c0, c1, p1, config.curve_segments))
}

/// Bounds of a complete pipe's curve, padded by the hit width
pub fn pipe_bounds(doc: &GraphDocument, pipe: PipeId, config: &LayoutConfig) -> Option<Rect> {
    let rect = pipe_curve(doc, pipe, config).and_then(|points| Rect::bounding(&points))?;
    let pad = config.pipe_hit_width / 2.0;
    Some(Rect {
        min: [rect.min[0] - pad, rect.min[1] - pad],
        max: [rect.max[0] + pad, rect.max[1] + pad],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Placement;
    use crate::grid::Leaf;

    #[test]
    fn test_childless_nodes_use_minimum_size() {
        let config = LayoutConfig::default();
        let mut doc = GraphDocument::new("root");
        let a = doc.add_node(NodeVariant::Attribute, [5.0, 5.0]);
        let l = doc.add_node(NodeVariant::Logic, [500.0, 5.0]);
        relayout(&mut doc, &config);
        assert_eq!(doc.node(a).unwrap().size, config.attribute_min_size);
        assert_eq!(doc.node(l).unwrap().size, config.logic_size);
        assert_eq!(doc.node(a).unwrap().position, [5.0, 5.0]);
    }

    #[test]
    fn test_nested_children_follow_grid() {
        let config = LayoutConfig::default();
        let mut doc = GraphDocument::new("root");
        let parent = doc.add_node(NodeVariant::Attribute, [100.0, 100.0]);
        let first = doc.add_node(NodeVariant::Attribute, [0.0, 0.0]);
        let second = doc.add_node(NodeVariant::Attribute, [0.0, 0.0]);
        doc.nest(first, parent, Placement::Append { new_line: false }).unwrap();
        doc.nest(second, parent, Placement::Append { new_line: false }).unwrap();
        relayout(&mut doc, &config);

        let origin = [100.0 + config.port_margin, 100.0 + config.header_height];
        assert_eq!(doc.node(first).unwrap().position, origin);
        assert_eq!(
            doc.node(second).unwrap().position,
            [origin[0] + config.attribute_min_size[0] + config.cell_spacing, origin[1]]
        );
        let size = doc.node(parent).unwrap().size;
        assert_eq!(
            size[0],
            2.0 * config.attribute_min_size[0] + config.cell_spacing + 2.0 * config.port_margin
        );

        let before: Vec<_> = doc.nodes().map(|n| (n.position, n.size)).collect();
        relayout(&mut doc, &config);
        let after: Vec<_> = doc.nodes().map(|n| (n.position, n.size)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_placeholder_rects_cover_empty_cells() {
        let config = LayoutConfig::default();
        let mut doc = GraphDocument::new("root");
        let parent = doc.add_node(NodeVariant::Attribute, [0.0, 0.0]);
        doc.add_leaf(parent, Leaf::todo("a"), Placement::At(GridPos::new(0, 1))).unwrap();
        relayout(&mut doc, &config);

        let holes = placeholder_rects(&doc, parent, &config);
        assert_eq!(holes.len(), 1);
        assert_eq!(holes[0].0, GridPos::new(0, 0));
        let parent_rect = doc.node_rect(parent).unwrap();
        assert!(parent_rect.intersects(&holes[0].1));
    }

    #[test]
    fn test_pipe_bounds_span_both_ports() {
        let config = LayoutConfig::default();
        let mut doc = GraphDocument::new("root");
        let a = doc.add_node(NodeVariant::Attribute, [0.0, 0.0]);
        let b = doc.add_node(NodeVariant::Attribute, [400.0, 200.0]);
        relayout(&mut doc, &config);
        let out = doc.node(a).unwrap().port(PortKind::Output, Channel::True).unwrap();
        let input = doc.node(b).unwrap().port(PortKind::Input, Channel::True).unwrap();
        let pipe = doc.begin_pipe(out).unwrap();
        assert!(pipe_bounds(&doc, pipe, &config).is_none());
        doc.connect(pipe, input).unwrap();

        let bounds = pipe_bounds(&doc, pipe, &config).unwrap();
        let p0 = port_position(&doc, out, &config).unwrap();
        let p1 = port_position(&doc, input, &config).unwrap();
        assert!(bounds.contains(p0));
        assert!(bounds.contains(p1));
    }
}
