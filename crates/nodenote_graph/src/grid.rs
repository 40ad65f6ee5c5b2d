// SPDX-License-Identifier: MIT OR Apache-2.0
//! The 2D child grid of an attribute node.
//!
//! The grid is always a full rectangle. Cells that hold nothing are explicit
//! [`Cell::Empty`] placeholders, so row-major traversal visits every index
//! from `(0, 0)` to the current bounds.

use crate::id::{DocumentId, LeafId, NodeId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Row/column coordinate inside a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridPos {
    /// Row index
    pub row: usize,
    /// Column index
    pub column: usize,
}

impl GridPos {
    /// Create a new grid position
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

/// How a file leaf is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FileDisplay {
    /// Plain file link
    #[default]
    File,
    /// Inline image preview
    Image,
}

/// Content held by a leaf cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LeafContent {
    /// Linked file or image
    File {
        /// Path on disk
        path: PathBuf,
        /// Display mode
        display: FileDisplay,
    },
    /// Todo item with a time tracker
    Todo {
        /// Task description
        task: String,
        /// Accumulated time in seconds
        elapsed_secs: u64,
        /// Whether the task is finished
        done: bool,
    },
    /// Embedded view onto its own graph document
    Embedded {
        /// The embedded document
        document: DocumentId,
    },
}

/// A leaf cell with its identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    /// Unique leaf ID
    pub id: LeafId,
    /// Leaf content
    pub content: LeafContent,
}

impl Leaf {
    /// Create a leaf with a fresh id
    pub fn new(content: LeafContent) -> Self {
        Self {
            id: LeafId::new(),
            content,
        }
    }

    /// Create a todo leaf
    pub fn todo(task: impl Into<String>) -> Self {
        Self::new(LeafContent::Todo {
            task: task.into(),
            elapsed_secs: 0,
            done: false,
        })
    }

    /// Create a file leaf
    pub fn file(path: impl Into<PathBuf>, display: FileDisplay) -> Self {
        Self::new(LeafContent::File {
            path: path.into(),
            display,
        })
    }

    /// Embedded document, if this is an embedded view
    pub fn embedded_document(&self) -> Option<DocumentId> {
        match self.content {
            LeafContent::Embedded { document } => Some(document),
            LeafContent::File { .. } | LeafContent::Todo { .. } => None,
        }
    }
}

/// A single grid cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Cell {
    /// A nested attribute node
    Child(NodeId),
    /// Leaf content
    Leaf(Leaf),
    /// Explicit placeholder
    #[default]
    Empty,
}

impl Cell {
    /// Whether this cell is a placeholder
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Child node held by the cell
    pub fn child(&self) -> Option<NodeId> {
        match self {
            Self::Child(id) => Some(*id),
            Self::Leaf(_) | Self::Empty => None,
        }
    }
}

/// Rectangular grid of cells
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
    /// Last append position
    cursor: Option<GridPos>,
}

impl Grid {
    /// Create an empty grid
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a grid from stored rows, padding ragged rows with placeholders
    pub fn from_rows(mut rows: Vec<Vec<Cell>>, cursor: Option<GridPos>) -> Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize_with(columns, Cell::default);
        }
        if columns == 0 {
            rows.clear();
        }
        Self { rows, cursor }
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn columns(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Whether the grid has no cells at all
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Last append position
    pub fn cursor(&self) -> Option<GridPos> {
        self.cursor
    }

    /// Get a cell
    pub fn get(&self, pos: GridPos) -> Option<&Cell> {
        self.rows.get(pos.row).and_then(|r| r.get(pos.column))
    }

    /// Get a mutable cell
    pub fn get_mut(&mut self, pos: GridPos) -> Option<&mut Cell> {
        self.rows.get_mut(pos.row).and_then(|r| r.get_mut(pos.column))
    }

    /// Raw rows, for serialization
    pub fn row_slices(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Iterate cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (GridPos, &Cell)> {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .map(move |(c, cell)| (GridPos::new(r, c), cell))
        })
    }

    /// Child nodes in row-major order
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.cells().filter_map(|(_, cell)| cell.child())
    }

    /// Leaves in row-major order
    pub fn leaves(&self) -> impl Iterator<Item = (GridPos, &Leaf)> {
        self.cells().filter_map(|(pos, cell)| match cell {
            Cell::Leaf(leaf) => Some((pos, leaf)),
            Cell::Child(_) | Cell::Empty => None,
        })
    }

    /// Placeholder coordinates in row-major order
    pub fn placeholders(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.cells().filter(|(_, c)| c.is_empty()).map(|(pos, _)| pos)
    }

    /// Where a child node sits
    pub fn find_child(&self, node: NodeId) -> Option<GridPos> {
        self.cells()
            .find(|(_, cell)| cell.child() == Some(node))
            .map(|(pos, _)| pos)
    }

    /// First placeholder in row-major order
    pub fn first_empty(&self) -> Option<GridPos> {
        self.placeholders().next()
    }

    /// Grow the rectangle so `pos` is in bounds
    fn ensure(&mut self, pos: GridPos) {
        let columns = self.columns().max(pos.column + 1);
        let rows = self.rows().max(pos.row + 1);
        for row in &mut self.rows {
            row.resize_with(columns, Cell::default);
        }
        while self.rows.len() < rows {
            let mut row = Vec::with_capacity(columns);
            row.resize_with(columns, Cell::default);
            self.rows.push(row);
        }
    }

    /// Put a cell at `pos`, growing the grid, and return what was there
    pub fn place(&mut self, pos: GridPos, cell: Cell) -> Cell {
        self.ensure(pos);
        let slot = &mut self.rows[pos.row][pos.column];
        std::mem::replace(slot, cell)
    }

    /// Take a cell out, leaving a placeholder
    pub fn take(&mut self, pos: GridPos) -> Option<Cell> {
        self.get_mut(pos).map(std::mem::take)
    }

    /// Next free append slot
    ///
    /// Same line continues to the right of the cursor, a new line starts at
    /// column 0 of the row below it. Occupied cells are skipped.
    pub fn append_slot(&self, new_line: bool) -> GridPos {
        let mut pos = match (self.cursor, new_line) {
            (None, _) => GridPos::new(0, 0),
            (Some(c), false) => GridPos::new(c.row, c.column + 1),
            (Some(c), true) => GridPos::new(c.row + 1, 0),
        };
        while self.get(pos).is_some_and(|cell| !cell.is_empty()) {
            pos.column += 1;
        }
        pos
    }

    /// Append a cell at the next free slot
    pub fn append(&mut self, cell: Cell, new_line: bool) -> GridPos {
        let pos = self.append_slot(new_line);
        self.place(pos, cell);
        self.cursor = Some(pos);
        pos
    }

    /// Whether every row has the same length
    pub fn is_rectangular(&self) -> bool {
        let columns = self.columns();
        self.rows.iter().all(|r| r.len() == columns) && (columns > 0 || self.rows.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_fills_rectangle() {
        let mut grid = Grid::new();
        let a = NodeId::new();
        let b = NodeId::new();
        let c = NodeId::new();

        assert_eq!(grid.append(Cell::Child(a), false), GridPos::new(0, 0));
        assert_eq!(grid.append(Cell::Child(b), false), GridPos::new(0, 1));
        assert_eq!(grid.append(Cell::Child(c), true), GridPos::new(1, 0));

        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.columns(), 2);
        assert!(grid.is_rectangular());
        assert_eq!(grid.placeholders().collect::<Vec<_>>(), vec![GridPos::new(1, 1)]);
        assert_eq!(grid.children().collect::<Vec<_>>(), vec![a, b, c]);
    }

    #[test]
    fn test_place_far_cell_pads_with_placeholders() {
        let mut grid = Grid::new();
        grid.place(GridPos::new(2, 3), Cell::Leaf(Leaf::todo("write docs")));
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.columns(), 4);
        assert_eq!(grid.placeholders().count(), 11);
        assert_eq!(grid.first_empty(), Some(GridPos::new(0, 0)));
    }

    #[test]
    fn test_take_leaves_placeholder() {
        let mut grid = Grid::new();
        let child = NodeId::new();
        let pos = grid.append(Cell::Child(child), false);
        assert_eq!(grid.take(pos), Some(Cell::Child(child)));
        assert_eq!(grid.get(pos), Some(&Cell::Empty));
        assert_eq!(grid.find_child(child), None);
        assert!(grid.take(GridPos::new(5, 5)).is_none());
    }

    #[test]
    fn test_append_skips_occupied_cells() {
        let mut grid = Grid::new();
        grid.append(Cell::Child(NodeId::new()), false);
        grid.place(GridPos::new(0, 1), Cell::Child(NodeId::new()));
        assert_eq!(grid.append_slot(false), GridPos::new(0, 2));
    }

    #[test]
    fn test_from_rows_pads_ragged_rows() {
        let grid = Grid::from_rows(vec![vec![Cell::Empty, Cell::Empty], vec![Cell::Empty]], None);
        assert!(grid.is_rectangular());
        assert_eq!(grid.columns(), 2);
    }
}
