// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph document model for `NodeNote`.
//!
//! A note is a tree of graph documents. Each document holds attribute nodes,
//! which carry a grid of nested nodes and leaves, and logic nodes, joined by
//! pipes between typed ports. An attribute node may own a whole nested
//! document of its own.
//!
//! ## Architecture
//!
//! - Arena documents keyed by explicit ids, with parent links instead of
//!   back pointers
//! - A ranked drop classifier driving nesting, detaching and splicing
//! - Records with a two-pass restore, written as RON or bincode
//! - Snapshot undo/redo per document
//! - A [`Workspace`] exposing the editing commands and publishing events

pub mod codec;
pub mod collision;
pub mod config;
pub mod document;
pub mod events;
pub mod geometry;
pub mod grid;
pub mod history;
pub mod id;
pub mod layout;
pub mod node;
pub mod pipe;
pub mod port;
pub mod style;
pub mod validate;
pub mod workspace;

pub use codec::{DocumentMap, Format, IdMode};
pub use collision::{DropTarget, ReparentOutcome};
pub use config::EditorConfig;
pub use document::{ConnectError, GraphDocument, NestError, Placement};
pub use events::GraphEvent;
pub use grid::{Cell, GridPos, Leaf, LeafContent};
pub use id::{DocumentId, LeafId, NodeId, PipeId, PortId};
pub use node::{Node, NodeKind, NodeVariant};
pub use pipe::Pipe;
pub use port::{Channel, Port, PortKind};
pub use style::StyleDefaults;
pub use validate::Violation;
pub use workspace::{GridTarget, UiQueries, Workspace, WorkspaceError};
