// SPDX-License-Identifier: MIT OR Apache-2.0
//! On-disk records and the two-pass restore.
//!
//! Entities reference each other by id, often forward. Restoring therefore
//! runs in two passes over the records:
//!
//! - **materialize**: nodes, ports, leaves and nested documents are created
//!   depth-first and every id goes into an [`IdTable`]
//! - **wire**: pipes, port pipe lists, adjacency sets and grid children are
//!   resolved through the table; references to unknown ids are dropped with a
//!   warning
//!
//! Records are written either as RON text or as bincode behind the
//! [`BINARY_MAGIC`] header. Decoding sniffs the header.

use crate::document::{DocumentOwner, GraphDocument};
use crate::grid::{Cell, FileDisplay, Grid, GridPos, Leaf, LeafContent};
use crate::id::{self, DocumentId, LeafId, NodeId, PipeId, PortId};
use crate::node::{
    Adjacency, AttributeData, AttributePorts, LogicData, LogicOp, LogicPorts, Node, NodeKind, NodeVariant,
    ParentLink,
};
use crate::pipe::Pipe;
use crate::port::{Channel, Port, PortKind};
use crate::style::{DocumentStyle, NodeStyle, PipeStyle, PortStyle, StyleDefaults};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Current record format version
pub const FORMAT_VERSION: u32 = 1;

/// Header of the binary encoding
pub const BINARY_MAGIC: &[u8; 4] = b"NNGB";

/// Every document of a workspace, keyed by id
pub type DocumentMap = IndexMap<DocumentId, GraphDocument>;

/// File encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Format {
    /// RON text
    #[default]
    Ron,
    /// Magic header plus bincode payload
    Binary,
}

/// How ids are treated on restore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdMode {
    /// Keep stored ids (load, undo, redo)
    Preserve,
    /// Allocate fresh ids and remap references (import)
    Regenerate,
}

/// Top-level file record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceRecord {
    /// Format version
    pub version: u32,
    /// Root document
    #[serde(default)]
    pub root: Option<DocumentRecord>,
    /// Global style defaults
    #[serde(default)]
    pub style: StyleDefaults,
    /// Document that was active when saved
    #[serde(default)]
    pub current_document_id: Option<DocumentId>,
}

/// One graph document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Document id
    pub id: DocumentId,
    /// Tree label
    pub label: String,
    /// Document-level overrides
    pub style: DocumentStyle,
    /// All nodes, root and nested, in creation order
    pub nodes: Vec<NodeRecord>,
    /// Complete pipes
    pub pipes: Vec<PipeRecord>,
}

/// One node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node id
    pub id: NodeId,
    /// Position
    pub position: [f32; 2],
    /// Size
    pub size: [f32; 2],
    /// Display text
    pub text: String,
    /// Local overrides
    pub style: NodeStyle,
    /// Parent node, for nested nodes
    pub parent: Option<NodeId>,
    /// Cell in the parent grid
    pub cell: Option<GridPos>,
    /// Ports
    pub ports: Vec<PortRecord>,
    /// Adjacency sets
    pub adjacency: AdjacencyRecord,
    /// Variant payload
    pub kind: NodeKindRecord,
}

/// Stored adjacency sets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyRecord {
    /// Downstream attribute nodes
    pub next_attribute: Vec<NodeId>,
    /// Upstream attribute nodes
    pub last_attribute: Vec<NodeId>,
    /// Downstream logic nodes
    pub next_logic: Vec<NodeId>,
    /// Upstream logic nodes
    pub last_logic: Vec<NodeId>,
}

/// Variant payload of a node record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKindRecord {
    /// Attribute node
    Attribute {
        /// Grid rows
        grid: Vec<Vec<CellRecord>>,
        /// Append cursor
        cursor: Option<GridPos>,
        /// Owned nested document
        sub_document: Option<Box<DocumentRecord>>,
    },
    /// Logic node
    Logic {
        /// Input operator
        input_op: LogicOp,
        /// Output operator
        output_op: LogicOp,
    },
}

/// One grid cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellRecord {
    /// Nested node
    Child(NodeId),
    /// Leaf content
    Leaf(LeafRecord),
    /// Placeholder
    Empty,
}

/// One leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafRecord {
    /// Leaf id
    pub id: LeafId,
    /// Content
    pub content: LeafContentRecord,
}

/// Stored leaf content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LeafContentRecord {
    /// Linked file
    File {
        /// Path on disk
        path: PathBuf,
        /// Display mode
        display: FileDisplay,
    },
    /// Todo item
    Todo {
        /// Task text
        task: String,
        /// Tracked seconds
        elapsed_secs: u64,
        /// Finished
        done: bool,
    },
    /// Embedded document view
    Embedded {
        /// The embedded document
        document: Box<DocumentRecord>,
    },
}

/// One port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortRecord {
    /// Port id
    pub id: PortId,
    /// Kind
    pub kind: PortKind,
    /// Channel
    pub channel: Channel,
    /// Local overrides
    pub style: PortStyle,
    /// Attached pipes in order
    pub pipes: Vec<PipeId>,
}

/// One complete pipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeRecord {
    /// Pipe id
    pub id: PipeId,
    /// Start port
    pub start_port: PortId,
    /// End port
    pub end_port: PortId,
    /// Label text
    pub label: String,
    /// Control point offset near the start
    pub start_offset: [f32; 2],
    /// Control point offset near the end
    pub end_offset: [f32; 2],
    /// Local overrides
    pub style: PipeStyle,
}

/// Encode a workspace record
pub fn encode(record: &WorkspaceRecord, format: Format) -> Result<Vec<u8>> {
    match format {
        Format::Ron => {
            let config = ron::ser::PrettyConfig::default().struct_names(true);
            Ok(ron::ser::to_string_pretty(record, config)?.into_bytes())
        }
        Format::Binary => {
            let mut bytes = BINARY_MAGIC.to_vec();
            bytes.extend(bincode::serialize(record)?);
            Ok(bytes)
        }
    }
}

/// Decode and check a workspace record, sniffing the encoding
pub fn decode(bytes: &[u8]) -> Result<WorkspaceRecord> {
    let record: WorkspaceRecord = match bytes.strip_prefix(BINARY_MAGIC.as_slice()) {
        Some(payload) => bincode::deserialize(payload)?,
        None => {
            let text = std::str::from_utf8(bytes).map_err(|e| CodecError::Corrupt(e.to_string()))?;
            ron::from_str(text)?
        }
    };
    if record.version == 0 || record.version > FORMAT_VERSION {
        return Err(CodecError::Corrupt(format!(
            "Document version {} is not supported (expected at most {})",
            record.version, FORMAT_VERSION
        )));
    }
    if record.root.is_none() {
        return Err(CodecError::Corrupt("missing root document".to_string()));
    }
    Ok(record)
}

/// Detect the encoding of stored bytes
pub fn sniff(bytes: &[u8]) -> Format {
    if bytes.starts_with(BINARY_MAGIC) {
        Format::Binary
    } else {
        Format::Ron
    }
}

/// Capture a document and everything nested in it
pub fn capture(documents: &DocumentMap, id: DocumentId) -> Result<DocumentRecord> {
    let mut visiting = HashSet::new();
    capture_document(documents, id, &mut visiting)
}

fn capture_nested(
    documents: &DocumentMap,
    id: DocumentId,
    visiting: &mut HashSet<DocumentId>,
) -> Option<Box<DocumentRecord>> {
    match capture_document(documents, id, visiting) {
        Ok(record) => Some(Box::new(record)),
        Err(err) => {
            tracing::warn!("Skipping nested document {}: {}", id, err);
            None
        }
    }
}

fn capture_document(
    documents: &DocumentMap,
    id: DocumentId,
    visiting: &mut HashSet<DocumentId>,
) -> Result<DocumentRecord> {
    let doc = documents.get(&id).ok_or(CodecError::DocumentNotFound(id))?;
    if !visiting.insert(id) {
        return Err(CodecError::Corrupt(format!("{} is nested inside itself", id)));
    }

    let pipes: Vec<PipeRecord> = doc
        .pipes()
        .filter_map(|pipe| {
            Some(PipeRecord {
                id: pipe.id,
                start_port: pipe.start_port?,
                end_port: pipe.end_port?,
                label: pipe.label.clone(),
                start_offset: pipe.start_offset,
                end_offset: pipe.end_offset,
                style: pipe.style.clone(),
            })
        })
        .collect();
    let written: HashSet<PipeId> = pipes.iter().map(|p| p.id).collect();

    let mut nodes = Vec::with_capacity(doc.node_count());
    for node in doc.nodes() {
        let ports = node
            .port_ids()
            .into_iter()
            .filter_map(|port| doc.port(port))
            .map(|port| PortRecord {
                id: port.id,
                kind: port.kind,
                channel: port.channel,
                style: port.style.clone(),
                pipes: port.pipes().iter().copied().filter(|p| written.contains(p)).collect(),
            })
            .collect();
        let kind = match &node.kind {
            NodeKind::Attribute(data) => NodeKindRecord::Attribute {
                grid: data
                    .grid
                    .row_slices()
                    .iter()
                    .map(|row| row.iter().map(|cell| capture_cell(documents, cell, visiting)).collect())
                    .collect(),
                cursor: data.grid.cursor(),
                sub_document: data
                    .sub_document
                    .and_then(|sub| capture_nested(documents, sub, visiting)),
            },
            NodeKind::Logic(data) => NodeKindRecord::Logic {
                input_op: data.input_op,
                output_op: data.output_op,
            },
        };
        nodes.push(NodeRecord {
            id: node.id,
            position: node.position,
            size: node.size,
            text: node.text.clone(),
            style: node.style.clone(),
            parent: node.parent.map(|link| link.node),
            cell: node.parent.map(|link| link.cell),
            ports,
            adjacency: AdjacencyRecord {
                next_attribute: node.adjacency.next_attribute.iter().copied().collect(),
                last_attribute: node.adjacency.last_attribute.iter().copied().collect(),
                next_logic: node.adjacency.next_logic.iter().copied().collect(),
                last_logic: node.adjacency.last_logic.iter().copied().collect(),
            },
            kind,
        });
    }

    visiting.remove(&id);
    Ok(DocumentRecord {
        id: doc.id,
        label: doc.label.clone(),
        style: doc.style.clone(),
        nodes,
        pipes,
    })
}

fn capture_cell(documents: &DocumentMap, cell: &Cell, visiting: &mut HashSet<DocumentId>) -> CellRecord {
    match cell {
        Cell::Child(id) => CellRecord::Child(*id),
        Cell::Empty => CellRecord::Empty,
        Cell::Leaf(leaf) => {
            let content = match &leaf.content {
                LeafContent::File { path, display } => LeafContentRecord::File {
                    path: path.clone(),
                    display: *display,
                },
                LeafContent::Todo {
                    task,
                    elapsed_secs,
                    done,
                } => LeafContentRecord::Todo {
                    task: task.clone(),
                    elapsed_secs: *elapsed_secs,
                    done: *done,
                },
                LeafContent::Embedded { document } => match capture_nested(documents, *document, visiting) {
                    Some(document) => LeafContentRecord::Embedded { document },
                    None => return CellRecord::Empty,
                },
            };
            CellRecord::Leaf(LeafRecord { id: leaf.id, content })
        }
    }
}

/// Mapping from stored ids to live ids, filled during materialization
#[derive(Debug)]
pub struct IdTable {
    mode: IdMode,
    nodes: HashMap<NodeId, NodeId>,
    ports: HashMap<PortId, PortId>,
    pipes: HashMap<PipeId, PipeId>,
    documents: HashMap<DocumentId, DocumentId>,
}

impl IdTable {
    fn new(mode: IdMode) -> Self {
        Self {
            mode,
            nodes: HashMap::new(),
            ports: HashMap::new(),
            pipes: HashMap::new(),
            documents: HashMap::new(),
        }
    }

    fn issue(&self, raw: u64) -> Result<u64> {
        match self.mode {
            IdMode::Preserve if !id::is_storable(raw) => {
                Err(CodecError::Corrupt(format!("stored id #{} is out of range", raw)))
            }
            IdMode::Preserve => {
                id::observe(raw);
                Ok(raw)
            }
            IdMode::Regenerate => Ok(id::allocate()),
        }
    }

    fn add_node(&mut self, raw: NodeId) -> Result<NodeId> {
        let live = NodeId(self.issue(raw.0)?);
        self.nodes.insert(raw, live);
        Ok(live)
    }

    fn add_port(&mut self, raw: PortId) -> Result<PortId> {
        let live = PortId(self.issue(raw.0)?);
        self.ports.insert(raw, live);
        Ok(live)
    }

    fn add_pipe(&mut self, raw: PipeId) -> Result<PipeId> {
        let live = PipeId(self.issue(raw.0)?);
        self.pipes.insert(raw, live);
        Ok(live)
    }

    fn add_document(&mut self, raw: DocumentId) -> Result<DocumentId> {
        let live = DocumentId(self.issue(raw.0)?);
        self.documents.insert(raw, live);
        Ok(live)
    }

    fn leaf(&self, raw: LeafId) -> Result<LeafId> {
        Ok(LeafId(self.issue(raw.0)?))
    }

    /// Live id of a stored node
    pub fn node(&self, raw: NodeId) -> Option<NodeId> {
        self.nodes.get(&raw).copied()
    }

    /// Live id of a stored port
    pub fn port(&self, raw: PortId) -> Option<PortId> {
        self.ports.get(&raw).copied()
    }

    /// Live id of a stored pipe
    pub fn pipe(&self, raw: PipeId) -> Option<PipeId> {
        self.pipes.get(&raw).copied()
    }

    /// Live id of a stored document
    pub fn document(&self, raw: DocumentId) -> Option<DocumentId> {
        self.documents.get(&raw).copied()
    }
}

/// A restored document tree
#[derive(Debug)]
pub struct Restored {
    /// The restored top document
    pub root: DocumentId,
    /// The top document and every document nested in it
    pub documents: DocumentMap,
    /// Stored-to-live id mapping
    pub ids: IdTable,
}

/// Two-pass restore of a document record and everything nested in it
pub fn restore(record: &DocumentRecord, mode: IdMode) -> Result<Restored> {
    let mut ids = IdTable::new(mode);
    let mut documents = DocumentMap::new();
    let mut pending = Vec::new();
    let root = materialize(record, None, &mut ids, &mut documents, &mut pending)?;
    for (doc_id, record) in pending {
        if let Some(doc) = documents.get_mut(&doc_id) {
            wire(doc, record, &mut ids)?;
        }
    }
    Ok(Restored { root, documents, ids })
}

fn materialize<'a>(
    record: &'a DocumentRecord,
    owner: Option<DocumentOwner>,
    ids: &mut IdTable,
    documents: &mut DocumentMap,
    pending: &mut Vec<(DocumentId, &'a DocumentRecord)>,
) -> Result<DocumentId> {
    if ids.document(record.id).is_some() {
        return Err(CodecError::Corrupt(format!("{} appears twice", record.id)));
    }
    let doc_id = ids.add_document(record.id)?;
    let mut doc = GraphDocument::with_id(doc_id, record.label.clone());
    doc.owner = owner;
    doc.style = record.style.clone();
    pending.push((doc_id, record));

    for node_record in &record.nodes {
        let node_id = ids.add_node(node_record.id)?;
        let ports = node_record
            .ports
            .iter()
            .map(|p| {
                let mut port = Port::with_id(ids.add_port(p.id)?, node_id, p.kind, p.channel);
                port.style = p.style.clone();
                Ok(port)
            })
            .collect::<Result<Vec<Port>>>()?;
        let find = |kind: PortKind, channel: Channel| {
            ports
                .iter()
                .find(|p| p.kind == kind && p.channel == channel)
                .map(|p| p.id)
                .ok_or_else(|| {
                    CodecError::Corrupt(format!("{} has no {:?} {:?} port", node_record.id, channel, kind))
                })
        };

        let kind = match &node_record.kind {
            NodeKindRecord::Attribute {
                grid,
                cursor,
                sub_document,
            } => {
                let here = DocumentOwner {
                    document: doc_id,
                    node: node_id,
                };
                let ports = AttributePorts {
                    true_input: find(PortKind::Input, Channel::True)?,
                    true_output: find(PortKind::Output, Channel::True)?,
                    false_input: find(PortKind::Input, Channel::False)?,
                    false_output: find(PortKind::Output, Channel::False)?,
                };
                let mut rows = Vec::with_capacity(grid.len());
                for row in grid {
                    let mut cells = Vec::with_capacity(row.len());
                    for cell in row {
                        cells.push(match cell {
                            // children are wired in the second pass
                            CellRecord::Child(_) | CellRecord::Empty => Cell::Empty,
                            CellRecord::Leaf(leaf) => {
                                let content = match &leaf.content {
                                    LeafContentRecord::File { path, display } => LeafContent::File {
                                        path: path.clone(),
                                        display: *display,
                                    },
                                    LeafContentRecord::Todo {
                                        task,
                                        elapsed_secs,
                                        done,
                                    } => LeafContent::Todo {
                                        task: task.clone(),
                                        elapsed_secs: *elapsed_secs,
                                        done: *done,
                                    },
                                    LeafContentRecord::Embedded { document } => LeafContent::Embedded {
                                        document: materialize(document, Some(here), ids, documents, pending)?,
                                    },
                                };
                                Cell::Leaf(Leaf {
                                    id: ids.leaf(leaf.id)?,
                                    content,
                                })
                            }
                        });
                    }
                    rows.push(cells);
                }
                let sub_document = match sub_document {
                    Some(sub) => Some(materialize(sub, Some(here), ids, documents, pending)?),
                    None => None,
                };
                NodeKind::Attribute(AttributeData {
                    ports,
                    grid: Grid::from_rows(rows, *cursor),
                    sub_document,
                })
            }
            NodeKindRecord::Logic { input_op, output_op } => NodeKind::Logic(LogicData {
                ports: LogicPorts {
                    input: find(PortKind::Input, Channel::True)?,
                    output: find(PortKind::Output, Channel::True)?,
                },
                input_op: *input_op,
                output_op: *output_op,
            }),
        };

        let mut node = Node::with_kind(node_id, kind, node_record.position, node_record.size);
        node.text = node_record.text.clone();
        node.style = node_record.style.clone();
        doc.insert_node(node, ports);
    }

    documents.insert(doc_id, doc);
    Ok(doc_id)
}

fn dangling(what: &str, raw: u64, doc: DocumentId) {
    tracing::warn!("Dropping dangling {} reference #{} in {}", what, raw, doc);
}

fn wire(doc: &mut GraphDocument, record: &DocumentRecord, ids: &mut IdTable) -> Result<()> {
    let mut pairs = HashSet::new();
    for pipe in &record.pipes {
        let start = ids.port(pipe.start_port).filter(|p| doc.port(*p).is_some());
        let end = ids.port(pipe.end_port).filter(|p| doc.port(*p).is_some());
        let (Some(start), Some(end)) = (start, end) else {
            dangling("pipe port", pipe.id.0, doc.id);
            continue;
        };
        if ids.pipe(pipe.id).is_some() {
            tracing::warn!("Dropping duplicate record of {} in {}", pipe.id, doc.id);
            continue;
        }
        let compatible = match (doc.port(start), doc.port(end)) {
            (Some(a), Some(b)) => a.kind != b.kind && a.node != b.node,
            _ => false,
        };
        if !compatible || !pairs.insert((start.min(end), start.max(end))) {
            tracing::warn!("Dropping {} joining invalid or already joined ports", pipe.id);
            continue;
        }
        let mut restored = Pipe::with_id(ids.add_pipe(pipe.id)?, Some(start), Some(end));
        restored.label = pipe.label.clone();
        restored.start_offset = pipe.start_offset;
        restored.end_offset = pipe.end_offset;
        restored.style = pipe.style.clone();
        doc.insert_pipe(restored);
    }

    for node_record in &record.nodes {
        for port_record in &node_record.ports {
            let Some(port) = ids.port(port_record.id) else {
                continue;
            };
            for raw in &port_record.pipes {
                let live = ids
                    .pipe(*raw)
                    .filter(|p| doc.pipe(*p).is_some_and(|pipe| pipe.involves_port(port)));
                match (live, doc.port_mut(port)) {
                    (Some(live), Some(port)) => port.add_pipe(live),
                    _ => dangling("port pipe", raw.0, doc.id),
                }
            }
        }
    }
    let ends: Vec<(PipeId, PortId)> = doc
        .pipes()
        .flat_map(|pipe| pipe.ends().map(move |port| (pipe.id, port)))
        .collect();
    for (pipe, port) in ends {
        if let Some(port) = doc.port_mut(port) {
            if !port.has_pipe(pipe) {
                tracing::warn!("{} was missing from the pipe list of {}", pipe, port.id);
                port.add_pipe(pipe);
            }
        }
    }

    for node_record in &record.nodes {
        let Some(node_id) = ids.node(node_record.id) else {
            continue;
        };
        let mut adjacency = Adjacency::default();
        let sets = [
            (&node_record.adjacency.next_attribute, &mut adjacency.next_attribute),
            (&node_record.adjacency.last_attribute, &mut adjacency.last_attribute),
            (&node_record.adjacency.next_logic, &mut adjacency.next_logic),
            (&node_record.adjacency.last_logic, &mut adjacency.last_logic),
        ];
        for (stored, live) in sets {
            for raw in stored {
                match ids.node(*raw).filter(|n| doc.contains_node(*n)) {
                    Some(neighbour) => {
                        live.insert(neighbour);
                    }
                    None => dangling("adjacency", raw.0, doc.id),
                }
            }
        }
        if let Some(node) = doc.node_mut(node_id) {
            node.adjacency = adjacency;
        }
    }

    for node_record in &record.nodes {
        let (Some(node_id), NodeKindRecord::Attribute { grid, .. }) = (ids.node(node_record.id), &node_record.kind)
        else {
            continue;
        };
        for (r, row) in grid.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let CellRecord::Child(raw) = cell else {
                    continue;
                };
                let pos = GridPos::new(r, c);
                let child = ids.node(*raw).filter(|child| {
                    doc.node(*child).is_some_and(|n| n.parent.is_none() && n.variant() == NodeVariant::Attribute)
                        && *child != node_id
                        && !doc.is_ancestor(*child, node_id)
                });
                let Some(child) = child else {
                    dangling("grid child", raw.0, doc.id);
                    continue;
                };
                if let Some(grid) = doc.node_mut(node_id).and_then(Node::grid_mut) {
                    grid.place(pos, Cell::Child(child));
                }
                if let Some(node) = doc.node_mut(child) {
                    node.parent = Some(ParentLink {
                        node: node_id,
                        cell: pos,
                    });
                }
            }
        }
    }

    for node_record in &record.nodes {
        let Some(node_id) = ids.node(node_record.id) else {
            continue;
        };
        let stored = node_record.parent.and_then(|p| ids.node(p));
        let live = doc.parent_of(node_id);
        if stored != live {
            tracing::warn!(
                "{} recorded parent {:?} but its grid placement gives {:?}",
                node_id,
                stored,
                live
            );
        }
    }
    Ok(())
}

/// Error when encoding or decoding documents
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Structurally invalid input
    #[error("Corrupt document: {0}")]
    Corrupt(String),

    /// Document missing from the workspace
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// RON encoding failed
    #[error("RON encoding error: {0}")]
    Ron(#[from] ron::Error),

    /// RON parsing failed
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// Binary encoding failed
    #[error("Binary encoding error: {0}")]
    Bincode(#[from] bincode::Error),
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Placement;

    fn port(doc: &GraphDocument, node: NodeId, kind: PortKind, channel: Channel) -> PortId {
        doc.node(node).and_then(|n| n.port(kind, channel)).unwrap()
    }

    /// Root with a nested child, a leaf, a logic node, two pipes, a dragging
    /// pipe and a sub-document holding one node.
    fn sample() -> (DocumentMap, DocumentId) {
        let mut root = GraphDocument::new("root");
        let a = root.add_node(NodeVariant::Attribute, [0.0, 0.0]);
        let b = root.add_node(NodeVariant::Attribute, [400.0, 0.0]);
        let c = root.add_node(NodeVariant::Attribute, [0.0, 0.0]);
        let l = root.add_node(NodeVariant::Logic, [200.0, 200.0]);
        root.node_mut(a).unwrap().text = "alpha".to_string();
        root.nest(c, a, Placement::Append { new_line: false }).unwrap();
        root.add_leaf(a, Leaf::todo("review"), Placement::Append { new_line: true }).unwrap();

        let p1 = root.begin_pipe(port(&root, a, PortKind::Output, Channel::True)).unwrap();
        root.connect(p1, port(&root, b, PortKind::Input, Channel::True)).unwrap();
        root.pipe_mut(p1).unwrap().label = "yes".to_string();
        let p2 = root.begin_pipe(port(&root, l, PortKind::Input, Channel::True)).unwrap();
        root.connect(p2, port(&root, c, PortKind::Output, Channel::False)).unwrap();
        root.begin_pipe(port(&root, b, PortKind::Output, Channel::False)).unwrap();

        let mut sub = GraphDocument::new("alpha");
        sub.owner = Some(DocumentOwner {
            document: root.id,
            node: a,
        });
        sub.add_node(NodeVariant::Attribute, [10.0, 10.0]);
        if let Some(data) = root.node_mut(a).and_then(Node::attribute_mut) {
            data.sub_document = Some(sub.id);
        }

        let root_id = root.id;
        let mut documents = DocumentMap::new();
        documents.insert(root.id, root);
        documents.insert(sub.id, sub);
        (documents, root_id)
    }

    fn workspace_record(documents: &DocumentMap, root: DocumentId) -> WorkspaceRecord {
        WorkspaceRecord {
            version: FORMAT_VERSION,
            root: Some(capture(documents, root).unwrap()),
            style: StyleDefaults::default(),
            current_document_id: Some(root),
        }
    }

    fn assert_same_document(original: &GraphDocument, restored: &GraphDocument) {
        assert_eq!(original.id, restored.id);
        assert_eq!(original.label, restored.label);
        assert_eq!(original.node_count(), restored.node_count());
        assert_eq!(original.port_count(), restored.port_count());
        for node in original.nodes() {
            assert_eq!(Some(node), restored.node(node.id));
        }
        for pipe in original.pipes().filter(|p| p.is_connected()) {
            assert_eq!(Some(pipe), restored.pipe(pipe.id));
        }
        let connected = original.pipes().filter(|p| p.is_connected()).count();
        assert_eq!(restored.pipe_count(), connected);
    }

    #[test]
    fn test_round_trip_preserves_ids_and_fields() {
        let (documents, root) = sample();
        for format in [Format::Ron, Format::Binary] {
            let bytes = encode(&workspace_record(&documents, root), format).unwrap();
            assert_eq!(sniff(&bytes), format);
            let record = decode(&bytes).unwrap();
            let restored = restore(record.root.as_ref().unwrap(), IdMode::Preserve).unwrap();

            assert_eq!(restored.root, root);
            assert_eq!(restored.documents.len(), 2);
            let original = &documents[&root];
            let back = &restored.documents[&root];
            assert_same_document(original, back);

            // dragging pipes are never written
            let dragging = original.pipes().find(|p| p.is_dragging()).unwrap();
            assert!(back.pipe(dragging.id).is_none());
            let anchor = dragging.anchor().unwrap();
            assert!(back.port(anchor).unwrap().pipes().is_empty());

            let (sub_id, sub) = restored.documents.iter().find(|(id, _)| **id != root).unwrap();
            assert_same_document(&documents[sub_id], sub);
            assert_eq!(sub.owner, documents[sub_id].owner);
        }
    }

    #[test]
    fn test_regenerate_mode_remaps_everything() {
        let (documents, root) = sample();
        let record = capture(&documents, root).unwrap();
        let restored = restore(&record, IdMode::Regenerate).unwrap();
        let original = &documents[&root];
        let copy = &restored.documents[&restored.root];

        assert_ne!(restored.root, root);
        assert_eq!(copy.node_count(), original.node_count());
        assert_eq!(copy.pipe_count(), 2);
        assert!(original.node_ids().all(|id| !copy.contains_node(id)));

        let a = original.nodes().find(|n| n.text == "alpha").unwrap();
        let new_a = restored.ids.node(a.id).unwrap();
        let copy_a = copy.node(new_a).unwrap();
        assert_eq!(copy_a.grid().unwrap().children().count(), 1);
        let sub = copy_a.sub_document().unwrap();
        assert_eq!(restored.ids.document(a.sub_document().unwrap()), Some(sub));
        assert_eq!(restored.documents[&sub].owner.map(|o| o.node), Some(new_a));
        let new_b = copy.node_ids().find(|id| copy_a.adjacency.next_attribute.contains(id));
        assert!(new_b.is_some());
    }

    #[test]
    fn test_dangling_references_are_dropped() {
        let (documents, root) = sample();
        let mut record = capture(&documents, root).unwrap();
        let ghost = PortId(u64::MAX - 7);
        record.pipes[0].end_port = ghost;
        record.nodes[0].adjacency.next_logic.push(NodeId(u64::MAX - 9));

        let restored = restore(&record, IdMode::Regenerate).unwrap();
        let doc = &restored.documents[&restored.root];
        assert_eq!(doc.pipe_count(), 1);
        assert!(doc.ports().all(|p| p.pipes().iter().all(|pipe| doc.pipe(*pipe).is_some())));
        assert!(doc.nodes().all(|n| n.adjacency.neighbours().all(|m| doc.contains_node(m))));
    }

    #[test]
    fn test_corrupt_input_is_rejected() {
        let (documents, root) = sample();
        let mut record = workspace_record(&documents, root);
        record.root = None;
        let bytes = encode(&record, Format::Binary).unwrap();
        assert!(matches!(decode(&bytes), Err(CodecError::Corrupt(_))));

        let mut record = workspace_record(&documents, root);
        record.version = FORMAT_VERSION + 1;
        let bytes = encode(&record, Format::Ron).unwrap();
        assert!(matches!(decode(&bytes), Err(CodecError::Corrupt(_))));

        assert!(decode(b"NNGB\x01").is_err());
        assert!(decode(b"(not a record").is_err());
    }

    #[test]
    fn test_attribute_record_without_ports_is_corrupt() {
        let (documents, root) = sample();
        let mut record = capture(&documents, root).unwrap();
        record.nodes[0].ports.clear();
        assert!(matches!(restore(&record, IdMode::Preserve), Err(CodecError::Corrupt(_))));
    }

    #[test]
    fn test_out_of_range_stored_ids_are_corrupt() {
        let (documents, root) = sample();
        let mut record = capture(&documents, root).unwrap();
        record.nodes[0].id = NodeId(u64::MAX);
        assert!(matches!(restore(&record, IdMode::Preserve), Err(CodecError::Corrupt(_))));

        let mut record = capture(&documents, root).unwrap();
        record.pipes[0].id = PipeId(0);
        assert!(matches!(restore(&record, IdMode::Preserve), Err(CodecError::Corrupt(_))));

        let mut record = capture(&documents, root).unwrap();
        record.nodes[0].id = NodeId(u64::MAX);
        let restored = restore(&record, IdMode::Regenerate).unwrap();
        let live = restored.ids.node(NodeId(u64::MAX)).unwrap();
        assert_ne!(live.value(), u64::MAX);
    }
}
