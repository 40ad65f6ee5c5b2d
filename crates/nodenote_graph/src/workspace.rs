// SPDX-License-Identifier: MIT OR Apache-2.0
//! Workspace: the tree of open documents and the editing command surface.
//!
//! The workspace owns every document, one history per document, the drag in
//! progress and the event queue. Commands act on the active document, lay it
//! out again and record a snapshot in its history when they change it.

use crate::codec::{self, DocumentMap, DocumentRecord, Format, IdMode, WorkspaceRecord, FORMAT_VERSION};
use crate::collision::{self, DragSession, DropTarget, ReparentOutcome};
use crate::config::{ConfigError, EditorConfig};
use crate::document::{ConnectError, DocumentOwner, GraphDocument, NestError, Placement};
use crate::events::{EventBus, GraphEvent};
use crate::geometry::segments_intersect;
use crate::grid::{GridPos, Leaf, LeafContent};
use crate::history::{History, HistoryEntry, HistoryError, StateSnapshot};
use crate::id::{DocumentId, NodeId, PipeId, PortId};
use crate::layout;
use crate::node::{Node, NodeVariant};
use crate::style::{DocumentStyle, ResolvedNodeStyle, ResolvedPipeStyle};
use crate::validate::{self, Violation};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Workspace errors
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// A pipe command was rejected
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// A nesting command was rejected
    #[error(transparent)]
    Nest(#[from] NestError),

    /// Encoding or decoding failed
    #[error(transparent)]
    Codec(#[from] codec::CodecError),

    /// A history snapshot could not be taken or read
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// File access failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// Node not found in the active document
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// No drag of this node is in progress
    #[error("{0} is not being dragged")]
    NoDrag(NodeId),

    /// Embedded documents are created with [`Workspace::embed_document`]
    #[error("Embedded document leaves cannot be added directly")]
    EmbeddedLeaf,
}

/// Result type for workspace commands
pub type Result<T> = std::result::Result<T, WorkspaceError>;

/// What the core asks of the user interface
pub trait UiQueries {
    /// Pointer position in document space
    fn pointer_position(&self) -> [f32; 2];

    /// Selected nodes of the active document
    fn selection(&self) -> Vec<NodeId>;

    /// Confirm deleting a node that has `descendants` nested nodes
    fn confirm_delete(&self, node: NodeId, descendants: usize) -> bool;
}

/// Grid cell a new node is created in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridTarget {
    /// Attribute node owning the grid
    pub parent: NodeId,
    /// Cell to use, or the first placeholder when `None`
    pub cell: Option<GridPos>,
}

/// Open documents, their histories and the active cursor
#[derive(Debug)]
pub struct Workspace {
    documents: DocumentMap,
    root: DocumentId,
    active: DocumentId,
    histories: HashMap<DocumentId, History>,
    drag: Option<(DocumentId, DragSession)>,
    /// Committed pipes currently held by one end
    regrabbed: HashSet<PipeId>,
    events: EventBus,
    config: EditorConfig,
}

impl Workspace {
    /// Create a workspace holding one empty root document
    pub fn new(config: EditorConfig) -> Result<Self> {
        let root = GraphDocument::new("Root");
        let id = root.id;
        let mut documents = DocumentMap::new();
        documents.insert(id, root);
        let mut workspace = Self {
            documents,
            root: id,
            active: id,
            histories: HashMap::new(),
            drag: None,
            regrabbed: HashSet::new(),
            events: EventBus::new(),
            config,
        };
        workspace.start_history(id)?;
        Ok(workspace)
    }

    /// Root document id
    pub fn root(&self) -> DocumentId {
        self.root
    }

    /// Active document id
    pub fn active(&self) -> DocumentId {
        self.active
    }

    /// Get a document by ID
    pub fn document(&self, id: DocumentId) -> Option<&GraphDocument> {
        self.documents.get(&id)
    }

    /// The active document
    pub fn active_document(&self) -> Option<&GraphDocument> {
        self.documents.get(&self.active)
    }

    /// Every open document
    pub fn documents(&self) -> &DocumentMap {
        &self.documents
    }

    /// Editor configuration
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// History of a document
    pub fn history(&self, id: DocumentId) -> Option<&History> {
        self.histories.get(&id)
    }

    /// Drag in progress
    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref().map(|(_, session)| session)
    }

    fn doc(&self, id: DocumentId) -> Result<&GraphDocument> {
        self.documents.get(&id).ok_or(WorkspaceError::DocumentNotFound(id))
    }

    fn doc_mut(&mut self, id: DocumentId) -> Result<&mut GraphDocument> {
        self.documents.get_mut(&id).ok_or(WorkspaceError::DocumentNotFound(id))
    }

    fn relayout(&mut self, id: DocumentId) {
        if let Some(doc) = self.documents.get_mut(&id) {
            layout::relayout(doc, &self.config.layout);
        }
    }

    /// Lay a document out and record its state
    fn commit(&mut self, id: DocumentId, description: &str) -> Result<()> {
        self.relayout(id);
        let record = codec::capture(&self.documents, id)?;
        let snapshot = StateSnapshot::from_value(&record)?;
        let limit = self.config.history_limit;
        self.histories
            .entry(id)
            .or_insert_with(|| History::with_max_depth(limit))
            .record(description, snapshot);
        self.amend_owners(id)
    }

    /// Refresh the current snapshot of every document enclosing `id`
    ///
    /// Parent snapshots embed their nested documents, so an edit below
    /// must show up in them or undoing the parent would lose it.
    fn amend_owners(&mut self, id: DocumentId) -> Result<()> {
        let mut owner = self.documents.get(&id).and_then(|d| d.owner);
        let mut hops = 0;
        while let Some(link) = owner {
            hops += 1;
            if hops > self.documents.len() {
                tracing::warn!("Owner chain of {} loops", id);
                break;
            }
            let record = codec::capture(&self.documents, link.document)?;
            let snapshot = StateSnapshot::from_value(&record)?;
            if let Some(history) = self.histories.get_mut(&link.document) {
                history.amend_current(snapshot);
            }
            owner = self.documents.get(&link.document).and_then(|d| d.owner);
        }
        Ok(())
    }

    fn start_history(&mut self, id: DocumentId) -> Result<()> {
        self.histories
            .insert(id, History::with_max_depth(self.config.history_limit));
        self.commit(id, "Open document")
    }

    /// A document followed by everything nested in it
    fn document_tree(&self, id: DocumentId) -> Vec<DocumentId> {
        let mut tree = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if tree.contains(&next) {
                continue;
            }
            if let Some(doc) = self.documents.get(&next) {
                tree.push(next);
                stack.extend(nested_documents(doc));
            }
        }
        tree
    }

    /// Drop documents together with everything nested in them
    fn drop_documents(&mut self, roots: Vec<DocumentId>) -> Vec<DocumentId> {
        let mut removed = Vec::new();
        let mut stack = roots;
        while let Some(id) = stack.pop() {
            if let Some(doc) = self.documents.shift_remove(&id) {
                stack.extend(nested_documents(&doc));
                self.histories.remove(&id);
                removed.push(id);
            }
        }
        if self.drag.as_ref().is_some_and(|(doc, _)| removed.contains(doc)) {
            self.drag = None;
        }
        if !self.documents.contains_key(&self.active) {
            self.active = self.root;
            self.events.publish(GraphEvent::ActiveDocumentChanged(self.root));
        }
        if !removed.is_empty() {
            tracing::debug!("Dropped {} nested documents", removed.len());
            self.events.publish(GraphEvent::DocumentsRemoved(removed.clone()));
        }
        removed
    }

    /// Create a node in the active document, optionally inside a grid
    pub fn create_node(
        &mut self,
        variant: NodeVariant,
        position: [f32; 2],
        target: Option<GridTarget>,
    ) -> Result<NodeId> {
        let doc_id = self.active;
        let doc = self.doc_mut(doc_id)?;
        let node = doc.add_node(variant, position);
        if let Some(target) = target {
            let placement = target.cell.map_or(Placement::FirstEmpty, Placement::At);
            if let Err(err) = doc.nest(node, target.parent, placement) {
                // nest rejects before touching any grid
                doc.delete_node(node);
                return Err(err.into());
            }
        }
        self.events.publish(GraphEvent::NodeCreated { document: doc_id, node });
        self.commit(doc_id, "Create node")?;
        Ok(node)
    }

    /// Create a root node under the pointer
    pub fn create_node_at_pointer(&mut self, ui: &dyn UiQueries, variant: NodeVariant) -> Result<NodeId> {
        self.create_node(variant, ui.pointer_position(), None)
    }

    fn remove_node(&mut self, doc_id: DocumentId, id: NodeId) -> Result<Vec<NodeId>> {
        if self.drag.as_ref().is_some_and(|(_, s)| s.node == id) {
            self.cancel_drag();
        }
        let removed = self
            .doc_mut(doc_id)?
            .delete_node(id)
            .ok_or(WorkspaceError::NodeNotFound(id))?;
        if !removed.pipes.is_empty() {
            self.events.publish(GraphEvent::PipesRemoved {
                document: doc_id,
                pipes: removed.pipes.clone(),
            });
        }
        self.events.publish(GraphEvent::NodesRemoved {
            document: doc_id,
            nodes: removed.nodes.clone(),
        });
        self.drop_documents(removed.documents);
        Ok(removed.nodes)
    }

    /// Delete a node with its nested nodes, pipes and owned documents
    pub fn delete_node(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        let doc_id = self.active;
        let removed = self.remove_node(doc_id, id)?;
        self.commit(doc_id, "Delete node")?;
        Ok(removed)
    }

    /// Delete the UI selection, asking before removing nodes with children
    pub fn delete_selection(&mut self, ui: &dyn UiQueries) -> Result<Vec<NodeId>> {
        let doc_id = self.active;
        let mut deleted = Vec::new();
        for node in ui.selection() {
            let doc = self.doc(doc_id)?;
            if !doc.contains_node(node) {
                continue;
            }
            let descendants = doc.descendants(node).len();
            if descendants > 0 && !ui.confirm_delete(node, descendants) {
                tracing::debug!("Kept {} with {} nested nodes", node, descendants);
                continue;
            }
            deleted.extend(self.remove_node(doc_id, node)?);
        }
        if !deleted.is_empty() {
            self.commit(doc_id, "Delete selection")?;
        }
        Ok(deleted)
    }

    /// Start a dragging pipe at a port of the active document
    pub fn begin_pipe(&mut self, port: PortId) -> Result<PipeId> {
        let doc_id = self.active;
        Ok(self.doc_mut(doc_id)?.begin_pipe(port)?)
    }

    /// Drop the free end of a dragging pipe on a port
    pub fn complete_pipe(&mut self, pipe: PipeId, port: PortId) -> Result<()> {
        let doc_id = self.active;
        if let Err(err) = self.doc_mut(doc_id)?.connect(pipe, port) {
            tracing::warn!("Rejected connecting {} to {}: {}", pipe, port, err);
            return Err(err.into());
        }
        self.regrabbed.remove(&pipe);
        self.events.publish(GraphEvent::PipeConnected { document: doc_id, pipe });
        self.commit(doc_id, "Connect pipe")
    }

    /// Throw away a dragging pipe
    ///
    /// A re-grabbed pipe was part of the last snapshot, so dropping it is
    /// committed as a deletion.
    pub fn abort_pipe(&mut self, pipe: PipeId) -> Result<()> {
        let doc_id = self.active;
        self.doc_mut(doc_id)?.abort_pipe(pipe)?;
        if !self.regrabbed.remove(&pipe) {
            return Ok(());
        }
        self.events.publish(GraphEvent::PipesRemoved {
            document: doc_id,
            pipes: vec![pipe],
        });
        self.commit(doc_id, "Delete pipe")
    }

    /// Grab one end of a complete pipe, leaving it dragging from the other
    pub fn detach_pipe_end(&mut self, pipe: PipeId, port: PortId) -> Result<PortId> {
        let doc_id = self.active;
        let anchor = self.doc_mut(doc_id)?.detach_pipe_end(pipe, port)?;
        self.regrabbed.insert(pipe);
        Ok(anchor)
    }

    /// Delete a pipe
    pub fn delete_pipe(&mut self, pipe: PipeId) -> Result<()> {
        let doc_id = self.active;
        self.doc_mut(doc_id)?
            .remove_pipe(pipe)
            .ok_or(ConnectError::PipeNotFound(pipe))?;
        self.events.publish(GraphEvent::PipesRemoved {
            document: doc_id,
            pipes: vec![pipe],
        });
        self.commit(doc_id, "Delete pipe")
    }

    /// Delete every complete pipe whose curve crosses the polyline
    pub fn cut_pipes(&mut self, polyline: &[[f32; 2]]) -> Result<Vec<PipeId>> {
        let doc_id = self.active;
        let doc = self.doc(doc_id)?;
        let cut: Vec<PipeId> = doc
            .pipes()
            .filter(|p| p.is_connected())
            .filter(|p| {
                layout::pipe_curve(doc, p.id, &self.config.layout).is_some_and(|curve| crosses(&curve, polyline))
            })
            .map(|p| p.id)
            .collect();
        if cut.is_empty() {
            return Ok(cut);
        }
        let doc = self.doc_mut(doc_id)?;
        for pipe in &cut {
            doc.remove_pipe(*pipe);
        }
        self.events.publish(GraphEvent::PipesRemoved {
            document: doc_id,
            pipes: cut.clone(),
        });
        self.commit(doc_id, "Cut pipes")?;
        Ok(cut)
    }

    /// Start dragging a node of the active document
    pub fn begin_drag(&mut self, node: NodeId) -> Result<()> {
        self.cancel_drag();
        let doc_id = self.active;
        let session = DragSession::begin(self.doc(doc_id)?, node).ok_or(WorkspaceError::NodeNotFound(node))?;
        self.drag = Some((doc_id, session));
        Ok(())
    }

    /// Nest at the start of a new grid row when dropped on a full node
    pub fn set_drag_new_line(&mut self, new_line: bool) {
        if let Some((_, session)) = self.drag.as_mut() {
            session.new_line = new_line;
        }
    }

    /// Move the dragged node and report what a drop would do
    pub fn update_drag(&mut self, node: NodeId, position: [f32; 2]) -> Result<DropTarget> {
        let (doc_id, session) = self
            .drag
            .as_ref()
            .filter(|(_, s)| s.node == node)
            .ok_or(WorkspaceError::NoDrag(node))?;
        let doc = self
            .documents
            .get_mut(doc_id)
            .ok_or(WorkspaceError::DocumentNotFound(*doc_id))?;
        session.update(doc, position);
        Ok(collision::classify(doc, session, &self.config.layout))
    }

    /// Drop the dragged node
    pub fn end_drag(&mut self, node: NodeId) -> Result<ReparentOutcome> {
        let (doc_id, session) = match self.drag.take() {
            Some((doc_id, session)) if session.node == node => (doc_id, session),
            other => {
                self.drag = other;
                return Err(WorkspaceError::NoDrag(node));
            }
        };
        let doc = self
            .documents
            .get_mut(&doc_id)
            .ok_or(WorkspaceError::DocumentNotFound(doc_id))?;
        let outcome = collision::finish(doc, &session, &self.config.layout);
        self.relayout(doc_id);
        self.events.publish(GraphEvent::Reparented {
            document: doc_id,
            node,
            outcome,
        });
        if outcome != ReparentOutcome::Unchanged {
            let description = match outcome {
                ReparentOutcome::NestedInto(_) | ReparentOutcome::PlacedAt { .. } => "Nest node",
                ReparentOutcome::Spliced { .. } => "Splice node",
                ReparentOutcome::Detached { .. } => "Detach node",
                ReparentOutcome::Moved { .. } | ReparentOutcome::Unchanged => "Move node",
            };
            self.commit(doc_id, description)?;
        }
        Ok(outcome)
    }

    /// Abandon the drag, putting the node back
    pub fn cancel_drag(&mut self) {
        if let Some((doc_id, session)) = self.drag.take() {
            if let Some(doc) = self.documents.get_mut(&doc_id) {
                session.cancel(doc);
            }
            self.relayout(doc_id);
        }
    }

    /// Undo the last edit of the active document
    ///
    /// Returns `false` at the oldest retained snapshot.
    pub fn undo(&mut self) -> Result<bool> {
        self.cancel_drag();
        let doc_id = self.active;
        let Some(entry) = self.histories.get_mut(&doc_id).and_then(History::undo).cloned() else {
            return Ok(false);
        };
        if let Err(err) = self.restore_entry(doc_id, &entry) {
            if let Some(history) = self.histories.get_mut(&doc_id) {
                history.redo();
            }
            return Err(err);
        }
        Ok(true)
    }

    /// Redo the last undone edit of the active document
    pub fn redo(&mut self) -> Result<bool> {
        self.cancel_drag();
        let doc_id = self.active;
        let Some(entry) = self.histories.get_mut(&doc_id).and_then(History::redo).cloned() else {
            return Ok(false);
        };
        if let Err(err) = self.restore_entry(doc_id, &entry) {
            if let Some(history) = self.histories.get_mut(&doc_id) {
                history.undo();
            }
            return Err(err);
        }
        Ok(true)
    }

    /// Replace a document and its nested documents with a snapshot
    fn restore_entry(&mut self, doc_id: DocumentId, entry: &HistoryEntry) -> Result<()> {
        let record: DocumentRecord = entry.snapshot.to_value()?;
        let restored = codec::restore(&record, IdMode::Preserve)?;
        let owner = self.doc(doc_id)?.owner;

        for stale in self.document_tree(doc_id) {
            self.documents.shift_remove(&stale);
        }
        let mut fresh = Vec::new();
        for (id, mut doc) in restored.documents {
            if id == restored.root {
                doc.owner = owner;
            }
            if !self.histories.contains_key(&id) {
                fresh.push(id);
            }
            self.documents.insert(id, doc);
        }
        self.histories.retain(|id, _| self.documents.contains_key(id));
        for id in fresh {
            self.start_history(id)?;
        }
        if !self.documents.contains_key(&self.active) {
            self.active = doc_id;
        }
        self.amend_owners(doc_id)?;

        tracing::info!("Restored {} to '{}'", doc_id, entry.description);
        self.events.publish(GraphEvent::HistoryRestored {
            document: doc_id,
            description: entry.description.clone(),
        });
        Ok(())
    }

    /// Encode a document and everything nested in it
    pub fn serialize(&self, id: DocumentId) -> Result<Vec<u8>> {
        self.serialize_as(id, self.config.default_format)
    }

    /// Encode a document in a given format
    pub fn serialize_as(&self, id: DocumentId, format: Format) -> Result<Vec<u8>> {
        let root = codec::capture(&self.documents, id)?;
        let current = self.document_tree(id).contains(&self.active).then_some(self.active);
        let record = WorkspaceRecord {
            version: FORMAT_VERSION,
            root: Some(root),
            style: self.config.style.clone(),
            current_document_id: current,
        };
        Ok(codec::encode(&record, format)?)
    }

    /// Replace the whole workspace with decoded bytes
    ///
    /// The new workspace is built aside and swapped in only once it is
    /// complete, so a failed load leaves the current one untouched.
    pub fn deserialize(&mut self, bytes: &[u8]) -> Result<DocumentId> {
        let record = codec::decode(bytes)?;
        let root_record = record
            .root
            .as_ref()
            .ok_or_else(|| codec::CodecError::Corrupt("missing root document".to_string()))?;
        let restored = codec::restore(root_record, IdMode::Preserve)?;

        let mut config = self.config.clone();
        config.style = record.style.clone();
        let mut staged = Self {
            documents: restored.documents,
            root: restored.root,
            active: restored.root,
            histories: HashMap::new(),
            drag: None,
            regrabbed: HashSet::new(),
            events: EventBus::new(),
            config,
        };
        if let Some(current) = record.current_document_id.and_then(|id| restored.ids.document(id)) {
            if staged.documents.contains_key(&current) {
                staged.active = current;
            }
        }
        let ids: Vec<DocumentId> = staged.documents.keys().copied().collect();
        for id in ids {
            staged.start_history(id)?;
        }

        staged.events = std::mem::take(&mut self.events);
        *self = staged;
        tracing::info!("Loaded workspace with {} documents", self.documents.len());
        self.events.publish(GraphEvent::WorkspaceLoaded { root: self.root });
        self.events.publish(GraphEvent::ActiveDocumentChanged(self.active));
        Ok(self.root)
    }

    /// Graft an encoded document into the active document with fresh ids
    ///
    /// Only structure and per-entity styles come across. The imported root's
    /// document style is discarded and the active document's style applies.
    /// Nested documents keep their own style. Returns the imported root nodes.
    pub fn import_document(&mut self, bytes: &[u8]) -> Result<Vec<NodeId>> {
        let record = codec::decode(bytes)?;
        let root_record = record
            .root
            .as_ref()
            .ok_or_else(|| codec::CodecError::Corrupt("missing root document".to_string()))?;
        let doc_id = self.active;
        self.doc(doc_id)?;
        let mut restored = codec::restore(root_record, IdMode::Regenerate)?;
        let imported = restored
            .documents
            .shift_remove(&restored.root)
            .ok_or(codec::CodecError::DocumentNotFound(restored.root))?;

        let mut nested = Vec::new();
        for (id, mut doc) in restored.documents {
            if let Some(owner) = doc.owner.as_mut() {
                if owner.document == imported.id {
                    owner.document = doc_id;
                }
            }
            nested.push((id, doc.owner.map(|o| o.node)));
            self.documents.insert(id, doc);
        }
        let roots = self.doc_mut(doc_id)?.absorb(imported);
        for node in &roots {
            self.events.publish(GraphEvent::NodeCreated {
                document: doc_id,
                node: *node,
            });
        }
        tracing::info!("Imported {} root nodes into {}", roots.len(), doc_id);
        self.commit(doc_id, "Import document")?;
        for (id, owner) in nested {
            self.start_history(id)?;
            self.events.publish(GraphEvent::DocumentCreated { document: id, owner });
        }
        Ok(roots)
    }

    /// Write the whole workspace to a file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let bytes = self.serialize(self.root)?;
        std::fs::write(path, bytes)?;
        tracing::info!("Saved workspace to {:?}", path);
        Ok(())
    }

    /// Replace the workspace with a file
    pub fn load_from_path(&mut self, path: &Path) -> Result<DocumentId> {
        let bytes = std::fs::read(path)?;
        tracing::info!("Loading workspace from {:?}", path);
        self.deserialize(&bytes)
    }

    /// Open the document owned by a node, creating it on first use
    pub fn open_sub_document(&mut self, node: NodeId) -> Result<DocumentId> {
        let parent_doc = self.active;
        let owner = self.doc(parent_doc)?.node(node).ok_or(WorkspaceError::NodeNotFound(node))?;
        let data = owner.attribute().ok_or(NestError::NotAnAttribute(node))?;
        if let Some(existing) = data.sub_document.filter(|id| self.documents.contains_key(id)) {
            self.set_active_document(existing)?;
            return Ok(existing);
        }

        let mut sub = GraphDocument::new(document_label(owner));
        sub.owner = Some(DocumentOwner {
            document: parent_doc,
            node,
        });
        let sub_id = sub.id;
        self.documents.insert(sub_id, sub);
        if let Some(data) = self.doc_mut(parent_doc)?.node_mut(node).and_then(Node::attribute_mut) {
            data.sub_document = Some(sub_id);
        }
        tracing::debug!("Created sub-document {} for {}", sub_id, node);
        self.events.publish(GraphEvent::DocumentCreated {
            document: sub_id,
            owner: Some(node),
        });
        self.commit(parent_doc, "Open sub-document")?;
        self.start_history(sub_id)?;
        self.set_active_document(sub_id)?;
        Ok(sub_id)
    }

    /// Switch the active document
    pub fn set_active_document(&mut self, id: DocumentId) -> Result<()> {
        self.doc(id)?;
        if id != self.active {
            self.cancel_drag();
            self.active = id;
            self.events.publish(GraphEvent::ActiveDocumentChanged(id));
        }
        Ok(())
    }

    /// Change a node's text; an owned sub-document takes it as its label
    pub fn set_node_text(&mut self, node: NodeId, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        let doc_id = self.active;
        let target = self
            .doc_mut(doc_id)?
            .node_mut(node)
            .ok_or(WorkspaceError::NodeNotFound(node))?;
        target.text = text.clone();
        let sub = target.sub_document();
        self.events.publish(GraphEvent::NodeRenamed {
            document: doc_id,
            node,
            text: text.clone(),
        });
        if let Some(sub) = sub.and_then(|id| self.documents.get_mut(&id)) {
            sub.label = text.clone();
            self.events.publish(GraphEvent::DocumentRenamed {
                document: sub.id,
                label: text,
            });
        }
        self.commit(doc_id, "Rename node")
    }

    /// Put a file or todo leaf into a node's grid
    pub fn add_leaf(&mut self, node: NodeId, leaf: Leaf, placement: Placement) -> Result<GridPos> {
        if leaf.embedded_document().is_some() {
            return Err(WorkspaceError::EmbeddedLeaf);
        }
        let doc_id = self.active;
        let pos = self.doc_mut(doc_id)?.add_leaf(node, leaf, placement)?;
        self.commit(doc_id, "Add leaf")?;
        Ok(pos)
    }

    /// Put a new embedded document view into a node's grid
    pub fn embed_document(&mut self, node: NodeId, placement: Placement) -> Result<(GridPos, DocumentId)> {
        let doc_id = self.active;
        let owner = self.doc(doc_id)?.node(node).ok_or(WorkspaceError::NodeNotFound(node))?;
        let mut sub = GraphDocument::new(document_label(owner));
        sub.owner = Some(DocumentOwner { document: doc_id, node });
        let sub_id = sub.id;
        let leaf = Leaf::new(LeafContent::Embedded { document: sub_id });
        let pos = self.doc_mut(doc_id)?.add_leaf(node, leaf, placement)?;

        self.documents.insert(sub_id, sub);
        self.events.publish(GraphEvent::DocumentCreated {
            document: sub_id,
            owner: Some(node),
        });
        self.commit(doc_id, "Embed document")?;
        self.start_history(sub_id)?;
        Ok((pos, sub_id))
    }

    /// Remove a leaf from a grid, leaving a placeholder
    pub fn remove_cell(&mut self, node: NodeId, cell: GridPos) -> Result<Leaf> {
        let doc_id = self.active;
        let leaf = self.doc_mut(doc_id)?.remove_cell(node, cell)?;
        if let Some(document) = leaf.embedded_document() {
            self.drop_documents(vec![document]);
        }
        self.commit(doc_id, "Remove cell")?;
        Ok(leaf)
    }

    /// Replace a document's style overrides
    pub fn set_document_style(&mut self, id: DocumentId, style: DocumentStyle) -> Result<()> {
        self.doc_mut(id)?.style = style;
        self.commit(id, "Set document style")
    }

    /// Effective style of a node in the active document
    pub fn node_style(&self, node: NodeId) -> Option<ResolvedNodeStyle> {
        let doc = self.documents.get(&self.active)?;
        let n = doc.node(node)?;
        Some(match n.variant() {
            NodeVariant::Attribute => n.style.resolve(&doc.style.attribute, &self.config.style.attribute),
            NodeVariant::Logic => n.style.resolve(&doc.style.logic, &self.config.style.logic),
        })
    }

    /// Effective style of a pipe in the active document
    pub fn pipe_style(&self, pipe: PipeId) -> Option<ResolvedPipeStyle> {
        let doc = self.documents.get(&self.active)?;
        Some(doc.pipe(pipe)?.style.resolve(&doc.style.pipe, &self.config.style.pipe))
    }

    /// Consistency report over every document
    pub fn check(&self) -> Vec<Violation> {
        validate::check_documents(&self.documents)
    }

    /// Take every pending event
    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        self.events.drain()
    }
}

fn nested_documents(doc: &GraphDocument) -> Vec<DocumentId> {
    let mut nested = Vec::new();
    for node in doc.nodes() {
        nested.extend(node.sub_document());
        if let Some(grid) = node.grid() {
            nested.extend(grid.leaves().filter_map(|(_, leaf)| leaf.embedded_document()));
        }
    }
    nested
}

fn document_label(owner: &Node) -> String {
    if owner.text.is_empty() {
        format!("{}", owner.id)
    } else {
        owner.text.clone()
    }
}

fn crosses(curve: &[[f32; 2]], polyline: &[[f32; 2]]) -> bool {
    curve
        .windows(2)
        .any(|a| polyline.windows(2).any(|b| segments_intersect(a[0], a[1], b[0], b[1])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{Channel, PortKind};
    use std::cell::RefCell;

    fn workspace() -> Workspace {
        Workspace::new(EditorConfig::default()).unwrap()
    }

    fn port(ws: &Workspace, node: NodeId, kind: PortKind) -> PortId {
        ws.active_document()
            .unwrap()
            .node(node)
            .unwrap()
            .port(kind, Channel::True)
            .unwrap()
    }

    fn connect(ws: &mut Workspace, from: NodeId, to: NodeId) -> PipeId {
        let output = port(ws, from, PortKind::Output);
        let input = port(ws, to, PortKind::Input);
        let pipe = ws.begin_pipe(output).unwrap();
        ws.complete_pipe(pipe, input).unwrap();
        pipe
    }

    struct FakeUi {
        pointer: [f32; 2],
        selection: Vec<NodeId>,
        confirm: bool,
        asked: RefCell<Vec<NodeId>>,
    }

    impl UiQueries for FakeUi {
        fn pointer_position(&self) -> [f32; 2] {
            self.pointer
        }

        fn selection(&self) -> Vec<NodeId> {
            self.selection.clone()
        }

        fn confirm_delete(&self, node: NodeId, _descendants: usize) -> bool {
            self.asked.borrow_mut().push(node);
            self.confirm
        }
    }

    #[test]
    fn test_connect_updates_adjacency() {
        let mut ws = workspace();
        let a = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let b = ws.create_node(NodeVariant::Attribute, [400.0, 0.0], None).unwrap();
        let pipe = connect(&mut ws, a, b);

        let doc = ws.active_document().unwrap();
        assert!(doc.node(a).unwrap().adjacency.next_attribute.contains(&b));
        assert!(doc.node(b).unwrap().adjacency.last_attribute.contains(&a));
        assert_eq!(doc.pipe_count(), 1);
        let pipe = doc.pipe(pipe).unwrap();
        assert!(pipe.start_port.is_some() && pipe.end_port.is_some());
        assert!(ws.check().is_empty());
    }

    #[test]
    fn test_same_kind_connection_is_rejected_without_change() {
        let mut ws = workspace();
        let a = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let b = ws.create_node(NodeVariant::Attribute, [400.0, 0.0], None).unwrap();
        let pipe = ws.begin_pipe(port(&ws, a, PortKind::Output)).unwrap();
        let undo_depth = ws.history(ws.active()).unwrap().len();

        let result = ws.complete_pipe(pipe, port(&ws, b, PortKind::Output));
        assert!(matches!(
            result,
            Err(WorkspaceError::Connect(ConnectError::IncompatiblePortKinds(..)))
        ));
        assert!(ws.active_document().unwrap().pipe(pipe).unwrap().is_dragging());
        assert_eq!(ws.history(ws.active()).unwrap().len(), undo_depth);

        ws.abort_pipe(pipe).unwrap();
        assert_eq!(ws.active_document().unwrap().pipe_count(), 0);
        assert!(ws.check().is_empty());
    }

    #[test]
    fn test_drag_onto_interior_nests_into_placeholder() {
        let mut ws = workspace();
        let a = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let x = ws
            .create_node(NodeVariant::Attribute, [0.0, 0.0], Some(GridTarget { parent: a, cell: None }))
            .unwrap();
        ws.delete_node(x).unwrap();
        let placeholder = ws.active_document().unwrap().node(a).unwrap().grid().unwrap().first_empty();
        assert_eq!(placeholder, Some(GridPos::new(0, 0)));

        let c = ws.create_node(NodeVariant::Attribute, [600.0, 0.0], None).unwrap();
        ws.begin_drag(c).unwrap();
        assert_eq!(ws.update_drag(c, [20.0, 20.0]).unwrap(), DropTarget::Node(a));
        assert_eq!(ws.end_drag(c).unwrap(), ReparentOutcome::NestedInto(a));

        let doc = ws.active_document().unwrap();
        let link = doc.node(c).unwrap().parent.unwrap();
        assert_eq!(link.node, a);
        assert_eq!(Some(link.cell), placeholder);
        assert!(doc.root_nodes().all(|n| n.id != c));
        assert!(ws.check().is_empty());
    }

    #[test]
    fn test_end_drag_requires_session() {
        let mut ws = workspace();
        let a = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        assert!(matches!(ws.end_drag(a), Err(WorkspaceError::NoDrag(_))));

        ws.begin_drag(a).unwrap();
        ws.update_drag(a, [50.0, 50.0]).unwrap();
        ws.cancel_drag();
        assert_eq!(ws.active_document().unwrap().node(a).unwrap().position, [0.0, 0.0]);
        assert!(ws.drag().is_none());
    }

    #[test]
    fn test_delete_owner_removes_sub_document() {
        let mut ws = workspace();
        let root = ws.root();
        let a = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let b = ws.create_node(NodeVariant::Attribute, [400.0, 0.0], None).unwrap();
        connect(&mut ws, a, b);

        let sub = ws.open_sub_document(a).unwrap();
        assert_eq!(ws.active(), sub);
        let d = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let e = ws.create_node(NodeVariant::Logic, [300.0, 0.0], None).unwrap();
        connect(&mut ws, d, e);
        let d_ports = ws.active_document().unwrap().node(d).unwrap().port_ids();

        ws.set_active_document(root).unwrap();
        ws.delete_node(a).unwrap();

        assert!(ws.document(sub).is_none());
        assert!(ws.history(sub).is_none());
        for doc in ws.documents().values() {
            assert!(!doc.contains_node(d));
            for pipe in doc.pipes() {
                assert!(pipe.ends().all(|p| !d_ports.contains(&p)));
            }
        }
        assert_eq!(ws.document(root).unwrap().pipe_count(), 0);
        assert!(ws.check().is_empty());
        let events = ws.drain_events();
        assert!(events.contains(&GraphEvent::DocumentsRemoved(vec![sub])));
    }

    #[test]
    fn test_round_trip_preserves_everything() {
        let mut ws = workspace();
        let a = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let b = ws.create_node(NodeVariant::Logic, [400.0, 0.0], None).unwrap();
        ws.create_node(NodeVariant::Attribute, [0.0, 0.0], Some(GridTarget { parent: a, cell: None }))
            .unwrap();
        ws.add_leaf(a, Leaf::todo("write notes"), Placement::Append { new_line: true })
            .unwrap();
        connect(&mut ws, a, b);
        ws.set_node_text(a, "Chapter").unwrap();
        ws.open_sub_document(a).unwrap();
        ws.create_node(NodeVariant::Attribute, [10.0, 10.0], None).unwrap();

        for format in [Format::Ron, Format::Binary] {
            let bytes = ws.serialize_as(ws.root(), format).unwrap();
            let mut loaded = workspace();
            let root = loaded.deserialize(&bytes).unwrap();
            assert_eq!(root, ws.root());
            assert_eq!(loaded.active(), ws.active());
            assert_eq!(loaded.documents().len(), ws.documents().len());
            assert_eq!(
                codec::capture(loaded.documents(), root).unwrap(),
                codec::capture(ws.documents(), ws.root()).unwrap()
            );
            assert!(loaded.check().is_empty());
        }
    }

    #[test]
    fn test_import_regenerates_ids() {
        let mut ws = workspace();
        let a = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let b = ws.create_node(NodeVariant::Attribute, [400.0, 0.0], None).unwrap();
        connect(&mut ws, a, b);
        ws.open_sub_document(a).unwrap();
        ws.set_active_document(ws.root()).unwrap();
        let bytes = ws.serialize(ws.root()).unwrap();

        let imported = ws.import_document(&bytes).unwrap();
        assert_eq!(imported.len(), 2);
        assert!(!imported.contains(&a) && !imported.contains(&b));
        let doc = ws.active_document().unwrap();
        assert_eq!(doc.node_count(), 4);
        assert_eq!(doc.pipe_count(), 2);
        assert_eq!(ws.documents().len(), 3);
        assert!(ws.check().is_empty());
    }

    #[test]
    fn test_corrupt_load_keeps_workspace() {
        let mut ws = workspace();
        let a = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let root = ws.root();
        assert!(ws.deserialize(b"not a document").is_err());
        assert!(ws.deserialize(b"NNGB\x01\x02").is_err());
        assert_eq!(ws.root(), root);
        assert!(ws.active_document().unwrap().contains_node(a));
    }

    #[test]
    fn test_load_rejects_ids_at_the_boundary() {
        let mut ws = workspace();
        let a = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let bytes = ws.serialize(ws.root()).unwrap();
        let mut record = codec::decode(&bytes).unwrap();
        record.root.as_mut().unwrap().nodes[0].id = NodeId(u64::MAX);
        let bytes = codec::encode(&record, Format::Ron).unwrap();

        let mut loaded = workspace();
        assert!(matches!(
            loaded.deserialize(&bytes),
            Err(WorkspaceError::Codec(codec::CodecError::Corrupt(_)))
        ));
        let b = loaded.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let c = loaded.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        assert!(b.value() > a.value() && c.value() > b.value());
        assert_ne!(b.value(), u64::MAX);
        assert!(loaded.check().is_empty());
    }

    #[test]
    fn test_save_and_load_path() {
        let path = std::env::temp_dir().join(format!("nodenote_workspace_{}.ron", std::process::id()));
        let mut ws = workspace();
        let a = ws.create_node(NodeVariant::Attribute, [5.0, 5.0], None).unwrap();
        ws.save_to_path(&path).unwrap();

        let mut loaded = workspace();
        loaded.load_from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.active_document().unwrap().node(a).unwrap().position, [5.0, 5.0]);
    }

    #[test]
    fn test_undo_redo_restores_connection() {
        let mut ws = workspace();
        let a = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let b = ws.create_node(NodeVariant::Attribute, [400.0, 0.0], None).unwrap();
        let pipe = connect(&mut ws, a, b);

        assert!(ws.undo().unwrap());
        let doc = ws.active_document().unwrap();
        assert_eq!(doc.pipe_count(), 0);
        assert!(doc.node(a).unwrap().adjacency.is_empty());
        assert!(doc.node(a).unwrap().port_ids().iter().all(|p| doc.port(*p).unwrap().pipes().is_empty()));

        assert!(ws.redo().unwrap());
        let doc = ws.active_document().unwrap();
        assert!(doc.pipe(pipe).unwrap().is_connected());
        assert!(doc.node(b).unwrap().adjacency.has_last(a));
        assert!(!ws.redo().unwrap());
        assert!(ws.check().is_empty());
    }

    #[test]
    fn test_dropping_regrabbed_pipe_is_undoable() {
        let mut ws = workspace();
        let a = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let b = ws.create_node(NodeVariant::Attribute, [400.0, 0.0], None).unwrap();
        let pipe = connect(&mut ws, a, b);
        let input = port(&ws, b, PortKind::Input);
        let before = ws.history(ws.active()).unwrap().len();

        assert_eq!(ws.detach_pipe_end(pipe, input).unwrap(), port(&ws, a, PortKind::Output));
        ws.abort_pipe(pipe).unwrap();
        assert_eq!(ws.history(ws.active()).unwrap().len(), before + 1);
        assert_eq!(ws.active_document().unwrap().pipe_count(), 0);

        assert!(ws.undo().unwrap());
        let doc = ws.active_document().unwrap();
        assert!(doc.pipe(pipe).unwrap().is_connected());
        assert!(doc.node(b).unwrap().adjacency.has_last(a));

        assert!(ws.redo().unwrap());
        assert_eq!(ws.active_document().unwrap().pipe_count(), 0);
        assert!(!ws.redo().unwrap());
        assert!(ws.check().is_empty());
    }

    #[test]
    fn test_fresh_pipe_abort_takes_no_snapshot() {
        let mut ws = workspace();
        let a = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let before = ws.history(ws.active()).unwrap().len();
        let pipe = ws.begin_pipe(port(&ws, a, PortKind::Output)).unwrap();
        ws.abort_pipe(pipe).unwrap();
        assert_eq!(ws.history(ws.active()).unwrap().len(), before);
        assert_eq!(ws.active_document().unwrap().pipe_count(), 0);
    }

    #[test]
    fn test_undo_past_oldest_is_noop() {
        let mut ws = workspace();
        for i in 0..60 {
            ws.create_node(NodeVariant::Logic, [i as f32 * 200.0, 0.0], None).unwrap();
        }
        assert_eq!(ws.history(ws.active()).unwrap().len(), 50);

        let mut undone = 0;
        while ws.undo().unwrap() {
            undone += 1;
        }
        assert_eq!(undone, 49);
        assert_eq!(ws.active_document().unwrap().node_count(), 11);
        assert!(!ws.undo().unwrap());
    }

    #[test]
    fn test_undo_restores_deleted_sub_document() {
        let mut ws = workspace();
        let a = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let sub = ws.open_sub_document(a).unwrap();
        ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        ws.set_active_document(ws.root()).unwrap();
        ws.delete_node(a).unwrap();
        assert!(ws.document(sub).is_none());

        assert!(ws.undo().unwrap());
        let restored = ws.document(sub).unwrap();
        assert_eq!(restored.node_count(), 1);
        assert_eq!(restored.owner.map(|o| o.node), Some(a));
        assert!(ws.history(sub).is_some());
        assert!(ws.check().is_empty());
    }

    #[test]
    fn test_cut_pipes_crossing_line() {
        let mut ws = workspace();
        let a = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let b = ws.create_node(NodeVariant::Attribute, [400.0, 0.0], None).unwrap();
        let pipe = connect(&mut ws, a, b);

        assert!(ws.cut_pipes(&[[261.0, 500.0], [261.0, 400.0]]).unwrap().is_empty());
        assert_eq!(ws.cut_pipes(&[[261.0, -100.0], [261.0, 200.0]]).unwrap(), vec![pipe]);
        let doc = ws.active_document().unwrap();
        assert_eq!(doc.pipe_count(), 0);
        assert!(!doc.node(a).unwrap().adjacency.has_next(b));
    }

    #[test]
    fn test_rename_updates_sub_document_label() {
        let mut ws = workspace();
        let a = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let sub = ws.open_sub_document(a).unwrap();
        ws.set_active_document(ws.root()).unwrap();
        ws.drain_events();

        ws.set_node_text(a, "Research").unwrap();
        assert_eq!(ws.document(sub).unwrap().label, "Research");
        let events = ws.drain_events();
        assert!(events.contains(&GraphEvent::DocumentRenamed {
            document: sub,
            label: "Research".to_string()
        }));
    }

    #[test]
    fn test_delete_selection_asks_before_removing_children() {
        let mut ws = workspace();
        let parent = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        ws.create_node(NodeVariant::Attribute, [0.0, 0.0], Some(GridTarget { parent, cell: None }))
            .unwrap();
        let single = ws.create_node(NodeVariant::Logic, [400.0, 0.0], None).unwrap();

        let ui = FakeUi {
            pointer: [0.0, 0.0],
            selection: vec![parent, single],
            confirm: false,
            asked: RefCell::new(Vec::new()),
        };
        assert_eq!(ws.delete_selection(&ui).unwrap(), vec![single]);
        assert_eq!(*ui.asked.borrow(), vec![parent]);
        assert_eq!(ws.active_document().unwrap().node_count(), 2);
    }

    #[test]
    fn test_create_at_pointer_and_invalid_nesting() {
        let mut ws = workspace();
        let ui = FakeUi {
            pointer: [30.0, 40.0],
            selection: Vec::new(),
            confirm: true,
            asked: RefCell::new(Vec::new()),
        };
        let a = ws.create_node_at_pointer(&ui, NodeVariant::Attribute).unwrap();
        assert_eq!(ws.active_document().unwrap().node(a).unwrap().position, [30.0, 40.0]);

        let result = ws.create_node(NodeVariant::Logic, [0.0, 0.0], Some(GridTarget { parent: a, cell: None }));
        assert!(matches!(result, Err(WorkspaceError::Nest(NestError::NotNestable(_)))));
        assert_eq!(ws.active_document().unwrap().node_count(), 1);
        assert!(ws.check().is_empty());
    }

    #[test]
    fn test_embedded_document_dropped_with_cell() {
        let mut ws = workspace();
        let a = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let (cell, sub) = ws.embed_document(a, Placement::FirstEmpty).unwrap();
        assert_eq!(ws.document(sub).unwrap().owner.map(|o| o.node), Some(a));
        assert!(ws.check().is_empty());

        assert!(matches!(
            ws.add_leaf(a, Leaf::new(LeafContent::Embedded { document: sub }), Placement::FirstEmpty),
            Err(WorkspaceError::EmbeddedLeaf)
        ));
        ws.remove_cell(a, cell).unwrap();
        assert!(ws.document(sub).is_none());
    }

    #[test]
    fn test_document_style_overrides_defaults() {
        let mut ws = workspace();
        let a = ws.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        assert_eq!(ws.node_style(a).unwrap(), ws.config().style.attribute);

        let mut style = DocumentStyle::default();
        style.attribute.background = Some([1, 2, 3, 255]);
        ws.set_document_style(ws.root(), style).unwrap();
        assert_eq!(ws.node_style(a).unwrap().background, [1, 2, 3, 255]);
    }

    #[test]
    fn test_import_keeps_active_document_style() {
        let mut source = workspace();
        source.create_node(NodeVariant::Attribute, [0.0, 0.0], None).unwrap();
        let mut style = DocumentStyle::default();
        style.attribute.background = Some([9, 9, 9, 255]);
        source.set_document_style(source.root(), style).unwrap();
        let bytes = source.serialize(source.root()).unwrap();

        let mut ws = workspace();
        let imported = ws.import_document(&bytes).unwrap();
        assert_eq!(ws.active_document().unwrap().style, DocumentStyle::default());
        assert_eq!(ws.node_style(imported[0]).unwrap(), ws.config().style.attribute);
    }
}
