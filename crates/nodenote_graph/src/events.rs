// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-process notifications published by the workspace.
//!
//! The workspace pushes an event for every committed change. Front ends drain
//! the queue after each command to refresh tree views and labels.

use crate::collision::ReparentOutcome;
use crate::id::{DocumentId, NodeId, PipeId};
use serde::{Deserialize, Serialize};

/// A change in the workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphEvent {
    /// A node was created
    NodeCreated {
        /// Owning document
        document: DocumentId,
        /// New node
        node: NodeId,
    },
    /// Nodes were deleted, the deleted node first
    NodesRemoved {
        /// Owning document
        document: DocumentId,
        /// Removed nodes
        nodes: Vec<NodeId>,
    },
    /// A node's display text changed
    NodeRenamed {
        /// Owning document
        document: DocumentId,
        /// Renamed node
        node: NodeId,
        /// New text
        text: String,
    },
    /// A pipe became fully connected
    PipeConnected {
        /// Owning document
        document: DocumentId,
        /// Connected pipe
        pipe: PipeId,
    },
    /// Pipes were removed
    PipesRemoved {
        /// Owning document
        document: DocumentId,
        /// Removed pipes
        pipes: Vec<PipeId>,
    },
    /// A drag finished
    Reparented {
        /// Owning document
        document: DocumentId,
        /// Dragged node
        node: NodeId,
        /// What the drop did
        outcome: ReparentOutcome,
    },
    /// A nested document was created
    DocumentCreated {
        /// New document
        document: DocumentId,
        /// Owner node
        owner: Option<NodeId>,
    },
    /// A document's tree label changed
    DocumentRenamed {
        /// Renamed document
        document: DocumentId,
        /// New label
        label: String,
    },
    /// Documents were dropped with their owner
    DocumentsRemoved(Vec<DocumentId>),
    /// The active document changed
    ActiveDocumentChanged(DocumentId),
    /// A document was restored from history
    HistoryRestored {
        /// Restored document
        document: DocumentId,
        /// Description of the restored snapshot
        description: String,
    },
    /// A whole workspace was loaded
    WorkspaceLoaded {
        /// New root document
        root: DocumentId,
    },
}

/// Queue of published events
#[derive(Debug, Default)]
pub struct EventBus {
    queue: Vec<GraphEvent>,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event
    pub fn publish(&mut self, event: GraphEvent) {
        tracing::trace!("Event: {:?}", event);
        self.queue.push(event);
    }

    /// Take every pending event in publish order
    pub fn drain(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.queue)
    }

    /// Pending events
    pub fn pending(&self) -> &[GraphEvent] {
        &self.queue
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties_queue_in_order() {
        let mut bus = EventBus::new();
        let doc = DocumentId::new();
        bus.publish(GraphEvent::ActiveDocumentChanged(doc));
        bus.publish(GraphEvent::DocumentsRemoved(vec![doc]));
        assert_eq!(bus.pending().len(), 2);

        let events = bus.drain();
        assert_eq!(events[0], GraphEvent::ActiveDocumentChanged(doc));
        assert!(bus.is_empty());
    }
}
