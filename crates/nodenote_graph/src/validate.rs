// SPDX-License-Identifier: MIT OR Apache-2.0
//! Consistency checks over documents.
//!
//! Checks report, they never repair. Adjacency that disagrees with pipe
//! connectivity is reported as [`Violation::UnbackedAdjacency`] or
//! [`Violation::MissingAdjacency`].

use crate::codec::DocumentMap;
use crate::document::GraphDocument;
use crate::grid::{Cell, GridPos};
use crate::id::{DocumentId, NodeId, PipeId, PortId};

/// One broken invariant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// A pipe with neither end set
    #[error("{0} has no ends")]
    PipeWithoutEnds(PipeId),

    /// A pipe joining two ports of the same kind
    #[error("{0} joins ports of the same kind")]
    SameKindPipe(PipeId),

    /// Pipe and port disagree about their link
    #[error("{pipe} and {port} disagree about their link")]
    PortPipeAsymmetry {
        /// Pipe
        pipe: PipeId,
        /// Port
        port: PortId,
    },

    /// A port whose owner is missing or does not list it
    #[error("{port} is not owned by {node}")]
    PortOwnerMismatch {
        /// Port
        port: PortId,
        /// Claimed owner
        node: NodeId,
    },

    /// A complete pipe without matching adjacency entries
    #[error("{pipe} from {from} to {to} is missing from adjacency")]
    MissingAdjacency {
        /// Pipe
        pipe: PipeId,
        /// Output-side node
        from: NodeId,
        /// Input-side node
        to: NodeId,
    },

    /// An adjacency entry with no complete pipe behind it
    #[error("{node} lists {neighbour} without a pipe between them")]
    UnbackedAdjacency {
        /// Node holding the entry
        node: NodeId,
        /// Listed neighbour
        neighbour: NodeId,
    },

    /// An adjacency entry pointing at a missing node
    #[error("{node} lists missing node {neighbour}")]
    DanglingAdjacency {
        /// Node holding the entry
        node: NodeId,
        /// Missing neighbour
        neighbour: NodeId,
    },

    /// A grid with ragged rows
    #[error("Grid of {0} is not rectangular")]
    GridNotRectangular(NodeId),

    /// Parent link and parent grid disagree
    #[error("{node} and its parent {parent} disagree about cell {cell:?}")]
    ParentMismatch {
        /// Nested node
        node: NodeId,
        /// Parent node
        parent: NodeId,
        /// Cell involved
        cell: GridPos,
    },

    /// A nested document whose owner does not reference it
    #[error("{document} has a broken owner link")]
    OwnershipMismatch {
        /// Nested document
        document: DocumentId,
    },

    /// A node references a document that does not exist
    #[error("{node} references missing document {document}")]
    MissingDocument {
        /// Owner node
        node: NodeId,
        /// Missing document
        document: DocumentId,
    },
}

/// Check every invariant of a single document
pub fn check_document(doc: &GraphDocument) -> Vec<Violation> {
    let mut violations = Vec::new();
    check_pipes(doc, &mut violations);
    check_ports(doc, &mut violations);
    check_adjacency(doc, &mut violations);
    check_grids(doc, &mut violations);
    violations
}

/// Check every document plus the ownership links between them
pub fn check_documents(documents: &DocumentMap) -> Vec<Violation> {
    let mut violations: Vec<Violation> = documents.values().flat_map(check_document).collect();
    for doc in documents.values() {
        for node in doc.nodes() {
            let nested = node
                .sub_document()
                .into_iter()
                .chain(node.grid().into_iter().flat_map(|g| {
                    g.leaves()
                        .filter_map(|(_, leaf)| leaf.embedded_document())
                        .collect::<Vec<_>>()
                }));
            for document in nested {
                match documents.get(&document) {
                    None => violations.push(Violation::MissingDocument {
                        node: node.id,
                        document,
                    }),
                    Some(sub) => {
                        let owner_ok = sub.owner.is_some_and(|o| o.document == doc.id && o.node == node.id);
                        if !owner_ok {
                            violations.push(Violation::OwnershipMismatch { document });
                        }
                    }
                }
            }
        }
        if let Some(owner) = doc.owner {
            let referenced = documents
                .get(&owner.document)
                .and_then(|d| d.node(owner.node))
                .is_some_and(|n| {
                    n.sub_document() == Some(doc.id)
                        || n.grid()
                            .is_some_and(|g| g.leaves().any(|(_, l)| l.embedded_document() == Some(doc.id)))
                });
            if !referenced {
                violations.push(Violation::OwnershipMismatch { document: doc.id });
            }
        }
    }
    violations
}

fn check_pipes(doc: &GraphDocument, violations: &mut Vec<Violation>) {
    for pipe in doc.pipes() {
        if pipe.start_port.is_none() && pipe.end_port.is_none() {
            violations.push(Violation::PipeWithoutEnds(pipe.id));
        }
        for port in pipe.ends() {
            if !doc.port(port).is_some_and(|p| p.has_pipe(pipe.id)) {
                violations.push(Violation::PortPipeAsymmetry { pipe: pipe.id, port });
            }
        }
        if let (Some(start), Some(end)) = (pipe.start_port, pipe.end_port) {
            let same = match (doc.port(start), doc.port(end)) {
                (Some(a), Some(b)) => a.kind == b.kind,
                _ => false,
            };
            if same {
                violations.push(Violation::SameKindPipe(pipe.id));
            }
        }
    }
}

fn check_ports(doc: &GraphDocument, violations: &mut Vec<Violation>) {
    for port in doc.ports() {
        if !doc.node(port.node).is_some_and(|n| n.owns_port(port.id)) {
            violations.push(Violation::PortOwnerMismatch {
                port: port.id,
                node: port.node,
            });
        }
        for pipe in port.pipes() {
            if !doc.pipe(*pipe).is_some_and(|p| p.involves_port(port.id)) {
                violations.push(Violation::PortPipeAsymmetry {
                    pipe: *pipe,
                    port: port.id,
                });
            }
        }
    }
}

fn check_adjacency(doc: &GraphDocument, violations: &mut Vec<Violation>) {
    let links: Vec<(PipeId, NodeId, NodeId)> = doc
        .pipes()
        .filter_map(|p| doc.pipe_nodes(p.id).map(|(from, to)| (p.id, from, to)))
        .collect();
    for (pipe, from, to) in &links {
        let next_ok = doc.node(*from).is_some_and(|n| n.adjacency.has_next(*to));
        let last_ok = doc.node(*to).is_some_and(|n| n.adjacency.has_last(*from));
        if !next_ok || !last_ok {
            violations.push(Violation::MissingAdjacency {
                pipe: *pipe,
                from: *from,
                to: *to,
            });
        }
    }
    for node in doc.nodes() {
        let adjacency = &node.adjacency;
        let downstream = adjacency.next_attribute.iter().chain(&adjacency.next_logic);
        let upstream = adjacency.last_attribute.iter().chain(&adjacency.last_logic);
        let entries = downstream
            .map(|n| (*n, (node.id, *n)))
            .chain(upstream.map(|n| (*n, (*n, node.id))));
        for (neighbour, (from, to)) in entries {
            if !doc.contains_node(neighbour) {
                violations.push(Violation::DanglingAdjacency {
                    node: node.id,
                    neighbour,
                });
            } else if !links.iter().any(|(_, f, t)| *f == from && *t == to) {
                violations.push(Violation::UnbackedAdjacency {
                    node: node.id,
                    neighbour,
                });
            }
        }
    }
}

fn check_grids(doc: &GraphDocument, violations: &mut Vec<Violation>) {
    for node in doc.nodes() {
        if let Some(grid) = node.grid() {
            if !grid.is_rectangular() {
                violations.push(Violation::GridNotRectangular(node.id));
            }
            for (cell, entry) in grid.cells() {
                if let Cell::Child(child) = entry {
                    let agrees = doc
                        .node(*child)
                        .and_then(|c| c.parent)
                        .is_some_and(|link| link.node == node.id && link.cell == cell);
                    if !agrees {
                        violations.push(Violation::ParentMismatch {
                            node: *child,
                            parent: node.id,
                            cell,
                        });
                    }
                }
            }
        }
        if let Some(link) = node.parent {
            let listed = doc
                .node(link.node)
                .and_then(|p| p.grid())
                .and_then(|g| g.get(link.cell))
                .and_then(Cell::child)
                == Some(node.id);
            if !listed {
                violations.push(Violation::ParentMismatch {
                    node: node.id,
                    parent: link.node,
                    cell: link.cell,
                });
            }
        }
    }
}
