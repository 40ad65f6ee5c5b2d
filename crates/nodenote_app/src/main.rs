// SPDX-License-Identifier: MIT OR Apache-2.0
//! `NodeNote` command-line front end.
//!
//! Works on saved note workspaces without a user interface:
//! - `inspect <file>`: print the document tree
//! - `check <file>`: report broken invariants
//! - `convert <in> <out>`: re-encode as RON or binary
//! - `demo <out>`: write a sample workspace

use clap::{Parser, Subcommand};
use nodenote_graph::{
    Channel, DocumentId, EditorConfig, Format, GraphDocument, GridTarget, Leaf, NodeId, NodeVariant, Placement,
    PortId, PortKind, Workspace, WorkspaceError,
};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "nodenote")]
#[command(author, version, about = "Inspect and convert NodeNote documents", long_about = None)]
struct Cli {
    /// Editor configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the documents, nodes and pipes of a file
    Inspect {
        /// Workspace file
        path: PathBuf,
    },

    /// Check a file for broken invariants
    Check {
        /// Workspace file
        path: PathBuf,
    },

    /// Re-encode a file
    Convert {
        /// Source file
        input: PathBuf,
        /// Destination file
        output: PathBuf,
        /// Write the binary encoding instead of RON
        #[arg(short, long)]
        binary: bool,
    },

    /// Write a sample workspace with nesting and a spliced pipe
    Demo {
        /// Destination file
        output: PathBuf,
        /// Write the binary encoding instead of RON
        #[arg(short, long)]
        binary: bool,
    },
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nodenote_app=info,nodenote_graph=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    }
}

/// Run a command, returning `false` when the check found problems
fn run(cli: Cli) -> Result<bool, WorkspaceError> {
    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    let mut workspace = Workspace::new(config)?;

    match cli.command {
        Commands::Inspect { path } => {
            workspace.load_from_path(&path)?;
            print_tree(&workspace, workspace.root(), 0);
            Ok(true)
        }

        Commands::Check { path } => {
            workspace.load_from_path(&path)?;
            let violations = workspace.check();
            for violation in &violations {
                println!("{violation}");
            }
            println!("{} documents, {} problems", workspace.documents().len(), violations.len());
            Ok(violations.is_empty())
        }

        Commands::Convert { input, output, binary } => {
            workspace.load_from_path(&input)?;
            let bytes = workspace.serialize_as(workspace.root(), format(binary))?;
            std::fs::write(&output, bytes)?;
            tracing::info!("Wrote {:?}", output);
            Ok(true)
        }

        Commands::Demo { output, binary } => {
            build_demo(&mut workspace)?;
            let bytes = workspace.serialize_as(workspace.root(), format(binary))?;
            std::fs::write(&output, bytes)?;
            print_tree(&workspace, workspace.root(), 0);
            Ok(true)
        }
    }
}

fn format(binary: bool) -> Format {
    if binary {
        Format::Binary
    } else {
        Format::Ron
    }
}

fn true_port(doc: Option<&GraphDocument>, node: NodeId, kind: PortKind) -> Option<PortId> {
    doc?.node(node)?.port(kind, Channel::True)
}

/// Two linked topics, one with a nested note, and a logic node dropped on the link
fn build_demo(workspace: &mut Workspace) -> Result<(), WorkspaceError> {
    let topic = workspace.create_node(NodeVariant::Attribute, [0.0, 0.0], None)?;
    workspace.set_node_text(topic, "Topic")?;
    let detail = workspace.create_node(
        NodeVariant::Attribute,
        [0.0, 0.0],
        Some(GridTarget {
            parent: topic,
            cell: None,
        }),
    )?;
    workspace.set_node_text(detail, "Detail")?;
    workspace.add_leaf(
        topic,
        Leaf::todo("Summarise sources"),
        Placement::Append { new_line: true },
    )?;

    let next = workspace.create_node(NodeVariant::Attribute, [600.0, 0.0], None)?;
    workspace.set_node_text(next, "Follow-up")?;
    let from = true_port(workspace.active_document(), topic, PortKind::Output);
    let to = true_port(workspace.active_document(), next, PortKind::Input);
    if let (Some(from), Some(to)) = (from, to) {
        let pipe = workspace.begin_pipe(from)?;
        workspace.complete_pipe(pipe, to)?;
    }

    let gate = workspace.create_node(NodeVariant::Logic, [300.0, 400.0], None)?;
    let link_y = workspace
        .active_document()
        .and_then(|doc| doc.node(topic))
        .map_or(0.0, |n| n.position[1] + workspace.config().layout.header_height / 2.0);
    let gate_x = workspace
        .active_document()
        .and_then(|doc| doc.node_rect(topic))
        .map_or(300.0, |r| r.max[0] + 40.0);
    workspace.begin_drag(gate)?;
    let target = workspace.update_drag(gate, [gate_x, link_y - 20.0])?;
    let outcome = workspace.end_drag(gate)?;
    tracing::info!("Dropped logic node on {:?}: {:?}", target, outcome);

    let notes = workspace.open_sub_document(next)?;
    let idea = workspace.create_node(NodeVariant::Attribute, [0.0, 0.0], None)?;
    workspace.set_node_text(idea, "Idea")?;
    tracing::info!("Filled sub-document {}", notes);
    workspace.set_active_document(workspace.root())?;
    Ok(())
}

fn print_tree(workspace: &Workspace, id: DocumentId, depth: usize) {
    let Some(doc) = workspace.document(id) else {
        return;
    };
    let indent = "  ".repeat(depth);
    println!(
        "{indent}{} '{}': {} nodes, {} pipes",
        doc.id,
        doc.label,
        doc.node_count(),
        doc.pipe_count()
    );
    for node in doc.nodes() {
        let nesting = doc.depth(node.id);
        println!(
            "{indent}  {}{} {:?} '{}' at {:?}",
            "  ".repeat(nesting),
            node.id,
            node.variant(),
            node.text,
            node.position
        );
    }
    for pipe in doc.pipes() {
        if let Some((from, to)) = doc.pipe_nodes(pipe.id) {
            println!("{indent}  {} {} -> {}", pipe.id, from, to);
        }
    }
    for node in doc.nodes() {
        if let Some(sub) = node.sub_document() {
            print_tree(workspace, sub, depth + 1);
        }
        if let Some(grid) = node.grid() {
            for (_, leaf) in grid.leaves() {
                if let Some(embedded) = leaf.embedded_document() {
                    print_tree(workspace, embedded, depth + 1);
                }
            }
        }
    }
}
