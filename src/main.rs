use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use time::OffsetDateTime;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::error;

use flowstep::config::{Config, ConfigError};
use flowstep::consts::{NEW_NODE_X, NEW_NODE_Y};
use flowstep::error::ErrorCode;
use flowstep::export::{self, ExportError};
use flowstep::format::{DiagramFile, FormatError};
use flowstep::graph::{GraphError, Position};
use flowstep::layout::{self, LayoutError, LayoutMode};
use flowstep::storage::{FsStorage, StorageError};
use flowstep::workspace::{Confirmation, Outcome, Workspace, WorkspaceEntry, WorkspaceError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("no workspace folder; pass --workspace or set FLOWSTEP_WORKSPACE")]
    MissingWorkspace,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("could not read input: {0}")]
    Input(#[from] std::io::Error),
}

impl ErrorCode for CliError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingWorkspace => "E_NO_WORKSPACE",
            Self::Config(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::Workspace(e) => e.error_code(),
            Self::Graph(e) => e.error_code(),
            Self::Layout(e) => e.error_code(),
            Self::Format(e) => e.error_code(),
            Self::Export(e) => e.error_code(),
            Self::Input(_) => "E_INPUT",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "flowstep", about = "FlowStep diagram workspace CLI")]
struct Cli {
    /// Folder holding the flow files (overrides FLOWSTEP_WORKSPACE).
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Accent color for exports (overrides FLOWSTEP_THEME_COLOR).
    #[arg(long, global = true)]
    theme: Option<String>,

    /// Export folder (overrides FLOWSTEP_EXPORT_DIR).
    #[arg(long, global = true)]
    export_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the flows in the workspace.
    List,
    /// Print a flow as JSON.
    Show { flow: String },
    /// Create a flow from the starter diagram.
    Create { name: String },
    /// Save a flow under a new name and remove the old file.
    Rename { flow: String, name: String },
    /// Delete a flow file.
    Delete {
        flow: String,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Replace a flow's content with a full JSON document.
    Replace {
        flow: String,
        #[arg(long, default_value = "-", help = "Input file path, or - for stdin")]
        input: String,
    },
    /// Add a node.
    AddNode {
        flow: String,
        #[arg(long)]
        label: Option<String>,
        #[arg(long, default_value_t = NEW_NODE_X)]
        x: f64,
        #[arg(long, default_value_t = NEW_NODE_Y)]
        y: f64,
        #[arg(long = "detail")]
        details: Vec<String>,
    },
    /// Connect two nodes.
    Connect {
        flow: String,
        source: String,
        target: String,
        #[arg(long)]
        source_handle: Option<String>,
        #[arg(long)]
        target_handle: Option<String>,
        #[arg(long)]
        label: Option<String>,
    },
    /// Remove a node and its edges.
    RemoveNode { flow: String, id: String },
    /// Remove an edge.
    RemoveEdge { flow: String, id: String },
    /// Align or distribute nodes; the first id is the anchor.
    Layout {
        flow: String,
        mode: LayoutMode,
        #[arg(num_args = 2.., required = true)]
        ids: Vec<String>,
    },
    /// Replay a flow step by step.
    Play {
        flow: String,
        /// Reveal from these nodes in order instead of advancing.
        #[arg(long = "click")]
        clicks: Vec<String>,
    },
    /// Write the portable HTML viewer for a flow.
    Export {
        flow: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.error_code(), error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::from_env()?.with_overrides(cli.workspace, cli.theme.as_deref(), cli.export_dir)?;
    let folder = config.workspace.clone().ok_or(CliError::MissingWorkspace)?;
    let mut ws = Workspace::new();
    ws.connect(FsStorage::open(folder).await?).await?;

    match cli.command {
        Command::List => {
            for entry in ws.listing() {
                println!("{}\t{}", entry.name, entry.file_name);
            }
            Ok(())
        }
        Command::Show { flow } => run_show(&mut ws, &flow).await,
        Command::Create { name } => {
            let entry = ws.create_entry(&name).await?;
            println!("created {}", entry.file_name);
            Ok(())
        }
        Command::Rename { flow, name } => run_rename(&mut ws, &flow, &name).await,
        Command::Delete { flow, yes } => run_delete(&mut ws, &flow, yes).await,
        Command::Replace { flow, input } => run_replace(&mut ws, &flow, &input).await,
        Command::AddNode { flow, label, x, y, details } => {
            run_add_node(&mut ws, &flow, label.as_deref(), Position::new(x, y), details).await
        }
        Command::Connect { flow, source, target, source_handle, target_handle, label } => {
            open_flow(&mut ws, &flow).await?;
            let graph = ws.graph_mut();
            let id = graph.add_edge(&source, &target, source_handle.as_deref(), target_handle.as_deref())?;
            if let Some(label) = label {
                graph.update_edge_label(&id, &label)?;
            }
            ws.save().await?;
            println!("{id}");
            Ok(())
        }
        Command::RemoveNode { flow, id } => {
            open_flow(&mut ws, &flow).await?;
            let removed = ws.graph_mut().remove_node(&id)?;
            ws.save().await?;
            println!("removed {id} and {} edge(s)", removed.len());
            Ok(())
        }
        Command::RemoveEdge { flow, id } => {
            open_flow(&mut ws, &flow).await?;
            ws.graph_mut().remove_edge(&id)?;
            ws.save().await?;
            println!("removed {id}");
            Ok(())
        }
        Command::Layout { flow, mode, ids } => run_layout(&mut ws, &flow, mode, &ids).await,
        Command::Play { flow, clicks } => {
            open_flow(&mut ws, &flow).await?;
            play(&mut ws, &clicks);
            Ok(())
        }
        Command::Export { flow, output } => run_export(&mut ws, &config, &flow, output).await,
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn run_show(ws: &mut Workspace<FsStorage>, flow: &str) -> Result<(), CliError> {
    let entry = open_flow(ws, flow).await?;
    let graph = ws.graph();
    println!("{}", DiagramFile::from_graph(graph, &entry.name, &graph.meta().notes).to_json()?);
    Ok(())
}

async fn run_rename(ws: &mut Workspace<FsStorage>, flow: &str, name: &str) -> Result<(), CliError> {
    let entry = open_flow(ws, flow).await?;
    if let Outcome::OrphanedFile(old) = ws.rename_entry(&entry.file_name, name).await? {
        eprintln!("new file created, old file {old} could not be deleted");
    }
    if let Some(renamed) = ws.selected() {
        println!("renamed to {}", renamed.file_name);
    }
    Ok(())
}

async fn run_delete(ws: &mut Workspace<FsStorage>, flow: &str, yes: bool) -> Result<(), CliError> {
    let entry = resolve(ws, flow)?;
    let confirmation = if yes { Confirmation::Confirmed } else { confirm(&format!("Delete \"{}\"?", entry.name)).await? };
    match ws.delete_entry(&entry.file_name, confirmation).await? {
        Outcome::Cancelled => println!("kept {}", entry.file_name),
        _ => println!("deleted {}", entry.file_name),
    }
    Ok(())
}

async fn run_replace(ws: &mut Workspace<FsStorage>, flow: &str, input: &str) -> Result<(), CliError> {
    let entry = open_flow(ws, flow).await?;
    let text = read_input(input).await?;
    ws.replace_content(&entry.file_name, &text)?;
    ws.save().await?;
    println!("replaced {}", entry.file_name);
    Ok(())
}

async fn run_add_node(
    ws: &mut Workspace<FsStorage>,
    flow: &str,
    label: Option<&str>,
    position: Position,
    details: Vec<String>,
) -> Result<(), CliError> {
    open_flow(ws, flow).await?;
    let graph = ws.graph_mut();
    let id = graph.add_node(position);
    if let Some(label) = label {
        graph.update_node_label(&id, label)?;
    }
    if !details.is_empty() {
        graph.update_node_details(&id, details)?;
    }
    ws.save().await?;
    println!("{id}");
    Ok(())
}

async fn run_layout(ws: &mut Workspace<FsStorage>, flow: &str, mode: LayoutMode, ids: &[String]) -> Result<(), CliError> {
    open_flow(ws, flow).await?;
    let placements = layout::compute(ws.graph(), ids, mode)?;
    ws.graph_mut().apply_positions(&placements)?;
    ws.save().await?;
    for (id, position) in &placements {
        println!("{id}\t{}\t{}", position.x, position.y);
    }
    Ok(())
}

async fn run_export(
    ws: &mut Workspace<FsStorage>,
    config: &Config,
    flow: &str,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    open_flow(ws, flow).await?;
    let snapshot = ws.export_snapshot();
    let path = match output {
        Some(path) => {
            export::write_viewer_to(&path, &snapshot, &config.theme_color).await?;
            path
        }
        None => {
            let today = OffsetDateTime::now_utc().date();
            export::write_viewer(&config.export_dir, &snapshot, &config.theme_color, today).await?
        }
    };
    println!("{}", path.display());
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

fn resolve(ws: &Workspace<FsStorage>, flow: &str) -> Result<WorkspaceEntry, CliError> {
    ws.find_entry(flow)
        .cloned()
        .ok_or_else(|| WorkspaceError::UnknownEntry(flow.to_string()).into())
}

async fn open_flow(ws: &mut Workspace<FsStorage>, flow: &str) -> Result<WorkspaceEntry, CliError> {
    let entry = resolve(ws, flow)?;
    ws.select_entry(&entry.file_name, Confirmation::Confirmed).await?;
    Ok(entry)
}

/// Print each reveal step; clicks drive the reveal when given.
fn play(ws: &mut Workspace<FsStorage>, clicks: &[String]) {
    ws.enter_sequence();
    print_step(ws, 0);
    if clicks.is_empty() {
        let mut step = 0;
        while ws.sequence().can_advance(ws.graph()) {
            ws.advance_sequence();
            step += 1;
            print_step(ws, step);
        }
    } else {
        for (step, id) in clicks.iter().enumerate() {
            if !ws.click_node(id) {
                eprintln!("{id}: hidden or has no outgoing edges");
            }
            print_step(ws, step + 1);
        }
    }
    if ws.sequence().is_complete(ws.graph()) {
        println!("flow complete");
    }
}

fn print_step(ws: &Workspace<FsStorage>, step: usize) {
    let sequence = ws.sequence();
    let shown: Vec<String> = ws
        .graph()
        .nodes()
        .iter()
        .filter(|n| sequence.node_visible(&n.id))
        .map(|n| {
            let marker = if sequence.is_highlighted(&n.id) { "*" } else { "" };
            let text = if n.label.is_empty() { n.id.as_str() } else { n.label.as_str() };
            format!("{marker}{text}")
        })
        .collect();
    println!("{step}: {}", shown.join(", "));
}

async fn read_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut text = String::new();
        tokio::io::stdin().read_to_string(&mut text).await?;
        return Ok(text);
    }
    Ok(tokio::fs::read_to_string(Path::new(input)).await?)
}

async fn confirm(prompt: &str) -> Result<Confirmation, CliError> {
    eprint!("{prompt} [y/N] ");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(match line.trim() {
        "y" | "Y" | "yes" => Confirmation::Confirmed,
        _ => Confirmation::Declined,
    })
}
