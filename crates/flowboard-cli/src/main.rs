//! CLI binary for inspecting and dry-running Flowboard pipelines.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use flowboard_graph::{
    CanvasEvent, EditorSession, FsStore, InstantClock, SystemClock,
};

#[derive(Parser)]
#[command(name = "flowboard", version, about = "Inspect, check, and dry-run persisted Flowboard pipelines")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a persisted pipeline
    Info {
        /// Directory holding the persisted pipeline store
        store: PathBuf,
    },

    /// Check a persisted pipeline (counts and DAG verdict)
    Check {
        /// Directory holding the persisted pipeline store
        store: PathBuf,

        /// Exit non-zero when the pipeline is not a DAG
        #[arg(long)]
        strict: bool,
    },

    /// Dry-run the simulation, streaming layers as they light up
    Simulate {
        /// Directory holding the persisted pipeline store
        store: PathBuf,

        /// Skip the highlight delays
        #[arg(long)]
        fast: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    match cli.command {
        Commands::Info { store } => {
            cmd_info(&store).await?;
        }
        Commands::Check { store, strict } => {
            cmd_check(&store, strict).await?;
        }
        Commands::Simulate { store, fast } => {
            cmd_simulate(&store, fast).await?;
        }
    }

    Ok(())
}

/// Open a session over the store directory and load the persisted pipeline.
async fn load_session(store_dir: &Path, fast: bool) -> anyhow::Result<EditorSession> {
    tracing::debug!(store = %store_dir.display(), "Opening pipeline store");
    let storage = Arc::new(FsStore::new(store_dir));
    let clock: Arc<dyn flowboard_graph::Clock> = if fast {
        Arc::new(InstantClock)
    } else {
        Arc::new(SystemClock)
    };
    let mut session = EditorSession::new(storage, clock);
    if !session.load().await? {
        anyhow::bail!(
            "No persisted pipeline found under {}",
            store_dir.display()
        );
    }
    Ok(session)
}

async fn cmd_info(store_dir: &Path) -> anyhow::Result<()> {
    let session = load_session(store_dir, true).await?;

    let report = session.report();
    println!("Pipeline store: {}", store_dir.display());
    println!("Nodes: {}", report.num_nodes);
    println!("Edges: {}", report.num_edges);

    println!("\nNodes:");
    for node in session.nodes() {
        println!(
            "  {} [{}] at ({:.0}, {:.0})",
            node.id, node.kind, node.position.x, node.position.y
        );
    }

    println!("\nEdges:");
    for edge in session.edges() {
        println!("  {} -> {}", edge.source, edge.target);
    }

    Ok(())
}

async fn cmd_check(store_dir: &Path, strict: bool) -> anyhow::Result<()> {
    let session = load_session(store_dir, true).await?;
    let report = session.report();

    println!("Nodes: {}", report.num_nodes);
    println!("Edges: {}", report.num_edges);
    println!("Is DAG: {}", if report.is_dag { "yes" } else { "no" });

    if strict && !report.is_dag {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_simulate(store_dir: &Path, fast: bool) -> anyhow::Result<()> {
    let session = load_session(store_dir, fast).await?;
    let mut events = session.events().subscribe();

    println!(
        "Simulating pipeline ({} nodes, {} edges)",
        session.nodes().len(),
        session.edges().len()
    );

    let run = session.run()?;
    let driver = tokio::spawn(run);

    while let Ok(event) = events.recv().await {
        match event {
            CanvasEvent::LayerActivated { index, node_ids } => {
                println!("Layer {}: {}", index + 1, node_ids.join(", "));
            }
            CanvasEvent::EdgesActivated { edge_ids, .. } => {
                println!("  ~ {} edge(s) firing", edge_ids.len());
            }
            CanvasEvent::SimulationFinished => {
                println!("Simulation complete");
                break;
            }
            _ => {}
        }
    }

    driver.await?;
    Ok(())
}
