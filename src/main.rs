use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quill::journal::types::GroupBy;
use quill::{cli, config, server};

#[derive(Parser)]
#[command(name = "quill", version, about = "Local-first development journal MCP server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport)
    Serve,
    /// Start the MCP server over streamable HTTP
    ServeHttp,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Create, list, restore, and prune journal snapshots
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
    /// Print journal statistics
    Stats {
        /// Period grouping: day, week, or month
        #[arg(long, default_value = "week")]
        group_by: String,
    },
    /// Rebuild the semantic index from the journal
    Reindex,
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.quill/models/
    Download,
}

#[derive(Subcommand)]
enum BackupAction {
    /// Write a snapshot to the backup directory
    Create {
        /// Label folded into the snapshot filename
        #[arg(long)]
        name: Option<String>,
    },
    /// List snapshots, newest first
    List,
    /// Replace the journal with a named snapshot
    Restore {
        /// Snapshot filename (bare name, no path)
        filename: String,
    },
    /// Delete old snapshots
    Prune {
        /// How many newest snapshots to keep
        #[arg(long)]
        keep: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::QuillConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter =
        EnvFilter::try_new(&config.server.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve_stdio(config).await?,
        Command::ServeHttp => server::serve_http(config).await?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
        Command::Backup { action } => match action {
            BackupAction::Create { name } => cli::backup::create(&config, name.as_deref())?,
            BackupAction::List => cli::backup::list(&config)?,
            BackupAction::Restore { filename } => cli::backup::restore(&config, &filename)?,
            BackupAction::Prune { keep } => cli::backup::prune(&config, keep)?,
        },
        Command::Stats { group_by } => {
            let group_by: GroupBy = group_by.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            cli::stats::stats(&config, group_by)?;
        }
        Command::Reindex => cli::reindex::reindex(&config)?,
    }

    Ok(())
}
