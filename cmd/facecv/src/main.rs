//! facecv - recognize and enroll faces from embedding vectors.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{EnrollCommand, InspectCommand, ListCommand, QueryCommand, RunCommand};
use config::Backend;

/// facecv - recognize and enroll faces from embedding vectors.
///
/// Embeddings are produced by an external face model and read as JSON
/// arrays, one vector per line. The face database lives in
/// ~/.facecv/ unless configured otherwise.
#[derive(Parser)]
#[command(name = "facecv")]
#[command(about = "Face identity matching over embedding vectors")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.facecv/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Face database path (overrides config file)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Storage backend (overrides config file)
    #[arg(long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Output as JSON instead of YAML
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add embedding samples for a named identity
    Enroll(EnrollCommand),
    /// Recognize embeddings against enrolled identities
    Query(QueryCommand),
    /// List enrolled identities
    List(ListCommand),
    /// Show database and configuration summary
    Inspect(InspectCommand),
    /// Recognize a stream of embeddings, prompting to enroll unknown faces
    Run(RunCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match &cli.command {
        Commands::Enroll(cmd) => cmd.run(&cli),
        Commands::Query(cmd) => cmd.run(&cli),
        Commands::List(cmd) => cmd.run(&cli),
        Commands::Inspect(cmd) => cmd.run(&cli),
        Commands::Run(cmd) => cmd.run(&cli),
    }
}
