//! Ambience engine process entry point.
//!
//! This binary is intentionally thin (spec `SPEC_FULL.md` §0): it loads a
//! persisted workspace document, decodes the sound files it references
//! into an [`ambience_registry::SoundFileRegistry`], builds an
//! [`ambience_mixer::Mixer`] over a chosen [`ambience_transport::Transport`],
//! and drives it until asked to stop. The HTTP control plane, the
//! chat-platform command handler, and the real voice-socket transport are
//! external collaborators (spec §1) with no home in this binary.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ambience")]
#[command(author, version, about = "Real-time generative ambience engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a workspace and drive the mixer against a transport until stopped.
    Run(commands::run::RunArgs),

    /// Load a workspace and report any effective-tree validation problems.
    Validate(commands::validate::ValidateArgs),

    /// Summarize a workspace document's environments, layers, and files.
    Info(commands::info::InfoArgs),
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Validate(args) => commands::validate::run(args),
        Commands::Info(args) => commands::info::run(args),
    }
}
