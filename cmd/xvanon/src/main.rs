//! xvanon - pseudo-speaker x-vector generation for speaker anonymization.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod corpus;
mod voxceleb;

use commands::{GenCommand, InspectCommand, Spk2genderCommand, TrainCommand};

/// xvanon - replace speaker x-vectors with sampled pseudo-speakers.
///
/// A PCA + Gaussian mixture model is fitted per gender over a pool of
/// x-vectors, and every source speaker receives a synthesized x-vector
/// drawn from it, optionally of the opposite gender and constrained to be
/// dissimilar from the original.
#[derive(Parser)]
#[command(name = "xvanon")]
#[command(about = "Pseudo-speaker x-vector generation")]
#[command(version)]
pub struct Cli {
    /// YAML file with default model and sampling options
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate pseudo-speaker x-vectors for a source data directory
    Gen(GenCommand),
    /// Fit models over a pool and save them
    Train(TrainCommand),
    /// Summarize a saved model file
    Inspect(InspectCommand),
    /// Build spk2gender from VoxCeleb metadata
    Spk2gender(Spk2genderCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Gen(cmd) => cmd.run(&cli),
        Commands::Train(cmd) => cmd.run(&cli),
        Commands::Inspect(cmd) => cmd.run(&cli),
        Commands::Spk2gender(cmd) => cmd.run(&cli),
    }
}
