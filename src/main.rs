mod cli;
mod config;
mod embedding;
mod pipeline;
mod table;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "swisstext", version, about = "Extract text embeddings with pretrained transformer models")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Embed every text in the text table and write the embedding table
    Run(cli::run::RunArgs),
    /// Manage pretrained models
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Show which execution device would be used
    Device,
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download a model's ONNX export and tokenizer to ~/.swisstext/models/
    Download {
        /// Model repository name, e.g. sentence-transformers/all-mpnet-base-v2
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::SwisstextConfig::load()?;

    // Log to stderr so stdout carries only progress and results.
    let filter = EnvFilter::try_new(&config.log.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Run(args) => {
            cli::run::run(&config, args).await?;
        }
        Command::Model { action } => match action {
            ModelAction::Download { name } => {
                cli::model_download(&config, &name).await?;
                println!("Model download complete. Ready for use.");
            }
        },
        Command::Device => {
            cli::device::device(&config)?;
        }
    }

    Ok(())
}
