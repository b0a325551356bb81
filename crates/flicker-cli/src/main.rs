use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

use flicker_swf::{Status, SwfDecoder};

mod info;
mod run;

#[derive(Parser)]
#[command(name = "flicker", version, about = "Flicker animation interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file and print its header and dictionary.
    Info {
        file: PathBuf,
        /// Emit machine-readable JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Run a file's timeline, printing trace output.
    Run {
        file: PathBuf,
        /// Number of frames to advance; defaults to one pass over the
        /// timeline.
        #[arg(long)]
        frames: Option<u32>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("FLICKER_LOG")
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Info { file, json } => info::info(&file, json),
        Commands::Run { file, frames } => run::run(&file, frames),
    }
}

/// Decode a whole file from disk.
fn decode_file(path: &PathBuf) -> Result<SwfDecoder> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mut decoder = SwfDecoder::new();
    let mut status = decoder
        .feed(&data)
        .with_context(|| format!("parsing {}", path.display()))?;
    if status == Status::Init {
        status = decoder.feed(&[]).context("parsing tag stream")?;
    }
    if status != Status::Eof {
        decoder.signal_eof();
    }
    Ok(decoder)
}
