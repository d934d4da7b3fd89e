//! Development tasks for experience content
//!
//! This binary provides development utilities using the cargo-xtask pattern.
//! Run with: `cargo xtask <command>`

mod commands;
mod dirs;
mod logging;

use anyhow::Result;
use clap::Parser;
use commands::{Simulate, Validate};

/// Development tasks for experience content
#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Development tools for gameplay experiences", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Load a content directory and report validation issues
    Validate(Validate),

    /// Run sessions against a content directory and report their lifecycle
    Simulate(Simulate),
}

fn main() -> Result<()> {
    // Load .env file if it exists (for EXPERIENCE_* and RUST_LOG)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Command::Validate(cmd) => cmd.execute(),
        Command::Simulate(cmd) => cmd.execute(),
    }
}
