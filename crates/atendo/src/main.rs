// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atendo - a real-time remote-support signaling hub.
//!
//! This is the binary entry point for the Atendo server.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod doctor;
mod serve;

/// Atendo - a real-time remote-support signaling hub.
#[derive(Parser, Debug)]
#[command(name = "atendo", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Atendo hub server.
    Serve,
    /// Run diagnostic checks against the configured environment.
    Doctor,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match atendo_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            atendo_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("atendo serve failed: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Doctor) => {
            if let Err(e) = doctor::run_doctor(&config).await {
                eprintln!("atendo doctor failed: {e}");
                std::process::exit(1);
            }
        }
        None => {
            println!("atendo: use --help for available commands");
        }
    }
}
