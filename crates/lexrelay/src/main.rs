// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lexrelay - WeCom legal customer-service backend.
//!
//! Binary entry point: loads configuration, then dispatches to the
//! requested subcommand.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod serve;
mod shutdown;

/// Lexrelay - WeCom legal customer-service backend.
#[derive(Parser, Debug)]
#[command(name = "lexrelay", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Lexrelay service: delivery worker, retry scheduler, and
    /// HTTP gateway.
    Serve,
    /// Print the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup
    let config = match lexrelay_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            lexrelay_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("lexrelay serve: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("lexrelay config: failed to render: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("lexrelay: use --help for available commands");
        }
    }
}
