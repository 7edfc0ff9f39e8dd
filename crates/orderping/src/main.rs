// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Orderping - WhatsApp order-notification delivery engine.
//!
//! This is the binary entry point for the Orderping engine.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod status;

use clap::{Parser, Subcommand};

/// Orderping - WhatsApp order-notification delivery engine.
#[derive(Parser, Debug)]
#[command(name = "orderping", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the delivery engine (sessions, worker pool, reconciliation).
    Serve,
    /// Print a tenant's connection status record.
    Status {
        /// Tenant identifier (store domain).
        tenant_id: String,
    },
    /// Erase all stored data for a tenant (credentials, jobs, history).
    Erase {
        /// Tenant identifier (store domain).
        tenant_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match orderping_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            orderping_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) | None => serve::run_serve(config).await,
        Some(Commands::Status { tenant_id }) => status::run_status(config, &tenant_id).await,
        Some(Commands::Erase { tenant_id }) => status::run_erase(config, &tenant_id).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
