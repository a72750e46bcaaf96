//! # Holon - Graph Unification CLI
//!
//! The main binary for the Holon value-unification engine.
//!
//! This application provides:
//! - Migration loading (types + seed objects from declarative JSON)
//! - Read-side inspection of stored objects
//! - Store statistics
//!
//! ## Usage
//!
//! ```bash
//! # Apply a migration file to a store
//! holon migrate -f migration.json --db graph.redb
//!
//! # Inspect an object with its children
//! holon get --db graph.redb --id 42 --types migration.json
//!
//! # Store statistics
//! holon status --db graph.redb
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Initialize tracing — HOLON_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("HOLON_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "holon=info,holon_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Execute command
    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
