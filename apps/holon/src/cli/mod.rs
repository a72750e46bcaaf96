//! # CLI Definitions
//!
//! Command-line argument structures (clap derive) and dispatch.

mod commands;

use clap::{Parser, Subcommand};
use holon_core::HolonError;
use std::path::PathBuf;

/// Holon - value unification over a typed graph store.
#[derive(Parser)]
#[command(name = "holon", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply a migration file: register its types, unify its objects.
    Migrate {
        /// The migration file (JSON: {"types": [...], "objects": [...]}).
        #[arg(short, long)]
        file: PathBuf,

        /// The store to migrate.
        #[arg(long)]
        db: PathBuf,
    },

    /// Fetch an object and render it with its children.
    Get {
        /// The store to read.
        #[arg(long)]
        db: PathBuf,

        /// Fetch by id.
        #[arg(long, conflicts_with = "uri")]
        id: Option<u64>,

        /// Fetch by URI.
        #[arg(long)]
        uri: Option<String>,

        /// Migration file whose types drive child rendering.
        #[arg(long)]
        types: Option<PathBuf>,

        /// Composite nesting depth to render.
        #[arg(long, default_value_t = 3)]
        depth: usize,
    },

    /// Print store statistics.
    Status {
        /// The store to inspect.
        #[arg(long)]
        db: PathBuf,
    },
}

/// Execute the parsed command.
pub fn execute(cli: Cli) -> Result<(), HolonError> {
    match cli.command {
        Commands::Migrate { file, db } => commands::migrate(&file, &db),
        Commands::Get {
            db,
            id,
            uri,
            types,
            depth,
        } => commands::get(&db, id, uri.as_deref(), types.as_deref(), depth),
        Commands::Status { db } => commands::status(&db),
    }
}
