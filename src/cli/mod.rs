//! CLI module for Print Guard
//!
//! Subcommands:
//! - `serve`: HTTP API, result files and the bundled page
//! - `migrate`: manage the SQLite schema

pub mod migrate;
pub mod serve;

use clap::{Parser, Subcommand};

/// Print Guard - 3D print failure detection API
#[derive(Parser)]
#[command(name = "print-guard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Apply, revert or inspect database migrations
    Migrate(migrate::MigrateArgs),
}
