//! cli
//!
//! Command-line interface layer for postbridge.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Set up logging
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, loads the
//! configuration once, and hands off to the [`crate::webhook`] layer, which
//! owns request handling.

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use std::path::PathBuf;

use crate::logging::{self, LogOptions};
use anyhow::Result;

/// Global options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Explicit `--config` path
    pub config_path: Option<PathBuf>,
    pub debug: bool,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    logging::init(LogOptions {
        debug: cli.debug,
        json: cli.log_json,
    });

    let ctx = Context {
        config_path: cli.config.clone(),
        debug: cli.debug,
    };

    commands::dispatch(cli.command, &ctx)
}
