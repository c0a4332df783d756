//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads the configuration
//! 2. Builds the forge and webhook state from it
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! `serve` and `apply` do network I/O. Their handlers are synchronous
//! wrappers that build a tokio runtime and block on the async body.

mod apply;
mod check_config;
mod serve;

pub use apply::apply;
pub use check_config::check_config;
pub use serve::serve;

use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::args::Command;
use super::Context;
use crate::core::config::Config;
use crate::engine::Dispatcher;
use crate::forge::github::GitHubForge;
use crate::forge::Forge;
use crate::webhook::AppState;

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Serve { bind } => serve(ctx, bind),
        Command::Apply { payload } => apply(ctx, &payload),
        Command::CheckConfig => check_config(ctx),
    }
}

/// Load the configuration named by the global flags.
fn load_config(ctx: &Context) -> Result<Config> {
    Config::load(ctx.config_path.as_deref()).context("Failed to load configuration")
}

/// Build the webhook state backed by the configured GitHub repository.
fn app_state(config: &Config) -> Result<AppState> {
    let forge: Arc<dyn Forge> =
        Arc::new(GitHubForge::from_config(&config.github).context("Failed to set up GitHub client")?);
    let dispatcher = Dispatcher::new(forge, config.extension.clone());
    Ok(AppState::new(dispatcher, config.webhook_secret.as_str()))
}
