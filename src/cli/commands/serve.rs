//! serve command - Run the webhook listener

use std::net::SocketAddr;

use anyhow::{Context as _, Result};
use tracing::info;

use super::{app_state, load_config};
use crate::cli::Context;
use crate::webhook;

/// Run the serve command.
///
/// Blocks until the listener stops (Ctrl-C).
pub fn serve(ctx: &Context, bind: Option<SocketAddr>) -> Result<()> {
    let config = load_config(ctx)?;
    let bind = bind.unwrap_or(config.bind);
    let state = app_state(&config)?;

    info!(
        repo = %format!("{}/{}", config.github.owner, config.github.repo),
        base = %config.github.base_branch,
        content_path = %config.github.content_path,
        "mirroring posts"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(webhook::serve(state, bind))
        .with_context(|| format!("Webhook listener on {} failed", bind))
}
