//! apply command - Run one webhook payload without the HTTP listener
//!
//! The payload goes through the same token check and validation as a
//! request to the listener, so a captured webhook body can be replayed
//! as-is.

use std::io::Read;
use std::path::Path;

use anyhow::{Context as _, Result};

use super::{app_state, load_config};
use crate::cli::Context;

/// Run the apply command.
pub fn apply(ctx: &Context, payload: &Path) -> Result<()> {
    let body = read_payload(payload)?;
    let config = load_config(ctx)?;
    let state = app_state(&config)?;

    let rt = tokio::runtime::Runtime::new()?;
    match rt.block_on(state.process(&body)) {
        Ok(outcome) => {
            println!("{}", outcome);
            Ok(())
        }
        Err(err) => {
            let summary = format!("{} (HTTP {})", err.details(), err.status().as_u16());
            Err(anyhow::Error::new(err).context(summary))
        }
    }
}

/// Read the payload from a file, or stdin for `-`.
fn read_payload(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut body = Vec::new();
        std::io::stdin()
            .read_to_end(&mut body)
            .context("Failed to read payload from stdin")?;
        Ok(body)
    } else {
        std::fs::read(path).with_context(|| format!("Failed to read payload {}", path.display()))
    }
}
