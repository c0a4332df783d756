//! check-config command - Validate and print the effective configuration

use anyhow::Result;

use super::load_config;
use crate::cli::Context;
use crate::core::config::Config;

/// Run the check-config command.
pub fn check_config(ctx: &Context) -> Result<()> {
    let config = load_config(ctx)?;
    print!("{}", render(&config));
    Ok(())
}

/// Render the effective configuration with secrets redacted.
fn render(config: &Config) -> String {
    let source = config
        .loaded_from()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(environment and defaults)".to_string());
    let github = &config.github;

    let mut out = String::new();
    out.push_str(&format!("source:          {}\n", source));
    out.push_str(&format!("bind:            {}\n", config.bind));
    out.push_str("webhook.secret:  <redacted>\n");
    out.push_str("github.token:    <redacted>\n");
    out.push_str(&format!("github.repo:     {}/{}\n", github.owner, github.repo));
    out.push_str(&format!("base_branch:     {}\n", github.base_branch));
    out.push_str(&format!("content_path:    {}\n", github.content_path));
    out.push_str(&format!("api_base:        {}\n", github.api_base));
    out.push_str(&format!(
        "request_timeout: {}s\n",
        github.request_timeout.as_secs()
    ));
    out.push_str(&format!("extension:       {}\n", config.extension));
    out
}
