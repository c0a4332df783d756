//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Configuration file to load
//! - `--debug`: Enable debug logging
//! - `--log-json`: Emit logs as JSON lines

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// postbridge - mirror CMS webhooks into a GitHub repository
#[derive(Parser, Debug)]
#[command(name = "postbridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: $POSTBRIDGE_CONFIG, then ./postbridge.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the webhook listener
    #[command(
        name = "serve",
        long_about = "Run the webhook listener.\n\n\
            Accepts CMS webhooks on POST / and mirrors each post create, update or \
            delete into the configured GitHub repository. A post whose title changed \
            is renamed through a short-lived branch and a squash-merged pull request, \
            so the base branch sees exactly one commit.",
        after_help = "\
EXAMPLES:
    # Listen on the configured address (default 0.0.0.0:3000)
    postbridge serve

    # Listen on a specific address
    postbridge serve --bind 127.0.0.1:8080

    # Verbose structured logs
    postbridge --debug --log-json serve"
    )]
    Serve {
        /// Listen address, overriding the configuration
        #[arg(long, value_name = "ADDR")]
        bind: Option<SocketAddr>,
    },

    /// Apply one webhook payload from a file and exit
    #[command(
        name = "apply",
        after_help = "\
EXAMPLES:
    # Replay a captured webhook body
    postbridge apply payload.json

    # Read the payload from stdin
    cat payload.json | postbridge apply -"
    )]
    Apply {
        /// JSON payload file, or `-` for stdin
        #[arg(value_name = "PAYLOAD")]
        payload: PathBuf,
    },

    /// Load and validate the configuration, then print it with secrets redacted
    #[command(name = "check-config")]
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_serve_with_bind() {
        let cli = Cli::try_parse_from(["postbridge", "serve", "--bind", "127.0.0.1:8080"]).unwrap();
        match cli.command {
            Command::Serve { bind } => assert_eq!(bind, Some("127.0.0.1:8080".parse().unwrap())),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "postbridge",
            "apply",
            "payload.json",
            "--config",
            "/etc/postbridge.toml",
            "--debug",
        ])
        .unwrap();
        assert!(cli.debug);
        assert!(!cli.log_json);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/postbridge.toml")));
        assert!(matches!(cli.command, Command::Apply { .. }));
    }

    #[test]
    fn bad_bind_rejected() {
        assert!(Cli::try_parse_from(["postbridge", "serve", "--bind", "nope"]).is_err());
    }

    #[test]
    fn subcommand_required() {
        assert!(Cli::try_parse_from(["postbridge"]).is_err());
    }
}
