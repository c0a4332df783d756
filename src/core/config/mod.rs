//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Configuration is resolved once at process start into an immutable
//! [`Config`], which is then passed into the GitHub forge and the webhook
//! server. Nothing reads the environment after startup.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. Environment variables
//!
//! # Config File Locations
//!
//! Searched in order:
//! 1. The explicit `--config <path>` (must exist)
//! 2. `$POSTBRIDGE_CONFIG` if set (must exist)
//! 3. `./postbridge.toml` if present
//!
//! # Environment
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `ABLE_TOKEN` | `webhook.secret` |
//! | `PORT` | port of `webhook.bind` |
//! | `GITHUB_TOKEN` | `github.token` |
//! | `GITHUB_USER` | `github.owner` |
//! | `GITHUB_REPO` | `github.repo` |
//! | `GITHUB_BASE_BRANCH` | `github.base_branch` |
//! | `CONTENT_PATH` | `github.content_path` |
//! | `GITHUB_API_BASE` | `github.api_base` |
//! | `POSTBRIDGE_REQUEST_TIMEOUT_SECS` | `github.request_timeout_secs` |
//!
//! # Example
//!
//! ```no_run
//! use postbridge::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("Mirroring into {}/{}", config.github.owner, config.github.repo);
//! ```

pub mod schema;

pub use schema::{FileConfig, GitHubSection, PostsSection, WebhookSection};

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::types::BranchName;
use crate::forge::github::parse_github_url;

/// Default listen address.
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
/// Default base branch.
pub const DEFAULT_BASE_BRANCH: &str = "master";
/// Default content directory.
pub const DEFAULT_CONTENT_PATH: &str = "content/blog";
/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
/// Default post file extension.
pub const DEFAULT_EXTENSION: &str = "md";

/// File name looked up in the working directory.
const LOCAL_CONFIG_FILE: &str = "postbridge.toml";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("missing required setting '{setting}' (set it in the config file or via ${env})")]
    Missing {
        setting: &'static str,
        env: &'static str,
    },
}

/// Coordinates and credentials of the target repository.
#[derive(Clone, PartialEq, Eq)]
pub struct GitHubConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub base_branch: BranchName,
    /// Directory holding post files, without leading or trailing slashes
    pub content_path: String,
    pub api_base: String,
    pub request_timeout: Duration,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("base_branch", &self.base_branch)
            .field("content_path", &self.content_path)
            .field("api_base", &self.api_base)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Fully resolved, immutable process configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Shared secret expected in `metadata.token`
    pub webhook_secret: String,
    /// Listen address for the webhook server
    pub bind: SocketAddr,
    pub github: GitHubConfig,
    /// Post file extension, without the dot
    pub extension: String,
    /// Path of the config file that was loaded, if any
    loaded_from: Option<PathBuf>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("webhook_secret", &"<redacted>")
            .field("bind", &self.bind)
            .field("github", &self.github)
            .field("extension", &self.extension)
            .field("loaded_from", &self.loaded_from)
            .finish()
    }
}

impl Config {
    /// Load configuration from the default locations and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file cannot be read or parsed, a value is
    /// invalid, or a required value is missing from every source.
    pub fn load(explicit_path: Option<&Path>) -> Result<Config, ConfigError> {
        Self::from_sources(explicit_path, |key| std::env::var(key).ok())
    }

    /// Load configuration with an explicit environment lookup.
    ///
    /// [`Config::load`] passes `std::env::var`; tests pass a map.
    pub fn from_sources<E>(explicit_path: Option<&Path>, env: E) -> Result<Config, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let (file, loaded_from) = Self::locate(explicit_path, &env)?;
        file.validate()?;
        Self::resolve(file, loaded_from, &env)
    }

    /// Find and read the config file, if any.
    fn locate<E>(
        explicit_path: Option<&Path>,
        env: &E,
    ) -> Result<(FileConfig, Option<PathBuf>), ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        // 1. Explicit path
        if let Some(path) = explicit_path {
            return Ok((Self::read_file(path)?, Some(path.to_path_buf())));
        }

        // 2. $POSTBRIDGE_CONFIG
        if let Some(path) = env("POSTBRIDGE_CONFIG").filter(|p| !p.is_empty()) {
            let path = PathBuf::from(path);
            return Ok((Self::read_file(&path)?, Some(path)));
        }

        // 3. ./postbridge.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Ok((Self::read_file(&local)?, Some(local)));
        }

        Ok((FileConfig::default(), None))
    }

    /// Read and parse a config file.
    pub fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Merge the file with environment overrides and apply defaults.
    fn resolve<E>(
        file: FileConfig,
        loaded_from: Option<PathBuf>,
        env: &E,
    ) -> Result<Config, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).filter(|v| !v.is_empty());

        let webhook_secret = var("ABLE_TOKEN")
            .or(file.webhook.secret)
            .ok_or(ConfigError::Missing {
                setting: "webhook.secret",
                env: "ABLE_TOKEN",
            })?;

        let mut bind: SocketAddr = file
            .webhook
            .bind
            .as_deref()
            .unwrap_or(DEFAULT_BIND)
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("invalid bind address: {}", e)))?;
        if let Some(port) = var("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("invalid PORT '{}'", port)))?;
            bind.set_port(port);
        }

        let github = file.github;
        let (file_owner, file_repo) = match github.repository.as_deref() {
            Some(repository) => {
                let (owner, repo) = parse_repository(repository)?;
                (Some(owner), Some(repo))
            }
            None => (github.owner, github.repo),
        };

        let token = var("GITHUB_TOKEN")
            .or(github.token)
            .ok_or(ConfigError::Missing {
                setting: "github.token",
                env: "GITHUB_TOKEN",
            })?;
        let owner = var("GITHUB_USER").or(file_owner).ok_or(ConfigError::Missing {
            setting: "github.owner",
            env: "GITHUB_USER",
        })?;
        let repo = var("GITHUB_REPO").or(file_repo).ok_or(ConfigError::Missing {
            setting: "github.repo",
            env: "GITHUB_REPO",
        })?;

        let base_branch = var("GITHUB_BASE_BRANCH")
            .or(github.base_branch)
            .unwrap_or_else(|| DEFAULT_BASE_BRANCH.to_string());
        let base_branch = BranchName::new(base_branch)
            .map_err(|e| ConfigError::InvalidValue(format!("invalid base branch name: {}", e)))?;

        let content_path = var("CONTENT_PATH")
            .or(github.content_path)
            .unwrap_or_else(|| DEFAULT_CONTENT_PATH.to_string());
        let content_path = content_path.trim_matches('/').to_string();

        let api_base = var("GITHUB_API_BASE")
            .or(github.api_base)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = api_base.trim_end_matches('/').to_string();

        let timeout_secs = match var("POSTBRIDGE_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().ok().filter(|s| *s > 0).ok_or_else(|| {
                ConfigError::InvalidValue(format!("invalid request timeout '{}'", raw))
            })?,
            None => github
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let extension = file
            .posts
            .extension
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        Ok(Config {
            webhook_secret,
            bind,
            github: GitHubConfig {
                token,
                owner,
                repo,
                base_branch,
                content_path,
                api_base,
                request_timeout: Duration::from_secs(timeout_secs),
            },
            extension,
            loaded_from,
        })
    }

    /// Get the path of the config file that was loaded, if any.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }
}

/// Parse `owner/repo` or a GitHub remote URL.
fn parse_repository(value: &str) -> Result<(String, String), ConfigError> {
    if let Some(parsed) = parse_github_url(value) {
        return Ok(parsed);
    }
    match value.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(ConfigError::InvalidValue(format!(
            "invalid github.repository '{}', expected 'owner/repo' or a GitHub URL",
            value
        ))),
    }
}
