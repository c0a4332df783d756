//! core::config::schema
//!
//! Configuration file schema types.
//!
//! Every field is optional in the file: environment variables may supply or
//! override any of them, and required values are only checked once all
//! sources have been merged.
//!
//! # Validation
//!
//! Values that are present are validated after parsing (e.g. the base branch
//! must be a valid branch name, the bind address must parse).

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// Top-level configuration file.
///
/// # Example
///
/// ```toml
/// [webhook]
/// secret = "able-webhook-secret"
/// bind = "0.0.0.0:3000"
///
/// [github]
/// token = "ghp_xxx"
/// owner = "octocat"
/// repo = "blog"
/// base_branch = "main"
/// content_path = "content/blog"
/// request_timeout_secs = 20
///
/// [posts]
/// extension = "md"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Inbound webhook settings
    pub webhook: WebhookSection,

    /// Target repository settings
    pub github: GitHubSection,

    /// Post file settings
    pub posts: PostsSection,
}

impl FileConfig {
    /// Validate the values present in the file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.webhook.validate()?;
        self.github.validate()?;
        self.posts.validate()
    }
}

/// `[webhook]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WebhookSection {
    /// Shared secret the CMS sends as `metadata.token`
    pub secret: Option<String>,

    /// Listen address (e.g. "0.0.0.0:3000")
    pub bind: Option<String>,
}

impl WebhookSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(bind) = &self.bind {
            bind.parse::<std::net::SocketAddr>().map_err(|e| {
                ConfigError::InvalidValue(format!("invalid bind address '{}': {}", bind, e))
            })?;
        }
        if matches!(&self.secret, Some(s) if s.is_empty()) {
            return Err(ConfigError::InvalidValue(
                "webhook secret cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// `[github]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubSection {
    /// Personal access token with contents and pull request write access
    pub token: Option<String>,

    /// Repository owner (user or organization)
    pub owner: Option<String>,

    /// Repository name
    pub repo: Option<String>,

    /// Alternative to owner/repo: "owner/repo" or a GitHub remote URL
    pub repository: Option<String>,

    /// Branch posts are committed to (default: "master")
    pub base_branch: Option<String>,

    /// Directory holding post files (default: "content/blog")
    pub content_path: Option<String>,

    /// API base URL (configurable for GitHub Enterprise)
    pub api_base: Option<String>,

    /// Per-request timeout in seconds (default: 20)
    pub request_timeout_secs: Option<u64>,
}

impl GitHubSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(branch) = &self.base_branch {
            BranchName::new(branch.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid base branch name: {}", e))
            })?;
        }
        if self.repository.is_some() && (self.owner.is_some() || self.repo.is_some()) {
            return Err(ConfigError::InvalidValue(
                "set either github.repository or github.owner/github.repo, not both".to_string(),
            ));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// `[posts]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PostsSection {
    /// File extension for post files, without the dot (default: "md")
    pub extension: Option<String>,
}

impl PostsSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ext) = &self.extension {
            if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid post extension '{}', must be ASCII alphanumeric",
                    ext
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = FileConfig::default();
        assert!(config.webhook.secret.is_none());
        assert!(config.github.base_branch.is_none());
        assert!(config.posts.extension.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn roundtrip() {
        let config = FileConfig {
            webhook: WebhookSection {
                secret: Some("s3cret".to_string()),
                bind: Some("127.0.0.1:8080".to_string()),
            },
            github: GitHubSection {
                token: Some("ghp_x".to_string()),
                owner: Some("octocat".to_string()),
                repo: Some("blog".to_string()),
                base_branch: Some("main".to_string()),
                request_timeout_secs: Some(5),
                ..Default::default()
            },
            posts: PostsSection {
                extension: Some("mdx".to_string()),
            },
        };

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: FileConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn unknown_fields_rejected() {
        let result: Result<FileConfig, _> = toml::from_str("[github]\nbranch = \"main\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn invalid_base_branch() {
        let config = FileConfig {
            github: GitHubSection {
                base_branch: Some("bad..branch".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn repository_conflicts_with_owner() {
        let config = FileConfig {
            github: GitHubSection {
                repository: Some("octocat/blog".to_string()),
                owner: Some("octocat".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_bind_and_extension() {
        let bad_bind = FileConfig {
            webhook: WebhookSection {
                bind: Some("not an address".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(bad_bind.validate().is_err());

        let bad_ext = FileConfig {
            posts: PostsSection {
                extension: Some(".md".to_string()),
            },
            ..Default::default()
        };
        assert!(bad_ext.validate().is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = FileConfig {
            github: GitHubSection {
                request_timeout_secs: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
