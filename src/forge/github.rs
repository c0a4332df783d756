//! forge::github
//!
//! GitHub forge implementation using the REST v3 API.
//!
//! # Design
//!
//! This module implements the `Forge` trait for GitHub:
//! - Contents API for single-file reads and writes (base64 bodies)
//! - Git refs API for creating and deleting staging branches
//! - Pulls API for opening and squash-merging pull requests
//!
//! Every request goes through one `reqwest::Client` built with the configured
//! timeout, so a hung provider call fails as `ForgeError::NetworkError`.
//!
//! # Status Mapping
//!
//! GitHub reports optimistic-concurrency failures inconsistently, so each
//! operation refines the generic mapping:
//! - create: 409/422 → `Conflict` (a file already exists and no sha was given)
//! - update/delete: 409/422 → `StaleVersion` (sha does not match)
//! - create ref: 422 → `Conflict` (reference already exists)
//! - merge: 409 → `StaleVersion` (head branch was modified)
//!
//! # Rate Limiting
//!
//! GitHub has rate limits. This implementation returns
//! `ForgeError::RateLimited` when they are hit and never retries; the CMS
//! redelivers the webhook.
//!
//! # Example
//!
//! ```ignore
//! use postbridge::forge::github::GitHubForge;
//! use postbridge::core::config::Config;
//!
//! let config = Config::load(None)?;
//! let forge = GitHubForge::from_config(&config.github)?;
//! let post = forge.find_post(&id).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::traits::{
    CommitInfo, CreateFileRequest, CreatePrRequest, DeleteFileRequest, Forge, ForgeError,
    MergeRequest, PendingBranch, PostRef, PrState, PullRequest, UpdateFileRequest,
};
use crate::core::config::{GitHubConfig, DEFAULT_API_BASE, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::core::naming::matches_external_id;
use crate::core::types::{BranchName, ExternalId};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("postbridge/", env!("CARGO_PKG_VERSION"));

/// GitHub forge implementation.
///
/// Scoped to one repository, one base branch and one content directory.
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
    /// Personal access token
    token: String,
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// Branch posts are committed to by default
    base_branch: String,
    /// Content directory, without leading or trailing slashes
    content_path: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("base_branch", &self.base_branch)
            .field("content_path", &self.content_path)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubForge {
    /// Create a GitHub forge with default settings.
    ///
    /// Uses `api.github.com`, the `master` base branch, the `content/blog`
    /// directory and the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::NetworkError` if the HTTP client cannot be built.
    pub fn new(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Result<Self, ForgeError> {
        Ok(Self {
            client: build_client(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))?,
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            base_branch: crate::core::config::DEFAULT_BASE_BRANCH.to_string(),
            content_path: crate::core::config::DEFAULT_CONTENT_PATH.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Create a GitHub forge from resolved configuration.
    pub fn from_config(config: &GitHubConfig) -> Result<Self, ForgeError> {
        Ok(Self {
            client: build_client(config.request_timeout)?,
            token: config.token.clone(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            base_branch: config.base_branch.to_string(),
            content_path: config.content_path.clone(),
            api_base: config.api_base.clone(),
        })
    }

    /// Use a custom API base URL (GitHub Enterprise, or a test server).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a different base branch.
    pub fn with_base_branch(mut self, branch: impl Into<String>) -> Self {
        self.base_branch = branch.into();
        self
    }

    /// Use a different content directory.
    pub fn with_content_path(mut self, path: impl Into<String>) -> Self {
        self.content_path = path.into().trim_matches('/').to_string();
        self
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("token {}", self.token))
            .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    /// Build URL for a repository endpoint from raw path segments.
    ///
    /// Each segment is percent-encoded, so a `?`, `#` or `/` inside one
    /// stays part of that segment.
    fn segment_url<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, ForgeError> {
        let mut url = Url::parse(&self.api_base).map_err(|e| {
            ForgeError::NetworkError(format!("invalid API base URL '{}': {}", self.api_base, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ForgeError::NetworkError(format!("API base URL '{}' cannot be a base", self.api_base))
            })?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str()])
            .extend(segments);
        Ok(url)
    }

    fn content_dir_segments(&self) -> impl Iterator<Item = &str> {
        self.content_path.split('/').filter(|s| !s.is_empty())
    }

    /// URL of the content directory listing.
    fn listing_url(&self) -> Result<Url, ForgeError> {
        self.segment_url(std::iter::once("contents").chain(self.content_dir_segments()))
    }

    /// URL of one post file in the content directory.
    fn contents_url(&self, name: &str) -> Result<Url, ForgeError> {
        self.segment_url(
            std::iter::once("contents")
                .chain(self.content_dir_segments())
                .chain(std::iter::once(name)),
        )
    }

    /// URL of a branch ref under `git/<kind>/heads/`.
    fn ref_url(&self, kind: &str, branch: &str) -> Result<Url, ForgeError> {
        self.segment_url(["git", kind, "heads"].into_iter().chain(branch.split('/')))
    }

    /// Resolve a branch or `None` to the branch name to commit on.
    fn target_branch<'a>(&'a self, branch: &'a Option<String>) -> &'a str {
        branch.as_deref().unwrap_or(&self.base_branch)
    }

    /// Send a request and decode a JSON response.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ForgeError> {
        let response = request
            .headers(self.headers()?)
            .send()
            .await
            .map_err(network_error)?;
        self.handle_response(response).await
    }

    /// Send a request whose response body is irrelevant.
    async fn send_empty(&self, request: RequestBuilder) -> Result<(), ForgeError> {
        let response = request
            .headers(self.headers()?)
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            self.handle_error_response(response, status).await
        }
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            self.handle_error_response(response, status).await
        }
    }

    /// Handle an error response from the API.
    async fn handle_error_response<T>(
        &self,
        response: Response,
        status: StatusCode,
    ) -> Result<T, ForgeError> {
        let rate_limited = response
            .headers()
            .get("X-RateLimit-Remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");

        // Try to get error message from body
        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        Err(match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN if rate_limited => ForgeError::RateLimited,
            StatusCode::FORBIDDEN => ForgeError::AuthFailed(format!("Permission denied: {}", message)),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::CONFLICT => ForgeError::StaleVersion(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }
}

/// Build the HTTP client with a per-request timeout.
fn build_client(timeout: Duration) -> Result<Client, ForgeError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ForgeError::NetworkError(format!("failed to build HTTP client: {}", e)))
}

fn network_error(e: reqwest::Error) -> ForgeError {
    if e.is_timeout() {
        ForgeError::NetworkError(format!("request timed out: {}", e))
    } else {
        ForgeError::NetworkError(e.to_string())
    }
}

/// Reinterpret a validation or conflict response as `Conflict`.
fn as_conflict(err: ForgeError) -> ForgeError {
    match err {
        ForgeError::StaleVersion(message) | ForgeError::ApiError { status: 422, message } => {
            ForgeError::Conflict(message)
        }
        other => other,
    }
}

/// Reinterpret a validation response as `StaleVersion`.
fn as_stale(err: ForgeError) -> ForgeError {
    match err {
        ForgeError::ApiError { status: 422, message } => ForgeError::StaleVersion(message),
        other => other,
    }
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    fn base_branch(&self) -> &str {
        &self.base_branch
    }

    async fn find_post(&self, id: &ExternalId) -> Result<Option<PostRef>, ForgeError> {
        let request = self
            .client
            .get(self.listing_url()?)
            .query(&[("ref", self.base_branch.as_str())]);

        let listing: ContentsListing = match self.send(request).await {
            Ok(listing) => listing,
            // No content directory yet means no posts yet
            Err(ForgeError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let entries = match listing {
            ContentsListing::Directory(entries) => entries,
            ContentsListing::Other(_) => return Ok(None),
        };

        Ok(entries
            .into_iter()
            .filter(|entry| entry.kind == "file")
            .find(|entry| matches_external_id(&entry.name, id))
            .map(|entry| PostRef {
                path: entry.path,
                name: entry.name,
                sha: entry.sha,
            }))
    }

    async fn create_file(&self, request: CreateFileRequest) -> Result<CommitInfo, ForgeError> {
        let body = PutContentsBody {
            message: &request.message,
            content: BASE64.encode(request.content.as_bytes()),
            branch: self.target_branch(&request.branch),
            sha: None,
        };
        let response: ContentsWriteResponse = self
            .send(self.client.put(self.contents_url(&request.name)?).json(&body))
            .await
            .map_err(as_conflict)?;
        Ok(response.commit.into())
    }

    async fn update_file(&self, request: UpdateFileRequest) -> Result<CommitInfo, ForgeError> {
        let body = PutContentsBody {
            message: &request.message,
            content: BASE64.encode(request.content.as_bytes()),
            branch: self.target_branch(&request.branch),
            sha: Some(&request.sha),
        };
        let response: ContentsWriteResponse = self
            .send(self.client.put(self.contents_url(&request.name)?).json(&body))
            .await
            .map_err(as_stale)?;
        Ok(response.commit.into())
    }

    async fn delete_file(&self, request: DeleteFileRequest) -> Result<CommitInfo, ForgeError> {
        let body = DeleteContentsBody {
            message: &request.message,
            sha: &request.sha,
            branch: self.target_branch(&request.branch),
        };
        let response: ContentsWriteResponse = self
            .send(
                self.client
                    .delete(self.contents_url(&request.name)?)
                    .json(&body),
            )
            .await
            .map_err(as_stale)?;
        Ok(response.commit.into())
    }

    async fn create_branch(
        &self,
        name: &BranchName,
        from: &str,
    ) -> Result<PendingBranch, ForgeError> {
        let tip: GitHubRefObject = self
            .send(
                self.client
                    .get(self.ref_url("ref", from)?),
            )
            .await?;

        let body = CreateRefBody {
            ref_name: format!("refs/heads/{}", name),
            sha: &tip.object.sha,
        };
        let created: GitHubRefObject = self
            .send(self.client.post(self.repo_url("git/refs")).json(&body))
            .await
            .map_err(as_conflict)?;

        Ok(PendingBranch {
            head_ref: name.clone(),
            base_ref: from.to_string(),
            sha: created.object.sha,
        })
    }

    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        let body = CreatePrBody {
            head: &request.head,
            base: &request.base,
            title: &request.title,
            body: request.body.as_deref(),
        };
        let pr: GitHubPullRequest = self
            .send(self.client.post(self.repo_url("pulls")).json(&body))
            .await?;
        Ok(pr.into())
    }

    async fn merge_pr(&self, number: u64, request: MergeRequest) -> Result<String, ForgeError> {
        let body = MergePrBody {
            merge_method: request.method.as_str(),
            commit_title: &request.commit_title,
            sha: &request.expected_head_sha,
        };
        let merged: GitHubMergeResponse = self
            .send(
                self.client
                    .put(self.repo_url(&format!("pulls/{}/merge", number)))
                    .json(&body),
            )
            .await?;

        if merged.merged {
            Ok(merged.sha)
        } else {
            Err(ForgeError::ApiError {
                status: 200,
                message: format!("pull request #{} was not merged: {}", number, merged.message),
            })
        }
    }

    async fn delete_branch(&self, name: &str) -> Result<(), ForgeError> {
        self.send_empty(
            self.client
                .delete(self.ref_url("refs", name)?),
        )
        .await
        .map_err(|e| match e {
            // GitHub answers 422 "Reference does not exist"
            ForgeError::ApiError { status: 422, message } => ForgeError::NotFound(message),
            other => other,
        })
    }
}

// --------------------------------------------------------------------------
// GitHub API types
// --------------------------------------------------------------------------

/// Request body for creating or updating a file.
#[derive(Serialize)]
struct PutContentsBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// Request body for deleting a file.
#[derive(Serialize)]
struct DeleteContentsBody<'a> {
    message: &'a str,
    sha: &'a str,
    branch: &'a str,
}

/// Request body for creating a ref.
#[derive(Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: &'a str,
}

/// Request body for creating a PR.
#[derive(Serialize)]
struct CreatePrBody<'a> {
    head: &'a str,
    base: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
}

/// Request body for merging a PR.
#[derive(Serialize)]
struct MergePrBody<'a> {
    merge_method: &'a str,
    commit_title: &'a str,
    /// GitHub refuses the merge with 409 unless the head is at this SHA
    sha: &'a str,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// Directory listing, or something else when the path is a file.
#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsListing {
    Directory(Vec<GitHubContentEntry>),
    Other(serde::de::IgnoredAny),
}

/// One entry of a directory listing.
#[derive(Deserialize)]
struct GitHubContentEntry {
    name: String,
    path: String,
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Response to a contents write (create/update/delete).
#[derive(Deserialize)]
struct ContentsWriteResponse {
    commit: GitHubCommit,
}

/// Commit summary in contents responses.
#[derive(Deserialize)]
struct GitHubCommit {
    sha: String,
    #[serde(default)]
    parents: Vec<GitHubShaOnly>,
}

#[derive(Deserialize)]
struct GitHubShaOnly {
    sha: String,
}

impl From<GitHubCommit> for CommitInfo {
    fn from(commit: GitHubCommit) -> Self {
        CommitInfo {
            sha: commit.sha,
            parents: commit.parents.into_iter().map(|p| p.sha).collect(),
        }
    }
}

/// Ref response (`GET /git/ref/...`, `POST /git/refs`).
#[derive(Deserialize)]
struct GitHubRefObject {
    object: GitHubShaOnly,
}

/// GitHub PR response format.
#[derive(Deserialize)]
struct GitHubPullRequest {
    number: u64,
    html_url: String,
    state: String,
    head: GitHubPrRef,
    base: GitHubPrRef,
    title: String,
    merged: Option<bool>,
}

/// GitHub ref (head/base) format.
#[derive(Deserialize)]
struct GitHubPrRef {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: String,
}

/// Merge response.
#[derive(Deserialize)]
struct GitHubMergeResponse {
    sha: String,
    merged: bool,
    #[serde(default)]
    message: String,
}

impl From<GitHubPullRequest> for PullRequest {
    fn from(pr: GitHubPullRequest) -> Self {
        let state = if pr.merged.unwrap_or(false) {
            PrState::Merged
        } else if pr.state == "closed" {
            PrState::Closed
        } else {
            PrState::Open
        };

        PullRequest {
            number: pr.number,
            url: pr.html_url,
            state,
            head: pr.head.ref_name,
            base: pr.base.ref_name,
            title: pr.title,
            head_sha: pr.head.sha,
        }
    }
}

// --------------------------------------------------------------------------
// URL Parsing
// --------------------------------------------------------------------------

/// Parse a GitHub remote URL to extract owner and repo.
///
/// Supports both SSH and HTTPS formats:
/// - `git@github.com:owner/repo.git`
/// - `https://github.com/owner/repo.git`
/// - `https://github.com/owner/repo`
///
/// # Example
///
/// ```
/// use postbridge::forge::github::parse_github_url;
///
/// let (owner, repo) = parse_github_url("git@github.com:octocat/hello-world.git").unwrap();
/// assert_eq!(owner, "octocat");
/// assert_eq!(repo, "hello-world");
/// ```
pub fn parse_github_url(url: &str) -> Option<(String, String)> {
    let rest = url
        .strip_prefix("git@github.com:")
        .or_else(|| url.strip_prefix("https://github.com/"))
        .or_else(|| url.strip_prefix("http://github.com/"))?;
    let rest = rest.strip_suffix(".git").unwrap_or(rest);
    let rest = rest.trim_end_matches('/');

    let (owner, repo) = rest.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod parse_github_url {
        use super::*;

        fn parsed(owner: &str, repo: &str) -> Option<(String, String)> {
            Some((owner.to_string(), repo.to_string()))
        }

        #[test]
        fn ssh_and_https_forms() {
            for url in [
                "git@github.com:octocat/hello-world.git",
                "git@github.com:octocat/hello-world",
                "https://github.com/octocat/hello-world.git",
                "https://github.com/octocat/hello-world",
                "https://github.com/octocat/hello-world/",
                "http://github.com/octocat/hello-world.git",
            ] {
                assert_eq!(parse_github_url(url), parsed("octocat", "hello-world"), "{url}");
            }
        }

        #[test]
        fn non_github_url() {
            assert!(parse_github_url("git@gitlab.com:owner/repo.git").is_none());
            assert!(parse_github_url("https://bitbucket.org/owner/repo").is_none());
        }

        #[test]
        fn invalid_format() {
            assert!(parse_github_url("not a url").is_none());
            assert!(parse_github_url("github.com/owner/repo").is_none());
            assert!(parse_github_url("https://github.com/").is_none());
            assert!(parse_github_url("https://github.com/owner").is_none());
            assert!(parse_github_url("https://github.com/owner/repo/tree/main").is_none());
        }

        #[test]
        fn repo_with_dots() {
            assert_eq!(
                parse_github_url("git@github.com:owner/repo.name.git"),
                parsed("owner", "repo.name")
            );
        }
    }

    mod github_forge {
        use super::*;

        fn forge() -> GitHubForge {
            GitHubForge::new("secret_token_abc123", "octocat", "blog").unwrap()
        }

        #[test]
        fn defaults() {
            let forge = forge();
            assert_eq!(forge.name(), "github");
            assert_eq!(forge.owner, "octocat");
            assert_eq!(forge.repo, "blog");
            assert_eq!(forge.base_branch(), "master");
            assert_eq!(forge.api_base, DEFAULT_API_BASE);
        }

        #[test]
        fn repo_url_format() {
            assert_eq!(
                forge().repo_url("pulls/7/merge"),
                "https://api.github.com/repos/octocat/blog/pulls/7/merge"
            );
        }

        #[test]
        fn contents_url_includes_content_path() {
            let forge = forge().with_content_path("/src/posts/");
            assert_eq!(
                forge.contents_url("hello-abc.md").unwrap().as_str(),
                "https://api.github.com/repos/octocat/blog/contents/src/posts/hello-abc.md"
            );
            assert_eq!(
                forge.listing_url().unwrap().as_str(),
                "https://api.github.com/repos/octocat/blog/contents/src/posts"
            );

            let root = forge.with_content_path("");
            assert_eq!(
                root.contents_url("hello-abc.md").unwrap().as_str(),
                "https://api.github.com/repos/octocat/blog/contents/hello-abc.md"
            );
        }

        #[test]
        fn contents_url_encodes_file_name() {
            let url = forge().contents_url("hello-ab?c#d.md").unwrap();
            assert_eq!(url.path(), "/repos/octocat/blog/contents/content/blog/hello-ab%3Fc%23d.md");
            assert_eq!(url.query(), None);
            assert_eq!(url.fragment(), None);
        }

        #[test]
        fn ref_url_keeps_branch_slashes() {
            let url = forge().ref_url("refs", "postbridge/rename-1a2b").unwrap();
            assert_eq!(
                url.as_str(),
                "https://api.github.com/repos/octocat/blog/git/refs/heads/postbridge/rename-1a2b"
            );
        }

        #[test]
        fn enterprise_base_keeps_its_path() {
            let forge = forge().with_api_base("https://ghe.example.com/api/v3/");
            assert_eq!(
                forge.contents_url("a-b.md").unwrap().as_str(),
                "https://ghe.example.com/api/v3/repos/octocat/blog/contents/content/blog/a-b.md"
            );
        }

        #[test]
        fn with_api_base_trims_slash() {
            let forge = forge().with_api_base("http://127.0.0.1:9999/");
            assert_eq!(
                forge.repo_url("pulls"),
                "http://127.0.0.1:9999/repos/octocat/blog/pulls"
            );
        }

        #[test]
        fn target_branch_defaults_to_base() {
            let forge = forge().with_base_branch("main");
            assert_eq!(forge.target_branch(&None), "main");
            assert_eq!(forge.target_branch(&Some("staging".into())), "staging");
        }

        #[test]
        fn debug_redacts_token() {
            let debug_output = format!("{:?}", forge());
            assert!(!debug_output.contains("secret_token_abc123"));
            assert!(debug_output.contains("octocat"));
        }

        #[test]
        fn invalid_token_is_auth_error() {
            let forge = GitHubForge::new("bad\ntoken", "o", "r").unwrap();
            assert!(matches!(forge.headers(), Err(ForgeError::AuthFailed(_))));
        }
    }

    mod status_mapping {
        use super::*;

        #[test]
        fn create_conflicts() {
            assert_eq!(
                as_conflict(ForgeError::ApiError {
                    status: 422,
                    message: "sha wasn't supplied".into()
                }),
                ForgeError::Conflict("sha wasn't supplied".into())
            );
            assert_eq!(
                as_conflict(ForgeError::StaleVersion("exists".into())),
                ForgeError::Conflict("exists".into())
            );
            assert_eq!(as_conflict(ForgeError::RateLimited), ForgeError::RateLimited);
        }

        #[test]
        fn update_staleness() {
            assert_eq!(
                as_stale(ForgeError::ApiError {
                    status: 422,
                    message: "invalid sha".into()
                }),
                ForgeError::StaleVersion("invalid sha".into())
            );
            assert!(matches!(
                as_stale(ForgeError::ApiError {
                    status: 500,
                    message: "boom".into()
                }),
                ForgeError::ApiError { status: 500, .. }
            ));
        }
    }

    mod conversions {
        use super::*;

        #[test]
        fn pull_request_from_api() {
            let json = serde_json::json!({
                "number": 12,
                "html_url": "https://github.com/octocat/blog/pull/12",
                "state": "open",
                "head": { "ref": "postbridge/rename-1", "sha": "abc" },
                "base": { "ref": "master", "sha": "def" },
                "title": "rename: x.md",
                "merged": false
            });
            let pr: PullRequest = serde_json::from_value::<GitHubPullRequest>(json)
                .unwrap()
                .into();
            assert_eq!(pr.number, 12);
            assert_eq!(pr.state, PrState::Open);
            assert_eq!(pr.head, "postbridge/rename-1");
            assert_eq!(pr.head_sha, "abc");
        }

        #[test]
        fn commit_from_contents_response() {
            let json = serde_json::json!({
                "content": null,
                "commit": { "sha": "c2", "parents": [{ "sha": "c1", "url": "x" }] }
            });
            let response: ContentsWriteResponse = serde_json::from_value(json).unwrap();
            let commit: CommitInfo = response.commit.into();
            assert_eq!(commit.sha, "c2");
            assert_eq!(commit.parents, vec!["c1".to_string()]);
        }

        #[test]
        fn listing_of_a_file_is_not_a_directory() {
            let json = serde_json::json!({ "name": "x.md", "type": "file" });
            let listing: ContentsListing = serde_json::from_value(json).unwrap();
            assert!(matches!(listing, ContentsListing::Other(_)));
        }
    }
}
