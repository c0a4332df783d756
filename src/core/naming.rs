//! core::naming
//!
//! Content file naming rules.
//!
//! # Convention
//!
//! Every managed post lives at `<slugified-title>-<external-id>.<ext>`. The
//! external id is the segment after the last `-` and before the first `.`,
//! which is how posts are found again when only the id is known.
//!
//! Staging branches for rename transactions are named
//! `postbridge/rename-<random>` so that concurrent renames never share one.

use uuid::Uuid;

use super::types::{BranchName, ExternalId};

/// Prefix for staging branches created by rename transactions.
pub const STAGING_BRANCH_PREFIX: &str = "postbridge/rename-";

/// Longest slug kept in a file name.
const MAX_SLUG_LEN: usize = 80;

/// Generate a file name slug from a post title.
///
/// Converts the first line of a title into a file-name-safe slug:
/// - Lowercase
/// - Whitespace, `_` and `-` become single hyphens
/// - Other characters are removed
/// - Truncated to a reasonable length
///
/// # Example
///
/// ```
/// use postbridge::core::naming::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("Rust 2021: what's new?"), "rust-2021-whats-new");
/// ```
pub fn slugify(title: &str) -> String {
    let first_line = title.lines().next().unwrap_or("");

    let cleaned: String = first_line
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c.to_ascii_lowercase())
            } else if c.is_whitespace() || c == '_' || c == '-' {
                Some('-')
            } else {
                None
            }
        })
        .collect();

    let joined = cleaned
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    let truncated: String = joined.chars().take(MAX_SLUG_LEN).collect();
    truncated.trim_end_matches('-').to_string()
}

/// Build the canonical file name for a post.
///
/// A title that slugifies to nothing yields `<id>.<ext>`, which still
/// resolves back to the same id.
///
/// # Example
///
/// ```
/// use postbridge::core::naming::post_file_name;
/// use postbridge::core::types::ExternalId;
///
/// let id = ExternalId::new("abc123").unwrap();
/// assert_eq!(post_file_name("Hello World", &id, "md"), "hello-world-abc123.md");
/// ```
pub fn post_file_name(title: &str, id: &ExternalId, extension: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        format!("{}.{}", id, extension)
    } else {
        format!("{}-{}.{}", slug, id, extension)
    }
}

/// Extract the external id embedded in a content file name.
///
/// # Example
///
/// ```
/// use postbridge::core::naming::external_id_of;
///
/// assert_eq!(external_id_of("hello-world-abc123.md"), Some("abc123"));
/// assert_eq!(external_id_of("abc123.md"), Some("abc123"));
/// ```
pub fn external_id_of(file_name: &str) -> Option<&str> {
    let last_segment = file_name.rsplit('-').next()?;
    let id = last_segment.split('.').next()?;
    (!id.is_empty()).then_some(id)
}

/// Check whether a file name belongs to the post with the given id.
pub fn matches_external_id(file_name: &str, id: &ExternalId) -> bool {
    external_id_of(file_name) == Some(id.as_str())
}

/// Generate a fresh, collision-resistant staging branch name.
pub fn staging_branch_name() -> BranchName {
    // A simple-format uuid is lowercase hex only, which is always a valid refname.
    BranchName::new(format!(
        "{}{}",
        STAGING_BRANCH_PREFIX,
        Uuid::new_v4().simple()
    ))
    .unwrap_or_else(|_| unreachable!("uuid-based branch names are valid refnames"))
}
