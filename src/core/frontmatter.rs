//! core::frontmatter
//!
//! Rendering of post files: a `---` delimited front-matter block followed by
//! a blank line and the raw body text.
//!
//! ```text
//! ---
//! title: Hello World
//! date: 2021-01-01
//! description: A subtitle
//! tags:
//! - rust
//! ---
//!
//! body text
//! ```
//!
//! `description` and `tags` are omitted when absent or empty.

use serde::Serialize;

/// The fields of a post that end up in its file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostContent {
    pub title: String,
    pub body: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Date string as supplied by the CMS (creation or last update).
    pub date: String,
}

#[derive(Debug, Serialize)]
struct FrontMatter<'a> {
    title: &'a str,
    date: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<&'a str>,
}

impl PostContent {
    fn front_matter(&self) -> FrontMatter<'_> {
        FrontMatter {
            title: &self.title,
            date: &self.date,
            description: self
                .description
                .as_deref()
                .filter(|d| !d.trim().is_empty()),
            tags: self
                .tags
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Render the full file text.
    ///
    /// Every front-matter value is emitted as a YAML string, quoted where a
    /// plain scalar would read back as a number, boolean or null.
    pub fn render(&self) -> Result<String, serde_yaml::Error> {
        let yaml = serde_yaml::to_string(&self.front_matter())?;
        Ok(format!("---\n{}---\n\n{}", yaml, self.body))
    }
}
