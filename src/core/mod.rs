//! core
//!
//! Domain types, schemas and pure transforms.
//!
//! # Modules
//!
//! - [`types`] - Strong types (BranchName, ExternalId)
//! - [`naming`] - Post file naming and staging branch naming
//! - [`frontmatter`] - Post file rendering
//! - [`config`] - Configuration schema and loading
//!
//! Nothing in this module performs network I/O.

pub mod config;
pub mod frontmatter;
pub mod naming;
pub mod types;
