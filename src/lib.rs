//! postbridge - mirror headless CMS webhooks into a GitHub repository
//!
//! postbridge receives post create/update/delete notifications from the Able
//! CMS and turns each one into a commit against a Markdown content directory
//! hosted on GitHub.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to the webhook layer)
//! - [`webhook`] - Inbound HTTP boundary: payload schema, authentication, responses
//! - [`engine`] - Change dispatch and the branch/PR rename transaction
//! - [`core`] - Domain types, naming, front matter, configuration
//! - [`forge`] - Remote file store abstraction (GitHub v1)
//! - [`logging`] - Tracing subscriber setup
//!
//! # Correctness Invariants
//!
//! 1. Every mutating store call carries a freshly fetched version token
//! 2. A rename lands on the base branch as exactly one squash commit, or not at all
//! 3. No local locks or state: the store's version checks are the only coordination

pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod logging;
pub mod webhook;
