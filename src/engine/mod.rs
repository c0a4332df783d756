//! engine
//!
//! Applies validated change events to the remote file store.
//!
//! # Architecture
//!
//! ```text
//! ChangeEvent -> Dispatcher -> { create | update | delete }      (one store call)
//!                           -> rename_and_replace                 (branch + PR + squash merge)
//! ```
//!
//! - [`dispatch`]: decides what an event means for the store
//! - [`transaction`]: lands a rename on the base branch as one commit
//!
//! # Invariants
//!
//! - The engine holds no state between events
//! - The store's version checks are the only concurrency control
//! - Nothing is retried; a failed event is reported and the sender redelivers

pub mod dispatch;
pub mod transaction;

pub use dispatch::{ChangeEvent, DispatchError, Dispatcher, Outcome};
pub use transaction::{
    rename_and_replace, MergedTransaction, PendingTransaction, TransactionError,
    TransactionStage,
};
