//! The ledger: applies and retracts blocks against the persisted chain state.
//!
//! [`ChainStateBuilder`] is the single writer through which blocks advance or
//! unwind the unspent-transaction set, one block per storage transaction.
//! [`pruning`] evicts auxiliary caches once blocks pass a safety depth.

mod builder;
mod error;
pub mod pruning;

pub use builder::ChainStateBuilder;
pub use error::ChainStateError;
pub use pruning::{prune, ChainCaches, PruningConfig, PruningMode};
