//! Abstract chain-state storage traits.
//!
//! Every storage backend (in-memory for testing, durable page-structured
//! engines) implements these traits. The rest of the codebase depends only
//! on the traits and is agnostic to which backend persists the data.

pub mod chain_state;
pub mod deferred;
pub mod error;
pub mod pool;

pub use chain_state::{ChainStateCursor, StorageManager};
pub use deferred::DeferredChainStateCursor;
pub use error::StoreError;
pub use pool::{CursorPool, PooledCursor};
