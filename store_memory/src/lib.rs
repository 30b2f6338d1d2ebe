//! In-memory chain-state storage backend.
//!
//! Volatile with process lifetime; implements the same cursor contract as a
//! durable backend, including transaction scoping (snapshot on begin, swap on
//! commit) and the encoded spent-transaction journal blobs.

mod chain_state;
mod deferred;

pub use chain_state::{MemoryChainStateCursor, MemoryStorageManager};
pub use deferred::MemoryDeferredChainStateCursor;
