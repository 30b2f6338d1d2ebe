//! Concurrent block validation.
//!
//! Decoded block transactions flow through the UTXO lookahead (prefetching
//! the previous outputs their inputs consume), then through the three-stage
//! validator: merkle accumulation, transaction-rule validation, and script
//! validation. The stages run concurrently per transaction and input while
//! the block receives a single aggregate verdict.

mod cancel;
mod error;
mod lookahead;
mod merkle;
mod rules;
mod validator;

pub use cancel::{CancelSource, CancelToken};
pub use error::ValidationError;
pub use lookahead::look_ahead;
pub use merkle::{MerkleAccumulator, MerkleError, MerkleTreeNode};
pub use rules::{ConsensusRules, ValidatorConfig};
pub use validator::{validate_block, BlockValidationSummary};
