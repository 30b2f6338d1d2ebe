use oxcoin_store::StoreError;
use oxcoin_types::{BlockHash, TxHash};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    /// The accumulated merkle root disagrees with the header, or the
    /// accumulator could not converge to a single root.
    #[error("merkle root validation failed for block {block_hash} at height {height}")]
    MerkleRoot { block_hash: BlockHash, height: u32 },

    #[error("transaction {tx_hash} failed rule validation: {reason}")]
    Transaction { tx_hash: TxHash, reason: String },

    #[error("script validation failed for input {input_index} of transaction {tx_hash}: {reason}")]
    Script {
        tx_hash: TxHash,
        input_index: usize,
        reason: String,
    },

    /// A lookahead warm-up failed; surfaced as the first fault of the
    /// pipeline's overall completion.
    #[error("unspent-transaction warm-up failed: {0}")]
    Warmup(#[from] StoreError),

    /// Distinct from failure: cancellation is a signal, not a verdict.
    #[error("validation was cancelled")]
    Cancelled,

    #[error("validation pipeline task failed: {0}")]
    Pipeline(String),
}
