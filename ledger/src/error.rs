use oxcoin_store::StoreError;
use oxcoin_types::{BlockHash, ChainError, TxHash};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainStateError {
    /// Storage's tip no longer matches the builder's last-observed tip. The
    /// builder must be discarded and reconstructed; never auto-recovered.
    #[error("chain state out of sync: expected tip {expected:?}, storage tip {actual:?}")]
    OutOfSync {
        expected: Option<BlockHash>,
        actual: Option<BlockHash>,
    },

    /// An ancestor the chain tip claims cannot be found in storage.
    #[error("chain state storage is corrupt: missing header {missing}")]
    StorageCorrupt { missing: BlockHash },

    #[error("block {hash} at height {height} does not extend the current tip")]
    InvalidChaining { hash: BlockHash, height: u32 },

    #[error("transaction {tx_hash} already exists in the unspent set")]
    DuplicateTransaction { tx_hash: TxHash },

    #[error("transaction output {tx_hash}:{output_index} is not in the unspent set")]
    MissingUnspentTx { tx_hash: TxHash, output_index: u32 },

    #[error("transaction output {tx_hash}:{output_index} is already spent")]
    OutputAlreadySpent { tx_hash: TxHash, output_index: u32 },

    #[error("no spent-transaction journal entry for block index {block_index}")]
    MissingSpentTx { block_index: u32 },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl From<ChainError> for ChainStateError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::InvalidChaining { hash, height } => {
                Self::InvalidChaining { hash, height }
            }
            ChainError::InvalidGenesis => Self::InvalidChaining {
                hash: BlockHash::ZERO,
                height: 0,
            },
        }
    }
}
