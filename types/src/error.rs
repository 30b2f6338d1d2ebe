use crate::hash::BlockHash;
use thiserror::Error;

/// Errors raised by [`crate::Chain`] mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("header {hash} at height {height} does not chain from the current tip")]
    InvalidChaining { hash: BlockHash, height: u32 },

    #[error("genesis header must have height 0 and a zero previous hash")]
    InvalidGenesis,
}
