//! Fundamental types for the oxcoin consensus-state core.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: hashes, block headers, the header chain, transactions, and the
//! unspent-transaction-output records the chain state is built from.

pub mod chain;
pub mod error;
pub mod hash;
pub mod header;
pub mod transaction;
pub mod utxo;

pub use chain::Chain;
pub use error::ChainError;
pub use hash::{BlockHash, TxHash};
pub use header::{BlockHeader, ChainedHeader};
pub use transaction::{
    BlockTx, DecodedBlockTx, LoadedTx, Transaction, TxInput, TxOutput, TxOutputKey,
};
pub use utxo::{OutputStates, SpentTx, UnspentTx};
