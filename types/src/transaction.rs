//! Transactions and the progressively enriched per-block transaction records.

use crate::hash::TxHash;
use serde::{Deserialize, Serialize};

/// Identifies one output of a previous transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxOutputKey {
    pub tx_hash: TxHash,
    pub output_index: u32,
}

impl TxOutputKey {
    pub fn new(tx_hash: TxHash, output_index: u32) -> Self {
        Self {
            tx_hash,
            output_index,
        }
    }
}

/// A transaction input: the previous output it spends plus its unlocking script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub prev_tx_output_key: TxOutputKey,
    pub script: Vec<u8>,
    pub sequence: u32,
}

/// A transaction output: a value and the locking script that guards it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub script: Vec<u8>,
}

/// A decoded transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

/// A transaction at its position within a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTx {
    /// Index of the transaction within its block.
    pub index: u32,
    pub hash: TxHash,
    pub tx: Transaction,
}

impl BlockTx {
    pub fn new(index: u32, hash: TxHash, tx: Transaction) -> Self {
        Self { index, hash, tx }
    }

    /// A block's first transaction is its coinbase: it creates new value and
    /// has no real previous outputs to validate against the UTXO set.
    pub fn is_coinbase(&self) -> bool {
        self.index == 0
    }
}

/// A [`BlockTx`] produced by wire decoding, retaining the raw bytes it was
/// decoded from. The hash is the double-hash of those bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedBlockTx {
    pub block_tx: BlockTx,
    pub raw_bytes: Vec<u8>,
}

impl DecodedBlockTx {
    pub fn new(block_tx: BlockTx, raw_bytes: Vec<u8>) -> Self {
        Self {
            block_tx,
            raw_bytes,
        }
    }

    pub fn index(&self) -> u32 {
        self.block_tx.index
    }

    pub fn hash(&self) -> TxHash {
        self.block_tx.hash
    }

    pub fn is_coinbase(&self) -> bool {
        self.block_tx.is_coinbase()
    }
}

/// A [`BlockTx`] with, for every input, the resolved previous output it
/// consumes. Required before rule and script validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedTx {
    pub block_tx: BlockTx,
    /// One entry per input, in input order. Empty for a coinbase.
    pub prev_tx_outputs: Vec<TxOutput>,
}

impl LoadedTx {
    pub fn new(block_tx: BlockTx, prev_tx_outputs: Vec<TxOutput>) -> Self {
        Self {
            block_tx,
            prev_tx_outputs,
        }
    }

    pub fn index(&self) -> u32 {
        self.block_tx.index
    }

    pub fn hash(&self) -> TxHash {
        self.block_tx.hash
    }

    pub fn is_coinbase(&self) -> bool {
        self.block_tx.is_coinbase()
    }

    /// The previous output consumed by input `input_index`.
    pub fn input_prev_tx_output(&self, input_index: usize) -> Option<&TxOutput> {
        self.prev_tx_outputs.get(input_index)
    }
}
