//! Unspent- and spent-transaction records and the per-output state bitmap.

use crate::hash::TxHash;
use serde::{Deserialize, Serialize};

/// A bit-packed spent/unspent bitmap, one bit per transaction output.
/// A set bit marks the output as spent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputStates {
    len: usize,
    bits: Vec<u8>,
}

impl OutputStates {
    /// A bitmap for `len` outputs, all unspent.
    pub fn all_unspent(len: usize) -> Self {
        Self {
            len,
            bits: vec![0u8; len.div_ceil(8)],
        }
    }

    /// A bitmap for `len` outputs, all spent.
    pub fn all_spent(len: usize) -> Self {
        let mut states = Self::all_unspent(len);
        for i in 0..len {
            states.set_spent(i);
        }
        states
    }

    /// Rebuild a bitmap from its packed byte representation.
    pub fn from_bytes(len: usize, bits: Vec<u8>) -> Option<Self> {
        if bits.len() != len.div_ceil(8) {
            return None;
        }
        Some(Self { len, bits })
    }

    /// Number of outputs covered by the bitmap.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The packed bitmap bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    pub fn is_spent(&self, index: usize) -> bool {
        assert!(index < self.len, "output index out of range");
        self.bits[index / 8] & (1 << (index % 8)) != 0
    }

    pub fn set_spent(&mut self, index: usize) {
        assert!(index < self.len, "output index out of range");
        self.bits[index / 8] |= 1 << (index % 8);
    }

    pub fn set_unspent(&mut self, index: usize) {
        assert!(index < self.len, "output index out of range");
        self.bits[index / 8] &= !(1 << (index % 8));
    }

    /// Whether at least one output is still unspent.
    pub fn any_unspent(&self) -> bool {
        (0..self.len).any(|i| !self.is_spent(i))
    }
}

/// An entry in the unspent-transaction table.
///
/// Exists in the table iff at least one of its outputs is unspent; deleted
/// when the last output becomes spent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentTx {
    pub tx_hash: TxHash,
    /// Height of the block that confirmed this transaction.
    pub block_index: u32,
    /// Index of the transaction within that block.
    pub tx_index: u32,
    pub output_states: OutputStates,
}

impl UnspentTx {
    pub fn new(tx_hash: TxHash, block_index: u32, tx_index: u32, output_states: OutputStates) -> Self {
        Self {
            tx_hash,
            block_index,
            tx_index,
            output_states,
        }
    }
}

/// A journal record written when an [`UnspentTx`] is fully spent and removed,
/// keyed by the block index at which the spend occurred. Carries everything
/// needed to re-create the record during rollback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentTx {
    pub tx_hash: TxHash,
    /// Height of the block that originally confirmed the transaction.
    pub confirmed_block_index: u32,
    pub tx_index: u32,
    pub output_count: u32,
}

impl SpentTx {
    /// The spent-journal record for a fully-spent unspent entry.
    pub fn from_unspent(unspent: &UnspentTx) -> Self {
        Self {
            tx_hash: unspent.tx_hash,
            confirmed_block_index: unspent.block_index,
            tx_index: unspent.tx_index,
            output_count: unspent.output_states.len() as u32,
        }
    }

    /// Re-create the unspent entry this record replaced, with every output
    /// marked spent. Rollback then clears the bits spent by the block being
    /// unwound.
    pub fn to_spent_unspent_tx(&self) -> UnspentTx {
        UnspentTx::new(
            self.tx_hash,
            self.confirmed_block_index,
            self.tx_index,
            OutputStates::all_spent(self.output_count as usize),
        )
    }
}
