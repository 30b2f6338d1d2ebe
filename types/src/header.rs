//! Block headers and chained headers.

use crate::hash::{BlockHash, TxHash};
use serde::{Deserialize, Serialize};

/// A raw block header as it appears on the wire. 80 bytes when encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    /// Hash of the previous block's header. Zero for the genesis block.
    pub previous_hash: BlockHash,
    /// Merkle root over the block's transaction hashes.
    pub merkle_root: TxHash,
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
}

/// A block header placed on a chain: the header plus its height and the
/// cumulative chain work up to and including this block.
///
/// Immutable once created; identified by `hash`, which is the double-hash of
/// the encoded header (computed by the codec, not here).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainedHeader {
    pub hash: BlockHash,
    pub header: BlockHeader,
    pub height: u32,
    pub total_work: u128,
}

impl ChainedHeader {
    pub fn new(hash: BlockHash, header: BlockHeader, height: u32, total_work: u128) -> Self {
        Self {
            hash,
            header,
            height,
            total_work,
        }
    }

    /// Whether this header is at genesis height and claims no parent.
    pub fn is_genesis(&self) -> bool {
        self.height == 0 && self.header.previous_hash.is_zero()
    }
}
