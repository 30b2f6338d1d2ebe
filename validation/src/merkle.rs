//! Incremental merkle-root accumulation.
//!
//! Leaves arrive strictly in index order at depth 0. Whenever two adjacent
//! same-depth nodes exist they combine into a parent one depth higher, so
//! the accumulator holds at most one unpaired node per depth (the left spine)
//! and never buffers the whole tree.

use oxcoin_crypto::merkle_pair_hash;
use oxcoin_types::TxHash;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("no nodes were accumulated")]
    Empty,

    #[error("node fed out of order: expected leaf index {expected}, got depth {depth} index {index}")]
    OutOfOrder {
        expected: u32,
        depth: u32,
        index: u32,
    },

    /// Finished while an odd-index node had no sibling to pair with.
    #[error("accumulator could not converge to a single root")]
    DidNotConverge,
}

/// A node of the merkle tree at (depth, index-at-depth).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MerkleTreeNode {
    pub depth: u32,
    pub index: u32,
    pub hash: TxHash,
    /// Whether the subtree under this node has been pruned away. A parent is
    /// pruned only when both children are.
    pub pruned: bool,
}

impl MerkleTreeNode {
    pub fn leaf(index: u32, hash: TxHash) -> Self {
        Self {
            depth: 0,
            index,
            hash,
            pruned: false,
        }
    }
}

#[derive(Default)]
pub struct MerkleAccumulator {
    // Left spine, deepest first; depths are strictly decreasing.
    nodes: Vec<MerkleTreeNode>,
    leaf_count: u32,
}

impl MerkleAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaf_count(&self) -> u32 {
        self.leaf_count
    }

    /// Add the next leaf. Leaves must be depth 0 and arrive in index order.
    pub fn add_node(&mut self, node: MerkleTreeNode) -> Result<(), MerkleError> {
        if node.depth != 0 || node.index != self.leaf_count {
            return Err(MerkleError::OutOfOrder {
                expected: self.leaf_count,
                depth: node.depth,
                index: node.index,
            });
        }
        self.leaf_count += 1;
        self.nodes.push(node);
        self.combine_pairs();
        Ok(())
    }

    /// Converge the remaining spine to a single root, pairing any trailing
    /// even-index node with a copy of itself (duplicate-last rule).
    pub fn finish_pairing(mut self) -> Result<TxHash, MerkleError> {
        if self.nodes.is_empty() {
            return Err(MerkleError::Empty);
        }
        while self.nodes.len() > 1 {
            let last = self.nodes[self.nodes.len() - 1];
            if last.index % 2 != 0 {
                return Err(MerkleError::DidNotConverge);
            }
            self.nodes.push(MerkleTreeNode {
                index: last.index + 1,
                ..last
            });
            self.combine_pairs();
        }
        // a single leaf is its own root
        Ok(self.nodes[0].hash)
    }

    fn combine_pairs(&mut self) {
        while self.nodes.len() >= 2 {
            let right = self.nodes[self.nodes.len() - 1];
            let left = self.nodes[self.nodes.len() - 2];
            if left.depth != right.depth {
                break;
            }
            self.nodes.truncate(self.nodes.len() - 2);
            self.nodes.push(MerkleTreeNode {
                depth: left.depth + 1,
                index: left.index / 2,
                hash: merkle_pair_hash(&left.hash, &right.hash),
                pruned: left.pruned && right.pruned,
            });
        }
    }
}
