//! The canonical header chain from genesis to tip.

use crate::error::ChainError;
use crate::hash::BlockHash;
use crate::header::ChainedHeader;
use serde::{Deserialize, Serialize};

/// An ordered, append/truncate-only sequence of [`ChainedHeader`] from
/// genesis to tip.
///
/// Invariants: each element's height equals its index, and each element's
/// previous-hash equals the previous element's hash. The only mutations are
/// appending the next header and removing the last.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    headers: Vec<ChainedHeader>,
}

impl Chain {
    /// An empty chain — no genesis yet.
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    /// Build a chain from a genesis-first header sequence, validating the
    /// height and previous-hash linkage of every element.
    pub fn from_headers(headers: Vec<ChainedHeader>) -> Result<Self, ChainError> {
        let mut chain = Self::new();
        for header in headers {
            chain.append(header)?;
        }
        Ok(chain)
    }

    pub fn genesis(&self) -> Option<&ChainedHeader> {
        self.headers.first()
    }

    pub fn tip(&self) -> Option<&ChainedHeader> {
        self.headers.last()
    }

    /// The hash of the tip header, or zero for an empty chain.
    pub fn tip_hash(&self) -> BlockHash {
        self.tip().map(|h| h.hash).unwrap_or(BlockHash::ZERO)
    }

    pub fn headers(&self) -> &[ChainedHeader] {
        &self.headers
    }

    /// Number of headers in the chain. The tip height is `len() - 1`.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Append the next header, validating that it extends the tip.
    pub fn append(&mut self, header: ChainedHeader) -> Result<(), ChainError> {
        match self.tip() {
            Some(tip) => {
                if header.height != tip.height + 1 || header.header.previous_hash != tip.hash {
                    return Err(ChainError::InvalidChaining {
                        hash: header.hash,
                        height: header.height,
                    });
                }
            }
            None => {
                if !header.is_genesis() {
                    return Err(ChainError::InvalidGenesis);
                }
            }
        }
        self.headers.push(header);
        Ok(())
    }

    /// Remove and return the tip header.
    pub fn pop(&mut self) -> Option<ChainedHeader> {
        self.headers.pop()
    }
}
