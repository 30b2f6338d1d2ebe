//! Blake2b hashing primitives.
//!
//! Block and transaction identities are the double Blake2b-256 hash of their
//! wire encodings; merkle siblings combine by concatenation followed by the
//! same double hash.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use oxcoin_types::TxHash;

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// The double hash used for block and transaction identities.
pub fn hash256(data: &[u8]) -> [u8; 32] {
    blake2b_256(&blake2b_256(data))
}

/// Combine two sibling merkle nodes into their parent hash:
/// concatenate the child hashes and double-hash the result.
pub fn merkle_pair_hash(left: &TxHash, right: &TxHash) -> TxHash {
    let mut hasher = Blake2b256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    let inner = hasher.finalize();
    TxHash::new(blake2b_256(&inner))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_deterministic() {
        let h1 = blake2b_256(b"oxcoin");
        let h2 = blake2b_256(b"oxcoin");
        assert_eq!(h1, h2);
    }

    #[test]
    fn blake2b_different_inputs() {
        assert_ne!(blake2b_256(b"hello"), blake2b_256(b"world"));
    }

    #[test]
    fn hash256_is_double_blake2b() {
        let single = blake2b_256(b"block data");
        assert_eq!(hash256(b"block data"), blake2b_256(&single));
    }

    #[test]
    fn merkle_pair_hash_matches_concatenation() {
        let left = TxHash::new([1u8; 32]);
        let right = TxHash::new([2u8; 32]);

        let mut concat = Vec::with_capacity(64);
        concat.extend_from_slice(left.as_bytes());
        concat.extend_from_slice(right.as_bytes());

        assert_eq!(merkle_pair_hash(&left, &right), TxHash::new(hash256(&concat)));
    }

    #[test]
    fn merkle_pair_hash_is_order_sensitive() {
        let a = TxHash::new([1u8; 32]);
        let b = TxHash::new([2u8; 32]);
        assert_ne!(merkle_pair_hash(&a, &b), merkle_pair_hash(&b, &a));
    }
}
