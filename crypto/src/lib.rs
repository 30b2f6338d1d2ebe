//! Blake2b hashing for blocks, transactions, and merkle trees.

pub mod hash;

pub use hash::{blake2b_256, hash256, merkle_pair_hash};
