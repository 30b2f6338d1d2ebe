//! Eviction of per-block auxiliary caches once blocks pass a safety depth.
//!
//! Pruning operates on caches only, never on the authoritative
//! unspent-transaction table. In-progress builder work is protected: on the
//! builder chain, heights at or above the committed tip height are never
//! touched.

use oxcoin_types::{BlockHash, Chain, SpentTx, Transaction, TxHash, TxOutputKey};
use std::collections::HashMap;

/// One week of blocks at ten-minute spacing.
pub const DEFAULT_PRUNE_DEPTH: u32 = 144 * 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PruningMode {
    /// Drop rollback metadata for blocks beyond the prune depth, plus the
    /// cached transactions that metadata names. Recent history stays
    /// rollback-capable.
    PreserveUnspent,
    /// Additionally evict transaction-level caches for every block below the
    /// committed height.
    Full,
}

#[derive(Clone, Copy, Debug)]
pub struct PruningConfig {
    pub mode: PruningMode,
    /// Blocks within this distance of the tip keep their rollback caches.
    pub prune_depth: u32,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            mode: PruningMode::PreserveUnspent,
            prune_depth: DEFAULT_PRUNE_DEPTH,
        }
    }
}

/// Per-block auxiliary caches kept alongside the chain state: transaction
/// hash lists, rollback metadata, spent-output journals, and a shared
/// transaction cache.
#[derive(Debug, Default)]
pub struct ChainCaches {
    block_tx_hashes: HashMap<BlockHash, Vec<TxHash>>,
    block_rollback: HashMap<BlockHash, Vec<SpentTx>>,
    spent_outputs: HashMap<BlockHash, Vec<TxOutputKey>>,
    transactions: HashMap<TxHash, Transaction>,
}

impl ChainCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the per-block caches produced while processing a block.
    pub fn record_block(
        &mut self,
        block_hash: BlockHash,
        tx_hashes: Vec<TxHash>,
        rollback: Vec<SpentTx>,
        spent_outputs: Vec<TxOutputKey>,
    ) {
        self.block_tx_hashes.insert(block_hash, tx_hashes);
        self.block_rollback.insert(block_hash, rollback);
        self.spent_outputs.insert(block_hash, spent_outputs);
    }

    pub fn cache_transaction(&mut self, tx_hash: TxHash, tx: Transaction) {
        self.transactions.insert(tx_hash, tx);
    }

    pub fn contains_block_rollback(&self, block_hash: &BlockHash) -> bool {
        self.block_rollback.contains_key(block_hash)
    }

    pub fn contains_block_tx_hashes(&self, block_hash: &BlockHash) -> bool {
        self.block_tx_hashes.contains_key(block_hash)
    }

    pub fn contains_spent_outputs(&self, block_hash: &BlockHash) -> bool {
        self.spent_outputs.contains_key(block_hash)
    }

    pub fn contains_transaction(&self, tx_hash: &TxHash) -> bool {
        self.transactions.contains_key(tx_hash)
    }
}

/// Prune the committed chain, then the builder chain if one is in progress.
///
/// Builder-chain pruning is capped below the committed tip height so work the
/// builder may still roll back is never evicted out from under it.
pub fn prune(
    caches: &mut ChainCaches,
    config: &PruningConfig,
    committed_chain: &Chain,
    builder_chain: Option<&Chain>,
) {
    prune_chain(caches, config, committed_chain, committed_chain.len());
    if let Some(builder) = builder_chain {
        let limit = committed_chain.len().saturating_sub(1);
        prune_chain(caches, config, builder, limit);
    }
}

fn prune_chain(caches: &mut ChainCaches, config: &PruningConfig, chain: &Chain, height_limit: usize) {
    let eligible = chain.len().min(height_limit);
    let beyond_depth = eligible.min(chain.len().saturating_sub(config.prune_depth as usize));

    match config.mode {
        PruningMode::PreserveUnspent => {
            for header in &chain.headers()[..beyond_depth] {
                if let Some(rollback) = caches.block_rollback.get(&header.hash) {
                    for spent in rollback {
                        caches.transactions.remove(&spent.tx_hash);
                    }
                }
            }
        }
        PruningMode::Full => {
            for header in &chain.headers()[..eligible] {
                if let Some(tx_hashes) = caches.block_tx_hashes.get(&header.hash) {
                    for tx_hash in tx_hashes {
                        caches.transactions.remove(tx_hash);
                    }
                }
            }
        }
    }

    for header in &chain.headers()[..beyond_depth] {
        caches.block_tx_hashes.remove(&header.hash);
        caches.block_rollback.remove(&header.hash);
        caches.spent_outputs.remove(&header.hash);
    }

    if beyond_depth > 0 {
        tracing::debug!(
            pruned_blocks = beyond_depth,
            chain_len = chain.len(),
            "pruned per-block caches"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxcoin_types::{BlockHeader, ChainedHeader};

    fn test_chain(len: u32) -> Chain {
        test_chain_salted(len, 0)
    }

    // Distinct salts produce chains with disjoint header hashes.
    fn test_chain_salted(len: u32, salt: u8) -> Chain {
        let mut chain = Chain::new();
        for height in 0..len {
            let previous_hash = if height == 0 {
                BlockHash::ZERO
            } else {
                BlockHash::new([salt + height as u8; 32])
            };
            chain
                .append(ChainedHeader::new(
                    BlockHash::new([salt + height as u8 + 1; 32]),
                    BlockHeader {
                        version: 1,
                        previous_hash,
                        merkle_root: TxHash::ZERO,
                        time: 0,
                        bits: 0,
                        nonce: 0,
                    },
                    height,
                    height as u128 + 1,
                ))
                .unwrap();
        }
        chain
    }

    fn seeded_caches(chain: &Chain) -> ChainCaches {
        let mut caches = ChainCaches::new();
        for header in chain.headers() {
            let tx_hash = TxHash::new([header.height as u8; 32]);
            caches.record_block(
                header.hash,
                vec![tx_hash],
                vec![SpentTx {
                    tx_hash,
                    confirmed_block_index: header.height,
                    tx_index: 0,
                    output_count: 1,
                }],
                vec![TxOutputKey::new(tx_hash, 0)],
            );
            caches.cache_transaction(
                tx_hash,
                Transaction {
                    version: 1,
                    inputs: vec![],
                    outputs: vec![],
                    lock_time: 0,
                },
            );
        }
        caches
    }

    #[test]
    fn preserve_unspent_drops_rollback_beyond_depth_only() {
        let chain = test_chain(10);
        let mut caches = seeded_caches(&chain);
        let config = PruningConfig {
            mode: PruningMode::PreserveUnspent,
            prune_depth: 4,
        };

        prune(&mut caches, &config, &chain, None);

        // Blocks 0..6 pass the depth, blocks 6..10 stay rollback-capable.
        for header in &chain.headers()[..6] {
            assert!(!caches.contains_block_rollback(&header.hash));
            assert!(!caches.contains_block_tx_hashes(&header.hash));
            assert!(!caches.contains_spent_outputs(&header.hash));
        }
        for header in &chain.headers()[6..] {
            assert!(caches.contains_block_rollback(&header.hash));
        }
    }

    #[test]
    fn full_mode_evicts_transactions_below_the_tip() {
        let chain = test_chain(10);
        let mut caches = seeded_caches(&chain);
        let config = PruningConfig {
            mode: PruningMode::Full,
            prune_depth: 4,
        };

        prune(&mut caches, &config, &chain, None);

        for header in chain.headers() {
            let tx_hash = TxHash::new([header.height as u8; 32]);
            assert!(!caches.contains_transaction(&tx_hash));
        }
    }

    #[test]
    fn builder_chain_is_never_pruned_at_or_above_committed_height() {
        let committed = test_chain(5);
        let builder = test_chain_salted(10, 100);
        let mut caches = seeded_caches(&builder);
        let config = PruningConfig {
            mode: PruningMode::Full,
            prune_depth: 0,
        };

        // Committed-chain hashes are disjoint; only the builder pass matters.
        prune(&mut caches, &config, &committed, Some(&builder));

        // Committed tip height is 4: builder blocks 0..4 prune, 4..10 stay.
        for header in &builder.headers()[..4] {
            assert!(!caches.contains_block_rollback(&header.hash));
        }
        for header in &builder.headers()[4..] {
            assert!(caches.contains_block_rollback(&header.hash));
            assert!(caches.contains_block_tx_hashes(&header.hash));
        }
    }

    #[test]
    fn pruning_with_everything_in_depth_is_a_no_op() {
        let chain = test_chain(5);
        let mut caches = seeded_caches(&chain);

        prune(&mut caches, &PruningConfig::default(), &chain, None);

        for header in chain.headers() {
            assert!(caches.contains_block_rollback(&header.hash));
            assert!(caches.contains_transaction(&TxHash::new([header.height as u8; 32])));
        }
    }
}
