//! The chain-state cursor: a transactional view over the persisted header
//! chain, the unspent-transaction table, and the spent-transaction journal.

use crate::StoreError;
use oxcoin_types::{BlockHash, ChainedHeader, SpentTx, TxHash, UnspentTx};

/// Opens cursors onto a chain-state store.
///
/// Implementations may be in-memory (volatile, process lifetime) or durable
/// (crash-consistent, page-structured).
pub trait StorageManager {
    type Cursor: ChainStateCursor;

    /// Open an exclusive read/write cursor onto the chain state.
    fn open_chain_state_cursor(&self) -> Result<Self::Cursor, StoreError>;
}

/// A cursor over the persisted chain state.
///
/// Mutating operations require an open storage transaction; a commit makes
/// every change since `begin_transaction` land atomically, a rollback drops
/// them all. `try_*` mutators return `Ok(false)` when the keyed entry was
/// absent (or, for `try_add_*`, already present) rather than erroring.
pub trait ChainStateCursor: Send {
    // ── Transaction scoping ─────────────────────────────────────────────

    fn in_transaction(&self) -> bool;
    fn begin_transaction(&mut self) -> Result<(), StoreError>;
    fn commit_transaction(&mut self) -> Result<(), StoreError>;
    fn rollback_transaction(&mut self) -> Result<(), StoreError>;

    // ── Header chain ────────────────────────────────────────────────────

    /// The header at the greatest height, or `None` for an empty store.
    fn chain_tip(&self) -> Result<Option<ChainedHeader>, StoreError>;

    fn try_get_header(&self, hash: &BlockHash) -> Result<Option<ChainedHeader>, StoreError>;

    fn add_chained_header(&mut self, header: &ChainedHeader) -> Result<(), StoreError>;

    fn remove_chained_header(&mut self, header: &ChainedHeader) -> Result<(), StoreError>;

    // ── Unspent-transaction table ───────────────────────────────────────

    fn unspent_tx_count(&self) -> Result<u64, StoreError>;

    fn contains_unspent_tx(&self, tx_hash: &TxHash) -> Result<bool, StoreError>;

    fn try_get_unspent_tx(&self, tx_hash: &TxHash) -> Result<Option<UnspentTx>, StoreError>;

    fn try_add_unspent_tx(&mut self, unspent: &UnspentTx) -> Result<bool, StoreError>;

    fn try_update_unspent_tx(&mut self, unspent: &UnspentTx) -> Result<bool, StoreError>;

    fn try_remove_unspent_tx(&mut self, tx_hash: &TxHash) -> Result<bool, StoreError>;

    /// Full scan of the unspent-transaction table, ordered by tx hash.
    fn read_unspent_txs(&self) -> Result<Vec<UnspentTx>, StoreError>;

    // ── Spent-transaction journal ───────────────────────────────────────

    /// Journal entries for the block at `block_index`, if any.
    fn try_get_block_spent_txs(&self, block_index: u32)
        -> Result<Option<Vec<SpentTx>>, StoreError>;

    fn try_add_block_spent_txs(
        &mut self,
        block_index: u32,
        spent_txs: &[SpentTx],
    ) -> Result<bool, StoreError>;

    fn try_remove_block_spent_txs(&mut self, block_index: u32) -> Result<bool, StoreError>;
}
