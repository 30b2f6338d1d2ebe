//! Deferred (prefetching) cursor over the in-memory store.

use crate::chain_state::MemoryStorageManager;
use oxcoin_store::{
    ChainStateCursor, CursorPool, DeferredChainStateCursor, StorageManager, StoreError,
};
use oxcoin_types::{TxHash, UnspentTx};
use std::collections::HashMap;
use std::sync::Mutex;

/// Warms unspent-transaction lookups through a fixed pool of read cursors.
///
/// Warm-ups populate a shared cache; later reads are served from the cache
/// without touching the store again.
pub struct MemoryDeferredChainStateCursor {
    pool: CursorPool<<MemoryStorageManager as StorageManager>::Cursor>,
    warmed: Mutex<HashMap<TxHash, Option<UnspentTx>>>,
}

impl MemoryDeferredChainStateCursor {
    /// Open a deferred cursor backed by `cursor_count` pooled read cursors.
    pub fn open(
        storage: &MemoryStorageManager,
        cursor_count: usize,
    ) -> Result<Self, StoreError> {
        let mut cursors = Vec::with_capacity(cursor_count);
        for _ in 0..cursor_count {
            cursors.push(storage.open_chain_state_cursor()?);
        }
        Ok(Self {
            pool: CursorPool::new(cursors),
            warmed: Mutex::new(HashMap::new()),
        })
    }

    /// The warmed entry for `tx_hash`: `None` if never warmed, `Some(None)`
    /// if warmed but absent from the unspent table.
    pub fn warmed_unspent_tx(&self, tx_hash: &TxHash) -> Option<Option<UnspentTx>> {
        self.warmed
            .lock()
            .expect("warm cache lock poisoned")
            .get(tx_hash)
            .cloned()
    }
}

impl DeferredChainStateCursor for MemoryDeferredChainStateCursor {
    fn cursor_count(&self) -> usize {
        self.pool.capacity()
    }

    fn warm_unspent_tx(&self, tx_hash: &TxHash) -> Result<(), StoreError> {
        let cursor = self.pool.acquire();
        let unspent = cursor.try_get_unspent_tx(tx_hash)?;
        self.warmed
            .lock()
            .expect("warm cache lock poisoned")
            .insert(*tx_hash, unspent);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxcoin_types::{Chain, OutputStates};

    #[test]
    fn warm_populates_cache_for_present_and_absent_entries() {
        let present = UnspentTx::new(TxHash::new([1; 32]), 0, 0, OutputStates::all_unspent(1));
        let storage =
            MemoryStorageManager::with_chain_state(&Chain::new(), vec![present.clone()]);
        let deferred = MemoryDeferredChainStateCursor::open(&storage, 4).unwrap();
        assert_eq!(deferred.cursor_count(), 4);

        let absent_hash = TxHash::new([2; 32]);
        assert!(deferred.warmed_unspent_tx(&present.tx_hash).is_none());

        deferred.warm_unspent_tx(&present.tx_hash).unwrap();
        deferred.warm_unspent_tx(&absent_hash).unwrap();

        assert_eq!(
            deferred.warmed_unspent_tx(&present.tx_hash),
            Some(Some(present))
        );
        assert_eq!(deferred.warmed_unspent_tx(&absent_hash), Some(None));
    }
}
