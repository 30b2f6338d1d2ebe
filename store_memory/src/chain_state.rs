//! The in-memory chain-state store and its cursor.

use oxcoin_codec::{decode_spent_tx_list, encode_spent_tx_list};
use oxcoin_store::{ChainStateCursor, StorageManager, StoreError};
use oxcoin_types::{BlockHash, Chain, ChainedHeader, SpentTx, TxHash, UnspentTx};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// The committed chain state: header tables, the unspent-transaction table
/// (ordered by tx hash), and the encoded spent-transaction journal.
#[derive(Clone, Default)]
pub(crate) struct ChainStateData {
    headers: HashMap<BlockHash, ChainedHeader>,
    headers_by_height: BTreeMap<u32, BlockHash>,
    unspent: BTreeMap<TxHash, UnspentTx>,
    spent_blobs: HashMap<u32, Vec<u8>>,
}

impl ChainStateData {
    fn chain_tip(&self) -> Option<ChainedHeader> {
        self.headers_by_height
            .last_key_value()
            .and_then(|(_, hash)| self.headers.get(hash).copied())
    }
}

/// In-memory storage manager. Cheap to clone; clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryStorageManager {
    data: Arc<Mutex<ChainStateData>>,
}

impl MemoryStorageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing chain and unspent set. Used by tests
    /// that need a pre-populated chain state.
    pub fn with_chain_state(chain: &Chain, unspent_txs: Vec<UnspentTx>) -> Self {
        let mut data = ChainStateData::default();
        for header in chain.headers() {
            data.headers.insert(header.hash, *header);
            data.headers_by_height.insert(header.height, header.hash);
        }
        for unspent in unspent_txs {
            data.unspent.insert(unspent.tx_hash, unspent);
        }
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

}

impl StorageManager for MemoryStorageManager {
    type Cursor = MemoryChainStateCursor;

    fn open_chain_state_cursor(&self) -> Result<Self::Cursor, StoreError> {
        Ok(MemoryChainStateCursor {
            data: Arc::clone(&self.data),
            pending: None,
        })
    }
}

/// Cursor over the in-memory store.
///
/// `begin_transaction` snapshots the committed state; mutations apply to the
/// snapshot and become visible to other cursors only on commit.
pub struct MemoryChainStateCursor {
    data: Arc<Mutex<ChainStateData>>,
    pending: Option<ChainStateData>,
}

impl MemoryChainStateCursor {
    /// Run `f` against the transaction snapshot if one is open, otherwise
    /// against the committed state.
    fn read<R>(&self, f: impl FnOnce(&ChainStateData) -> R) -> R {
        match &self.pending {
            Some(pending) => f(pending),
            None => f(&self.data.lock().expect("chain state lock poisoned")),
        }
    }

    fn write<R>(
        &mut self,
        f: impl FnOnce(&mut ChainStateData) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        match &mut self.pending {
            Some(pending) => f(pending),
            None => Err(StoreError::NotInTransaction),
        }
    }
}

impl ChainStateCursor for MemoryChainStateCursor {
    fn in_transaction(&self) -> bool {
        self.pending.is_some()
    }

    fn begin_transaction(&mut self) -> Result<(), StoreError> {
        if self.pending.is_some() {
            return Err(StoreError::AlreadyInTransaction);
        }
        self.pending = Some(self.data.lock().expect("chain state lock poisoned").clone());
        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<(), StoreError> {
        let pending = self.pending.take().ok_or(StoreError::NotInTransaction)?;
        *self.data.lock().expect("chain state lock poisoned") = pending;
        Ok(())
    }

    fn rollback_transaction(&mut self) -> Result<(), StoreError> {
        if self.pending.take().is_none() {
            return Err(StoreError::NotInTransaction);
        }
        Ok(())
    }

    fn chain_tip(&self) -> Result<Option<ChainedHeader>, StoreError> {
        Ok(self.read(|data| data.chain_tip()))
    }

    fn try_get_header(&self, hash: &BlockHash) -> Result<Option<ChainedHeader>, StoreError> {
        Ok(self.read(|data| data.headers.get(hash).copied()))
    }

    fn add_chained_header(&mut self, header: &ChainedHeader) -> Result<(), StoreError> {
        self.write(|data| {
            if data.headers_by_height.contains_key(&header.height) {
                return Err(StoreError::Duplicate(format!(
                    "header at height {}",
                    header.height
                )));
            }
            data.headers.insert(header.hash, *header);
            data.headers_by_height.insert(header.height, header.hash);
            Ok(())
        })
    }

    fn remove_chained_header(&mut self, header: &ChainedHeader) -> Result<(), StoreError> {
        self.write(|data| {
            match data.headers_by_height.remove(&header.height) {
                Some(hash) => {
                    data.headers.remove(&hash);
                    Ok(())
                }
                None => Err(StoreError::NotFound(format!(
                    "header at height {}",
                    header.height
                ))),
            }
        })
    }

    fn unspent_tx_count(&self) -> Result<u64, StoreError> {
        Ok(self.read(|data| data.unspent.len() as u64))
    }

    fn contains_unspent_tx(&self, tx_hash: &TxHash) -> Result<bool, StoreError> {
        Ok(self.read(|data| data.unspent.contains_key(tx_hash)))
    }

    fn try_get_unspent_tx(&self, tx_hash: &TxHash) -> Result<Option<UnspentTx>, StoreError> {
        Ok(self.read(|data| data.unspent.get(tx_hash).cloned()))
    }

    fn try_add_unspent_tx(&mut self, unspent: &UnspentTx) -> Result<bool, StoreError> {
        self.write(|data| {
            if data.unspent.contains_key(&unspent.tx_hash) {
                return Ok(false);
            }
            data.unspent.insert(unspent.tx_hash, unspent.clone());
            Ok(true)
        })
    }

    fn try_update_unspent_tx(&mut self, unspent: &UnspentTx) -> Result<bool, StoreError> {
        self.write(|data| {
            if !data.unspent.contains_key(&unspent.tx_hash) {
                return Ok(false);
            }
            data.unspent.insert(unspent.tx_hash, unspent.clone());
            Ok(true)
        })
    }

    fn try_remove_unspent_tx(&mut self, tx_hash: &TxHash) -> Result<bool, StoreError> {
        self.write(|data| Ok(data.unspent.remove(tx_hash).is_some()))
    }

    fn read_unspent_txs(&self) -> Result<Vec<UnspentTx>, StoreError> {
        Ok(self.read(|data| data.unspent.values().cloned().collect()))
    }

    fn try_get_block_spent_txs(
        &self,
        block_index: u32,
    ) -> Result<Option<Vec<SpentTx>>, StoreError> {
        self.read(|data| match data.spent_blobs.get(&block_index) {
            Some(blob) => decode_spent_tx_list(blob)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        })
    }

    fn try_add_block_spent_txs(
        &mut self,
        block_index: u32,
        spent_txs: &[SpentTx],
    ) -> Result<bool, StoreError> {
        self.write(|data| {
            if data.spent_blobs.contains_key(&block_index) {
                return Ok(false);
            }
            data.spent_blobs
                .insert(block_index, encode_spent_tx_list(spent_txs));
            Ok(true)
        })
    }

    fn try_remove_block_spent_txs(&mut self, block_index: u32) -> Result<bool, StoreError> {
        self.write(|data| Ok(data.spent_blobs.remove(&block_index).is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxcoin_types::{BlockHeader, OutputStates};

    fn chained(height: u32, hash: u8, previous: u8) -> ChainedHeader {
        ChainedHeader::new(
            BlockHash::new([hash; 32]),
            BlockHeader {
                version: 1,
                previous_hash: if height == 0 {
                    BlockHash::ZERO
                } else {
                    BlockHash::new([previous; 32])
                },
                merkle_root: TxHash::ZERO,
                time: 0,
                bits: 0,
                nonce: 0,
            },
            height,
            height as u128 + 1,
        )
    }

    fn unspent(hash: u8, outputs: usize) -> UnspentTx {
        UnspentTx::new(
            TxHash::new([hash; 32]),
            0,
            0,
            OutputStates::all_unspent(outputs),
        )
    }

    #[test]
    fn mutations_require_open_transaction() {
        let storage = MemoryStorageManager::new();
        let mut cursor = storage.open_chain_state_cursor().unwrap();
        assert!(!cursor.in_transaction());

        let err = cursor.try_add_unspent_tx(&unspent(1, 1)).unwrap_err();
        assert!(matches!(err, StoreError::NotInTransaction));
    }

    #[test]
    fn commit_publishes_to_other_cursors() {
        let storage = MemoryStorageManager::new();
        let mut writer = storage.open_chain_state_cursor().unwrap();
        let reader = storage.open_chain_state_cursor().unwrap();

        writer.begin_transaction().unwrap();
        writer.add_chained_header(&chained(0, 1, 0)).unwrap();
        writer.try_add_unspent_tx(&unspent(9, 2)).unwrap();

        // uncommitted writes are invisible elsewhere
        assert!(reader.chain_tip().unwrap().is_none());
        assert_eq!(reader.unspent_tx_count().unwrap(), 0);

        writer.commit_transaction().unwrap();
        assert_eq!(reader.chain_tip().unwrap().unwrap().height, 0);
        assert_eq!(reader.unspent_tx_count().unwrap(), 1);
    }

    #[test]
    fn rollback_discards_pending_writes() {
        let storage = MemoryStorageManager::new();
        let mut cursor = storage.open_chain_state_cursor().unwrap();

        cursor.begin_transaction().unwrap();
        cursor.try_add_unspent_tx(&unspent(3, 1)).unwrap();
        cursor.rollback_transaction().unwrap();

        assert_eq!(cursor.unspent_tx_count().unwrap(), 0);
        assert!(!cursor.in_transaction());
    }

    #[test]
    fn chain_tip_follows_greatest_height() {
        let storage = MemoryStorageManager::new();
        let mut cursor = storage.open_chain_state_cursor().unwrap();

        cursor.begin_transaction().unwrap();
        cursor.add_chained_header(&chained(0, 1, 0)).unwrap();
        cursor.add_chained_header(&chained(1, 2, 1)).unwrap();
        cursor.commit_transaction().unwrap();
        assert_eq!(cursor.chain_tip().unwrap().unwrap().height, 1);

        cursor.begin_transaction().unwrap();
        cursor.remove_chained_header(&chained(1, 2, 1)).unwrap();
        cursor.commit_transaction().unwrap();
        assert_eq!(cursor.chain_tip().unwrap().unwrap().height, 0);
    }

    #[test]
    fn add_then_update_then_remove_unspent() {
        let storage = MemoryStorageManager::new();
        let mut cursor = storage.open_chain_state_cursor().unwrap();
        let mut entry = unspent(7, 2);

        cursor.begin_transaction().unwrap();
        assert!(cursor.try_add_unspent_tx(&entry).unwrap());
        assert!(!cursor.try_add_unspent_tx(&entry).unwrap());

        entry.output_states.set_spent(0);
        assert!(cursor.try_update_unspent_tx(&entry).unwrap());
        assert_eq!(
            cursor.try_get_unspent_tx(&entry.tx_hash).unwrap().unwrap(),
            entry
        );

        assert!(cursor.try_remove_unspent_tx(&entry.tx_hash).unwrap());
        assert!(!cursor.try_remove_unspent_tx(&entry.tx_hash).unwrap());
        cursor.commit_transaction().unwrap();
    }

    #[test]
    fn read_unspent_txs_is_ordered_by_hash() {
        let storage = MemoryStorageManager::new();
        let mut cursor = storage.open_chain_state_cursor().unwrap();

        cursor.begin_transaction().unwrap();
        cursor.try_add_unspent_tx(&unspent(9, 1)).unwrap();
        cursor.try_add_unspent_tx(&unspent(1, 1)).unwrap();
        cursor.try_add_unspent_tx(&unspent(5, 1)).unwrap();
        cursor.commit_transaction().unwrap();

        let hashes: Vec<_> = cursor
            .read_unspent_txs()
            .unwrap()
            .into_iter()
            .map(|u| u.tx_hash)
            .collect();
        assert_eq!(
            hashes,
            vec![
                TxHash::new([1; 32]),
                TxHash::new([5; 32]),
                TxHash::new([9; 32])
            ]
        );
    }

    #[test]
    fn spent_tx_journal_round_trips_through_blob() {
        let storage = MemoryStorageManager::new();
        let mut cursor = storage.open_chain_state_cursor().unwrap();

        let spent_txs = vec![SpentTx {
            tx_hash: TxHash::new([4; 32]),
            confirmed_block_index: 2,
            tx_index: 1,
            output_count: 3,
        }];

        cursor.begin_transaction().unwrap();
        assert!(cursor.try_add_block_spent_txs(8, &spent_txs).unwrap());
        assert!(!cursor.try_add_block_spent_txs(8, &spent_txs).unwrap());
        cursor.commit_transaction().unwrap();

        assert_eq!(
            cursor.try_get_block_spent_txs(8).unwrap().unwrap(),
            spent_txs
        );
        assert!(cursor.try_get_block_spent_txs(9).unwrap().is_none());

        cursor.begin_transaction().unwrap();
        assert!(cursor.try_remove_block_spent_txs(8).unwrap());
        cursor.commit_transaction().unwrap();
        assert!(cursor.try_get_block_spent_txs(8).unwrap().is_none());
    }

    #[test]
    fn seeded_storage_exposes_chain_and_unspent_set() {
        let chain = Chain::from_headers(vec![chained(0, 1, 0), chained(1, 2, 1)]).unwrap();
        let storage = MemoryStorageManager::with_chain_state(&chain, vec![unspent(3, 2)]);
        let cursor = storage.open_chain_state_cursor().unwrap();

        assert_eq!(cursor.chain_tip().unwrap().unwrap().height, 1);
        assert!(cursor
            .try_get_header(&BlockHash::new([1; 32]))
            .unwrap()
            .is_some());
        assert_eq!(cursor.unspent_tx_count().unwrap(), 1);
    }
}
