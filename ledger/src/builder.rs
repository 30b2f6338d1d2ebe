//! The chain-state builder: the single writer that advances or retracts the
//! unspent-transaction set one block at a time.
//!
//! Construction reconstructs the in-memory [`Chain`] by walking persisted
//! headers from the storage tip back to genesis. Every `add_block` and
//! `rollback_block` first re-reads the storage tip and refuses to proceed if
//! it has moved out from under the builder; a faulted builder is discarded by
//! the caller, never repaired in place.

use crate::ChainStateError;
use oxcoin_store::{ChainStateCursor, StorageManager, StoreError};
use oxcoin_types::{
    BlockTx, Chain, ChainedHeader, OutputStates, SpentTx, TxOutputKey, UnspentTx,
};

pub struct ChainStateBuilder<C: ChainStateCursor> {
    cursor: C,
    chain: Chain,
}

impl<C: ChainStateCursor> std::fmt::Debug for ChainStateBuilder<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainStateBuilder")
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

impl<C: ChainStateCursor> ChainStateBuilder<C> {
    /// Open a builder over `storage`, reconstructing the chain from the
    /// persisted tip. An absent ancestor header is fatal and surfaces as
    /// [`ChainStateError::StorageCorrupt`] naming the missing hash.
    pub fn open<S>(storage: &S) -> Result<Self, ChainStateError>
    where
        S: StorageManager<Cursor = C>,
    {
        let cursor = storage.open_chain_state_cursor()?;
        let chain = reconstruct_chain(&cursor)?;
        Ok(Self { cursor, chain })
    }

    /// The current in-progress chain.
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn unspent_tx_count(&self) -> Result<u64, ChainStateError> {
        Ok(self.cursor.unspent_tx_count()?)
    }

    /// Apply `header` and its transactions on top of the current tip.
    ///
    /// Runs inside one storage transaction: inputs spend their referenced
    /// outputs (records deleted and journaled when fully spent), each
    /// transaction gains a fresh all-unspent record, the block's
    /// spent-transaction journal entry and chained header are written, and
    /// the whole delta commits atomically. Any failure rolls the storage
    /// transaction back and leaves the builder's chain untouched.
    pub fn add_block(
        &mut self,
        header: &ChainedHeader,
        txs: &[BlockTx],
    ) -> Result<(), ChainStateError> {
        self.check_chain_tip()?;
        self.check_extends_tip(header)?;

        self.cursor.begin_transaction()?;
        if let Err(err) = self.apply_block(header, txs) {
            self.cursor.rollback_transaction()?;
            return Err(err);
        }
        self.cursor.commit_transaction()?;

        self.chain.append(*header)?;
        tracing::debug!(
            block_hash = %header.hash,
            height = header.height,
            tx_count = txs.len(),
            "applied block to chain state"
        );
        Ok(())
    }

    /// Retract the current tip block, restoring the unspent-transaction set
    /// to its state before `add_block`. Structural inverse of `add_block`,
    /// driven by the block's transactions plus its spent-transaction journal
    /// entry, inside one storage transaction.
    pub fn rollback_block(
        &mut self,
        header: &ChainedHeader,
        txs: &[BlockTx],
    ) -> Result<(), ChainStateError> {
        self.check_chain_tip()?;
        if self.chain.tip_hash() != header.hash {
            return Err(ChainStateError::InvalidChaining {
                hash: header.hash,
                height: header.height,
            });
        }

        self.cursor.begin_transaction()?;
        if let Err(err) = self.unwind_block(header, txs) {
            self.cursor.rollback_transaction()?;
            return Err(err);
        }
        self.cursor.commit_transaction()?;

        self.chain.pop();
        tracing::debug!(
            block_hash = %header.hash,
            height = header.height,
            "rolled back block from chain state"
        );
        Ok(())
    }

    fn check_chain_tip(&self) -> Result<(), ChainStateError> {
        let actual = self.cursor.chain_tip()?.map(|tip| tip.hash);
        let expected = self.chain.tip().map(|tip| tip.hash);
        if actual != expected {
            return Err(ChainStateError::OutOfSync { expected, actual });
        }
        Ok(())
    }

    fn check_extends_tip(&self, header: &ChainedHeader) -> Result<(), ChainStateError> {
        let extends = match self.chain.tip() {
            Some(tip) => {
                header.header.previous_hash == tip.hash && header.height == tip.height + 1
            }
            None => header.is_genesis(),
        };
        if !extends {
            return Err(ChainStateError::InvalidChaining {
                hash: header.hash,
                height: header.height,
            });
        }
        Ok(())
    }

    fn apply_block(
        &mut self,
        header: &ChainedHeader,
        txs: &[BlockTx],
    ) -> Result<(), ChainStateError> {
        let mut spent_txs = Vec::new();
        for block_tx in txs {
            // The coinbase creates value; it has no real previous outputs.
            if !block_tx.is_coinbase() {
                for input in &block_tx.tx.inputs {
                    self.spend_output(&input.prev_tx_output_key, &mut spent_txs)?;
                }
            }

            let fresh = UnspentTx::new(
                block_tx.hash,
                header.height,
                block_tx.index,
                OutputStates::all_unspent(block_tx.tx.outputs.len()),
            );
            if !self.cursor.try_add_unspent_tx(&fresh)? {
                return Err(ChainStateError::DuplicateTransaction {
                    tx_hash: block_tx.hash,
                });
            }
        }

        // Written even when empty so rollback always finds an entry.
        if !self.cursor.try_add_block_spent_txs(header.height, &spent_txs)? {
            return Err(StoreError::Duplicate(format!(
                "spent-tx journal for block index {}",
                header.height
            ))
            .into());
        }
        self.cursor.add_chained_header(header)?;
        Ok(())
    }

    fn spend_output(
        &mut self,
        key: &TxOutputKey,
        spent_txs: &mut Vec<SpentTx>,
    ) -> Result<(), ChainStateError> {
        let Some(mut unspent) = self.cursor.try_get_unspent_tx(&key.tx_hash)? else {
            return Err(ChainStateError::MissingUnspentTx {
                tx_hash: key.tx_hash,
                output_index: key.output_index,
            });
        };
        let output_index = key.output_index as usize;
        if output_index >= unspent.output_states.len() {
            return Err(ChainStateError::MissingUnspentTx {
                tx_hash: key.tx_hash,
                output_index: key.output_index,
            });
        }
        if unspent.output_states.is_spent(output_index) {
            return Err(ChainStateError::OutputAlreadySpent {
                tx_hash: key.tx_hash,
                output_index: key.output_index,
            });
        }

        unspent.output_states.set_spent(output_index);
        if unspent.output_states.any_unspent() {
            self.cursor.try_update_unspent_tx(&unspent)?;
        } else {
            // Last output spent: the record leaves the table and is journaled
            // so rollback can re-create it with its original indices.
            self.cursor.try_remove_unspent_tx(&key.tx_hash)?;
            spent_txs.push(SpentTx::from_unspent(&unspent));
        }
        Ok(())
    }

    fn unwind_block(
        &mut self,
        header: &ChainedHeader,
        txs: &[BlockTx],
    ) -> Result<(), ChainStateError> {
        let journaled = self
            .cursor
            .try_get_block_spent_txs(header.height)?
            .ok_or(ChainStateError::MissingSpentTx {
                block_index: header.height,
            })?;

        // Re-create the records this block fully spent, every output marked
        // spent; clearing this block's spends below restores their true state.
        for spent in &journaled {
            if !self.cursor.try_add_unspent_tx(&spent.to_spent_unspent_tx())? {
                return Err(StoreError::Corruption(format!(
                    "journaled transaction {} still present in the unspent set",
                    spent.tx_hash
                ))
                .into());
            }
        }

        for block_tx in txs.iter().rev() {
            if block_tx.is_coinbase() {
                continue;
            }
            for input in block_tx.tx.inputs.iter().rev() {
                self.unspend_output(&input.prev_tx_output_key)?;
            }
        }

        // Drop the records this block created.
        for block_tx in txs {
            if !self.cursor.try_remove_unspent_tx(&block_tx.hash)? {
                return Err(StoreError::Corruption(format!(
                    "transaction {} confirmed by the unwound block is missing",
                    block_tx.hash
                ))
                .into());
            }
        }

        if !self.cursor.try_remove_block_spent_txs(header.height)? {
            return Err(ChainStateError::MissingSpentTx {
                block_index: header.height,
            });
        }
        self.cursor.remove_chained_header(header)?;
        Ok(())
    }

    fn unspend_output(&mut self, key: &TxOutputKey) -> Result<(), ChainStateError> {
        let Some(mut unspent) = self.cursor.try_get_unspent_tx(&key.tx_hash)? else {
            return Err(ChainStateError::MissingUnspentTx {
                tx_hash: key.tx_hash,
                output_index: key.output_index,
            });
        };
        let output_index = key.output_index as usize;
        if output_index >= unspent.output_states.len()
            || !unspent.output_states.is_spent(output_index)
        {
            return Err(StoreError::Corruption(format!(
                "output {}:{} is not marked spent",
                key.tx_hash, key.output_index
            ))
            .into());
        }

        unspent.output_states.set_unspent(output_index);
        self.cursor.try_update_unspent_tx(&unspent)?;
        Ok(())
    }
}

fn reconstruct_chain<C: ChainStateCursor>(cursor: &C) -> Result<Chain, ChainStateError> {
    let Some(tip) = cursor.chain_tip()? else {
        return Ok(Chain::new());
    };

    let mut headers = vec![tip];
    let mut current = tip;
    while !current.is_genesis() {
        let previous_hash = current.header.previous_hash;
        let previous = cursor
            .try_get_header(&previous_hash)?
            .ok_or(ChainStateError::StorageCorrupt {
                missing: previous_hash,
            })?;
        headers.push(previous);
        current = previous;
    }
    headers.reverse();
    Ok(Chain::from_headers(headers)?)
}
