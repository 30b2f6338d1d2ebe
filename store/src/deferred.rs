//! Deferred cursor for read-side prefetching.

use crate::StoreError;
use oxcoin_types::TxHash;

/// A cursor front-end that can warm unspent-transaction lookups ahead of the
/// point where validation needs the data.
///
/// `warm_unspent_tx` blocks while it performs the lookup; callers run warm-ups
/// concurrently across up to [`cursor_count`](Self::cursor_count) slots.
pub trait DeferredChainStateCursor: Send + Sync {
    /// Number of concurrent lookup slots backing this cursor.
    fn cursor_count(&self) -> usize;

    /// Pre-fetch the unspent entry for `tx_hash` so a later read is served
    /// from the warmed cache. Missing entries are not an error here; they
    /// surface during rule validation instead.
    fn warm_unspent_tx(&self, tx_hash: &TxHash) -> Result<(), StoreError>;
}
