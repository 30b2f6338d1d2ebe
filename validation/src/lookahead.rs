//! UTXO lookahead: warms the previous outputs a transaction's inputs consume
//! before the transaction reaches validation.
//!
//! Warm-ups run concurrently, bounded by the deferred cursor's pool size, but
//! transactions are re-emitted strictly in input order: completed-but-not-next
//! items wait in a reorder buffer keyed by arrival sequence until the
//! emission frontier reaches them.

use crate::ValidationError;
use oxcoin_store::{DeferredChainStateCursor, StoreError};
use oxcoin_types::{DecodedBlockTx, TxHash};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

const OUTPUT_CHANNEL_CAPACITY: usize = 64;

/// Spawn the lookahead stage over `rx`.
///
/// Returns the re-emitting receiver and a completion handle. The handle
/// resolves `Ok` once every input has been warmed and emitted; the first
/// warm-up failure resolves it with that error and abandons remaining work.
pub fn look_ahead(
    rx: mpsc::Receiver<DecodedBlockTx>,
    cursor: Arc<dyn DeferredChainStateCursor>,
) -> (
    mpsc::Receiver<DecodedBlockTx>,
    JoinHandle<Result<(), ValidationError>>,
) {
    let (out_tx, out_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
    let handle = tokio::spawn(run_look_ahead(rx, cursor, out_tx));
    (out_rx, handle)
}

async fn run_look_ahead(
    mut rx: mpsc::Receiver<DecodedBlockTx>,
    cursor: Arc<dyn DeferredChainStateCursor>,
    out_tx: mpsc::Sender<DecodedBlockTx>,
) -> Result<(), ValidationError> {
    let semaphore = Arc::new(Semaphore::new(cursor.cursor_count().max(1)));
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(u64, Result<(), StoreError>)>();

    let mut pending: HashMap<u64, DecodedBlockTx> = HashMap::new();
    let mut ready: HashSet<u64> = HashSet::new();
    let mut next_seq = 0u64;
    let mut next_emit = 0u64;
    let mut input_open = true;

    loop {
        tokio::select! {
            item = rx.recv(), if input_open => match item {
                Some(decoded) => {
                    let seq = next_seq;
                    next_seq += 1;

                    // The coinbase has no real previous outputs to warm.
                    let warm_hashes: Vec<TxHash> = if decoded.is_coinbase() {
                        Vec::new()
                    } else {
                        decoded
                            .block_tx
                            .tx
                            .inputs
                            .iter()
                            .map(|input| input.prev_tx_output_key.tx_hash)
                            .collect()
                    };
                    pending.insert(seq, decoded);

                    if warm_hashes.is_empty() {
                        let _ = done_tx.send((seq, Ok(())));
                    } else {
                        let cursor = Arc::clone(&cursor);
                        let semaphore = Arc::clone(&semaphore);
                        let done_tx = done_tx.clone();
                        tokio::spawn(async move {
                            let result = warm_inputs(cursor, semaphore, warm_hashes).await;
                            let _ = done_tx.send((seq, result));
                        });
                    }
                }
                None => input_open = false,
            },
            Some((seq, result)) = done_rx.recv() => {
                result.map_err(ValidationError::Warmup)?;
                ready.insert(seq);

                // Drain the eligible prefix of the reorder buffer.
                while ready.remove(&next_emit) {
                    let Some(decoded) = pending.remove(&next_emit) else {
                        break;
                    };
                    if out_tx.send(decoded).await.is_err() {
                        // Downstream hung up; nothing left to deliver.
                        return Ok(());
                    }
                    next_emit += 1;
                }
            },
        }

        if !input_open && next_emit == next_seq {
            return Ok(());
        }
    }
}

async fn warm_inputs(
    cursor: Arc<dyn DeferredChainStateCursor>,
    semaphore: Arc<Semaphore>,
    warm_hashes: Vec<TxHash>,
) -> Result<(), StoreError> {
    for tx_hash in warm_hashes {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|_| StoreError::Backend("warm-up semaphore closed".into()))?;
        let cursor = Arc::clone(&cursor);

        // The cursor contract is synchronous; keep warm lookups off the
        // async workers.
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            cursor.warm_unspent_tx(&tx_hash)
        })
        .await;
        match result {
            Ok(warmed) => warmed?,
            Err(join_err) => {
                return Err(StoreError::Backend(format!(
                    "warm-up task failed: {join_err}"
                )))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxcoin_types::{BlockTx, Transaction, TxInput, TxOutput, TxOutputKey};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Condvar, Mutex};
    use std::time::Duration;

    fn decoded(index: u32, hash_byte: u8, input_hashes: &[u8]) -> DecodedBlockTx {
        let tx = Transaction {
            version: 1,
            inputs: input_hashes
                .iter()
                .map(|&b| TxInput {
                    prev_tx_output_key: TxOutputKey::new(TxHash::new([b; 32]), 0),
                    script: vec![],
                    sequence: u32::MAX,
                })
                .collect(),
            outputs: vec![TxOutput {
                value: 50,
                script: vec![],
            }],
            lock_time: 0,
        };
        DecodedBlockTx::new(BlockTx::new(index, TxHash::new([hash_byte; 32]), tx), vec![])
    }

    struct CountingCursor {
        cursors: usize,
        warm_calls: AtomicUsize,
    }

    impl CountingCursor {
        fn new(cursors: usize) -> Self {
            Self {
                cursors,
                warm_calls: AtomicUsize::new(0),
            }
        }
    }

    impl DeferredChainStateCursor for CountingCursor {
        fn cursor_count(&self) -> usize {
            self.cursors
        }

        fn warm_unspent_tx(&self, _tx_hash: &TxHash) -> Result<(), StoreError> {
            self.warm_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Blocks each warm-up until its hash is explicitly released.
    struct BlockingCursor {
        released: Mutex<HashSet<TxHash>>,
        cv: Condvar,
    }

    impl BlockingCursor {
        fn new() -> Self {
            Self {
                released: Mutex::new(HashSet::new()),
                cv: Condvar::new(),
            }
        }

        fn release(&self, hash_byte: u8) {
            let mut released = self.released.lock().unwrap();
            released.insert(TxHash::new([hash_byte; 32]));
            self.cv.notify_all();
        }
    }

    impl DeferredChainStateCursor for BlockingCursor {
        fn cursor_count(&self) -> usize {
            8
        }

        fn warm_unspent_tx(&self, tx_hash: &TxHash) -> Result<(), StoreError> {
            let mut released = self.released.lock().unwrap();
            while !released.contains(tx_hash) {
                released = self.cv.wait(released).unwrap();
            }
            Ok(())
        }
    }

    struct FailingCursor {
        fail_on: TxHash,
    }

    impl DeferredChainStateCursor for FailingCursor {
        fn cursor_count(&self) -> usize {
            2
        }

        fn warm_unspent_tx(&self, tx_hash: &TxHash) -> Result<(), StoreError> {
            if *tx_hash == self.fail_on {
                Err(StoreError::Backend("warm lookup failed".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn empty_input_emits_nothing_and_completes() {
        let (in_tx, in_rx) = mpsc::channel(8);
        let cursor = Arc::new(CountingCursor::new(2));
        let (mut out_rx, handle) = look_ahead(in_rx, cursor.clone());

        drop(in_tx);
        assert!(out_rx.recv().await.is_none());
        handle.await.unwrap().unwrap();
        assert_eq!(cursor.warm_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn coinbase_passes_through_without_warm_ups() {
        let (in_tx, in_rx) = mpsc::channel(8);
        let cursor = Arc::new(CountingCursor::new(2));
        let (mut out_rx, handle) = look_ahead(in_rx, cursor.clone());

        let coinbase = decoded(0, 10, &[0]);
        in_tx.send(coinbase.clone()).await.unwrap();
        drop(in_tx);

        assert_eq!(out_rx.recv().await.unwrap(), coinbase);
        assert!(out_rx.recv().await.is_none());
        handle.await.unwrap().unwrap();
        assert_eq!(cursor.warm_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn warms_once_per_input_and_preserves_order() {
        let (in_tx, in_rx) = mpsc::channel(8);
        let cursor = Arc::new(CountingCursor::new(4));
        let (mut out_rx, handle) = look_ahead(in_rx, cursor.clone());

        // Three transactions with two inputs each: six warm-ups total.
        let txs = vec![
            decoded(1, 10, &[1, 2]),
            decoded(2, 11, &[3, 4]),
            decoded(3, 12, &[5, 6]),
        ];
        for tx in &txs {
            in_tx.send(tx.clone()).await.unwrap();
        }
        drop(in_tx);

        for expected in &txs {
            assert_eq!(out_rx.recv().await.unwrap(), *expected);
        }
        assert!(out_rx.recv().await.is_none());
        handle.await.unwrap().unwrap();
        assert_eq!(cursor.warm_calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn emission_order_survives_out_of_order_completions() {
        let (in_tx, in_rx) = mpsc::channel(8);
        let cursor = Arc::new(BlockingCursor::new());
        let (mut out_rx, handle) = look_ahead(in_rx, cursor.clone());

        // Inputs 0..4; completions will land in order 0, 3, 1, 2.
        let txs = vec![
            decoded(1, 10, &[1]),
            decoded(2, 11, &[2]),
            decoded(3, 12, &[3]),
            decoded(4, 13, &[4]),
        ];
        for tx in &txs {
            in_tx.send(tx.clone()).await.unwrap();
        }
        drop(in_tx);
        tokio::time::sleep(Duration::from_millis(50)).await;

        cursor.release(1);
        assert_eq!(out_rx.recv().await.unwrap(), txs[0]);

        cursor.release(4);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(out_rx.try_recv().is_err());

        cursor.release(2);
        assert_eq!(out_rx.recv().await.unwrap(), txs[1]);

        cursor.release(3);
        assert_eq!(out_rx.recv().await.unwrap(), txs[2]);
        assert_eq!(out_rx.recv().await.unwrap(), txs[3]);

        assert!(out_rx.recv().await.is_none());
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn first_warm_up_fault_fails_the_completion() {
        let (in_tx, in_rx) = mpsc::channel(8);
        let cursor = Arc::new(FailingCursor {
            fail_on: TxHash::new([9; 32]),
        });
        let (_out_rx, handle) = look_ahead(in_rx, cursor);

        in_tx.send(decoded(1, 10, &[1])).await.unwrap();
        in_tx.send(decoded(2, 11, &[9])).await.unwrap();
        drop(in_tx);

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, ValidationError::Warmup(_)));
    }
}
