//! The three-stage block validator.
//!
//! Loaded transactions fan out to a sequential merkle stage (accumulation
//! order is part of its correctness contract) and a bounded-parallel rule
//! stage; the rule stage emits one unit per non-coinbase input to the
//! bounded-parallel script stage. The stages drain over bounded channels and
//! the block receives a single aggregate verdict.

use crate::{
    CancelToken, ConsensusRules, MerkleAccumulator, MerkleTreeNode, ValidationError,
    ValidatorConfig,
};
use oxcoin_types::{ChainedHeader, LoadedTx};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Aggregate result of a successfully validated block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockValidationSummary {
    /// Script failures logged and swallowed under `ignore_script_errors`.
    /// Always zero on consensus-critical paths.
    pub suppressed_script_errors: u64,
}

/// Validate one block's transactions against `rules`.
///
/// `loaded_txs` must deliver the block's transactions in index order, each
/// with its previous outputs resolved. Cancellation is observed at unit
/// boundaries and surfaces as [`ValidationError::Cancelled`], never as a
/// validation verdict.
pub async fn validate_block<R>(
    rules: Arc<R>,
    config: &ValidatorConfig,
    header: &ChainedHeader,
    mut loaded_txs: mpsc::Receiver<LoadedTx>,
    cancel: CancelToken,
) -> Result<BlockValidationSummary, ValidationError>
where
    R: ConsensusRules + 'static,
{
    let header = *header;
    let (merkle_tx, merkle_rx) = mpsc::channel(config.channel_capacity.max(1));
    let (rule_tx, rule_rx) = mpsc::channel(config.channel_capacity.max(1));
    let (script_tx, script_rx) = mpsc::channel(config.channel_capacity.max(1));

    let merkle_stage = run_merkle_stage(
        merkle_rx,
        header,
        config.bypass_merkle_validation,
        cancel.clone(),
    );
    let rule_stage = run_rule_stage(
        rule_rx,
        script_tx,
        Arc::clone(&rules),
        header,
        config.ignore_scripts,
        config.rule_concurrency,
        cancel.clone(),
    );
    let script_stage = run_script_stage(
        script_rx,
        rules,
        header,
        config.ignore_script_errors,
        config.script_concurrency,
        cancel.clone(),
    );

    let feed_cancel = cancel.clone();
    let feed = async move {
        while let Some(tx) = loaded_txs.recv().await {
            feed_cancel.check()?;
            let tx = Arc::new(tx);
            if merkle_tx
                .send(MerkleTreeNode::leaf(tx.index(), tx.hash()))
                .await
                .is_err()
            {
                break;
            }
            if rule_tx.send(Arc::clone(&tx)).await.is_err() {
                break;
            }
        }
        Ok::<(), ValidationError>(())
    };

    let (feed_result, merkle_result, rule_result, script_result) =
        tokio::join!(feed, merkle_stage, rule_stage, script_stage);

    if cancel.is_cancelled() {
        return Err(ValidationError::Cancelled);
    }

    // A stage failure makes upstream senders fail and the merkle stage see a
    // truncated feed; report the causing stage, not the knock-on mismatch.
    rule_result?;
    let suppressed_script_errors = script_result?;
    feed_result?;
    merkle_result?;

    if suppressed_script_errors > 0 {
        tracing::debug!(
            block_hash = %header.hash,
            height = header.height,
            suppressed_script_errors,
            "script failures suppressed by policy"
        );
    }
    Ok(BlockValidationSummary {
        suppressed_script_errors,
    })
}

async fn run_merkle_stage(
    mut rx: mpsc::Receiver<MerkleTreeNode>,
    header: ChainedHeader,
    bypass_merkle_validation: bool,
    cancel: CancelToken,
) -> Result<(), ValidationError> {
    let mut accumulator = MerkleAccumulator::new();
    while let Some(node) = rx.recv().await {
        cancel.check()?;
        if accumulator.add_node(node).is_err() {
            return Err(merkle_failure(&header));
        }
    }
    if bypass_merkle_validation {
        return Ok(());
    }
    match accumulator.finish_pairing() {
        Ok(root) if root == header.header.merkle_root => Ok(()),
        _ => Err(merkle_failure(&header)),
    }
}

fn merkle_failure(header: &ChainedHeader) -> ValidationError {
    ValidationError::MerkleRoot {
        block_hash: header.hash,
        height: header.height,
    }
}

async fn run_rule_stage<R>(
    mut rx: mpsc::Receiver<Arc<LoadedTx>>,
    script_tx: mpsc::Sender<(Arc<LoadedTx>, usize)>,
    rules: Arc<R>,
    header: ChainedHeader,
    ignore_scripts: bool,
    concurrency: usize,
    cancel: CancelToken,
) -> Result<(), ValidationError>
where
    R: ConsensusRules + 'static,
{
    let mut tasks: JoinSet<Result<(), ValidationError>> = JoinSet::new();
    let mut first_error: Option<ValidationError> = None;

    while let Some(tx) = rx.recv().await {
        if let Err(err) = cancel.check() {
            first_error.get_or_insert(err);
            break;
        }
        while tasks.len() >= concurrency.max(1) {
            if let Err(err) = join_unit(&mut tasks).await {
                first_error.get_or_insert(err);
            }
        }
        if first_error.is_some() {
            break;
        }

        let rules = Arc::clone(&rules);
        let script_tx = script_tx.clone();
        tasks.spawn(async move {
            rules.validate_transaction(&header, &tx)?;
            if !ignore_scripts && !tx.is_coinbase() {
                for input_index in 0..tx.block_tx.tx.inputs.len() {
                    if script_tx.send((Arc::clone(&tx), input_index)).await.is_err() {
                        break;
                    }
                }
            }
            Ok(())
        });
    }

    while !tasks.is_empty() {
        if let Err(err) = join_unit(&mut tasks).await {
            first_error.get_or_insert(err);
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn run_script_stage<R>(
    mut rx: mpsc::Receiver<(Arc<LoadedTx>, usize)>,
    rules: Arc<R>,
    header: ChainedHeader,
    ignore_script_errors: bool,
    concurrency: usize,
    cancel: CancelToken,
) -> Result<u64, ValidationError>
where
    R: ConsensusRules + 'static,
{
    let mut tasks: JoinSet<Result<u64, ValidationError>> = JoinSet::new();
    let mut suppressed = 0u64;
    let mut first_error: Option<ValidationError> = None;

    while let Some((tx, input_index)) = rx.recv().await {
        if let Err(err) = cancel.check() {
            first_error.get_or_insert(err);
            break;
        }
        while tasks.len() >= concurrency.max(1) {
            match join_unit(&mut tasks).await {
                Ok(count) => suppressed += count,
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        if first_error.is_some() {
            break;
        }

        let rules = Arc::clone(&rules);
        tasks.spawn(async move {
            validate_input(rules.as_ref(), &header, &tx, input_index, ignore_script_errors)
        });
    }

    while !tasks.is_empty() {
        match join_unit(&mut tasks).await {
            Ok(count) => suppressed += count,
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(suppressed),
    }
}

fn validate_input<R: ConsensusRules>(
    rules: &R,
    header: &ChainedHeader,
    tx: &LoadedTx,
    input_index: usize,
    ignore_script_errors: bool,
) -> Result<u64, ValidationError> {
    let Some(input) = tx.block_tx.tx.inputs.get(input_index) else {
        return Err(ValidationError::Transaction {
            tx_hash: tx.hash(),
            reason: format!("input {input_index} does not exist"),
        });
    };
    let Some(prev_output) = tx.input_prev_tx_output(input_index) else {
        return Err(ValidationError::Transaction {
            tx_hash: tx.hash(),
            reason: format!("input {input_index} has no resolved previous output"),
        });
    };

    match rules.validate_transaction_script(
        header,
        &tx.block_tx,
        tx.index(),
        input,
        input_index,
        prev_output,
    ) {
        Ok(()) => Ok(0),
        Err(err) if ignore_script_errors => {
            tracing::debug!(
                tx_hash = %tx.hash(),
                input_index,
                error = %err,
                "suppressed script validation failure"
            );
            Ok(1)
        }
        Err(err) => Err(err),
    }
}

async fn join_unit<T>(tasks: &mut JoinSet<Result<T, ValidationError>>) -> Result<T, ValidationError>
where
    T: Default + Send + 'static,
{
    match tasks.join_next().await {
        Some(Ok(result)) => result,
        Some(Err(join_err)) => Err(ValidationError::Pipeline(join_err.to_string())),
        None => Ok(T::default()),
    }
}
