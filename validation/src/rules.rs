//! The consensus-rule capability consumed by the block validator, and the
//! validator's configuration.

use crate::ValidationError;
use oxcoin_types::{BlockTx, ChainedHeader, LoadedTx, TxInput, TxOutput};

/// Active consensus rules, supplied by the caller.
///
/// Implementations are shared across the validator's concurrent stages and
/// must be safe to call from multiple tasks at once.
pub trait ConsensusRules: Send + Sync {
    /// Structural and semantic transaction rules (value conservation,
    /// script-count limits, and so on).
    fn validate_transaction(
        &self,
        header: &ChainedHeader,
        tx: &LoadedTx,
    ) -> Result<(), ValidationError>;

    /// Evaluate the unlocking/locking script pair for one input.
    fn validate_transaction_script(
        &self,
        header: &ChainedHeader,
        tx: &BlockTx,
        tx_index: u32,
        input: &TxInput,
        input_index: usize,
        prev_output: &TxOutput,
    ) -> Result<(), ValidationError>;
}

/// Per-call validator policy and resource bounds. No process-wide toggles;
/// a config travels with each pipeline construction.
#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    /// Skip script validation entirely; no script units are emitted.
    pub ignore_scripts: bool,
    /// Log and count script failures instead of failing the block. For
    /// analysis tooling only, never for consensus-critical paths.
    pub ignore_script_errors: bool,
    /// Skip comparing the accumulated merkle root against the header.
    pub bypass_merkle_validation: bool,
    /// Concurrent transaction-rule validations.
    pub rule_concurrency: usize,
    /// Concurrent script validations.
    pub script_concurrency: usize,
    /// Capacity of the bounded channels between stages.
    pub channel_capacity: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            ignore_scripts: false,
            ignore_script_errors: false,
            bypass_merkle_validation: false,
            rule_concurrency: 16,
            script_concurrency: 16,
            channel_capacity: 64,
        }
    }
}
