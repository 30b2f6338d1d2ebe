//! Fixed binary wire layouts for the oxcoin consensus-state core.
//!
//! Every encode/decode pair here is byte-exact: decoding an encoding and
//! re-encoding the result must reproduce the original bytes. Golden test
//! vectors in `tests/golden.rs` pin the layouts.
//!
//! All integers are little-endian; variable-length counts use the compact
//! varint form (1, 3, 5, or 9 bytes).

pub mod error;
pub mod header;
pub mod io;
pub mod transaction;
pub mod utxo;

pub use error::CodecError;
pub use header::{
    decode_block_header, decode_chained_header, encode_block_header, encode_chained_header,
    header_hash,
};
pub use transaction::{
    decode_block_tx, decode_transaction, encode_transaction, transaction_hash,
};
pub use utxo::{
    decode_output_states, decode_spent_tx_list, decode_unspent_tx, encode_output_states,
    encode_spent_tx_list, encode_unspent_tx,
};
