//! Codecs for unspent-transaction records and the spent-transaction journal.

use crate::error::CodecError;
use crate::io::{ByteReader, ByteWriter};
use oxcoin_types::{OutputStates, SpentTx, TxHash, UnspentTx};

/// Encode an output-state bitmap: varint output count, then the packed bits.
pub fn encode_output_states(states: &OutputStates) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    write_output_states(&mut writer, states);
    writer.into_bytes()
}

fn write_output_states(writer: &mut ByteWriter, states: &OutputStates) {
    writer.write_varint(states.len() as u64);
    writer.write_bytes(states.as_bytes());
}

/// Decode an output-state bitmap.
pub fn decode_output_states(bytes: &[u8]) -> Result<OutputStates, CodecError> {
    let mut reader = ByteReader::new(bytes);
    let states = read_output_states(&mut reader)?;
    reader.finish()?;
    Ok(states)
}

fn read_output_states(reader: &mut ByteReader<'_>) -> Result<OutputStates, CodecError> {
    let len = reader.read_varint()? as usize;
    let bits = reader.read_bytes(len.div_ceil(8))?.to_vec();
    OutputStates::from_bytes(len, bits)
        .ok_or_else(|| CodecError::Invalid("output-state bitmap length mismatch".into()))
}

/// Encode an unspent-transaction table entry.
pub fn encode_unspent_tx(unspent: &UnspentTx) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.write_bytes(unspent.tx_hash.as_bytes());
    writer.write_u32(unspent.block_index);
    writer.write_u32(unspent.tx_index);
    write_output_states(&mut writer, &unspent.output_states);
    writer.into_bytes()
}

/// Decode an unspent-transaction table entry.
pub fn decode_unspent_tx(bytes: &[u8]) -> Result<UnspentTx, CodecError> {
    let mut reader = ByteReader::new(bytes);
    let tx_hash = TxHash::new(reader.read_array()?);
    let block_index = reader.read_u32()?;
    let tx_index = reader.read_u32()?;
    let output_states = read_output_states(&mut reader)?;
    reader.finish()?;
    Ok(UnspentTx::new(tx_hash, block_index, tx_index, output_states))
}

/// Encoded size of one spent-transaction journal record.
pub const SPENT_TX_SIZE: usize = 44;

fn write_spent_tx(writer: &mut ByteWriter, spent: &SpentTx) {
    writer.write_bytes(spent.tx_hash.as_bytes());
    writer.write_u32(spent.confirmed_block_index);
    writer.write_u32(spent.tx_index);
    writer.write_u32(spent.output_count);
}

fn read_spent_tx(reader: &mut ByteReader<'_>) -> Result<SpentTx, CodecError> {
    Ok(SpentTx {
        tx_hash: TxHash::new(reader.read_array()?),
        confirmed_block_index: reader.read_u32()?,
        tx_index: reader.read_u32()?,
        output_count: reader.read_u32()?,
    })
}

/// Encode a block's spent-transaction journal as an append-only blob of
/// fixed-size records.
pub fn encode_spent_tx_list(spent_txs: &[SpentTx]) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    for spent in spent_txs {
        write_spent_tx(&mut writer, spent);
    }
    writer.into_bytes()
}

/// Decode a block's spent-transaction journal blob.
pub fn decode_spent_tx_list(bytes: &[u8]) -> Result<Vec<SpentTx>, CodecError> {
    if bytes.len() % SPENT_TX_SIZE != 0 {
        return Err(CodecError::Invalid(format!(
            "spent-tx journal length {} is not a multiple of {}",
            bytes.len(),
            SPENT_TX_SIZE
        )));
    }
    let mut reader = ByteReader::new(bytes);
    let mut spent_txs = Vec::with_capacity(bytes.len() / SPENT_TX_SIZE);
    while reader.remaining() > 0 {
        spent_txs.push(read_spent_tx(&mut reader)?);
    }
    reader.finish()?;
    Ok(spent_txs)
}
