//! Transaction codec.

use crate::error::CodecError;
use crate::io::{ByteReader, ByteWriter};
use oxcoin_crypto::hash256;
use oxcoin_types::{
    BlockTx, DecodedBlockTx, Transaction, TxHash, TxInput, TxOutput, TxOutputKey,
};

/// Encode a transaction to its wire form.
pub fn encode_transaction(tx: &Transaction) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.write_u32(tx.version);

    writer.write_varint(tx.inputs.len() as u64);
    for input in &tx.inputs {
        writer.write_bytes(input.prev_tx_output_key.tx_hash.as_bytes());
        writer.write_u32(input.prev_tx_output_key.output_index);
        writer.write_var_bytes(&input.script);
        writer.write_u32(input.sequence);
    }

    writer.write_varint(tx.outputs.len() as u64);
    for output in &tx.outputs {
        writer.write_u64(output.value);
        writer.write_var_bytes(&output.script);
    }

    writer.write_u32(tx.lock_time);
    writer.into_bytes()
}

/// Decode a transaction from its wire form.
pub fn decode_transaction(bytes: &[u8]) -> Result<Transaction, CodecError> {
    let mut reader = ByteReader::new(bytes);
    let tx = read_transaction(&mut reader)?;
    reader.finish()?;
    Ok(tx)
}

fn read_transaction(reader: &mut ByteReader<'_>) -> Result<Transaction, CodecError> {
    let version = reader.read_u32()?;

    let input_count = reader.read_varint()? as usize;
    let mut inputs = Vec::with_capacity(input_count.min(1024));
    for _ in 0..input_count {
        inputs.push(TxInput {
            prev_tx_output_key: TxOutputKey::new(
                TxHash::new(reader.read_array()?),
                reader.read_u32()?,
            ),
            script: reader.read_var_bytes()?,
            sequence: reader.read_u32()?,
        });
    }

    let output_count = reader.read_varint()? as usize;
    let mut outputs = Vec::with_capacity(output_count.min(1024));
    for _ in 0..output_count {
        outputs.push(TxOutput {
            value: reader.read_u64()?,
            script: reader.read_var_bytes()?,
        });
    }

    let lock_time = reader.read_u32()?;
    Ok(Transaction {
        version,
        inputs,
        outputs,
        lock_time,
    })
}

/// A transaction's identity: the double-hash of its encoding.
pub fn transaction_hash(tx: &Transaction) -> TxHash {
    TxHash::new(hash256(&encode_transaction(tx)))
}

/// Decode the transaction at `index` within a block from its raw bytes,
/// producing the wire-decoded record with its hash computed from those bytes.
pub fn decode_block_tx(index: u32, raw_bytes: &[u8]) -> Result<DecodedBlockTx, CodecError> {
    let tx = decode_transaction(raw_bytes)?;
    let hash = TxHash::new(hash256(raw_bytes));
    Ok(DecodedBlockTx::new(
        BlockTx::new(index, hash, tx),
        raw_bytes.to_vec(),
    ))
}
