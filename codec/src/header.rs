//! Block-header and chained-header codecs.

use crate::error::CodecError;
use crate::io::{ByteReader, ByteWriter};
use oxcoin_crypto::hash256;
use oxcoin_types::{BlockHash, BlockHeader, ChainedHeader, TxHash};

/// Encoded size of a raw block header.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Encode an 80-byte block header.
pub fn encode_block_header(header: &BlockHeader) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    write_block_header(&mut writer, header);
    writer.into_bytes()
}

pub(crate) fn write_block_header(writer: &mut ByteWriter, header: &BlockHeader) {
    writer.write_u32(header.version);
    writer.write_bytes(header.previous_hash.as_bytes());
    writer.write_bytes(header.merkle_root.as_bytes());
    writer.write_u32(header.time);
    writer.write_u32(header.bits);
    writer.write_u32(header.nonce);
}

/// Decode an 80-byte block header.
pub fn decode_block_header(bytes: &[u8]) -> Result<BlockHeader, CodecError> {
    let mut reader = ByteReader::new(bytes);
    let header = read_block_header(&mut reader)?;
    reader.finish()?;
    Ok(header)
}

pub(crate) fn read_block_header(reader: &mut ByteReader<'_>) -> Result<BlockHeader, CodecError> {
    Ok(BlockHeader {
        version: reader.read_u32()?,
        previous_hash: BlockHash::new(reader.read_array()?),
        merkle_root: TxHash::new(reader.read_array()?),
        time: reader.read_u32()?,
        bits: reader.read_u32()?,
        nonce: reader.read_u32()?,
    })
}

/// A block header's identity: the double-hash of its encoding.
pub fn header_hash(header: &BlockHeader) -> BlockHash {
    BlockHash::new(hash256(&encode_block_header(header)))
}

/// Encode a chained header: height, cumulative work, then the raw header.
/// The hash is not stored; it is recomputed from the header on decode.
pub fn encode_chained_header(chained: &ChainedHeader) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.write_u32(chained.height);
    writer.write_u128(chained.total_work);
    write_block_header(&mut writer, &chained.header);
    writer.into_bytes()
}

/// Decode a chained header, recomputing its hash from the header bytes.
pub fn decode_chained_header(bytes: &[u8]) -> Result<ChainedHeader, CodecError> {
    let mut reader = ByteReader::new(bytes);
    let height = reader.read_u32()?;
    let total_work = reader.read_u128()?;
    let header = read_block_header(&mut reader)?;
    reader.finish()?;
    Ok(ChainedHeader::new(
        header_hash(&header),
        header,
        height,
        total_work,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> BlockHeader {
        BlockHeader {
            version: 2,
            previous_hash: BlockHash::new([0x11; 32]),
            merkle_root: TxHash::new([0x22; 32]),
            time: 1_415_000_000,
            bits: 0x1D00FFFF,
            nonce: 0xDEADBEEF,
        }
    }

    #[test]
    fn block_header_encodes_to_80_bytes() {
        assert_eq!(encode_block_header(&sample_header()).len(), BLOCK_HEADER_SIZE);
    }

    #[test]
    fn block_header_round_trip() {
        let header = sample_header();
        let encoded = encode_block_header(&header);
        let decoded = decode_block_header(&encoded).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(encode_block_header(&decoded), encoded);
    }

    #[test]
    fn chained_header_round_trip_recomputes_hash() {
        let header = sample_header();
        let chained = ChainedHeader::new(header_hash(&header), header, 42, 1 << 40);
        let encoded = encode_chained_header(&chained);
        let decoded = decode_chained_header(&encoded).unwrap();
        assert_eq!(decoded, chained);
        assert_eq!(encode_chained_header(&decoded), encoded);
    }

    #[test]
    fn header_hash_changes_with_nonce() {
        let a = sample_header();
        let mut b = a;
        b.nonce += 1;
        assert_ne!(header_hash(&a), header_hash(&b));
    }

    #[test]
    fn decode_rejects_truncated_header() {
        let encoded = encode_block_header(&sample_header());
        assert!(decode_block_header(&encoded[..79]).is_err());
    }
}
