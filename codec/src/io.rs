//! Byte-level reader/writer helpers shared by the codecs.

use crate::error::CodecError;

/// Sequential reader over an input buffer.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Error unless every input byte has been consumed.
    pub fn finish(self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < len {
            return Err(CodecError::UnexpectedEnd {
                needed: len - self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_u128(&mut self) -> Result<u128, CodecError> {
        Ok(u128::from_le_bytes(self.read_array()?))
    }

    /// Read a compact varint count.
    pub fn read_varint(&mut self) -> Result<u64, CodecError> {
        match self.read_u8()? {
            0xFF => Ok(self.read_u64()?),
            0xFE => Ok(self.read_u32()? as u64),
            0xFD => Ok(self.read_u16()? as u64),
            n => Ok(n as u64),
        }
    }

    /// Read a varint-prefixed byte vector.
    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_varint()? as usize;
        Ok(self.read_bytes(len)?.to_vec())
    }
}

/// Appends encoded fields to an output buffer.
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u128(&mut self, v: u128) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a compact varint count.
    pub fn write_varint(&mut self, v: u64) {
        if v < 0xFD {
            self.write_u8(v as u8);
        } else if v <= u16::MAX as u64 {
            self.write_u8(0xFD);
            self.write_u16(v as u16);
        } else if v <= u32::MAX as u64 {
            self.write_u8(0xFE);
            self.write_u32(v as u32);
        } else {
            self.write_u8(0xFF);
            self.write_u64(v);
        }
    }

    /// Write a varint-prefixed byte vector.
    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as u64);
        self.write_bytes(bytes);
    }
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_boundary_widths() {
        let cases: &[(u64, usize)] = &[
            (0, 1),
            (0xFC, 1),
            (0xFD, 3),
            (u16::MAX as u64, 3),
            (u16::MAX as u64 + 1, 5),
            (u32::MAX as u64, 5),
            (u32::MAX as u64 + 1, 9),
        ];
        for &(value, width) in cases {
            let mut writer = ByteWriter::new();
            writer.write_varint(value);
            let bytes = writer.into_bytes();
            assert_eq!(bytes.len(), width, "varint width for {value}");

            let mut reader = ByteReader::new(&bytes);
            assert_eq!(reader.read_varint().unwrap(), value);
            reader.finish().unwrap();
        }
    }

    #[test]
    fn reader_rejects_short_input() {
        let mut reader = ByteReader::new(&[1, 2, 3]);
        let err = reader.read_u32().unwrap_err();
        assert_eq!(err, CodecError::UnexpectedEnd { needed: 1 });
    }

    #[test]
    fn finish_rejects_trailing_bytes() {
        let mut reader = ByteReader::new(&[1, 2, 3]);
        reader.read_u8().unwrap();
        assert_eq!(reader.finish().unwrap_err(), CodecError::TrailingBytes(2));
    }
}
