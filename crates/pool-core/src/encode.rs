//! Consensus serialization primitives.
//!
//! CompactSize integers and a bounds-checked reader for decoding raw
//! transactions out of a block template.

use thiserror::Error;

/// Errors while reading consensus-encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ended before the structure was complete.
    #[error("unexpected end of data at offset {offset} (needed {needed} more bytes)")]
    UnexpectedEnd { offset: usize, needed: usize },
    /// A CompactSize used a longer form than necessary.
    #[error("non-canonical compact size at offset {0}")]
    NonCanonicalVarint(usize),
    /// Bytes were left over after the structure ended.
    #[error("{0} trailing bytes after transaction")]
    TrailingBytes(usize),
    /// Segwit flag byte was not 0x01.
    #[error("unsupported segwit flag 0x{0:02x}")]
    UnsupportedSegwitFlag(u8),
    /// Segwit marker present but the transaction carries no witness data.
    #[error("segwit marker present but all witnesses are empty")]
    EmptyWitness,
}

/// Encode a variable-length integer (Bitcoin CompactSize).
pub fn encode_varint(value: u64, output: &mut Vec<u8>) {
    if value < 0xfd {
        output.push(value as u8);
    } else if value <= 0xffff {
        output.push(0xfd);
        output.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        output.push(0xfe);
        output.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        output.push(0xff);
        output.extend_from_slice(&value.to_le_bytes());
    }
}

/// Append a CompactSize length prefix followed by the bytes themselves.
pub fn encode_bytes(bytes: &[u8], output: &mut Vec<u8>) {
    encode_varint(bytes.len() as u64, output);
    output.extend_from_slice(bytes);
}

/// Cursor over a byte slice that never reads out of bounds.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn peek_u8(&self) -> Result<u8, DecodeError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEnd { offset: self.pos, needed: 1 })
    }

    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::UnexpectedEnd {
                offset: self.pos,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a CompactSize, rejecting non-minimal encodings.
    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let start = self.pos;
        let (value, min) = match self.read_u8()? {
            0xfd => (u16::from_le_bytes(self.read_array()?) as u64, 0xfd),
            0xfe => (u32::from_le_bytes(self.read_array()?) as u64, 0x1_0000),
            0xff => (self.read_u64_le()?, 0x1_0000_0000),
            small => return Ok(small as u64),
        };
        if value < min {
            return Err(DecodeError::NonCanonicalVarint(start));
        }
        Ok(value)
    }

    /// Read a CompactSize-prefixed byte string.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_varint()?;
        // A length larger than what is left can never be satisfied.
        if len > self.remaining() as u64 {
            return Err(DecodeError::UnexpectedEnd {
                offset: self.pos,
                needed: (len - self.remaining() as u64) as usize,
            });
        }
        Ok(self.read_slice(len as usize)?.to_vec())
    }
}
