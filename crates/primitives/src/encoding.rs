//! Little-endian wire cursor shared by the transaction codec and the field inspector.

use std::fmt;

use satsigner_consensus::Hash256;

/// Largest CompactSize accepted for a length prefix (Bitcoin Core's `MAX_SIZE`).
pub const MAX_COMPACT_SIZE: u64 = 0x0200_0000;

/// Smallest value that needs each CompactSize prefix; anything lower is non-canonical.
const COMPACT_U16_MIN: u64 = 0xfd;
const COMPACT_U32_MIN: u64 = 0x1_0000;
const COMPACT_U64_MIN: u64 = 0x1_0000_0000;

/// Number of bytes `write_varint` emits for `value`.
pub fn varint_len(value: u64) -> usize {
    match value {
        v if v < COMPACT_U16_MIN => 1,
        v if v < COMPACT_U32_MIN => 3,
        v if v < COMPACT_U64_MIN => 5,
        _ => 9,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    UnexpectedEof,
    NonCanonicalVarInt,
    SizeTooLarge,
    InvalidData(&'static str),
    TrailingBytes,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnexpectedEof => f.write_str("ran out of bytes"),
            DecodeError::NonCanonicalVarInt => f.write_str("varint is not minimally encoded"),
            DecodeError::SizeTooLarge => write!(f, "length prefix above {MAX_COMPACT_SIZE}"),
            DecodeError::InvalidData(message) => f.write_str(message),
            DecodeError::TrailingBytes => f.write_str("bytes left over after the transaction"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Growable output buffer for wire serialization.
#[derive(Default)]
pub struct Encoder {
    out: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.out
    }

    pub fn write_u8(&mut self, value: u8) {
        self.out.push(value);
    }

    pub fn write_u32_le(&mut self, value: u32) {
        self.out.extend(value.to_le_bytes());
    }

    pub fn write_i32_le(&mut self, value: i32) {
        self.out.extend(value.to_le_bytes());
    }

    pub fn write_u64_le(&mut self, value: u64) {
        self.out.extend(value.to_le_bytes());
    }

    pub fn write_varint(&mut self, value: u64) {
        let bytes = value.to_le_bytes();
        match varint_len(value) {
            1 => self.out.push(bytes[0]),
            3 => {
                self.out.push(0xfd);
                self.out.extend_from_slice(&bytes[..2]);
            }
            5 => {
                self.out.push(0xfe);
                self.out.extend_from_slice(&bytes[..4]);
            }
            _ => {
                self.out.push(0xff);
                self.out.extend_from_slice(&bytes);
            }
        }
    }

    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as u64);
        self.out.extend_from_slice(bytes);
    }

    /// Hashes are stored in internal byte order on the wire.
    pub fn write_hash_le(&mut self, hash: &Hash256) {
        self.out.extend_from_slice(hash);
    }
}

/// Read cursor over a borrowed byte string. A failed read leaves the
/// position unchanged so errors can report where decoding stopped.
pub struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn peek_u8(&self) -> Result<u8, DecodeError> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEof)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.input.len())
            .ok_or(DecodeError::UnexpectedEof)?;
        let bytes = &self.input[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let [byte] = self.read_fixed::<1>()?;
        Ok(byte)
    }

    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        self.read_fixed().map(u32::from_le_bytes)
    }

    pub fn read_i32_le(&mut self) -> Result<i32, DecodeError> {
        self.read_fixed().map(i32::from_le_bytes)
    }

    pub fn read_u64_le(&mut self) -> Result<u64, DecodeError> {
        self.read_fixed().map(u64::from_le_bytes)
    }

    /// Reads a CompactSize, rejecting non-minimal encodings and values above
    /// [`MAX_COMPACT_SIZE`].
    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let start = self.pos;
        let result = self.read_compact_size();
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    fn read_compact_size(&mut self) -> Result<u64, DecodeError> {
        let (value, minimum) = match self.read_u8()? {
            0xfd => (u64::from(u16::from_le_bytes(self.read_fixed()?)), COMPACT_U16_MIN),
            0xfe => (u64::from(self.read_u32_le()?), COMPACT_U32_MIN),
            0xff => (self.read_u64_le()?, COMPACT_U64_MIN),
            small => return Ok(u64::from(small)),
        };
        if value < minimum {
            return Err(DecodeError::NonCanonicalVarInt);
        }
        if value > MAX_COMPACT_SIZE {
            return Err(DecodeError::SizeTooLarge);
        }
        Ok(value)
    }

    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_varint()?;
        let len = usize::try_from(len).map_err(|_| DecodeError::SizeTooLarge)?;
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_hash_le(&mut self) -> Result<Hash256, DecodeError> {
        self.read_fixed()
    }
}

pub trait Encodable {
    fn consensus_encode(&self, encoder: &mut Encoder);
}

pub trait Decodable: Sized {
    fn consensus_decode(decoder: &mut Decoder) -> Result<Self, DecodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_boundaries() {
        for (value, len) in [
            (0u64, 1usize),
            (0xfc, 1),
            (0xfd, 3),
            (0xffff, 3),
            (0x1_0000, 5),
            (MAX_COMPACT_SIZE, 5),
        ] {
            let mut encoder = Encoder::new();
            encoder.write_varint(value);
            let bytes = encoder.into_inner();
            assert_eq!(bytes.len(), len, "value {value:#x}");
            assert_eq!(varint_len(value), len);
            let mut decoder = Decoder::new(&bytes);
            assert_eq!(decoder.read_varint().expect("varint"), value);
            assert!(decoder.is_empty());
        }
    }

    #[test]
    fn rejects_non_canonical_varint() {
        let mut decoder = Decoder::new(&[0xfd, 0x10, 0x00]);
        assert_eq!(decoder.read_varint(), Err(DecodeError::NonCanonicalVarInt));
        let mut decoder = Decoder::new(&[0xfe, 0xff, 0x00, 0x00, 0x00]);
        assert_eq!(decoder.read_varint(), Err(DecodeError::NonCanonicalVarInt));
    }

    #[test]
    fn rejects_oversized_varint() {
        let mut decoder = Decoder::new(&[0xfe, 0x01, 0x00, 0x00, 0x02]);
        assert_eq!(decoder.read_varint(), Err(DecodeError::SizeTooLarge));
    }

    #[test]
    fn position_tracks_reads() {
        let bytes = [1u8, 2, 3, 4, 5, 6];
        let mut decoder = Decoder::new(&bytes);
        assert_eq!(decoder.peek_u8(), Ok(1));
        assert_eq!(decoder.read_u32_le(), Ok(0x0403_0201));
        assert_eq!(decoder.position(), 4);
        assert_eq!(decoder.read_u32_le(), Err(DecodeError::UnexpectedEof));
        assert_eq!(decoder.position(), 4);
        assert_eq!(decoder.remaining(), 2);
    }
}
