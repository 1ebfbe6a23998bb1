//! Reference to a previous transaction output.

use satsigner_consensus::{hash256_to_hex, Hash256};

use crate::encoding::{Decodable, DecodeError, Decoder, Encodable, Encoder};

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct OutPoint {
    pub hash: Hash256,
    pub index: u32,
}

impl OutPoint {
    /// The prevout carried by a coinbase input.
    pub const COINBASE: OutPoint = OutPoint {
        hash: [0u8; 32],
        index: u32::MAX,
    };

    pub fn null() -> Self {
        Self::COINBASE
    }

    pub fn is_null(&self) -> bool {
        *self == Self::COINBASE
    }

    /// Previous txid in display (byte-reversed) order.
    pub fn txid_hex(&self) -> String {
        hash256_to_hex(&self.hash)
    }
}

impl std::fmt::Display for OutPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.txid_hex(), self.index)
    }
}

impl Encodable for OutPoint {
    fn consensus_encode(&self, encoder: &mut Encoder) {
        encoder.write_hash_le(&self.hash);
        encoder.write_u32_le(self.index);
    }
}

impl Decodable for OutPoint {
    fn consensus_decode(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        Ok(Self {
            hash: decoder.read_hash_le()?,
            index: decoder.read_u32_le()?,
        })
    }
}
