//! Digests used for txids, address payloads and Electrum scripthashes.

use ripemd::{Digest, Ripemd160};
use satsigner_consensus::Hash256;
use sha2::Sha256;

pub fn sha256(data: &[u8]) -> Hash256 {
    Sha256::digest(data).into()
}

/// SHA256 applied twice; txids and base58check checksums.
pub fn sha256d(data: &[u8]) -> Hash256 {
    Sha256::digest(Sha256::digest(data)).into()
}

/// RIPEMD160(SHA256(data)), the hash committed to by P2PKH, P2SH and P2WPKH.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}
