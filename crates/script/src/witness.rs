//! Shape heuristics for witness stack items.

use secp256k1::{ecdsa, schnorr, PublicKey};
use serde::Serialize;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WitnessItemKind {
    Empty,
    PublicKey,
    Signature,
    Script,
}

const SIGHASH_TYPES: [u8; 6] = [0x01, 0x02, 0x03, 0x81, 0x82, 0x83];

/// Guesses what a witness item holds. Anything that is neither a valid curve point nor a
/// well-formed signature is reported as a script.
pub fn classify_witness_item(item: &[u8]) -> WitnessItemKind {
    if item.is_empty() {
        return WitnessItemKind::Empty;
    }
    if is_public_key(item) {
        return WitnessItemKind::PublicKey;
    }
    if is_ecdsa_signature(item) || is_schnorr_signature(item) {
        return WitnessItemKind::Signature;
    }
    WitnessItemKind::Script
}

fn is_public_key(item: &[u8]) -> bool {
    let shaped = match item.len() {
        33 => item[0] == 0x02 || item[0] == 0x03,
        65 => item[0] == 0x04,
        _ => false,
    };
    shaped && PublicKey::from_slice(item).is_ok()
}

// DER signature followed by the sighash byte.
fn is_ecdsa_signature(item: &[u8]) -> bool {
    if item.len() < 9 || item.len() > 73 || item[0] != 0x30 {
        return false;
    }
    let Some((sighash, der)) = item.split_last() else {
        return false;
    };
    SIGHASH_TYPES.contains(sighash) && ecdsa::Signature::from_der(der).is_ok()
}

fn is_schnorr_signature(item: &[u8]) -> bool {
    match item.len() {
        64 => schnorr::Signature::from_slice(item).is_ok(),
        65 => SIGHASH_TYPES.contains(&item[64]) && schnorr::Signature::from_slice(&item[..64]).is_ok(),
        _ => false,
    }
}
