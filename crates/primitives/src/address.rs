//! Address <-> output script conversion, Electrum scripthashes and WIF.

use std::fmt;

use bech32::{segwit, Fe32, Hrp};
use satsigner_consensus::{chain_params, Network};

use crate::base58::{self, Base58Error};
use crate::hash::sha256;

const OP_0: u8 = 0x00;
const OP_1: u8 = 0x51;
const OP_16: u8 = 0x60;
const OP_DUP: u8 = 0x76;
const OP_EQUAL: u8 = 0x87;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_HASH160: u8 = 0xa9;
const OP_CHECKSIG: u8 = 0xac;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    Base58(Base58Error),
    Segwit(String),
    InvalidLength,
    UnknownPrefix,
    WrongNetwork { expected: Network },
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::Base58(err) => write!(f, "{err}"),
            AddressError::Segwit(message) => write!(f, "invalid segwit address: {message}"),
            AddressError::InvalidLength => write!(f, "invalid address payload length"),
            AddressError::UnknownPrefix => write!(f, "unknown address prefix"),
            AddressError::WrongNetwork { expected } => {
                write!(f, "address does not belong to {expected}")
            }
        }
    }
}

impl std::error::Error for AddressError {}

impl From<Base58Error> for AddressError {
    fn from(err: Base58Error) -> Self {
        AddressError::Base58(err)
    }
}

/// Output type an address or script pays to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum AddressKind {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    P2tr,
    /// Witness program of a version or length not assigned yet.
    WitnessUnknown,
}

impl AddressKind {
    pub fn from_script(script: &[u8]) -> Option<Self> {
        if is_p2pkh(script) {
            return Some(AddressKind::P2pkh);
        }
        if is_p2sh(script) {
            return Some(AddressKind::P2sh);
        }
        let (version, program) = witness_program(script)?;
        Some(match (version, program.len()) {
            (0, 20) => AddressKind::P2wpkh,
            (0, 32) => AddressKind::P2wsh,
            (1, 32) => AddressKind::P2tr,
            _ => AddressKind::WitnessUnknown,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AddressKind::P2pkh => "p2pkh",
            AddressKind::P2sh => "p2sh",
            AddressKind::P2wpkh => "p2wpkh",
            AddressKind::P2wsh => "p2wsh",
            AddressKind::P2tr => "p2tr",
            AddressKind::WitnessUnknown => "witness_unknown",
        }
    }
}

pub fn address_to_script_pubkey(address: &str, network: Network) -> Result<Vec<u8>, AddressError> {
    let params = chain_params(network);
    if looks_like_segwit(address) {
        let (hrp, version, program) =
            segwit::decode(address).map_err(|err| AddressError::Segwit(err.to_string()))?;
        if hrp.to_lowercase() != params.bech32_hrp {
            return Err(AddressError::WrongNetwork { expected: network });
        }
        return Ok(witness_program_script(version.to_u8(), &program));
    }

    let payload = base58::check_decode(address)?;
    if payload.len() != 21 {
        return Err(AddressError::InvalidLength);
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload[1..]);
    if payload[0] == params.pubkey_address_prefix {
        return Ok(p2pkh_script(&hash));
    }
    if payload[0] == params.script_address_prefix {
        return Ok(p2sh_script(&hash));
    }
    let known = Network::ALL.iter().any(|other| {
        let other = chain_params(*other);
        payload[0] == other.pubkey_address_prefix || payload[0] == other.script_address_prefix
    });
    if known {
        Err(AddressError::WrongNetwork { expected: network })
    } else {
        Err(AddressError::UnknownPrefix)
    }
}

pub fn script_pubkey_to_address(script: &[u8], network: Network) -> Option<String> {
    let params = chain_params(network);
    if is_p2pkh(script) {
        let mut payload = Vec::with_capacity(21);
        payload.push(params.pubkey_address_prefix);
        payload.extend_from_slice(&script[3..23]);
        return Some(base58::check_encode(&payload));
    }
    if is_p2sh(script) {
        let mut payload = Vec::with_capacity(21);
        payload.push(params.script_address_prefix);
        payload.extend_from_slice(&script[2..22]);
        return Some(base58::check_encode(&payload));
    }
    let (version, program) = witness_program(script)?;
    let hrp = Hrp::parse(params.bech32_hrp).ok()?;
    let version = Fe32::try_from(version).ok()?;
    segwit::encode(hrp, version, program).ok()
}

/// Electrum scripthash of an address: SHA256 of its output script, byte-reversed hex.
pub fn address_to_script_hash(address: &str, network: Network) -> Result<String, AddressError> {
    let script = address_to_script_pubkey(address, network)?;
    Ok(electrum_script_hash(&script))
}

pub fn electrum_script_hash(script: &[u8]) -> String {
    let mut digest = sha256(script);
    digest.reverse();
    hex::encode(digest)
}

/// Networks whose encoding accepts `address`. Testnet and signet share encodings.
pub fn address_network(address: &str) -> Vec<Network> {
    Network::ALL
        .iter()
        .copied()
        .filter(|network| address_to_script_pubkey(address, *network).is_ok())
        .collect()
}

pub fn address_kind(address: &str, network: Network) -> Result<AddressKind, AddressError> {
    let script = address_to_script_pubkey(address, network)?;
    AddressKind::from_script(&script).ok_or(AddressError::UnknownPrefix)
}

pub fn p2pkh_script(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    script.push(0x14);
    script.extend_from_slice(hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

pub fn p2sh_script(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(23);
    script.push(OP_HASH160);
    script.push(0x14);
    script.extend_from_slice(hash);
    script.push(OP_EQUAL);
    script
}

pub fn p2wpkh_script(hash: &[u8; 20]) -> Vec<u8> {
    witness_program_script(0, hash)
}

pub fn p2wsh_script(hash: &[u8; 32]) -> Vec<u8> {
    witness_program_script(0, hash)
}

pub fn p2tr_script(output_key: &[u8; 32]) -> Vec<u8> {
    witness_program_script(1, output_key)
}

/// `<version opcode> <push program>`.
pub fn witness_program_script(version: u8, program: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(2 + program.len());
    script.push(if version == 0 { OP_0 } else { OP_1 + version - 1 });
    script.push(program.len() as u8);
    script.extend_from_slice(program);
    script
}

/// Splits a witness output script into version and program.
pub fn witness_program(script: &[u8]) -> Option<(u8, &[u8])> {
    if script.len() < 4 || script.len() > 42 {
        return None;
    }
    let version = match script[0] {
        OP_0 => 0,
        op @ OP_1..=OP_16 => op - OP_1 + 1,
        _ => return None,
    };
    if script[1] as usize != script.len() - 2 {
        return None;
    }
    Some((version, &script[2..]))
}

pub fn is_p2pkh(script: &[u8]) -> bool {
    script.len() == 25
        && script[0] == OP_DUP
        && script[1] == OP_HASH160
        && script[2] == 0x14
        && script[23] == OP_EQUALVERIFY
        && script[24] == OP_CHECKSIG
}

pub fn is_p2sh(script: &[u8]) -> bool {
    script.len() == 23 && script[0] == OP_HASH160 && script[1] == 0x14 && script[22] == OP_EQUAL
}

fn looks_like_segwit(address: &str) -> bool {
    let lower = address.to_ascii_lowercase();
    Network::ALL.iter().any(|network| {
        let hrp = chain_params(*network).bech32_hrp;
        lower.len() > hrp.len() && lower.starts_with(hrp) && lower.as_bytes()[hrp.len()] == b'1'
    })
}

pub fn secret_key_to_wif(secret: &[u8; 32], network: Network, compressed: bool) -> String {
    let mut payload = Vec::with_capacity(1 + secret.len() + usize::from(compressed));
    payload.push(chain_params(network).secret_key_prefix);
    payload.extend_from_slice(secret);
    if compressed {
        payload.push(0x01);
    }
    base58::check_encode(&payload)
}

/// Returns the secret key and whether it signals a compressed public key.
pub fn wif_to_secret_key(wif: &str, network: Network) -> Result<([u8; 32], bool), AddressError> {
    let payload = base58::check_decode(wif)?;
    if payload.is_empty() {
        return Err(AddressError::InvalidLength);
    }
    if payload[0] != chain_params(network).secret_key_prefix {
        return Err(AddressError::UnknownPrefix);
    }

    let compressed = match payload.len() {
        33 => false,
        34 if payload[33] == 0x01 => true,
        _ => return Err(AddressError::InvalidLength),
    };
    let mut secret = [0u8; 32];
    secret.copy_from_slice(&payload[1..33]);
    Ok((secret, compressed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn witness_program_bounds() {
        assert_eq!(witness_program(&[0x00, 0x02, 0xaa, 0xbb]), Some((0, &[0xaa, 0xbb][..])));
        assert_eq!(witness_program(&[0x51, 0x02, 0xaa, 0xbb]), Some((1, &[0xaa, 0xbb][..])));
        assert_eq!(witness_program(&[0x00, 0x03, 0xaa, 0xbb]), None);
        assert_eq!(witness_program(&[0x6a, 0x02, 0xaa, 0xbb]), None);
    }

    #[test]
    fn witness_version_opcodes() {
        assert_eq!(witness_program_script(0, &[1u8; 20])[0], 0x00);
        assert_eq!(witness_program_script(1, &[1u8; 32])[0], 0x51);
        assert_eq!(witness_program_script(16, &[1u8; 2])[0], 0x60);
    }

    #[test]
    fn segwit_prefix_detection() {
        assert!(looks_like_segwit("bc1qxyz"));
        assert!(looks_like_segwit("BCRT1qxyz"));
        assert!(looks_like_segwit("tb1pxyz"));
        assert!(!looks_like_segwit("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2"));
        assert!(!looks_like_segwit("bc"));
    }
}
