//! Standard script classification and construction.

use std::fmt;

use satsigner_consensus::constants::MAX_PUBKEYS_PER_MULTISIG;
use satsigner_primitives::address::{is_p2pkh, is_p2sh, p2sh_script, p2wsh_script, witness_program};
use satsigner_primitives::{hash160, sha256};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ScriptType {
    P2Pk,
    P2Pkh,
    P2Sh,
    P2Wpkh,
    P2Wsh,
    P2Tr,
    Multisig,
    NullData,
    Unknown,
}

impl ScriptType {
    pub fn as_str(self) -> &'static str {
        match self {
            ScriptType::P2Pk => "p2pk",
            ScriptType::P2Pkh => "p2pkh",
            ScriptType::P2Sh => "p2sh",
            ScriptType::P2Wpkh => "p2wpkh",
            ScriptType::P2Wsh => "p2wsh",
            ScriptType::P2Tr => "p2tr",
            ScriptType::Multisig => "multisig",
            ScriptType::NullData => "nulldata",
            ScriptType::Unknown => "nonstandard",
        }
    }

    pub fn is_standard(self) -> bool {
        !matches!(self, ScriptType::Unknown)
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const OP_0: u8 = 0x00;
const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;
const OP_1: u8 = 0x51;
const OP_16: u8 = 0x60;
const OP_RETURN: u8 = 0x6a;
const OP_CHECKSIG: u8 = 0xac;
const OP_CHECKMULTISIG: u8 = 0xae;

pub fn classify_script_pubkey(script: &[u8]) -> ScriptType {
    if is_p2pkh(script) {
        return ScriptType::P2Pkh;
    }
    if is_p2sh(script) {
        return ScriptType::P2Sh;
    }
    if let Some((version, program)) = witness_program(script) {
        return match (version, program.len()) {
            (0, 20) => ScriptType::P2Wpkh,
            (0, 32) => ScriptType::P2Wsh,
            (1, 32) => ScriptType::P2Tr,
            _ => ScriptType::Unknown,
        };
    }
    if is_p2pk(script) {
        return ScriptType::P2Pk;
    }
    if script.first() == Some(&OP_RETURN) {
        return ScriptType::NullData;
    }
    if parse_multisig(script).is_some() {
        return ScriptType::Multisig;
    }
    ScriptType::Unknown
}

fn is_p2pk(script: &[u8]) -> bool {
    let key_len = match script.first().copied() {
        Some(len @ 33) | Some(len @ 65) => len as usize,
        _ => return false,
    };
    script.len() == key_len + 2 && script[script.len() - 1] == OP_CHECKSIG
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    InvalidThreshold { threshold: usize, keys: usize },
    TooManyKeys(usize),
    InvalidPublicKeyLength(usize),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::InvalidThreshold { threshold, keys } => {
                write!(f, "threshold {threshold} out of range for {keys} keys")
            }
            ScriptError::TooManyKeys(count) => {
                write!(f, "{count} keys exceeds the multisig limit of {MAX_PUBKEYS_PER_MULTISIG}")
            }
            ScriptError::InvalidPublicKeyLength(len) => {
                write!(f, "public key of {len} bytes")
            }
        }
    }
}

impl std::error::Error for ScriptError {}

/// `OP_k <key_1> .. <key_n> OP_n OP_CHECKMULTISIG`, keys in the order given.
pub fn multisig_script<K: AsRef<[u8]>>(threshold: usize, keys: &[K]) -> Result<Vec<u8>, ScriptError> {
    if keys.len() > MAX_PUBKEYS_PER_MULTISIG {
        return Err(ScriptError::TooManyKeys(keys.len()));
    }
    if threshold == 0 || threshold > keys.len() {
        return Err(ScriptError::InvalidThreshold {
            threshold,
            keys: keys.len(),
        });
    }
    let mut script = Vec::with_capacity(3 + keys.len() * 34);
    push_small_int(&mut script, threshold);
    for key in keys {
        let key = key.as_ref();
        if key.len() != 33 && key.len() != 65 {
            return Err(ScriptError::InvalidPublicKeyLength(key.len()));
        }
        push_data(&mut script, key);
    }
    push_small_int(&mut script, keys.len());
    script.push(OP_CHECKMULTISIG);
    Ok(script)
}

/// Splits a bare multisig script into its threshold and public keys.
pub fn parse_multisig(script: &[u8]) -> Option<(usize, Vec<&[u8]>)> {
    let (&last, body) = script.split_last()?;
    if last != OP_CHECKMULTISIG {
        return None;
    }
    let (threshold, mut rest) = read_small_int(body)?;
    let mut keys = Vec::new();
    loop {
        match rest.first().copied() {
            Some(len @ 33) | Some(len @ 65) if rest.len() > len as usize => {
                let len = len as usize;
                keys.push(&rest[1..=len]);
                rest = &rest[len + 1..];
            }
            _ => break,
        }
    }
    let (count, rest) = read_small_int(rest)?;
    if !rest.is_empty() || count != keys.len() || threshold == 0 || threshold > count {
        return None;
    }
    Some((threshold, keys))
}

pub fn p2wsh_script_for(witness_script: &[u8]) -> Vec<u8> {
    p2wsh_script(&sha256(witness_script))
}

pub fn p2sh_script_for(redeem_script: &[u8]) -> Vec<u8> {
    p2sh_script(&hash160(redeem_script))
}

pub fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len < OP_PUSHDATA1 as usize {
        script.push(len as u8);
    } else if len <= 0xff {
        script.push(OP_PUSHDATA1);
        script.push(len as u8);
    } else if len <= 0xffff {
        script.push(OP_PUSHDATA2);
        script.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        script.push(OP_PUSHDATA4);
        script.extend_from_slice(&(len as u32).to_le_bytes());
    }
    script.extend_from_slice(data);
}

fn push_small_int(script: &mut Vec<u8>, value: usize) {
    match value {
        0 => script.push(OP_0),
        1..=16 => script.push(OP_1 + (value as u8) - 1),
        _ => push_data(script, &[value as u8]),
    }
}

fn read_small_int(script: &[u8]) -> Option<(usize, &[u8])> {
    match script.first().copied()? {
        op @ OP_1..=OP_16 => Some(((op - OP_1 + 1) as usize, &script[1..])),
        0x01 if script.len() >= 2 && script[1] > 16 => Some((script[1] as usize, &script[2..])),
        _ => None,
    }
}
