//! Per-network address and key encoding parameters.

use std::fmt;
use std::str::FromStr;

use crate::Hash256;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Network {
    Bitcoin,
    Testnet,
    Signet,
    Regtest,
}

impl Network {
    pub const ALL: [Network; 4] = [
        Network::Bitcoin,
        Network::Testnet,
        Network::Signet,
        Network::Regtest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Bitcoin => "bitcoin",
            Network::Testnet => "testnet",
            Network::Signet => "signet",
            Network::Regtest => "regtest",
        }
    }

    /// Whether this network uses the mainnet encodings (`xpub`, `1...`, `bc1...`).
    pub fn is_mainnet(self) -> bool {
        matches!(self, Network::Bitcoin)
    }

    pub fn params(self) -> &'static ChainParams {
        chain_params(self)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseNetworkError(pub String);

impl fmt::Display for ParseNetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown network '{}'", self.0)
    }
}

impl std::error::Error for ParseNetworkError {}

impl FromStr for Network {
    type Err = ParseNetworkError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bitcoin" | "mainnet" | "main" => Ok(Network::Bitcoin),
            "testnet" | "test" => Ok(Network::Testnet),
            "signet" => Ok(Network::Signet),
            "regtest" => Ok(Network::Regtest),
            _ => Err(ParseNetworkError(raw.to_string())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChainParams {
    pub network: Network,
    pub pubkey_address_prefix: u8,
    pub script_address_prefix: u8,
    pub secret_key_prefix: u8,
    pub bech32_hrp: &'static str,
    /// BIP-44 coin type used in the second path level.
    pub coin_type: u32,
}

static BITCOIN_PARAMS: ChainParams = ChainParams {
    network: Network::Bitcoin,
    pubkey_address_prefix: 0x00,
    script_address_prefix: 0x05,
    secret_key_prefix: 0x80,
    bech32_hrp: "bc",
    coin_type: 0,
};

static TESTNET_PARAMS: ChainParams = ChainParams {
    network: Network::Testnet,
    pubkey_address_prefix: 0x6f,
    script_address_prefix: 0xc4,
    secret_key_prefix: 0xef,
    bech32_hrp: "tb",
    coin_type: 1,
};

static SIGNET_PARAMS: ChainParams = ChainParams {
    network: Network::Signet,
    pubkey_address_prefix: 0x6f,
    script_address_prefix: 0xc4,
    secret_key_prefix: 0xef,
    bech32_hrp: "tb",
    coin_type: 1,
};

static REGTEST_PARAMS: ChainParams = ChainParams {
    network: Network::Regtest,
    pubkey_address_prefix: 0x6f,
    script_address_prefix: 0xc4,
    secret_key_prefix: 0xef,
    bech32_hrp: "bcrt",
    coin_type: 1,
};

pub fn chain_params(network: Network) -> &'static ChainParams {
    match network {
        Network::Bitcoin => &BITCOIN_PARAMS,
        Network::Testnet => &TESTNET_PARAMS,
        Network::Signet => &SIGNET_PARAMS,
        Network::Regtest => &REGTEST_PARAMS,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HexError {
    InvalidLength,
    InvalidHex,
}

impl fmt::Display for HexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HexError::InvalidLength => write!(f, "hash hex must be 64 characters"),
            HexError::InvalidHex => write!(f, "invalid hex digit"),
        }
    }
}

impl std::error::Error for HexError {}

/// Parses a display-order (byte-reversed) hash such as a txid.
pub fn hash256_from_hex(input: &str) -> Result<Hash256, HexError> {
    let mut hex = input.trim();
    if let Some(stripped) = hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X")) {
        hex = stripped;
    }
    if hex.len() != 64 {
        return Err(HexError::InvalidLength);
    }

    let mut bytes = [0u8; 32];
    for (i, byte_out) in bytes.iter_mut().enumerate() {
        let start = i * 2;
        let digits = hex.get(start..start + 2).ok_or(HexError::InvalidHex)?;
        *byte_out = u8::from_str_radix(digits, 16).map_err(|_| HexError::InvalidHex)?;
    }
    bytes.reverse();
    Ok(bytes)
}

/// Formats an internal-order hash in display order.
pub fn hash256_to_hex(hash: &Hash256) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(64);
    for byte in hash.iter().rev() {
        out.push(DIGITS[(byte >> 4) as usize] as char);
        out.push(DIGITS[(byte & 0x0f) as usize] as char);
    }
    out
}
