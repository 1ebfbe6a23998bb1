//! Script versions, keychains and account policies.

use std::fmt;
use std::str::FromStr;

use satsigner_consensus::Network;
use serde::{Deserialize, Serialize};

/// Single-key output type an account derives addresses for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ScriptVersion {
    #[serde(rename = "P2PKH")]
    P2pkh,
    #[serde(rename = "P2SH-P2WPKH")]
    P2shP2wpkh,
    #[serde(rename = "P2WPKH")]
    P2wpkh,
    #[serde(rename = "P2TR")]
    P2tr,
}

impl ScriptVersion {
    pub const ALL: [ScriptVersion; 4] = [
        ScriptVersion::P2pkh,
        ScriptVersion::P2shP2wpkh,
        ScriptVersion::P2wpkh,
        ScriptVersion::P2tr,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScriptVersion::P2pkh => "P2PKH",
            ScriptVersion::P2shP2wpkh => "P2SH-P2WPKH",
            ScriptVersion::P2wpkh => "P2WPKH",
            ScriptVersion::P2tr => "P2TR",
        }
    }

    /// BIP-44/49/84/86 purpose level.
    pub fn purpose(self) -> u32 {
        match self {
            ScriptVersion::P2pkh => 44,
            ScriptVersion::P2shP2wpkh => 49,
            ScriptVersion::P2wpkh => 84,
            ScriptVersion::P2tr => 86,
        }
    }

    /// Address prefixes a well-formed address of this version starts with.
    pub fn address_prefixes(self, network: Network) -> &'static [&'static str] {
        match (self, network) {
            (ScriptVersion::P2pkh, Network::Bitcoin) => &["1"],
            (ScriptVersion::P2pkh, _) => &["m", "n"],
            (ScriptVersion::P2shP2wpkh, Network::Bitcoin) => &["3"],
            (ScriptVersion::P2shP2wpkh, _) => &["2"],
            (ScriptVersion::P2wpkh, Network::Bitcoin) => &["bc1q"],
            (ScriptVersion::P2wpkh, Network::Regtest) => &["bcrt1q"],
            (ScriptVersion::P2wpkh, _) => &["tb1q"],
            (ScriptVersion::P2tr, Network::Bitcoin) => &["bc1p"],
            (ScriptVersion::P2tr, Network::Regtest) => &["bcrt1p"],
            (ScriptVersion::P2tr, _) => &["tb1p"],
        }
    }
}

impl fmt::Display for ScriptVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseScriptVersionError(pub String);

impl fmt::Display for ParseScriptVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown script version '{}'", self.0)
    }
}

impl std::error::Error for ParseScriptVersionError {}

impl FromStr for ScriptVersion {
    type Err = ParseScriptVersionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().replace('_', "-").as_str() {
            "P2PKH" | "BIP44" => Ok(ScriptVersion::P2pkh),
            "P2SH-P2WPKH" | "BIP49" => Ok(ScriptVersion::P2shP2wpkh),
            "P2WPKH" | "BIP84" => Ok(ScriptVersion::P2wpkh),
            "P2TR" | "BIP86" => Ok(ScriptVersion::P2tr),
            _ => Err(ParseScriptVersionError(raw.to_string())),
        }
    }
}

/// Receive (external) or change (internal) branch of an account.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keychain {
    #[default]
    External,
    Internal,
}

impl Keychain {
    /// Change index used in the fourth path level.
    pub fn index(self) -> u32 {
        match self {
            Keychain::External => 0,
            Keychain::Internal => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keychain::External => "external",
            Keychain::Internal => "internal",
        }
    }
}

impl fmt::Display for Keychain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
