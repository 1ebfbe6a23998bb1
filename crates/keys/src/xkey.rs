//! BIP-32 extended keys with SLIP-132 version prefixes.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use satsigner_consensus::Network;
use satsigner_primitives::base58::{self, Base58Error};
use secp256k1::{PublicKey, Scalar, SecretKey};
use sha2::Sha512;

use crate::fingerprint::Fingerprint;
use crate::path::{ChildNumber, DerivationPath};
use crate::policy::ScriptVersion;
use crate::secp::secp256k1;

type HmacSha512 = Hmac<Sha512>;

/// Serialized payload length before Base58Check.
pub const EXTENDED_KEY_LEN: usize = 78;
/// Base58Check length of every standard extended key.
pub const EXTENDED_KEY_STR_LEN: usize = 111;

const MASTER_SEED_KEY: &[u8] = b"Bitcoin seed";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ExtendedKeyKind {
    Xpub,
    Xprv,
    Ypub,
    Yprv,
    Zpub,
    Zprv,
    Tpub,
    Tprv,
    Upub,
    Uprv,
    Vpub,
    Vprv,
}

impl ExtendedKeyKind {
    pub const ALL: [ExtendedKeyKind; 12] = [
        ExtendedKeyKind::Xpub,
        ExtendedKeyKind::Xprv,
        ExtendedKeyKind::Ypub,
        ExtendedKeyKind::Yprv,
        ExtendedKeyKind::Zpub,
        ExtendedKeyKind::Zprv,
        ExtendedKeyKind::Tpub,
        ExtendedKeyKind::Tprv,
        ExtendedKeyKind::Upub,
        ExtendedKeyKind::Uprv,
        ExtendedKeyKind::Vpub,
        ExtendedKeyKind::Vprv,
    ];

    pub fn version(self) -> [u8; 4] {
        let raw: u32 = match self {
            ExtendedKeyKind::Xpub => 0x0488_b21e,
            ExtendedKeyKind::Xprv => 0x0488_ade4,
            ExtendedKeyKind::Ypub => 0x049d_7cb2,
            ExtendedKeyKind::Yprv => 0x049d_7878,
            ExtendedKeyKind::Zpub => 0x04b2_4746,
            ExtendedKeyKind::Zprv => 0x04b2_430c,
            ExtendedKeyKind::Tpub => 0x0435_87cf,
            ExtendedKeyKind::Tprv => 0x0435_8394,
            ExtendedKeyKind::Upub => 0x044a_5262,
            ExtendedKeyKind::Uprv => 0x044a_4e28,
            ExtendedKeyKind::Vpub => 0x045f_1cf6,
            ExtendedKeyKind::Vprv => 0x045f_18bc,
        };
        raw.to_be_bytes()
    }

    pub fn from_version(version: [u8; 4]) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.version() == version)
    }

    /// Four-character string prefix of the Base58Check encoding.
    pub fn prefix(self) -> &'static str {
        match self {
            ExtendedKeyKind::Xpub => "xpub",
            ExtendedKeyKind::Xprv => "xprv",
            ExtendedKeyKind::Ypub => "ypub",
            ExtendedKeyKind::Yprv => "yprv",
            ExtendedKeyKind::Zpub => "zpub",
            ExtendedKeyKind::Zprv => "zprv",
            ExtendedKeyKind::Tpub => "tpub",
            ExtendedKeyKind::Tprv => "tprv",
            ExtendedKeyKind::Upub => "upub",
            ExtendedKeyKind::Uprv => "uprv",
            ExtendedKeyKind::Vpub => "vpub",
            ExtendedKeyKind::Vprv => "vprv",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
    }

    pub fn is_private(self) -> bool {
        self.prefix().ends_with("prv")
    }

    pub fn is_mainnet(self) -> bool {
        matches!(
            self,
            ExtendedKeyKind::Xpub
                | ExtendedKeyKind::Xprv
                | ExtendedKeyKind::Ypub
                | ExtendedKeyKind::Yprv
                | ExtendedKeyKind::Zpub
                | ExtendedKeyKind::Zprv
        )
    }

    /// Signet and regtest reuse the testnet versions.
    pub fn matches_network(self, network: Network) -> bool {
        self.is_mainnet() == network.is_mainnet()
    }

    pub fn script_version(self) -> ScriptVersion {
        match self {
            ExtendedKeyKind::Xpub
            | ExtendedKeyKind::Xprv
            | ExtendedKeyKind::Tpub
            | ExtendedKeyKind::Tprv => ScriptVersion::P2pkh,
            ExtendedKeyKind::Ypub
            | ExtendedKeyKind::Yprv
            | ExtendedKeyKind::Upub
            | ExtendedKeyKind::Uprv => ScriptVersion::P2shP2wpkh,
            ExtendedKeyKind::Zpub
            | ExtendedKeyKind::Zprv
            | ExtendedKeyKind::Vpub
            | ExtendedKeyKind::Vprv => ScriptVersion::P2wpkh,
        }
    }

    pub fn to_public(self) -> Self {
        match self {
            ExtendedKeyKind::Xprv => ExtendedKeyKind::Xpub,
            ExtendedKeyKind::Yprv => ExtendedKeyKind::Ypub,
            ExtendedKeyKind::Zprv => ExtendedKeyKind::Zpub,
            ExtendedKeyKind::Tprv => ExtendedKeyKind::Tpub,
            ExtendedKeyKind::Uprv => ExtendedKeyKind::Upub,
            ExtendedKeyKind::Vprv => ExtendedKeyKind::Vpub,
            public => public,
        }
    }

    /// Kind for a script version and network. Taproot has no SLIP-132
    /// version, so it maps to the plain `xpub`/`tpub` family.
    pub fn new(script_version: ScriptVersion, network: Network, private: bool) -> Self {
        let mainnet = network.is_mainnet();
        match (script_version, mainnet, private) {
            (ScriptVersion::P2pkh | ScriptVersion::P2tr, true, false) => ExtendedKeyKind::Xpub,
            (ScriptVersion::P2pkh | ScriptVersion::P2tr, true, true) => ExtendedKeyKind::Xprv,
            (ScriptVersion::P2pkh | ScriptVersion::P2tr, false, false) => ExtendedKeyKind::Tpub,
            (ScriptVersion::P2pkh | ScriptVersion::P2tr, false, true) => ExtendedKeyKind::Tprv,
            (ScriptVersion::P2shP2wpkh, true, false) => ExtendedKeyKind::Ypub,
            (ScriptVersion::P2shP2wpkh, true, true) => ExtendedKeyKind::Yprv,
            (ScriptVersion::P2shP2wpkh, false, false) => ExtendedKeyKind::Upub,
            (ScriptVersion::P2shP2wpkh, false, true) => ExtendedKeyKind::Uprv,
            (ScriptVersion::P2wpkh, true, false) => ExtendedKeyKind::Zpub,
            (ScriptVersion::P2wpkh, true, true) => ExtendedKeyKind::Zprv,
            (ScriptVersion::P2wpkh, false, false) => ExtendedKeyKind::Vpub,
            (ScriptVersion::P2wpkh, false, true) => ExtendedKeyKind::Vprv,
        }
    }

    /// The `xpub`/`xprv`/`tpub`/`tprv` kind with the same network and privacy.
    pub fn to_bip32(self) -> Self {
        let network = if self.is_mainnet() {
            Network::Bitcoin
        } else {
            Network::Testnet
        };
        Self::new(ScriptVersion::P2pkh, network, self.is_private())
    }
}

impl fmt::Display for ExtendedKeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

#[derive(Debug)]
pub enum ExtendedKeyError {
    Base58(Base58Error),
    InvalidLength(usize),
    UnknownVersion([u8; 4]),
    InvalidKey,
    InvalidMasterMetadata,
    HardenedFromPublic,
    KindMismatch {
        from: ExtendedKeyKind,
        to: ExtendedKeyKind,
    },
    Derivation,
}

impl fmt::Display for ExtendedKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtendedKeyError::Base58(err) => write!(f, "extended key encoding: {err}"),
            ExtendedKeyError::InvalidLength(len) => {
                write!(f, "extended key payload has {len} bytes, expected {EXTENDED_KEY_LEN}")
            }
            ExtendedKeyError::UnknownVersion(version) => {
                write!(f, "unknown extended key version {}", hex::encode(version))
            }
            ExtendedKeyError::InvalidKey => write!(f, "extended key holds an invalid key"),
            ExtendedKeyError::InvalidMasterMetadata => {
                write!(f, "depth zero key with non-zero parent fingerprint or child number")
            }
            ExtendedKeyError::HardenedFromPublic => {
                write!(f, "cannot derive a hardened child from a public key")
            }
            ExtendedKeyError::KindMismatch { from, to } => {
                write!(f, "cannot re-version {from} as {to}")
            }
            ExtendedKeyError::Derivation => write!(f, "child key derivation produced an invalid key"),
        }
    }
}

impl std::error::Error for ExtendedKeyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtendedKeyError::Base58(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Base58Error> for ExtendedKeyError {
    fn from(err: Base58Error) -> Self {
        ExtendedKeyError::Base58(err)
    }
}

impl From<secp256k1::Error> for ExtendedKeyError {
    fn from(_: secp256k1::Error) -> Self {
        ExtendedKeyError::InvalidKey
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyData {
    Private(SecretKey),
    Public(PublicKey),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExtendedKey {
    pub kind: ExtendedKeyKind,
    pub depth: u8,
    pub parent_fingerprint: Fingerprint,
    pub child_number: ChildNumber,
    pub chain_code: [u8; 32],
    pub key: KeyData,
}

impl ExtendedKey {
    /// Master private key from a BIP-32 seed.
    pub fn new_master(seed: &[u8], network: Network) -> Result<Self, ExtendedKeyError> {
        let (secret, chain_code) = hmac_split(MASTER_SEED_KEY, &[seed])?;
        let secret = SecretKey::from_slice(&secret)?;
        Ok(Self {
            kind: ExtendedKeyKind::new(ScriptVersion::P2pkh, network, true),
            depth: 0,
            parent_fingerprint: Fingerprint::default(),
            child_number: ChildNumber::Normal(0),
            chain_code,
            key: KeyData::Private(secret),
        })
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ExtendedKeyError> {
        if payload.len() != EXTENDED_KEY_LEN {
            return Err(ExtendedKeyError::InvalidLength(payload.len()));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&payload[0..4]);
        let kind =
            ExtendedKeyKind::from_version(version).ok_or(ExtendedKeyError::UnknownVersion(version))?;
        let depth = payload[4];
        let mut parent = [0u8; 4];
        parent.copy_from_slice(&payload[5..9]);
        let mut child = [0u8; 4];
        child.copy_from_slice(&payload[9..13]);
        let child_number = ChildNumber::from_index(u32::from_be_bytes(child));
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&payload[13..45]);
        let key_bytes = &payload[45..78];

        if depth == 0 && (parent != [0u8; 4] || child_number.to_u32() != 0) {
            return Err(ExtendedKeyError::InvalidMasterMetadata);
        }

        let key = if kind.is_private() {
            if key_bytes[0] != 0 {
                return Err(ExtendedKeyError::InvalidKey);
            }
            KeyData::Private(SecretKey::from_slice(&key_bytes[1..])?)
        } else {
            KeyData::Public(PublicKey::from_slice(key_bytes)?)
        };

        Ok(Self {
            kind,
            depth,
            parent_fingerprint: Fingerprint(parent),
            child_number,
            chain_code,
            key,
        })
    }

    pub fn encode(&self) -> [u8; EXTENDED_KEY_LEN] {
        let mut out = [0u8; EXTENDED_KEY_LEN];
        out[0..4].copy_from_slice(&self.kind.version());
        out[4] = self.depth;
        out[5..9].copy_from_slice(self.parent_fingerprint.as_bytes());
        out[9..13].copy_from_slice(&self.child_number.to_u32().to_be_bytes());
        out[13..45].copy_from_slice(&self.chain_code);
        match &self.key {
            KeyData::Private(secret) => out[46..78].copy_from_slice(&secret.secret_bytes()),
            KeyData::Public(public) => out[45..78].copy_from_slice(&public.serialize()),
        }
        out
    }

    pub fn is_private(&self) -> bool {
        matches!(self.key, KeyData::Private(_))
    }

    pub fn network_matches(&self, network: Network) -> bool {
        self.kind.matches_network(network)
    }

    pub fn public_key(&self) -> PublicKey {
        match &self.key {
            KeyData::Private(secret) => PublicKey::from_secret_key(secp256k1(), secret),
            KeyData::Public(public) => *public,
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::from_public_key(&self.public_key().serialize())
    }

    pub fn to_public(&self) -> Self {
        Self {
            kind: self.kind.to_public(),
            key: KeyData::Public(self.public_key()),
            ..*self
        }
    }

    /// Same key under a different version prefix. Privacy and network must agree.
    pub fn with_kind(&self, kind: ExtendedKeyKind) -> Result<Self, ExtendedKeyError> {
        if kind.is_private() != self.kind.is_private() || kind.is_mainnet() != self.kind.is_mainnet() {
            return Err(ExtendedKeyError::KindMismatch {
                from: self.kind,
                to: kind,
            });
        }
        Ok(Self { kind, ..*self })
    }

    pub fn derive_child(&self, child: ChildNumber) -> Result<Self, ExtendedKeyError> {
        let index = child.to_u32().to_be_bytes();
        let (key, chain_code) = match &self.key {
            KeyData::Private(secret) => {
                let (tweak, chain_code) = if child.is_hardened() {
                    let secret_bytes = secret.secret_bytes();
                    hmac_split(&self.chain_code, &[&[0u8][..], &secret_bytes[..], &index[..]])?
                } else {
                    let public = PublicKey::from_secret_key(secp256k1(), secret).serialize();
                    hmac_split(&self.chain_code, &[&public[..], &index[..]])?
                };
                let scalar = Scalar::from_be_bytes(tweak).map_err(|_| ExtendedKeyError::Derivation)?;
                let derived = secret
                    .add_tweak(&scalar)
                    .map_err(|_| ExtendedKeyError::Derivation)?;
                (KeyData::Private(derived), chain_code)
            }
            KeyData::Public(public) => {
                if child.is_hardened() {
                    return Err(ExtendedKeyError::HardenedFromPublic);
                }
                let serialized = public.serialize();
                let (tweak, chain_code) =
                    hmac_split(&self.chain_code, &[&serialized[..], &index[..]])?;
                let scalar = Scalar::from_be_bytes(tweak).map_err(|_| ExtendedKeyError::Derivation)?;
                let derived = public
                    .add_exp_tweak(secp256k1(), &scalar)
                    .map_err(|_| ExtendedKeyError::Derivation)?;
                (KeyData::Public(derived), chain_code)
            }
        };
        let depth = self.depth.checked_add(1).ok_or(ExtendedKeyError::Derivation)?;
        Ok(Self {
            kind: self.kind,
            depth,
            parent_fingerprint: self.fingerprint(),
            child_number: child,
            chain_code,
            key,
        })
    }

    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self, ExtendedKeyError> {
        path.as_slice()
            .iter()
            .try_fold(*self, |key, step| key.derive_child(*step))
    }
}

fn hmac_split(key: &[u8], parts: &[&[u8]]) -> Result<([u8; 32], [u8; 32]), ExtendedKeyError> {
    let mut mac = HmacSha512::new_from_slice(key).map_err(|_| ExtendedKeyError::Derivation)?;
    for part in parts {
        mac.update(part);
    }
    let digest = mac.finalize().into_bytes();
    let mut left = [0u8; 32];
    let mut right = [0u8; 32];
    left.copy_from_slice(&digest[..32]);
    right.copy_from_slice(&digest[32..]);
    Ok((left, right))
}

impl fmt::Display for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base58::check_encode(&self.encode()))
    }
}

impl FromStr for ExtendedKey {
    type Err = ExtendedKeyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let payload = base58::check_decode(raw)?;
        Self::decode(&payload)
    }
}
