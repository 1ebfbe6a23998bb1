//! Turns seeds, descriptors and extended public keys into account descriptors.

use std::fmt;

use bip39::{Language, Mnemonic};
use satsigner_consensus::{chain_params, Network};
use satsigner_log::log_debug;

use crate::descriptor::{Descriptor, DescriptorError, Expr, KeyExpression, KeyMaterial, KeyOrigin, Wildcard};
use crate::fingerprint::{Fingerprint, ParseFingerprintError};
use crate::path::{ChildNumber, DerivationPath};
use crate::policy::{Keychain, ScriptVersion};
use crate::validation::validate_address;
use crate::xkey::{ExtendedKey, ExtendedKeyError, ExtendedKeyKind};

#[derive(Debug)]
pub enum DeriveError {
    Mnemonic(bip39::Error),
    ExtendedKey(ExtendedKeyError),
    Descriptor(DescriptorError),
    Fingerprint(ParseFingerprintError),
    NetworkMismatch(Network),
    NotPublic,
    InvalidAddress(String),
}

impl fmt::Display for DeriveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeriveError::Mnemonic(err) => write!(f, "invalid mnemonic: {err}"),
            DeriveError::ExtendedKey(err) => write!(f, "{err}"),
            DeriveError::Descriptor(err) => write!(f, "{err}"),
            DeriveError::Fingerprint(err) => write!(f, "{err}"),
            DeriveError::NetworkMismatch(network) => {
                write!(f, "key material does not belong to {network}")
            }
            DeriveError::NotPublic => write!(f, "expected an extended public key"),
            DeriveError::InvalidAddress(address) => {
                write!(f, "'{address}' is not a watchable address on this network")
            }
        }
    }
}

impl std::error::Error for DeriveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeriveError::Mnemonic(err) => Some(err),
            DeriveError::ExtendedKey(err) => Some(err),
            DeriveError::Descriptor(err) => Some(err),
            DeriveError::Fingerprint(err) => Some(err),
            _ => None,
        }
    }
}

impl From<bip39::Error> for DeriveError {
    fn from(err: bip39::Error) -> Self {
        DeriveError::Mnemonic(err)
    }
}

impl From<ExtendedKeyError> for DeriveError {
    fn from(err: ExtendedKeyError) -> Self {
        DeriveError::ExtendedKey(err)
    }
}

impl From<DescriptorError> for DeriveError {
    fn from(err: DescriptorError) -> Self {
        DeriveError::Descriptor(err)
    }
}

impl From<ParseFingerprintError> for DeriveError {
    fn from(err: ParseFingerprintError) -> Self {
        DeriveError::Fingerprint(err)
    }
}

/// Where an account's key material comes from.
#[derive(Clone, Debug)]
pub enum KeySource {
    Mnemonic {
        mnemonic: String,
        passphrase: String,
        script_version: ScriptVersion,
    },
    Descriptor {
        external: String,
        internal: Option<String>,
    },
    ExtendedPublicKey {
        key: String,
        fingerprint: String,
        script_version: ScriptVersion,
    },
    Address(String),
}

#[derive(Clone, Debug)]
pub enum AccountPolicy {
    SingleSig(KeySource),
    /// Each key is a descriptor key expression, usually `[fp/path]xpub/0/*`.
    MultiSig {
        threshold: usize,
        keys: Vec<String>,
    },
    WatchOnly(KeySource),
}

/// Public identity of an account, ready for the caller to persist.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AccountIdentity {
    pub external_descriptor: String,
    pub internal_descriptor: Option<String>,
    pub fingerprint: String,
    pub derivation_path: String,
}

pub fn validate_mnemonic(mnemonic: &str) -> bool {
    parse_mnemonic(mnemonic).is_ok()
}

fn parse_mnemonic(mnemonic: &str) -> Result<Mnemonic, DeriveError> {
    Ok(Mnemonic::parse_in(Language::English, mnemonic.trim())?)
}

fn master_key(mnemonic: &str, passphrase: &str, network: Network) -> Result<ExtendedKey, DeriveError> {
    let seed = parse_mnemonic(mnemonic)?.to_seed(passphrase);
    Ok(ExtendedKey::new_master(&seed, network)?)
}

/// `purpose'/coin_type'/0'` for the script version and network.
pub fn account_path(script_version: ScriptVersion, network: Network) -> DerivationPath {
    DerivationPath::from(vec![
        ChildNumber::Hardened(script_version.purpose()),
        ChildNumber::Hardened(chain_params(network).coin_type),
        ChildNumber::Hardened(0),
    ])
}

/// Master key fingerprint of a mnemonic and passphrase.
pub fn mnemonic_fingerprint(mnemonic: &str, passphrase: &str, network: Network) -> Result<Fingerprint, DeriveError> {
    Ok(master_key(mnemonic, passphrase, network)?.fingerprint())
}

/// Account-level extended public key, versioned for the script type
/// (`zpub`/`vpub` for P2WPKH and so on).
pub fn extended_public_key_from_mnemonic(
    mnemonic: &str,
    passphrase: &str,
    script_version: ScriptVersion,
    network: Network,
) -> Result<ExtendedKey, DeriveError> {
    let master = master_key(mnemonic, passphrase, network)?;
    let account = master
        .derive_path(&account_path(script_version, network))?
        .to_public();
    Ok(account.with_kind(ExtendedKeyKind::new(script_version, network, false))?)
}

fn wrap(script_version: ScriptVersion, key: KeyExpression) -> Expr {
    match script_version {
        ScriptVersion::P2pkh => Expr::Pkh(key),
        ScriptVersion::P2shP2wpkh => Expr::Sh(Box::new(Expr::Wpkh(key))),
        ScriptVersion::P2wpkh => Expr::Wpkh(key),
        ScriptVersion::P2tr => Expr::Tr(key),
    }
}

fn account_descriptor(
    account: ExtendedKey,
    fingerprint: Fingerprint,
    script_version: ScriptVersion,
    keychain: Keychain,
    network: Network,
) -> Descriptor {
    let key = KeyExpression {
        origin: Some(KeyOrigin {
            fingerprint,
            path: account_path(script_version, network),
        }),
        material: KeyMaterial::Extended(account),
        steps: DerivationPath::from(vec![ChildNumber::Normal(keychain.index())]),
        wildcard: Wildcard::Unhardened,
    };
    Descriptor::new(wrap(script_version, key)).with_checksum()
}

/// Public BIP-44/49/84/86 descriptor for one keychain of the first account.
pub fn derive_from_seed(
    mnemonic: &str,
    passphrase: &str,
    script_version: ScriptVersion,
    keychain: Keychain,
    network: Network,
) -> Result<Descriptor, DeriveError> {
    let master = master_key(mnemonic, passphrase, network)?;
    let account = master
        .derive_path(&account_path(script_version, network))?
        .to_public();
    Ok(account_descriptor(
        account,
        master.fingerprint(),
        script_version,
        keychain,
        network,
    ))
}

/// Public descriptor for an imported account-level extended public key.
/// SLIP-132 prefixes are re-versioned to `xpub`/`tpub`.
pub fn descriptor_from_extended_public_key(
    key: &str,
    fingerprint: &str,
    script_version: ScriptVersion,
    keychain: Keychain,
    network: Network,
) -> Result<Descriptor, DeriveError> {
    let parsed: ExtendedKey = key.trim().parse()?;
    if parsed.is_private() {
        return Err(DeriveError::NotPublic);
    }
    if !parsed.network_matches(network) {
        return Err(DeriveError::NetworkMismatch(network));
    }
    let fingerprint: Fingerprint = fingerprint.trim().parse()?;
    let account = parsed.with_kind(parsed.kind.to_bip32())?;
    Ok(account_descriptor(
        account,
        fingerprint,
        script_version,
        keychain,
        network,
    ))
}

/// Fingerprint and `m/`-rooted path of the first key origin, or empty
/// strings when the descriptor carries none.
pub fn extract_fingerprint_and_path(descriptor: &str) -> Result<(String, String), DescriptorError> {
    let parsed = Descriptor::parse(descriptor)?;
    let origin = parsed.keys().into_iter().find_map(|key| key.origin.clone());
    Ok(match origin {
        Some(origin) => (origin.fingerprint.to_string(), origin.path.to_m_string()),
        None => (String::new(), String::new()),
    })
}

/// First extended key in the descriptor.
pub fn extract_extended_key(descriptor: &str) -> Result<Option<ExtendedKey>, DescriptorError> {
    let parsed = Descriptor::parse(descriptor)?;
    let key = parsed
        .keys()
        .into_iter()
        .find_map(|key| key.extended_key().copied());
    Ok(key)
}

/// `wsh(multi(k, keys..))` with keys in the order given.
pub fn compose_multisig<K: AsRef<str>>(threshold: usize, keys: &[K]) -> Result<Descriptor, DescriptorError> {
    compose("multi", threshold, keys)
}

/// `wsh(sortedmulti(k, keys..))`; keys are sorted per derived index.
pub fn compose_sorted_multisig<K: AsRef<str>>(
    threshold: usize,
    keys: &[K],
) -> Result<Descriptor, DescriptorError> {
    compose("sortedmulti", threshold, keys)
}

fn compose<K: AsRef<str>>(name: &str, threshold: usize, keys: &[K]) -> Result<Descriptor, DescriptorError> {
    let joined = keys
        .iter()
        .map(|key| key.as_ref().trim())
        .collect::<Vec<_>>()
        .join(",");
    Ok(Descriptor::parse(&format!("wsh({name}({threshold},{joined}))"))?.with_checksum())
}

pub fn resolve_account(policy: &AccountPolicy, network: Network) -> Result<AccountIdentity, DeriveError> {
    match policy {
        AccountPolicy::SingleSig(source) | AccountPolicy::WatchOnly(source) => {
            resolve_source(source, network)
        }
        AccountPolicy::MultiSig { threshold, keys } => {
            let descriptor = compose_multisig(*threshold, keys)?;
            descriptor.check_network(network)?;
            let rendered = descriptor.to_string_with_checksum();
            let (fingerprint, derivation_path) = extract_fingerprint_and_path(&rendered)?;
            log_debug!(
                "resolved {}-of-{} multisig account",
                threshold,
                keys.len()
            );
            Ok(AccountIdentity {
                external_descriptor: rendered,
                internal_descriptor: None,
                fingerprint,
                derivation_path,
            })
        }
    }
}

fn resolve_source(source: &KeySource, network: Network) -> Result<AccountIdentity, DeriveError> {
    let (external, internal) = match source {
        KeySource::Mnemonic {
            mnemonic,
            passphrase,
            script_version,
        } => (
            derive_from_seed(mnemonic, passphrase, *script_version, Keychain::External, network)?,
            Some(derive_from_seed(
                mnemonic,
                passphrase,
                *script_version,
                Keychain::Internal,
                network,
            )?),
        ),
        KeySource::Descriptor { external, internal } => {
            let external = Descriptor::parse_with_network(external, network)?;
            let internal = match internal.as_deref().map(str::trim) {
                Some(internal) if !internal.is_empty() => {
                    Some(Descriptor::parse_with_network(internal, network)?)
                }
                _ => None,
            };
            (external, internal)
        }
        KeySource::ExtendedPublicKey {
            key,
            fingerprint,
            script_version,
        } => (
            descriptor_from_extended_public_key(
                key,
                fingerprint,
                *script_version,
                Keychain::External,
                network,
            )?,
            Some(descriptor_from_extended_public_key(
                key,
                fingerprint,
                *script_version,
                Keychain::Internal,
                network,
            )?),
        ),
        KeySource::Address(address) => {
            let address = address.trim();
            if !validate_address(address, None, Some(network)) {
                return Err(DeriveError::InvalidAddress(address.to_string()));
            }
            (
                Descriptor::new(Expr::Addr(address.to_string())).with_checksum(),
                None,
            )
        }
    };

    let external_descriptor = external.to_string_with_checksum();
    let (fingerprint, derivation_path) = extract_fingerprint_and_path(&external_descriptor)?;
    Ok(AccountIdentity {
        external_descriptor,
        internal_descriptor: internal.map(|descriptor| descriptor.to_string_with_checksum()),
        fingerprint,
        derivation_path,
    })
}
