//! Boolean gates for user-supplied key material.
//!
//! Every check returns `false` instead of an error so callers can show
//! inline feedback. Taproot (`P2TR`) keys, addresses and descriptors are
//! rejected unconditionally.

use satsigner_consensus::Network;
use satsigner_primitives::address::{address_kind, AddressKind};

use crate::descriptor::{Descriptor, ScriptKind};
use crate::path::DerivationPath;
use crate::policy::ScriptVersion;
use crate::xkey::{ExtendedKey, ExtendedKeyKind, EXTENDED_KEY_STR_LEN};

pub fn validate_extended_key(
    key: &str,
    script_version: Option<ScriptVersion>,
    network: Option<Network>,
) -> bool {
    if script_version == Some(ScriptVersion::P2tr) || key.len() != EXTENDED_KEY_STR_LEN {
        return false;
    }
    let Some(kind) = key.get(..4).and_then(ExtendedKeyKind::from_prefix) else {
        return false;
    };
    if script_version.is_some_and(|version| kind.script_version() != version) {
        return false;
    }
    if network.is_some_and(|network| !kind.matches_network(network)) {
        return false;
    }
    key.parse::<ExtendedKey>().is_ok()
}

pub fn validate_fingerprint(fingerprint: &str) -> bool {
    fingerprint.len() == 8 && fingerprint.bytes().all(|b| b.is_ascii_hexdigit())
}

/// At least one index, optionally rooted at `m/`.
pub fn validate_derivation_path(path: &str) -> bool {
    if path != path.trim() {
        return false;
    }
    path.parse::<DerivationPath>()
        .is_ok_and(|parsed| !parsed.is_master())
}

pub fn validate_address(
    address: &str,
    script_version: Option<ScriptVersion>,
    network: Option<Network>,
) -> bool {
    if script_version == Some(ScriptVersion::P2tr) {
        return false;
    }
    let networks: Vec<Network> = match network {
        Some(network) => vec![network],
        None => Network::ALL.to_vec(),
    };
    if let Some(version) = script_version {
        let prefixed = networks.iter().any(|network| {
            version
                .address_prefixes(*network)
                .iter()
                .any(|prefix| address.starts_with(prefix))
        });
        if !prefixed {
            return false;
        }
    }
    networks.iter().any(|network| match address_kind(address, *network) {
        Ok(AddressKind::P2tr) | Err(_) => false,
        Ok(kind) => script_version.map_or(true, |version| kind_matches(version, kind)),
    })
}

fn kind_matches(version: ScriptVersion, kind: AddressKind) -> bool {
    matches!(
        (version, kind),
        (ScriptVersion::P2pkh, AddressKind::P2pkh)
            | (ScriptVersion::P2shP2wpkh, AddressKind::P2sh)
            | (ScriptVersion::P2wpkh, AddressKind::P2wpkh)
    )
}

/// Structural descriptor check. With a network, the checksum (if present)
/// and the network of every key must also be valid.
pub fn validate_descriptor(
    descriptor: &str,
    script_version: Option<ScriptVersion>,
    network: Option<Network>,
) -> bool {
    if script_version == Some(ScriptVersion::P2tr) {
        return false;
    }
    let parsed = match network {
        Some(network) => Descriptor::parse_with_network(descriptor, network),
        None => Descriptor::parse(descriptor),
    };
    parsed.is_ok_and(|parsed| parsed.kind() != ScriptKind::P2tr)
}
