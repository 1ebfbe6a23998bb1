use std::collections::{BTreeMap, HashSet};
use std::fmt;

use satsigner_consensus::Network;
use satsigner_keys::{Descriptor, DescriptorError, Keychain};
use satsigner_log::log_debug;
use satsigner_primitives::{electrum_script_hash, AddressError};

use crate::reconcile::{reconcile_address, AddressData, AddressInfo, OwnedAddress};
use crate::source::{ChainSource, SourceError};

#[derive(Debug)]
pub enum FetchError {
    Address(AddressError),
    Descriptor(DescriptorError),
    Source(SourceError),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Address(err) => write!(f, "{err}"),
            FetchError::Descriptor(err) => write!(f, "{err}"),
            FetchError::Source(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Address(err) => Some(err),
            FetchError::Descriptor(err) => Some(err),
            FetchError::Source(err) => Some(err),
        }
    }
}

impl From<AddressError> for FetchError {
    fn from(err: AddressError) -> Self {
        FetchError::Address(err)
    }
}

impl From<DescriptorError> for FetchError {
    fn from(err: DescriptorError) -> Self {
        FetchError::Descriptor(err)
    }
}

impl From<SourceError> for FetchError {
    fn from(err: SourceError) -> Self {
        FetchError::Source(err)
    }
}

/// Fetches everything known about one address in a single batch and
/// reconciles it.
pub fn fetch_address_activity<S: ChainSource + ?Sized>(
    source: &S,
    address: &str,
    keychain: Keychain,
    index: Option<u32>,
    network: Network,
) -> Result<AddressInfo, FetchError> {
    let owned = OwnedAddress::new(address, network)?.with_keychain(keychain, index);
    let script_hash = electrum_script_hash(&owned.script_pubkey);

    let utxos = source.utxos(&script_hash)?;
    let history = source.history(&script_hash)?;

    let mut seen = HashSet::new();
    let txids = history
        .iter()
        .filter(|entry| seen.insert(entry.tx_hash.as_str()))
        .map(|entry| entry.tx_hash.clone())
        .collect::<Vec<_>>();
    let raw_transactions = if txids.is_empty() {
        Vec::new()
    } else {
        source.raw_transactions(&txids)?
    };
    let balance = source.balance(&script_hash)?;

    let mut block_times = BTreeMap::new();
    for height in history.iter().filter_map(|entry| entry.confirmed_height()) {
        if block_times.contains_key(&height) {
            continue;
        }
        if let Some(timestamp) = source.block_time(height)? {
            block_times.insert(height, timestamp);
        }
    }

    log_debug!(
        "fetched {} history entries and {} utxos for {}",
        history.len(),
        utxos.len(),
        owned.address
    );

    let data = AddressData {
        raw_transactions,
        utxos,
        history,
        balance: Some(balance),
        block_times,
    };
    Ok(reconcile_address(&owned, &data))
}

/// Fetches activity for the first `count` addresses of a descriptor.
pub fn fetch_descriptor_activity<S: ChainSource + ?Sized>(
    source: &S,
    descriptor: &Descriptor,
    keychain: Keychain,
    count: u32,
    network: Network,
) -> Result<Vec<AddressInfo>, FetchError> {
    (0..count)
        .map(|index| {
            let address = descriptor.derive_address(index, network)?;
            fetch_address_activity(source, &address, keychain, Some(index), network)
        })
        .collect()
}
