//! Account-level snapshot assembled from per-address results.

use std::collections::{HashMap, HashSet};

use satsigner_keys::{AccountIdentity, Keychain};
use serde::Serialize;

use crate::reconcile::{AddressInfo, Direction, Utxo, WalletTransaction};

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub balance: u64,
    pub number_of_addresses: u32,
    pub number_of_transactions: usize,
    pub number_of_utxos: usize,
    pub sats_in_mempool: i64,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountWalletView {
    pub external_descriptor: String,
    pub internal_descriptor: Option<String>,
    pub fingerprint: String,
    pub derivation_path: String,
    pub transactions: Vec<WalletTransaction>,
    pub utxos: Vec<Utxo>,
    pub summary: WalletSummary,
}

/// Merges address results into one view. A transaction touching several
/// owned addresses appears once with its sent and received values summed;
/// `address` stays the first one seen and `owned_addresses` lists them all.
pub fn build_account_view(identity: &AccountIdentity, addresses: &[AddressInfo]) -> AccountWalletView {
    let mut transactions: Vec<WalletTransaction> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut utxos: Vec<Utxo> = Vec::new();
    let mut outpoints: HashSet<(String, u32)> = HashSet::new();
    let mut summary = WalletSummary::default();
    let mut highest_used: Option<u32> = None;

    for info in addresses {
        for tx in &info.transactions {
            match positions.get(&tx.id) {
                Some(&position) => {
                    let merged = &mut transactions[position];
                    merged.sent = merged.sent.saturating_add(tx.sent);
                    merged.received = merged.received.saturating_add(tx.received);
                    merged.direction = Direction::classify(merged.sent);
                    for address in &tx.owned_addresses {
                        if !merged.owned_addresses.contains(address) {
                            merged.owned_addresses.push(address.clone());
                        }
                    }
                }
                None => {
                    positions.insert(tx.id.clone(), transactions.len());
                    transactions.push(tx.clone());
                }
            }
        }

        for utxo in &info.utxos {
            if outpoints.insert((utxo.txid.clone(), utxo.vout)) {
                utxos.push(utxo.clone());
            }
        }

        summary.balance = summary
            .balance
            .saturating_add(u64::try_from(info.balance.confirmed).unwrap_or(0));
        summary.sats_in_mempool = summary
            .sats_in_mempool
            .saturating_add(info.balance.unconfirmed);

        let used = !info.transactions.is_empty() || !info.utxos.is_empty();
        if used && info.keychain == Keychain::External {
            if let Some(index) = info.index {
                highest_used = Some(highest_used.map_or(index, |current| current.max(index)));
            }
        }
    }

    summary.number_of_addresses = highest_used.map_or(0, |index| index.saturating_add(1));
    summary.number_of_transactions = transactions.len();
    summary.number_of_utxos = utxos.len();

    AccountWalletView {
        external_descriptor: identity.external_descriptor.clone(),
        internal_descriptor: identity.internal_descriptor.clone(),
        fingerprint: identity.fingerprint.clone(),
        derivation_path: identity.derivation_path.clone(),
        transactions,
        utxos,
        summary,
    }
}
