//! Per-address reconciliation of raw transactions and unspent outputs into
//! wallet transactions.
//!
//! Previous outputs are looked up only inside the batch handed to
//! [`reconcile_address`]; parents that were not fetched contribute nothing
//! to the sent value and are counted in [`ReconcileDiagnostics`].

use std::collections::{BTreeMap, HashMap};

use satsigner_consensus::Network;
use satsigner_keys::Keychain;
use satsigner_log::{log_debug, log_warn};
use satsigner_primitives::{
    address_to_script_pubkey, script_pubkey_to_address, AddressError, Transaction,
};
use serde::Serialize;

use crate::records::{ElectrumBalance, HistoryEntry, UtxoRecord};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Send,
    Receive,
}

impl Direction {
    /// Any value leaving the address makes it a send, change included.
    pub fn classify(sent: u64) -> Self {
        if sent > 0 {
            Direction::Send
        } else {
            Direction::Receive
        }
    }
}

/// An address the wallet owns, with its output script resolved once.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OwnedAddress {
    pub address: String,
    pub script_pubkey: Vec<u8>,
    pub keychain: Keychain,
    pub index: Option<u32>,
    pub network: Network,
}

impl OwnedAddress {
    pub fn new(address: &str, network: Network) -> Result<Self, AddressError> {
        let address = address.trim();
        let script_pubkey = address_to_script_pubkey(address, network)?;
        Ok(Self {
            address: address.to_string(),
            script_pubkey,
            keychain: Keychain::External,
            index: None,
            network,
        })
    }

    pub fn with_keychain(mut self, keychain: Keychain, index: Option<u32>) -> Self {
        self.keychain = keychain;
        self.index = index;
        self
    }

    fn owns(&self, script_pubkey: &[u8]) -> bool {
        self.script_pubkey == script_pubkey
    }
}

/// Everything fetched for one address.
#[derive(Clone, Debug, Default)]
pub struct AddressData {
    pub raw_transactions: Vec<String>,
    pub utxos: Vec<UtxoRecord>,
    pub history: Vec<HistoryEntry>,
    pub balance: Option<ElectrumBalance>,
    pub block_times: BTreeMap<u32, u64>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TxInputView {
    pub txid: String,
    pub vout: u32,
    pub sequence: u32,
    pub script_sig: String,
    pub witness: Vec<String>,
    /// Known only when the parent transaction is in the batch.
    pub value: Option<u64>,
    pub address: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TxOutputView {
    pub value: u64,
    pub script_pubkey: String,
    pub address: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    pub id: String,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub sent: u64,
    pub received: u64,
    pub fee: Option<u64>,
    /// Owned address this record was reconciled for.
    pub address: String,
    /// Every owned address the transaction touches, in merge order.
    pub owned_addresses: Vec<String>,
    pub label: String,
    pub block_height: Option<u32>,
    pub timestamp: Option<u64>,
    pub size: usize,
    pub vsize: usize,
    pub weight: usize,
    pub version: i32,
    pub lock_time: u32,
    pub lock_time_enabled: bool,
    pub raw: String,
    pub vin: Vec<TxInputView>,
    pub vout: Vec<TxOutputView>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
    pub address: String,
    pub keychain: Keychain,
    pub label: String,
    pub script_pubkey: String,
    pub block_height: Option<u32>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RejectedTransaction {
    pub position: usize,
    pub error: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileDiagnostics {
    pub rejected: Vec<RejectedTransaction>,
    pub unresolved_inputs: usize,
    pub duplicate_txids: usize,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AddressInfo {
    pub address: String,
    pub keychain: Keychain,
    pub index: Option<u32>,
    pub transactions: Vec<WalletTransaction>,
    pub utxos: Vec<Utxo>,
    pub balance: ElectrumBalance,
    pub diagnostics: ReconcileDiagnostics,
}

/// Decoded transactions in arrival order, indexed by txid.
#[derive(Default)]
struct Batch {
    entries: Vec<(String, Transaction)>,
    by_txid: HashMap<String, usize>,
}

impl Batch {
    fn insert(&mut self, txid: String, tx: Transaction) -> bool {
        if self.by_txid.contains_key(&txid) {
            return false;
        }
        self.by_txid.insert(txid.clone(), self.entries.len());
        self.entries.push((txid, tx));
        true
    }

    fn get(&self, txid: &str) -> Option<&Transaction> {
        self.by_txid.get(txid).map(|&index| &self.entries[index].1)
    }
}

/// Reconciles a batch with only an unspent list; balance comes from the
/// unspent outputs.
pub fn reconcile(owned: &OwnedAddress, raw_transactions: &[String], utxos: &[UtxoRecord]) -> AddressInfo {
    let data = AddressData {
        raw_transactions: raw_transactions.to_vec(),
        utxos: utxos.to_vec(),
        ..AddressData::default()
    };
    reconcile_address(owned, &data)
}

pub fn reconcile_address(owned: &OwnedAddress, data: &AddressData) -> AddressInfo {
    let mut diagnostics = ReconcileDiagnostics::default();
    let mut batch = Batch::default();

    for (position, raw) in data.raw_transactions.iter().enumerate() {
        let tx = match Transaction::from_hex(raw) {
            Ok(tx) => tx,
            Err(err) => {
                log_warn!(
                    "skipping transaction {position} for {}: {err}",
                    owned.address
                );
                diagnostics.rejected.push(RejectedTransaction {
                    position,
                    error: err.to_string(),
                });
                continue;
            }
        };
        let txid = tx.txid_hex();
        if !batch.insert(txid.clone(), tx) {
            log_warn!("duplicate transaction {txid} for {}", owned.address);
            diagnostics.duplicate_txids += 1;
        }
    }

    let history: HashMap<&str, &HistoryEntry> = data
        .history
        .iter()
        .map(|entry| (entry.tx_hash.as_str(), entry))
        .collect();

    let transactions = batch
        .entries
        .iter()
        .map(|(txid, tx)| {
            let entry = history.get(txid.as_str()).copied();
            wallet_transaction(owned, txid, tx, entry, &batch, data, &mut diagnostics)
        })
        .collect::<Vec<_>>();

    let script_hex = hex::encode(&owned.script_pubkey);
    let utxos = data
        .utxos
        .iter()
        .map(|record| Utxo {
            txid: record.tx_hash.clone(),
            vout: record.tx_pos,
            value: record.value,
            address: owned.address.clone(),
            keychain: owned.keychain,
            label: String::new(),
            script_pubkey: script_hex.clone(),
            block_height: u32::try_from(record.height).ok().filter(|height| *height > 0),
        })
        .collect::<Vec<_>>();

    let balance = data
        .balance
        .unwrap_or_else(|| ElectrumBalance::from_utxos(&data.utxos));

    log_debug!(
        "reconciled {}: {} transactions, {} utxos, {} rejected, {} unresolved inputs",
        owned.address,
        transactions.len(),
        utxos.len(),
        diagnostics.rejected.len(),
        diagnostics.unresolved_inputs
    );

    AddressInfo {
        address: owned.address.clone(),
        keychain: owned.keychain,
        index: owned.index,
        transactions,
        utxos,
        balance,
        diagnostics,
    }
}

fn wallet_transaction(
    owned: &OwnedAddress,
    txid: &str,
    tx: &Transaction,
    history: Option<&HistoryEntry>,
    batch: &Batch,
    data: &AddressData,
    diagnostics: &mut ReconcileDiagnostics,
) -> WalletTransaction {
    let network = owned.network;
    let mut received = 0u64;
    let vout = tx
        .outputs
        .iter()
        .map(|output| {
            if owned.owns(&output.script_pubkey) {
                received = received.saturating_add(output.value);
            }
            TxOutputView {
                value: output.value,
                script_pubkey: hex::encode(&output.script_pubkey),
                address: script_pubkey_to_address(&output.script_pubkey, network),
            }
        })
        .collect::<Vec<_>>();

    let coinbase = tx.is_coinbase();
    let mut sent = 0u64;
    let mut input_total = Some(0u64);
    let vin = tx
        .inputs
        .iter()
        .map(|input| {
            let parent_txid = input.prevout.txid_hex();
            let parent_output = batch
                .get(&parent_txid)
                .and_then(|parent| parent.outputs.get(input.prevout.index as usize));
            match parent_output {
                Some(output) => {
                    if owned.owns(&output.script_pubkey) {
                        sent = sent.saturating_add(output.value);
                    }
                    input_total = input_total.map(|total| total.saturating_add(output.value));
                }
                None if !coinbase => {
                    log_debug!(
                        "input {} of {txid} spends a transaction outside the batch",
                        input.prevout
                    );
                    diagnostics.unresolved_inputs += 1;
                    input_total = None;
                }
                None => input_total = None,
            }
            TxInputView {
                txid: parent_txid,
                vout: input.prevout.index,
                sequence: input.sequence,
                script_sig: hex::encode(&input.script_sig),
                witness: input.witness.iter().map(hex::encode).collect(),
                value: parent_output.map(|output| output.value),
                address: parent_output
                    .and_then(|output| script_pubkey_to_address(&output.script_pubkey, network)),
            }
        })
        .collect::<Vec<_>>();

    let fee = match (input_total, tx.total_output_value()) {
        (Some(inputs), Some(outputs)) => inputs.checked_sub(outputs),
        _ => history.and_then(|entry| entry.fee),
    };
    let block_height = history.and_then(HistoryEntry::confirmed_height);
    let timestamp = block_height.and_then(|height| data.block_times.get(&height).copied());

    WalletTransaction {
        id: txid.to_string(),
        direction: Direction::classify(sent),
        sent,
        received,
        fee,
        address: owned.address.clone(),
        owned_addresses: vec![owned.address.clone()],
        label: String::new(),
        block_height,
        timestamp,
        size: tx.size(),
        vsize: tx.vsize(),
        weight: tx.weight(),
        version: tx.version,
        lock_time: tx.lock_time,
        lock_time_enabled: tx.lock_time_enabled(),
        raw: tx.to_hex(),
        vin,
        vout,
    }
}
