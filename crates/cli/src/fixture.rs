//! JSON fixture describing an account's Electrum data, replayed through
//! an in-memory chain source.

use std::collections::BTreeMap;

use satsigner_keys::Keychain;
use satsigner_wallet::{ElectrumBalance, HistoryEntry, UtxoRecord};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletFixture {
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub external_descriptor: Option<String>,
    #[serde(default)]
    pub internal_descriptor: Option<String>,
    #[serde(default)]
    pub transactions: Vec<String>,
    #[serde(default)]
    pub block_times: BTreeMap<u32, u64>,
    pub addresses: Vec<AddressFixture>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AddressFixture {
    pub address: String,
    #[serde(default)]
    pub keychain: Keychain,
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub utxos: Vec<UtxoRecord>,
    #[serde(default)]
    pub balance: Option<ElectrumBalance>,
}
