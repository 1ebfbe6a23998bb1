//! Records returned by an Electrum server's `blockchain.scripthash.*` calls.

use serde::{Deserialize, Serialize};

/// One `get_history` entry. Heights of zero or below are mempool entries.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub height: i32,
    pub tx_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<u64>,
}

impl HistoryEntry {
    pub fn confirmed_height(&self) -> Option<u32> {
        u32::try_from(self.height).ok().filter(|height| *height > 0)
    }
}

/// One `listunspent` entry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UtxoRecord {
    pub height: i32,
    pub tx_hash: String,
    pub tx_pos: u32,
    pub value: u64,
}

impl UtxoRecord {
    pub fn is_confirmed(&self) -> bool {
        self.height > 0
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ElectrumBalance {
    pub confirmed: i64,
    pub unconfirmed: i64,
}

impl ElectrumBalance {
    /// Balance implied by an unspent list, split on confirmation.
    pub fn from_utxos(utxos: &[UtxoRecord]) -> Self {
        utxos.iter().fold(Self::default(), |mut balance, utxo| {
            let value = i64::try_from(utxo.value).unwrap_or(i64::MAX);
            if utxo.is_confirmed() {
                balance.confirmed = balance.confirmed.saturating_add(value);
            } else {
                balance.unconfirmed = balance.unconfirmed.saturating_add(value);
            }
            balance
        })
    }
}
