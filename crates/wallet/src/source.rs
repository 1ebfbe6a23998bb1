//! Chain data collaborator: the Electrum-style calls the wallet needs.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock};

use satsigner_primitives::{Transaction, TransactionDecodeError};

use crate::records::{ElectrumBalance, HistoryEntry, UtxoRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    MissingTransaction(String),
    Backend(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::MissingTransaction(txid) => write!(f, "transaction {txid} not found"),
            SourceError::Backend(message) => write!(f, "chain source error: {message}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Read access to chain data keyed by Electrum scripthash or txid.
pub trait ChainSource: Send + Sync {
    fn history(&self, script_hash: &str) -> Result<Vec<HistoryEntry>, SourceError>;
    fn utxos(&self, script_hash: &str) -> Result<Vec<UtxoRecord>, SourceError>;
    fn balance(&self, script_hash: &str) -> Result<ElectrumBalance, SourceError>;
    /// Raw transaction hex, one per requested txid and in the same order.
    fn raw_transactions(&self, txids: &[String]) -> Result<Vec<String>, SourceError>;

    fn block_time(&self, _height: u32) -> Result<Option<u64>, SourceError> {
        Ok(None)
    }
}

impl<T: ChainSource + ?Sized> ChainSource for Arc<T> {
    fn history(&self, script_hash: &str) -> Result<Vec<HistoryEntry>, SourceError> {
        self.as_ref().history(script_hash)
    }

    fn utxos(&self, script_hash: &str) -> Result<Vec<UtxoRecord>, SourceError> {
        self.as_ref().utxos(script_hash)
    }

    fn balance(&self, script_hash: &str) -> Result<ElectrumBalance, SourceError> {
        self.as_ref().balance(script_hash)
    }

    fn raw_transactions(&self, txids: &[String]) -> Result<Vec<String>, SourceError> {
        self.as_ref().raw_transactions(txids)
    }

    fn block_time(&self, height: u32) -> Result<Option<u64>, SourceError> {
        self.as_ref().block_time(height)
    }
}

#[derive(Default)]
struct MemoryData {
    transactions: HashMap<String, String>,
    history: HashMap<String, Vec<HistoryEntry>>,
    utxos: HashMap<String, Vec<UtxoRecord>>,
    balances: HashMap<String, ElectrumBalance>,
    block_times: BTreeMap<u32, u64>,
}

/// In-memory chain source for fixtures and tests.
#[derive(Default)]
pub struct MemorySource {
    inner: RwLock<MemoryData>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a raw transaction and returns its txid.
    pub fn insert_transaction(&self, raw_hex: &str) -> Result<String, TransactionDecodeError> {
        let tx = Transaction::from_hex(raw_hex)?;
        let txid = tx.txid_hex();
        let mut guard = self.inner.write().expect("memory source lock");
        guard.transactions.insert(txid.clone(), tx.to_hex());
        Ok(txid)
    }

    pub fn add_history(&self, script_hash: &str, entry: HistoryEntry) {
        let mut guard = self.inner.write().expect("memory source lock");
        guard
            .history
            .entry(script_hash.to_string())
            .or_default()
            .push(entry);
    }

    pub fn add_utxo(&self, script_hash: &str, utxo: UtxoRecord) {
        let mut guard = self.inner.write().expect("memory source lock");
        guard
            .utxos
            .entry(script_hash.to_string())
            .or_default()
            .push(utxo);
    }

    pub fn set_balance(&self, script_hash: &str, balance: ElectrumBalance) {
        let mut guard = self.inner.write().expect("memory source lock");
        guard.balances.insert(script_hash.to_string(), balance);
    }

    pub fn set_block_time(&self, height: u32, timestamp: u64) {
        let mut guard = self.inner.write().expect("memory source lock");
        guard.block_times.insert(height, timestamp);
    }
}

impl ChainSource for MemorySource {
    fn history(&self, script_hash: &str) -> Result<Vec<HistoryEntry>, SourceError> {
        let guard = self.inner.read().expect("memory source lock");
        Ok(guard.history.get(script_hash).cloned().unwrap_or_default())
    }

    fn utxos(&self, script_hash: &str) -> Result<Vec<UtxoRecord>, SourceError> {
        let guard = self.inner.read().expect("memory source lock");
        Ok(guard.utxos.get(script_hash).cloned().unwrap_or_default())
    }

    /// Falls back to the balance implied by the stored unspent list.
    fn balance(&self, script_hash: &str) -> Result<ElectrumBalance, SourceError> {
        let guard = self.inner.read().expect("memory source lock");
        if let Some(balance) = guard.balances.get(script_hash) {
            return Ok(*balance);
        }
        let utxos = guard.utxos.get(script_hash).map(Vec::as_slice).unwrap_or(&[]);
        Ok(ElectrumBalance::from_utxos(utxos))
    }

    fn raw_transactions(&self, txids: &[String]) -> Result<Vec<String>, SourceError> {
        let guard = self.inner.read().expect("memory source lock");
        txids
            .iter()
            .map(|txid| {
                guard
                    .transactions
                    .get(txid)
                    .cloned()
                    .ok_or_else(|| SourceError::MissingTransaction(txid.clone()))
            })
            .collect()
    }

    fn block_time(&self, height: u32) -> Result<Option<u64>, SourceError> {
        let guard = self.inner.read().expect("memory source lock");
        Ok(guard.block_times.get(&height).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS_COINBASE: &str = "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff4d04ffff001d0104455468652054696d65732030332f4a616e2f32303039204368616e63656c6c6f72206f6e206272696e6b206f66207365636f6e64206261696c6f757420666f722062616e6b73ffffffff0100f2052a01000000434104678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61deb649f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5fac00000000";
    const GENESIS_TXID: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";

    #[test]
    fn raw_transactions_preserve_request_order() {
        let source = MemorySource::new();
        let txid = source
            .insert_transaction(GENESIS_COINBASE)
            .expect("insert");
        assert_eq!(txid, GENESIS_TXID);

        let raw = source
            .raw_transactions(&[txid.clone(), txid])
            .expect("fetch");
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0], GENESIS_COINBASE);

        let missing = source.raw_transactions(&["00".repeat(32)]);
        assert!(matches!(missing, Err(SourceError::MissingTransaction(_))));
    }

    #[test]
    fn balance_defaults_to_unspent_sum() {
        let source = MemorySource::new();
        source.add_utxo(
            "sh",
            UtxoRecord {
                height: 0,
                tx_hash: GENESIS_TXID.into(),
                tx_pos: 0,
                value: 1_000,
            },
        );
        assert_eq!(
            source.balance("sh").expect("balance"),
            ElectrumBalance {
                confirmed: 0,
                unconfirmed: 1_000,
            }
        );
        source.set_balance(
            "sh",
            ElectrumBalance {
                confirmed: 9,
                unconfirmed: 0,
            },
        );
        assert_eq!(source.balance("sh").expect("balance").confirmed, 9);
        assert_eq!(source.balance("other").expect("balance"), ElectrumBalance::default());
    }

    #[test]
    fn shared_source_through_arc() {
        let source = Arc::new(MemorySource::new());
        source.set_block_time(1, 1_231_469_665);
        let shared: Arc<MemorySource> = Arc::clone(&source);
        assert_eq!(shared.block_time(1).expect("time"), Some(1_231_469_665));
        assert_eq!(shared.block_time(2).expect("time"), None);
        assert!(shared.history("none").expect("history").is_empty());
    }
}
