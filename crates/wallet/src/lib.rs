//! Wallet views reconciled from Electrum-style chain data.

pub mod account;
pub mod fetch;
pub mod reconcile;
pub mod records;
pub mod source;

pub use account::{build_account_view, AccountWalletView, WalletSummary};
pub use fetch::{fetch_address_activity, fetch_descriptor_activity, FetchError};
pub use reconcile::{
    reconcile, reconcile_address, AddressData, AddressInfo, Direction, OwnedAddress,
    ReconcileDiagnostics, RejectedTransaction, TxInputView, TxOutputView, Utxo, WalletTransaction,
};
pub use records::{ElectrumBalance, HistoryEntry, UtxoRecord};
pub use source::{ChainSource, MemorySource, SourceError};
