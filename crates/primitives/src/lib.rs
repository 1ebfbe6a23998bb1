//! Bitcoin transaction model, wire serialization, hashing and address encodings.

pub mod address;
pub mod base58;
pub mod encoding;
pub mod hash;
pub mod outpoint;
pub mod transaction;

pub use address::{
    address_kind, address_network, address_to_script_hash, address_to_script_pubkey,
    electrum_script_hash, script_pubkey_to_address, secret_key_to_wif, wif_to_secret_key,
    AddressError, AddressKind,
};
pub use hash::{hash160, sha256, sha256d};
pub use outpoint::OutPoint;
pub use transaction::{Transaction, TransactionDecodeError, TxComponent, TxIn, TxOut};
