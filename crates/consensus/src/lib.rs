//! Network parameters, monetary units, and transaction-level constants.

pub mod constants;
pub mod money;
pub mod params;

pub use money::{money_range, Amount, COIN, MAX_MONEY};
pub use params::{
    chain_params, hash256_from_hex, hash256_to_hex, ChainParams, HexError, Network,
    ParseNetworkError,
};

/// 32-byte hash in internal (little-endian, wire) byte order.
pub type Hash256 = [u8; 32];
