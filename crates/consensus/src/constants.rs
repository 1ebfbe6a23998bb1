//! Transaction-level constants shared by the decoder and the wallet view.

/// Sequence value that opts an input out of lock-time and relative lock-time rules.
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;
/// Lock times below this are block heights, at or above are unix timestamps.
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;
/// Witness discount applied to non-witness bytes when computing weight (BIP141).
pub const WITNESS_SCALE_FACTOR: usize = 4;
/// Segwit serialization marker byte, placed where the input count would be.
pub const SEGWIT_MARKER: u8 = 0x00;
/// Segwit serialization flag byte following the marker.
pub const SEGWIT_FLAG: u8 = 0x01;
/// Maximum number of public keys in a bare `OP_CHECKMULTISIG`.
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 20;
