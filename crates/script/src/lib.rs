//! Output-script classification, script construction and transaction byte annotation.

pub mod inspect;
pub mod standard;
pub mod witness;

pub use inspect::{inspect_hex, inspect_transaction, FieldSegment, TxField};
pub use standard::{
    classify_script_pubkey, multisig_script, p2sh_script_for, p2wsh_script_for, parse_multisig,
    ScriptError, ScriptType,
};
pub use witness::{classify_witness_item, WitnessItemKind};
