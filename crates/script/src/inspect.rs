//! Field-tagged byte map of a serialized transaction.
//!
//! Every byte of the input belongs to exactly one [`FieldSegment`]; segments are emitted in
//! wire order and are contiguous.

use std::collections::BTreeMap;
use std::ops::Range;

use satsigner_consensus::constants::{LOCKTIME_THRESHOLD, SEGWIT_FLAG, SEGWIT_MARKER, SEQUENCE_FINAL};
use satsigner_primitives::encoding::varint_len;
use satsigner_primitives::{Transaction, TransactionDecodeError};
use serde::Serialize;

use crate::standard::classify_script_pubkey;
use crate::witness::{classify_witness_item, WitnessItemKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum TxField {
    Version,
    Marker,
    Flag,
    TxInVarInt,
    TxInHash,
    TxInIndex,
    TxInScriptVarInt,
    TxInScript,
    TxInSequence,
    TxOutVarInt,
    TxOutValue,
    TxOutScriptVarInt,
    TxOutScriptStandard,
    TxOutScriptNonStandard,
    WitnessVarInt,
    WitnessItemsVarInt,
    WitnessItemEmpty,
    WitnessItemPubkey,
    WitnessItemSignature,
    WitnessItemScript,
    Locktime,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FieldSegment {
    pub range: Range<usize>,
    pub field: TxField,
    /// Raw bytes of the segment.
    pub hex: String,
    /// Decoded value in display form.
    pub value: String,
    pub placeholders: BTreeMap<String, String>,
}

pub fn inspect_hex(raw: &str) -> Result<Vec<FieldSegment>, TransactionDecodeError> {
    let tx = Transaction::from_hex(raw)?;
    Ok(annotate(&tx, &tx.consensus_encode()))
}

/// Decodes `bytes` and annotates each wire field.
pub fn inspect_transaction(bytes: &[u8]) -> Result<Vec<FieldSegment>, TransactionDecodeError> {
    let tx = Transaction::consensus_decode(bytes)?;
    Ok(annotate(&tx, bytes))
}

// Decoding succeeded, so re-encoding reproduces `bytes` and field lengths can be computed
// from the decoded structure.
fn annotate(tx: &Transaction, bytes: &[u8]) -> Vec<FieldSegment> {
    let mut map = SegmentMap::new(bytes);

    map.push(4, TxField::Version, tx.version.to_string(), &[]);
    if tx.is_segwit() {
        map.push(1, TxField::Marker, SEGWIT_MARKER.to_string(), &[]);
        map.push(1, TxField::Flag, SEGWIT_FLAG.to_string(), &[]);
    }

    let input_count = tx.inputs.len() as u64;
    map.push(
        varint_len(input_count),
        TxField::TxInVarInt,
        input_count.to_string(),
        &[],
    );
    for (index, input) in tx.inputs.iter().enumerate() {
        let input_tag = index.to_string();
        map.push(
            32,
            TxField::TxInHash,
            input.prevout.txid_hex(),
            &[("input", input_tag.clone())],
        );
        map.push(
            4,
            TxField::TxInIndex,
            input.prevout.index.to_string(),
            &[("input", input_tag.clone())],
        );
        let script_len = input.script_sig.len() as u64;
        map.push(
            varint_len(script_len),
            TxField::TxInScriptVarInt,
            script_len.to_string(),
            &[("input", input_tag.clone())],
        );
        if !input.script_sig.is_empty() {
            map.push(
                input.script_sig.len(),
                TxField::TxInScript,
                hex::encode(&input.script_sig),
                &[("input", input_tag.clone())],
            );
        }
        map.push(
            4,
            TxField::TxInSequence,
            format!("{:#010x}", input.sequence),
            &[
                ("input", input_tag),
                ("final", (input.sequence == SEQUENCE_FINAL).to_string()),
            ],
        );
    }

    let output_count = tx.outputs.len() as u64;
    map.push(
        varint_len(output_count),
        TxField::TxOutVarInt,
        output_count.to_string(),
        &[],
    );
    for (index, output) in tx.outputs.iter().enumerate() {
        let output_tag = index.to_string();
        map.push(
            8,
            TxField::TxOutValue,
            output.value.to_string(),
            &[("output", output_tag.clone())],
        );
        let script_len = output.script_pubkey.len() as u64;
        map.push(
            varint_len(script_len),
            TxField::TxOutScriptVarInt,
            script_len.to_string(),
            &[("output", output_tag.clone())],
        );
        if !output.script_pubkey.is_empty() {
            let script_type = classify_script_pubkey(&output.script_pubkey);
            let field = if script_type.is_standard() {
                TxField::TxOutScriptStandard
            } else {
                TxField::TxOutScriptNonStandard
            };
            map.push(
                output.script_pubkey.len(),
                field,
                hex::encode(&output.script_pubkey),
                &[("output", output_tag), ("type", script_type.to_string())],
            );
        }
    }

    if tx.is_segwit() {
        for (index, input) in tx.inputs.iter().enumerate() {
            let input_tag = index.to_string();
            let items = input.witness.len() as u64;
            map.push(
                varint_len(items),
                TxField::WitnessVarInt,
                items.to_string(),
                &[("input", input_tag.clone())],
            );
            for (item_index, item) in input.witness.iter().enumerate() {
                let tags = [("input", input_tag.clone()), ("item", item_index.to_string())];
                let item_len = item.len() as u64;
                let field = match classify_witness_item(item) {
                    WitnessItemKind::Empty => {
                        map.push(1, TxField::WitnessItemEmpty, String::new(), &tags);
                        continue;
                    }
                    WitnessItemKind::PublicKey => TxField::WitnessItemPubkey,
                    WitnessItemKind::Signature => TxField::WitnessItemSignature,
                    WitnessItemKind::Script => TxField::WitnessItemScript,
                };
                map.push(
                    varint_len(item_len),
                    TxField::WitnessItemsVarInt,
                    item_len.to_string(),
                    &tags,
                );
                map.push(item.len(), field, hex::encode(item), &tags);
            }
        }
    }

    let lock_kind = if tx.lock_time < LOCKTIME_THRESHOLD {
        "height"
    } else {
        "timestamp"
    };
    map.push(
        4,
        TxField::Locktime,
        tx.lock_time.to_string(),
        &[
            ("enabled", tx.lock_time_enabled().to_string()),
            ("kind", lock_kind.to_string()),
        ],
    );

    map.into_segments()
}

struct SegmentMap<'a> {
    bytes: &'a [u8],
    offset: usize,
    segments: Vec<FieldSegment>,
}

impl<'a> SegmentMap<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            segments: Vec::new(),
        }
    }

    fn push(&mut self, len: usize, field: TxField, value: String, tags: &[(&str, String)]) {
        let range = self.offset..self.offset + len;
        self.offset = range.end;
        let placeholders = tags
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect();
        self.segments.push(FieldSegment {
            hex: hex::encode(&self.bytes[range.clone()]),
            range,
            field,
            value,
            placeholders,
        });
    }

    fn into_segments(self) -> Vec<FieldSegment> {
        debug_assert_eq!(self.offset, self.bytes.len());
        self.segments
    }
}
