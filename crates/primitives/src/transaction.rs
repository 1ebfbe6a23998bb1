//! Bitcoin transactions in legacy and segwit (BIP144) serialization.

use std::fmt;

use satsigner_consensus::constants::{
    SEGWIT_FLAG, SEGWIT_MARKER, SEQUENCE_FINAL, WITNESS_SCALE_FACTOR,
};
use satsigner_consensus::{hash256_to_hex, money_range, Amount, Hash256};

use crate::encoding::{Decodable, DecodeError, Decoder, Encodable, Encoder};
use crate::hash::sha256d;
use crate::outpoint::OutPoint;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
    /// Witness stack; empty for legacy inputs.
    pub witness: Vec<Vec<u8>>,
}

impl Encodable for TxIn {
    fn consensus_encode(&self, encoder: &mut Encoder) {
        self.prevout.consensus_encode(encoder);
        encoder.write_var_bytes(&self.script_sig);
        encoder.write_u32_le(self.sequence);
    }
}

impl Decodable for TxIn {
    fn consensus_decode(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        let prevout = OutPoint::consensus_decode(decoder)?;
        let script_sig = decoder.read_var_bytes()?;
        let sequence = decoder.read_u32_le()?;
        Ok(Self {
            prevout,
            script_sig,
            sequence,
            witness: Vec::new(),
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxOut {
    pub value: Amount,
    pub script_pubkey: Vec<u8>,
}

impl Encodable for TxOut {
    fn consensus_encode(&self, encoder: &mut Encoder) {
        encoder.write_u64_le(self.value);
        encoder.write_var_bytes(&self.script_pubkey);
    }
}

impl Decodable for TxOut {
    fn consensus_decode(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        let value = decoder.read_u64_le()?;
        if !money_range(value) {
            return Err(DecodeError::InvalidData("output value out of range"));
        }
        let script_pubkey = decoder.read_var_bytes()?;
        Ok(Self {
            value,
            script_pubkey,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    /// Full serialization; uses the segwit framing when any input carries witness data.
    pub fn consensus_encode(&self) -> Vec<u8> {
        self.encode_with_witness(self.is_segwit())
    }

    /// Legacy serialization that commits to the txid.
    pub fn encode_without_witness(&self) -> Vec<u8> {
        self.encode_with_witness(false)
    }

    fn encode_with_witness(&self, witness: bool) -> Vec<u8> {
        let mut encoder = Encoder::with_capacity(self.estimated_size());
        encoder.write_i32_le(self.version);
        if witness {
            encoder.write_u8(SEGWIT_MARKER);
            encoder.write_u8(SEGWIT_FLAG);
        }
        write_vec(&mut encoder, &self.inputs);
        write_vec(&mut encoder, &self.outputs);
        if witness {
            for input in &self.inputs {
                encoder.write_varint(input.witness.len() as u64);
                for item in &input.witness {
                    encoder.write_var_bytes(item);
                }
            }
        }
        encoder.write_u32_le(self.lock_time);
        encoder.into_inner()
    }

    fn estimated_size(&self) -> usize {
        let inputs: usize = self
            .inputs
            .iter()
            .map(|input| 41 + input.script_sig.len())
            .sum();
        let outputs: usize = self
            .outputs
            .iter()
            .map(|output| 9 + output.script_pubkey.len())
            .sum();
        10 + inputs + outputs
    }

    pub fn txid(&self) -> Hash256 {
        sha256d(&self.encode_without_witness())
    }

    pub fn wtxid(&self) -> Hash256 {
        sha256d(&self.consensus_encode())
    }

    pub fn txid_hex(&self) -> String {
        hash256_to_hex(&self.txid())
    }

    pub fn wtxid_hex(&self) -> String {
        hash256_to_hex(&self.wtxid())
    }

    pub fn is_segwit(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].prevout.is_null()
    }

    /// Total serialized size in bytes, witness included.
    pub fn size(&self) -> usize {
        self.consensus_encode().len()
    }

    /// Serialized size with marker, flag and witness stacks stripped.
    pub fn base_size(&self) -> usize {
        self.encode_without_witness().len()
    }

    /// BIP141 weight: `3 * base_size + size`.
    pub fn weight(&self) -> usize {
        self.base_size() * (WITNESS_SCALE_FACTOR - 1) + self.size()
    }

    pub fn vsize(&self) -> usize {
        self.weight().div_ceil(WITNESS_SCALE_FACTOR)
    }

    /// Lock time is only enforced when it is non-zero and some input has not opted out
    /// with a final sequence number.
    pub fn lock_time_enabled(&self) -> bool {
        self.lock_time > 0
            && self
                .inputs
                .iter()
                .any(|input| input.sequence < SEQUENCE_FINAL)
    }

    /// Sum of output values, `None` on overflow.
    pub fn total_output_value(&self) -> Option<Amount> {
        self.outputs
            .iter()
            .try_fold(0u64, |total, output| total.checked_add(output.value))
    }

    pub fn consensus_decode(bytes: &[u8]) -> Result<Self, TransactionDecodeError> {
        let mut decoder = Decoder::new(bytes);
        let mut last_parsed = None;
        let result = decode_from(&mut decoder, &mut last_parsed).and_then(|tx| {
            if decoder.is_empty() {
                Ok(tx)
            } else {
                Err(DecodeError::TrailingBytes)
            }
        });
        result.map_err(|error| TransactionDecodeError {
            last_parsed,
            offset: decoder.position(),
            error,
        })
    }

    pub fn from_hex(raw: &str) -> Result<Self, TransactionDecodeError> {
        let bytes = hex::decode(raw.trim()).map_err(|_| TransactionDecodeError {
            last_parsed: None,
            offset: 0,
            error: DecodeError::InvalidData("invalid transaction hex"),
        })?;
        Self::consensus_decode(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.consensus_encode())
    }
}

fn decode_from(
    decoder: &mut Decoder,
    last_parsed: &mut Option<TxComponent>,
) -> Result<Transaction, DecodeError> {
    let version = decoder.read_i32_le()?;
    *last_parsed = Some(TxComponent::Version);

    let segwit = decoder.peek_u8()? == SEGWIT_MARKER;
    if segwit {
        decoder.read_u8()?;
        if decoder.read_u8()? != SEGWIT_FLAG {
            return Err(DecodeError::InvalidData("unsupported segwit flag"));
        }
        *last_parsed = Some(TxComponent::SegwitFlag);
    }

    let input_count = decoder.read_varint()?;
    *last_parsed = Some(TxComponent::InputCount);
    if segwit && input_count == 0 {
        return Err(DecodeError::InvalidData("segwit transaction without inputs"));
    }
    let mut inputs = Vec::new();
    for index in 0..input_count as usize {
        inputs.push(TxIn::consensus_decode(decoder)?);
        *last_parsed = Some(TxComponent::Input(index));
    }

    let output_count = decoder.read_varint()?;
    *last_parsed = Some(TxComponent::OutputCount);
    let mut outputs = Vec::new();
    for index in 0..output_count as usize {
        outputs.push(TxOut::consensus_decode(decoder)?);
        *last_parsed = Some(TxComponent::Output(index));
    }

    if segwit {
        for (index, input) in inputs.iter_mut().enumerate() {
            let items = decoder.read_varint()?;
            let mut stack = Vec::new();
            for _ in 0..items {
                stack.push(decoder.read_var_bytes()?);
            }
            input.witness = stack;
            *last_parsed = Some(TxComponent::Witness(index));
        }
        if inputs.iter().all(|input| input.witness.is_empty()) {
            return Err(DecodeError::InvalidData("superfluous witness record"));
        }
    }

    let lock_time = decoder.read_u32_le()?;
    *last_parsed = Some(TxComponent::LockTime);

    Ok(Transaction {
        version,
        inputs,
        outputs,
        lock_time,
    })
}

fn write_vec<T: Encodable>(encoder: &mut Encoder, values: &[T]) {
    encoder.write_varint(values.len() as u64);
    for value in values {
        value.consensus_encode(encoder);
    }
}

/// Wire component of a transaction, used to report how far a decode got.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TxComponent {
    Version,
    SegwitFlag,
    InputCount,
    Input(usize),
    OutputCount,
    Output(usize),
    Witness(usize),
    LockTime,
}

impl fmt::Display for TxComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxComponent::Version => write!(f, "version"),
            TxComponent::SegwitFlag => write!(f, "segwit marker and flag"),
            TxComponent::InputCount => write!(f, "input count"),
            TxComponent::Input(index) => write!(f, "input {index}"),
            TxComponent::OutputCount => write!(f, "output count"),
            TxComponent::Output(index) => write!(f, "output {index}"),
            TxComponent::Witness(index) => write!(f, "witness {index}"),
            TxComponent::LockTime => write!(f, "lock time"),
        }
    }
}

/// Corrupt transaction bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDecodeError {
    /// Last component that decoded successfully, `None` if the version itself failed.
    pub last_parsed: Option<TxComponent>,
    /// Byte offset at which decoding stopped.
    pub offset: usize,
    pub error: DecodeError,
}

impl fmt::Display for TransactionDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last_parsed {
            Some(component) => write!(
                f,
                "corrupt transaction at byte {} after {component}: {}",
                self.offset, self.error
            ),
            None => write!(
                f,
                "corrupt transaction at byte {}: {}",
                self.offset, self.error
            ),
        }
    }
}

impl std::error::Error for TransactionDecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
