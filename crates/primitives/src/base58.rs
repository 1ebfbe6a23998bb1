//! Base58 and Base58Check as used by legacy addresses, WIF and extended keys.

use std::fmt;

use crate::hash::sha256d;

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base58Error {
    Empty,
    InvalidCharacter(char),
    TooShort,
    InvalidChecksum,
}

impl fmt::Display for Base58Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Base58Error::Empty => write!(f, "empty base58 string"),
            Base58Error::InvalidCharacter(ch) => write!(f, "invalid base58 character '{ch}'"),
            Base58Error::TooShort => write!(f, "base58check payload too short"),
            Base58Error::InvalidChecksum => write!(f, "base58check checksum mismatch"),
        }
    }
}

impl std::error::Error for Base58Error {}

pub fn decode(input: &str) -> Result<Vec<u8>, Base58Error> {
    if input.is_empty() {
        return Err(Base58Error::Empty);
    }
    let mut bytes: Vec<u8> = Vec::with_capacity(input.len());
    for ch in input.chars() {
        let mut carry = value_of(ch).ok_or(Base58Error::InvalidCharacter(ch))? as u32;
        for byte in bytes.iter_mut().rev() {
            let value = (*byte as u32) * 58 + carry;
            *byte = (value & 0xff) as u8;
            carry = value >> 8;
        }
        while carry > 0 {
            bytes.insert(0, (carry & 0xff) as u8);
            carry >>= 8;
        }
    }

    let leading_zeros = input.bytes().take_while(|b| *b == b'1').count();
    let mut out = vec![0u8; leading_zeros];
    out.extend_from_slice(&bytes);
    Ok(out)
}

pub fn encode(data: &[u8]) -> String {
    let leading_zeros = data.iter().take_while(|b| **b == 0).count();
    let mut digits: Vec<u8> = Vec::with_capacity(data.len() * 138 / 100 + 1);
    for byte in &data[leading_zeros..] {
        let mut carry = *byte as u32;
        for digit in digits.iter_mut().rev() {
            let value = (*digit as u32) * 256 + carry;
            *digit = (value % 58) as u8;
            carry = value / 58;
        }
        while carry > 0 {
            digits.insert(0, (carry % 58) as u8);
            carry /= 58;
        }
    }
    let mut out = String::with_capacity(leading_zeros + digits.len());
    for _ in 0..leading_zeros {
        out.push('1');
    }
    for digit in digits {
        out.push(ALPHABET[digit as usize] as char);
    }
    out
}

/// Decodes and strips the trailing 4-byte double-SHA256 checksum.
pub fn check_decode(input: &str) -> Result<Vec<u8>, Base58Error> {
    let bytes = decode(input)?;
    if bytes.len() < 4 {
        return Err(Base58Error::TooShort);
    }
    let (payload, checksum) = bytes.split_at(bytes.len() - 4);
    if checksum != &sha256d(payload)[..4] {
        return Err(Base58Error::InvalidChecksum);
    }
    Ok(payload.to_vec())
}

pub fn check_encode(payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + 4);
    data.extend_from_slice(payload);
    data.extend_from_slice(&sha256d(payload)[..4]);
    encode(&data)
}

fn value_of(ch: char) -> Option<u8> {
    if !ch.is_ascii() {
        return None;
    }
    ALPHABET
        .iter()
        .position(|value| *value == ch as u8)
        .map(|pos| pos as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_leading_zeros() {
        assert_eq!(encode(&[]), "");
        assert_eq!(encode(&[0, 0]), "11");
        assert_eq!(encode(&[0, 0, 0x28, 0x7f, 0xb4, 0xcd]), "11233QC4");
        assert_eq!(decode("11233QC4").expect("decode"), vec![0, 0, 0x28, 0x7f, 0xb4, 0xcd]);
    }

    #[test]
    fn check_round_trip_and_corruption() {
        let payload = [0x00u8, 0x01, 0x02, 0x03];
        let encoded = check_encode(&payload);
        assert_eq!(check_decode(&encoded).expect("decode"), payload.to_vec());

        let mut corrupted: Vec<char> = encoded.chars().collect();
        let last = corrupted.len() - 1;
        corrupted[last] = if corrupted[last] == 'z' { 'y' } else { 'z' };
        let corrupted: String = corrupted.into_iter().collect();
        assert_eq!(check_decode(&corrupted), Err(Base58Error::InvalidChecksum));
    }

    #[test]
    fn rejects_bad_characters() {
        assert_eq!(decode("0abc"), Err(Base58Error::InvalidCharacter('0')));
        assert_eq!(decode("abcl"), Err(Base58Error::InvalidCharacter('l')));
        assert_eq!(decode(""), Err(Base58Error::Empty));
    }
}
