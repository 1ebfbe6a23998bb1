use std::fmt;
use std::str::FromStr;

/// First four bytes of HASH160 of a public key.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Fingerprint(pub [u8; 4]);

impl Fingerprint {
    pub fn from_public_key(serialized: &[u8]) -> Self {
        let digest = satsigner_primitives::hash160(serialized);
        let mut out = [0u8; 4];
        out.copy_from_slice(&digest[..4]);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseFingerprintError(pub String);

impl fmt::Display for ParseFingerprintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid fingerprint '{}'", self.0)
    }
}

impl std::error::Error for ParseFingerprintError {}

impl FromStr for Fingerprint {
    type Err = ParseFingerprintError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.len() != 8 {
            return Err(ParseFingerprintError(raw.to_string()));
        }
        let mut out = [0u8; 4];
        hex::decode_to_slice(raw, &mut out).map_err(|_| ParseFingerprintError(raw.to_string()))?;
        Ok(Self(out))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
