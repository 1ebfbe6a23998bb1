//! BIP-32 derivation paths.

use std::fmt;
use std::str::FromStr;

pub const HARDENED_BIT: u32 = 0x8000_0000;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ChildNumber {
    Normal(u32),
    Hardened(u32),
}

impl ChildNumber {
    pub fn from_index(raw: u32) -> Self {
        if raw & HARDENED_BIT != 0 {
            ChildNumber::Hardened(raw & !HARDENED_BIT)
        } else {
            ChildNumber::Normal(raw)
        }
    }

    pub fn normal(index: u32) -> Result<Self, PathError> {
        if index & HARDENED_BIT != 0 {
            return Err(PathError::IndexOutOfRange(index.to_string()));
        }
        Ok(ChildNumber::Normal(index))
    }

    pub fn hardened(index: u32) -> Result<Self, PathError> {
        if index & HARDENED_BIT != 0 {
            return Err(PathError::IndexOutOfRange(index.to_string()));
        }
        Ok(ChildNumber::Hardened(index))
    }

    /// Raw 32-bit index as serialized in extended keys.
    pub fn to_u32(self) -> u32 {
        match self {
            ChildNumber::Normal(index) => index,
            ChildNumber::Hardened(index) => index | HARDENED_BIT,
        }
    }

    pub fn is_hardened(self) -> bool {
        matches!(self, ChildNumber::Hardened(_))
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildNumber::Normal(index) => write!(f, "{index}"),
            ChildNumber::Hardened(index) => write!(f, "{index}'"),
        }
    }
}

impl FromStr for ChildNumber {
    type Err = PathError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (digits, hardened) = match raw.strip_suffix(['\'', 'h', 'H']) {
            Some(rest) => (rest, true),
            None => (raw, false),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PathError::InvalidStep(raw.to_string()));
        }
        let index: u32 = digits
            .parse()
            .map_err(|_| PathError::IndexOutOfRange(raw.to_string()))?;
        if hardened {
            ChildNumber::hardened(index)
        } else {
            ChildNumber::normal(index)
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathError {
    Empty,
    InvalidStep(String),
    IndexOutOfRange(String),
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Empty => write!(f, "empty derivation path"),
            PathError::InvalidStep(step) => write!(f, "invalid derivation step '{step}'"),
            PathError::IndexOutOfRange(step) => {
                write!(f, "derivation index out of range '{step}'")
            }
        }
    }
}

impl std::error::Error for PathError {}

/// Sequence of child numbers, optionally written with a leading `m/`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct DerivationPath(Vec<ChildNumber>);

impl DerivationPath {
    pub fn master() -> Self {
        Self(Vec::new())
    }

    pub fn is_master(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[ChildNumber] {
        &self.0
    }

    pub fn child(&self, step: ChildNumber) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }

    pub fn extend(&self, other: &DerivationPath) -> Self {
        let mut steps = self.0.clone();
        steps.extend_from_slice(&other.0);
        Self(steps)
    }

    /// `m/`-prefixed rendering; `m` alone for the master path.
    pub fn to_m_string(&self) -> String {
        if self.0.is_empty() {
            return "m".to_string();
        }
        format!("m/{self}")
    }

    /// Parses the body of a path with no `m` prefix, as used inside key origins.
    pub fn parse_steps(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Ok(Self::master());
        }
        raw.split('/')
            .map(ChildNumber::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl From<Vec<ChildNumber>> for DerivationPath {
    fn from(steps: Vec<ChildNumber>) -> Self {
        Self(steps)
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pos, step) in self.0.iter().enumerate() {
            if pos > 0 {
                f.write_str("/")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = PathError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        match raw {
            "m" | "M" => return Ok(Self::master()),
            _ => {}
        }
        let body = raw
            .strip_prefix("m/")
            .or_else(|| raw.strip_prefix("M/"))
            .unwrap_or(raw);
        if body.is_empty() {
            return Err(PathError::InvalidStep(raw.to_string()));
        }
        Self::parse_steps(body)
    }
}
