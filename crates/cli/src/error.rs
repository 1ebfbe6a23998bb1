use std::fmt;
use std::io;

use satsigner_keys::{DescriptorError, DeriveError};
use satsigner_primitives::{AddressError, TransactionDecodeError};
use satsigner_wallet::FetchError;

#[derive(Debug)]
pub enum CliError {
    Usage(String),
    Config(String),
    Io(io::Error),
    Json(serde_json::Error),
    Transaction(TransactionDecodeError),
    Address(AddressError),
    Descriptor(DescriptorError),
    Derive(DeriveError),
    Fetch(FetchError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Usage(message) => f.write_str(message),
            CliError::Config(message) => write!(f, "config error: {message}"),
            CliError::Io(err) => write!(f, "io error: {err}"),
            CliError::Json(err) => write!(f, "json error: {err}"),
            CliError::Transaction(err) => write!(f, "{err}"),
            CliError::Address(err) => write!(f, "{err}"),
            CliError::Descriptor(err) => write!(f, "{err}"),
            CliError::Derive(err) => write!(f, "{err}"),
            CliError::Fetch(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Io(err) => Some(err),
            CliError::Json(err) => Some(err),
            CliError::Transaction(err) => Some(err),
            CliError::Address(err) => Some(err),
            CliError::Descriptor(err) => Some(err),
            CliError::Derive(err) => Some(err),
            CliError::Fetch(err) => Some(err),
            CliError::Usage(_) | CliError::Config(_) => None,
        }
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::Io(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Json(err)
    }
}

impl From<TransactionDecodeError> for CliError {
    fn from(err: TransactionDecodeError) -> Self {
        CliError::Transaction(err)
    }
}

impl From<AddressError> for CliError {
    fn from(err: AddressError) -> Self {
        CliError::Address(err)
    }
}

impl From<DescriptorError> for CliError {
    fn from(err: DescriptorError) -> Self {
        CliError::Descriptor(err)
    }
}

impl From<DeriveError> for CliError {
    fn from(err: DeriveError) -> Self {
        CliError::Derive(err)
    }
}

impl From<FetchError> for CliError {
    fn from(err: FetchError) -> Self {
        CliError::Fetch(err)
    }
}
