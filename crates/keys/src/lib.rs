//! Key material: extended keys, derivation paths, descriptors and the
//! validators and resolver built on them.

pub mod checksum;
pub mod descriptor;
pub mod fingerprint;
pub mod path;
pub mod policy;
pub mod resolver;
mod secp;
pub mod validation;
pub mod xkey;

pub use checksum::{add_checksum, descriptor_checksum};
pub use descriptor::{
    taproot_output_key, verify_checksum, Descriptor, DescriptorError, Expr, KeyExpression,
    KeyMaterial, KeyOrigin, ScriptKind, Wildcard,
};
pub use fingerprint::Fingerprint;
pub use path::{ChildNumber, DerivationPath, PathError};
pub use policy::{Keychain, ScriptVersion};
pub use resolver::{
    compose_multisig, compose_sorted_multisig, derive_from_seed, descriptor_from_extended_public_key,
    extended_public_key_from_mnemonic, extract_extended_key, extract_fingerprint_and_path,
    mnemonic_fingerprint, resolve_account, validate_mnemonic, AccountIdentity, AccountPolicy,
    DeriveError, KeySource,
};
pub use validation::{
    validate_address, validate_derivation_path, validate_descriptor, validate_extended_key,
    validate_fingerprint,
};
pub use xkey::{ExtendedKey, ExtendedKeyError, ExtendedKeyKind};
