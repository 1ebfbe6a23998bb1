//! Output script descriptors (BIP-380 family).
//!
//! Parsing is structural: a trailing `#checksum` is noted but not
//! verified. [`Descriptor::parse_with_network`] and [`verify_checksum`]
//! add the checksum and network checks when the caller wants them.

use std::fmt;
use std::str::FromStr;

use satsigner_consensus::Network;
use satsigner_primitives::address::{
    address_to_script_pubkey, p2pkh_script, p2tr_script, p2wpkh_script, script_pubkey_to_address,
    wif_to_secret_key, secret_key_to_wif, AddressError,
};
use satsigner_primitives::{hash160, sha256};
use satsigner_script::standard::{multisig_script, p2sh_script_for, p2wsh_script_for, push_data};
use satsigner_script::ScriptError;
use secp256k1::{PublicKey, Scalar, SecretKey, XOnlyPublicKey};

use crate::checksum::{descriptor_checksum, split_checksum, CHECKSUM_LEN};
use crate::fingerprint::Fingerprint;
use crate::path::{ChildNumber, DerivationPath, HARDENED_BIT};
use crate::secp::secp256k1;
use crate::xkey::{ExtendedKey, ExtendedKeyError, ExtendedKeyKind, EXTENDED_KEY_STR_LEN};

const OP_CHECKSIG: u8 = 0xac;
const MAX_BARE_MULTISIG_KEYS: usize = 3;
const MAX_P2SH_MULTISIG_KEYS: usize = 15;

#[derive(Debug)]
pub enum DescriptorError {
    InvalidDescriptor(String),
    ChecksumMismatch { expected: String, found: String },
    NetworkMismatch(Network),
    NoAddress(ScriptKind),
    Derivation(ExtendedKeyError),
    Script(ScriptError),
    Address(AddressError),
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorError::InvalidDescriptor(reason) => write!(f, "invalid descriptor: {reason}"),
            DescriptorError::ChecksumMismatch { expected, found } => {
                write!(f, "descriptor checksum mismatch: expected {expected}, found {found}")
            }
            DescriptorError::NetworkMismatch(network) => {
                write!(f, "descriptor key material is not valid on {network}")
            }
            DescriptorError::NoAddress(kind) => write!(f, "{kind} descriptor has no address form"),
            DescriptorError::Derivation(err) => write!(f, "descriptor key derivation: {err}"),
            DescriptorError::Script(err) => write!(f, "descriptor script: {err}"),
            DescriptorError::Address(err) => write!(f, "descriptor address: {err}"),
        }
    }
}

impl std::error::Error for DescriptorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DescriptorError::Derivation(err) => Some(err),
            DescriptorError::Script(err) => Some(err),
            DescriptorError::Address(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ExtendedKeyError> for DescriptorError {
    fn from(err: ExtendedKeyError) -> Self {
        DescriptorError::Derivation(err)
    }
}

impl From<ScriptError> for DescriptorError {
    fn from(err: ScriptError) -> Self {
        DescriptorError::Script(err)
    }
}

impl From<AddressError> for DescriptorError {
    fn from(err: AddressError) -> Self {
        DescriptorError::Address(err)
    }
}

fn invalid(reason: impl Into<String>) -> DescriptorError {
    DescriptorError::InvalidDescriptor(reason.into())
}

/// Output type a descriptor produces.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ScriptKind {
    P2pk,
    P2pkh,
    P2wpkh,
    P2sh,
    P2wsh,
    P2tr,
    Addr,
    Raw,
    Multisig,
    Combo,
}

impl ScriptKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScriptKind::P2pk => "P2PK",
            ScriptKind::P2pkh => "P2PKH",
            ScriptKind::P2wpkh => "P2WPKH",
            ScriptKind::P2sh => "P2SH",
            ScriptKind::P2wsh => "P2WSH",
            ScriptKind::P2tr => "P2TR",
            ScriptKind::Addr => "ADDR",
            ScriptKind::Raw => "RAW",
            ScriptKind::Multisig => "MULTISIG",
            ScriptKind::Combo => "COMBO",
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Wildcard {
    #[default]
    None,
    Unhardened,
    Hardened,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyOrigin {
    pub fingerprint: Fingerprint,
    pub path: DerivationPath,
}

impl fmt::Display for KeyOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.fingerprint)?;
        if !self.path.is_empty() {
            write!(f, "/{}", self.path)?;
        }
        f.write_str("]")
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeyMaterial {
    Extended(ExtendedKey),
    PublicKey { key: PublicKey, compressed: bool },
    XOnly(XOnlyPublicKey),
    Wif {
        secret: SecretKey,
        compressed: bool,
        network: Network,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyExpression {
    pub origin: Option<KeyOrigin>,
    pub material: KeyMaterial,
    pub steps: DerivationPath,
    pub wildcard: Wildcard,
}

/// Public key produced by a key expression at a given index.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DerivedKey {
    Full { key: PublicKey, compressed: bool },
    XOnly(XOnlyPublicKey),
}

impl DerivedKey {
    pub fn to_bytes(self) -> Vec<u8> {
        match self {
            DerivedKey::Full {
                key,
                compressed: true,
            } => key.serialize().to_vec(),
            DerivedKey::Full {
                key,
                compressed: false,
            } => key.serialize_uncompressed().to_vec(),
            DerivedKey::XOnly(key) => key.serialize().to_vec(),
        }
    }

    pub fn is_compressed(self) -> bool {
        !matches!(
            self,
            DerivedKey::Full {
                compressed: false,
                ..
            }
        )
    }

    pub fn x_only(self) -> XOnlyPublicKey {
        match self {
            DerivedKey::Full { key, .. } => key.x_only_public_key().0,
            DerivedKey::XOnly(key) => key,
        }
    }
}

impl KeyExpression {
    pub fn extended_key(&self) -> Option<&ExtendedKey> {
        match &self.material {
            KeyMaterial::Extended(key) => Some(key),
            _ => None,
        }
    }

    pub fn has_wildcard(&self) -> bool {
        self.wildcard != Wildcard::None
    }

    pub fn is_uncompressed(&self) -> bool {
        matches!(
            self.material,
            KeyMaterial::PublicKey {
                compressed: false,
                ..
            } | KeyMaterial::Wif {
                compressed: false,
                ..
            }
        )
    }

    fn is_x_only(&self) -> bool {
        matches!(self.material, KeyMaterial::XOnly(_))
    }

    fn network_ok(&self, network: Network) -> bool {
        match &self.material {
            KeyMaterial::Extended(key) => key.network_matches(network),
            KeyMaterial::Wif {
                network: key_network,
                ..
            } => key_network.is_mainnet() == network.is_mainnet(),
            KeyMaterial::PublicKey { .. } | KeyMaterial::XOnly(_) => true,
        }
    }

    /// Key at `index`; the index only matters for wildcard expressions.
    pub fn derive_public_key(&self, index: u32) -> Result<DerivedKey, DescriptorError> {
        match &self.material {
            KeyMaterial::Extended(xkey) => {
                let mut derived = xkey.derive_path(&self.steps)?;
                if self.has_wildcard() {
                    if index & HARDENED_BIT != 0 {
                        return Err(invalid(format!("child index {index} out of range")));
                    }
                    let child = match self.wildcard {
                        Wildcard::Hardened => ChildNumber::Hardened(index),
                        _ => ChildNumber::Normal(index),
                    };
                    derived = derived.derive_child(child)?;
                }
                Ok(DerivedKey::Full {
                    key: derived.public_key(),
                    compressed: true,
                })
            }
            KeyMaterial::PublicKey { key, compressed } => Ok(DerivedKey::Full {
                key: *key,
                compressed: *compressed,
            }),
            KeyMaterial::XOnly(key) => Ok(DerivedKey::XOnly(*key)),
            KeyMaterial::Wif {
                secret, compressed, ..
            } => Ok(DerivedKey::Full {
                key: PublicKey::from_secret_key(secp256k1(), secret),
                compressed: *compressed,
            }),
        }
    }
}

impl fmt::Display for KeyExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(origin) = &self.origin {
            write!(f, "{origin}")?;
        }
        match &self.material {
            KeyMaterial::Extended(key) => write!(f, "{key}")?,
            KeyMaterial::PublicKey {
                key,
                compressed: true,
            } => f.write_str(&hex::encode(key.serialize()))?,
            KeyMaterial::PublicKey {
                key,
                compressed: false,
            } => f.write_str(&hex::encode(key.serialize_uncompressed()))?,
            KeyMaterial::XOnly(key) => f.write_str(&hex::encode(key.serialize()))?,
            KeyMaterial::Wif {
                secret,
                compressed,
                network,
            } => f.write_str(&secret_key_to_wif(&secret.secret_bytes(), *network, *compressed))?,
        }
        if !self.steps.is_empty() {
            write!(f, "/{}", self.steps)?;
        }
        match self.wildcard {
            Wildcard::None => Ok(()),
            Wildcard::Unhardened => f.write_str("/*"),
            Wildcard::Hardened => f.write_str("/*'"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Expr {
    Sh(Box<Expr>),
    Wsh(Box<Expr>),
    Pk(KeyExpression),
    Pkh(KeyExpression),
    Wpkh(KeyExpression),
    Combo(KeyExpression),
    Tr(KeyExpression),
    RawTr(KeyExpression),
    Multi {
        sorted: bool,
        threshold: usize,
        keys: Vec<KeyExpression>,
    },
    Addr(String),
    Raw(Vec<u8>),
}

impl Expr {
    fn keys(&self) -> Vec<&KeyExpression> {
        match self {
            Expr::Sh(inner) | Expr::Wsh(inner) => inner.keys(),
            Expr::Pk(key)
            | Expr::Pkh(key)
            | Expr::Wpkh(key)
            | Expr::Combo(key)
            | Expr::Tr(key)
            | Expr::RawTr(key) => vec![key],
            Expr::Multi { keys, .. } => keys.iter().collect(),
            Expr::Addr(_) | Expr::Raw(_) => Vec::new(),
        }
    }

    fn script(&self, index: u32, network: Network) -> Result<Vec<u8>, DescriptorError> {
        match self {
            Expr::Sh(inner) => Ok(p2sh_script_for(&inner.script(index, network)?)),
            Expr::Wsh(inner) => Ok(p2wsh_script_for(&inner.script(index, network)?)),
            Expr::Pk(key) => {
                let mut script = Vec::with_capacity(67);
                push_data(&mut script, &key.derive_public_key(index)?.to_bytes());
                script.push(OP_CHECKSIG);
                Ok(script)
            }
            Expr::Pkh(key) => Ok(p2pkh_script(&hash160(&key.derive_public_key(index)?.to_bytes()))),
            Expr::Wpkh(key) => Ok(p2wpkh_script(&hash160(&key.derive_public_key(index)?.to_bytes()))),
            Expr::Combo(_) => Err(DescriptorError::NoAddress(ScriptKind::Combo)),
            Expr::Tr(key) => {
                let internal = key.derive_public_key(index)?.x_only();
                Ok(p2tr_script(&taproot_output_key(&internal)?.serialize()))
            }
            Expr::RawTr(key) => Ok(p2tr_script(&key.derive_public_key(index)?.x_only().serialize())),
            Expr::Multi {
                sorted,
                threshold,
                keys,
            } => {
                let mut derived = keys
                    .iter()
                    .map(|key| key.derive_public_key(index).map(DerivedKey::to_bytes))
                    .collect::<Result<Vec<_>, _>>()?;
                if *sorted {
                    derived.sort();
                }
                Ok(multisig_script(*threshold, &derived)?)
            }
            Expr::Addr(address) => Ok(address_to_script_pubkey(address, network)?),
            Expr::Raw(script) => Ok(script.clone()),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Sh(inner) => write!(f, "sh({inner})"),
            Expr::Wsh(inner) => write!(f, "wsh({inner})"),
            Expr::Pk(key) => write!(f, "pk({key})"),
            Expr::Pkh(key) => write!(f, "pkh({key})"),
            Expr::Wpkh(key) => write!(f, "wpkh({key})"),
            Expr::Combo(key) => write!(f, "combo({key})"),
            Expr::Tr(key) => write!(f, "tr({key})"),
            Expr::RawTr(key) => write!(f, "rawtr({key})"),
            Expr::Multi {
                sorted,
                threshold,
                keys,
            } => {
                let name = if *sorted { "sortedmulti" } else { "multi" };
                write!(f, "{name}({threshold}")?;
                for key in keys {
                    write!(f, ",{key}")?;
                }
                f.write_str(")")
            }
            Expr::Addr(address) => write!(f, "addr({address})"),
            Expr::Raw(script) => write!(f, "raw({})", hex::encode(script)),
        }
    }
}

/// BIP-86 key-path-only output key: `P + H_TapTweak(P)·G`.
pub fn taproot_output_key(internal: &XOnlyPublicKey) -> Result<XOnlyPublicKey, DescriptorError> {
    let tag = sha256(b"TapTweak");
    let mut preimage = Vec::with_capacity(96);
    preimage.extend_from_slice(&tag);
    preimage.extend_from_slice(&tag);
    preimage.extend_from_slice(&internal.serialize());
    let tweak = Scalar::from_be_bytes(sha256(&preimage))
        .map_err(|_| DescriptorError::Derivation(ExtendedKeyError::Derivation))?;
    let (output, _parity) = internal
        .add_tweak(secp256k1(), &tweak)
        .map_err(|_| DescriptorError::Derivation(ExtendedKeyError::Derivation))?;
    Ok(output)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Context {
    Top,
    Sh,
    Wsh,
}

impl Context {
    fn is_segwit(self) -> bool {
        matches!(self, Context::Wsh)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Descriptor {
    expr: Expr,
    checksum: Option<String>,
}

impl Descriptor {
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            checksum: None,
        }
    }

    /// Structural parse. A trailing checksum is not verified; its presence
    /// is kept and re-rendered in canonical form.
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        let descriptor = descriptor.trim();
        let (body, checksum) = split_checksum(descriptor);
        if let Some(checksum) = checksum {
            if !is_checksum_shaped(checksum) {
                return Err(invalid(format!("malformed checksum '{checksum}'")));
            }
        }
        let parsed = Self::new(parse_expr(body, Context::Top)?);
        Ok(if checksum.is_some() {
            parsed.with_checksum()
        } else {
            parsed
        })
    }

    /// Structural parse plus checksum verification (when one is present)
    /// and a check that every key and address belongs to `network`.
    pub fn parse_with_network(descriptor: &str, network: Network) -> Result<Self, DescriptorError> {
        let parsed = Self::parse(descriptor)?;
        verify_checksum(descriptor)?;
        parsed.check_network(network)?;
        Ok(parsed)
    }

    pub fn check_network(&self, network: Network) -> Result<(), DescriptorError> {
        if self.expr.keys().iter().any(|key| !key.network_ok(network)) {
            return Err(DescriptorError::NetworkMismatch(network));
        }
        if let Expr::Addr(address) = &self.expr {
            address_to_script_pubkey(address, network)
                .map_err(|_| DescriptorError::NetworkMismatch(network))?;
        }
        Ok(())
    }

    /// Attaches the checksum of the canonical rendering.
    pub fn with_checksum(mut self) -> Self {
        self.checksum = descriptor_checksum(&self.expr.to_string());
        self
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Canonical checksum, present when the descriptor was parsed with a
    /// `#` suffix or built through [`Descriptor::with_checksum`].
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    pub fn to_string_with_checksum(&self) -> String {
        let body = self.expr.to_string();
        match descriptor_checksum(&body) {
            Some(checksum) => format!("{body}#{checksum}"),
            None => body,
        }
    }

    pub fn kind(&self) -> ScriptKind {
        match &self.expr {
            Expr::Sh(_) => ScriptKind::P2sh,
            Expr::Wsh(_) => ScriptKind::P2wsh,
            Expr::Pk(_) => ScriptKind::P2pk,
            Expr::Pkh(_) => ScriptKind::P2pkh,
            Expr::Wpkh(_) => ScriptKind::P2wpkh,
            Expr::Combo(_) => ScriptKind::Combo,
            Expr::Tr(_) | Expr::RawTr(_) => ScriptKind::P2tr,
            Expr::Multi { .. } => ScriptKind::Multisig,
            Expr::Addr(_) => ScriptKind::Addr,
            Expr::Raw(_) => ScriptKind::Raw,
        }
    }

    /// Key expressions in descriptor order.
    pub fn keys(&self) -> Vec<&KeyExpression> {
        self.expr.keys()
    }

    /// Threshold of the (possibly wrapped) multisig expression.
    pub fn threshold(&self) -> Option<usize> {
        let mut expr = &self.expr;
        loop {
            match expr {
                Expr::Sh(inner) | Expr::Wsh(inner) => expr = inner,
                Expr::Multi { threshold, .. } => return Some(*threshold),
                _ => return None,
            }
        }
    }

    pub fn is_multisig(&self) -> bool {
        self.threshold().is_some()
    }

    pub fn has_wildcard(&self) -> bool {
        self.keys().iter().any(|key| key.has_wildcard())
    }

    /// Output script at `index`. `sortedmulti` keys are sorted per index.
    pub fn derive_script(&self, index: u32, network: Network) -> Result<Vec<u8>, DescriptorError> {
        self.expr.script(index, network)
    }

    /// Every script a `combo()` expands to; a single script otherwise.
    pub fn derive_scripts(&self, index: u32, network: Network) -> Result<Vec<Vec<u8>>, DescriptorError> {
        let Expr::Combo(key) = &self.expr else {
            return Ok(vec![self.derive_script(index, network)?]);
        };
        let derived = key.derive_public_key(index)?;
        let bytes = derived.to_bytes();
        let mut scripts = vec![
            Expr::Pk(key.clone()).script(index, network)?,
            p2pkh_script(&hash160(&bytes)),
        ];
        if derived.is_compressed() {
            let wpkh = p2wpkh_script(&hash160(&bytes));
            scripts.push(p2sh_script_for(&wpkh));
            scripts.push(wpkh);
        }
        Ok(scripts)
    }

    pub fn derive_address(&self, index: u32, network: Network) -> Result<String, DescriptorError> {
        if let Expr::Addr(address) = &self.expr {
            address_to_script_pubkey(address, network)?;
            return Ok(address.clone());
        }
        let script = self.derive_script(index, network)?;
        script_pubkey_to_address(&script, network).ok_or(DescriptorError::NoAddress(self.kind()))
    }
}

/// Renders the expression, followed by `#checksum` when the descriptor
/// carries one.
impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(checksum) = &self.checksum {
            write!(f, "#{checksum}")?;
        }
        Ok(())
    }
}

impl FromStr for Descriptor {
    type Err = DescriptorError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

/// Verifies the `#checksum` suffix when present. A missing checksum passes.
pub fn verify_checksum(descriptor: &str) -> Result<(), DescriptorError> {
    let (body, found) = split_checksum(descriptor.trim());
    let Some(found) = found else {
        return Ok(());
    };
    let expected =
        descriptor_checksum(body).ok_or_else(|| invalid("character outside descriptor alphabet"))?;
    if expected != found {
        return Err(DescriptorError::ChecksumMismatch {
            expected,
            found: found.to_string(),
        });
    }
    Ok(())
}

fn is_checksum_shaped(checksum: &str) -> bool {
    checksum.len() == CHECKSUM_LEN
        && checksum
            .bytes()
            .all(|b| b"qpzry9x8gf2tvdw0s3jn54khce6mua7l".contains(&b))
}

/// Splits `name(args)` where the closing parenthesis is the last character.
fn split_call(raw: &str) -> Result<(&str, &str), DescriptorError> {
    let open = raw
        .find('(')
        .ok_or_else(|| invalid(format!("expected a script expression, found '{raw}'")))?;
    if !raw.ends_with(')') {
        return Err(invalid(format!("unbalanced parentheses in '{raw}'")));
    }
    let args = &raw[open + 1..raw.len() - 1];
    let mut depth = 0i32;
    for ch in args.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(invalid(format!("unbalanced parentheses in '{raw}'")));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(invalid(format!("unbalanced parentheses in '{raw}'")));
    }
    Ok((&raw[..open], args))
}

/// Splits on commas outside nested parentheses and brackets.
fn split_args(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (pos, ch) in args.char_indices() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&args[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    parts.push(&args[start..]);
    parts
}

fn single_arg<'a>(name: &str, args: &'a str) -> Result<&'a str, DescriptorError> {
    let parts = split_args(args);
    if parts.len() != 1 || parts[0].is_empty() {
        return Err(invalid(format!("{name}() takes exactly one argument")));
    }
    Ok(parts[0])
}

fn top_level_only(name: &str, ctx: Context) -> Result<(), DescriptorError> {
    if ctx != Context::Top {
        return Err(invalid(format!("{name}() can only be used at the top level")));
    }
    Ok(())
}

fn parse_expr(raw: &str, ctx: Context) -> Result<Expr, DescriptorError> {
    let (name, args) = split_call(raw)?;
    match name {
        "sh" => {
            top_level_only(name, ctx)?;
            let inner = parse_expr(single_arg(name, args)?, Context::Sh)?;
            Ok(Expr::Sh(Box::new(inner)))
        }
        "wsh" => {
            if ctx == Context::Wsh {
                return Err(invalid("wsh() cannot be nested inside wsh()"));
            }
            let inner = parse_expr(single_arg(name, args)?, Context::Wsh)?;
            Ok(Expr::Wsh(Box::new(inner)))
        }
        "pk" | "pkh" => {
            let key = parse_key(single_arg(name, args)?, ctx.is_segwit(), false)?;
            Ok(if name == "pk" { Expr::Pk(key) } else { Expr::Pkh(key) })
        }
        "wpkh" => {
            if ctx == Context::Wsh {
                return Err(invalid("wpkh() cannot be nested inside wsh()"));
            }
            Ok(Expr::Wpkh(parse_key(single_arg(name, args)?, true, false)?))
        }
        "combo" => {
            top_level_only(name, ctx)?;
            Ok(Expr::Combo(parse_key(single_arg(name, args)?, false, false)?))
        }
        "tr" | "rawtr" => {
            top_level_only(name, ctx)?;
            let parts = split_args(args);
            if parts.len() > 1 {
                return Err(invalid("taproot script trees are not supported"));
            }
            let key = parse_key(single_arg(name, args)?, true, true)?;
            Ok(if name == "tr" { Expr::Tr(key) } else { Expr::RawTr(key) })
        }
        "multi" | "sortedmulti" => parse_multi(name == "sortedmulti", args, ctx),
        "addr" => {
            top_level_only(name, ctx)?;
            let address = single_arg(name, args)?;
            if !address.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(invalid(format!("malformed address '{address}'")));
            }
            Ok(Expr::Addr(address.to_string()))
        }
        "raw" => {
            top_level_only(name, ctx)?;
            let script = hex::decode(single_arg(name, args)?)
                .map_err(|_| invalid("raw() expects a hex script"))?;
            Ok(Expr::Raw(script))
        }
        "" => Err(invalid(format!("missing script function in '{raw}'"))),
        other => Err(invalid(format!("unknown script function '{other}'"))),
    }
}

fn parse_multi(sorted: bool, args: &str, ctx: Context) -> Result<Expr, DescriptorError> {
    let mut parts = split_args(args).into_iter();
    let threshold_str = parts.next().unwrap_or_default();
    if threshold_str.is_empty() || !threshold_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(format!("multisig threshold '{threshold_str}' is not a number")));
    }
    let threshold: usize = threshold_str
        .parse()
        .map_err(|_| invalid(format!("multisig threshold '{threshold_str}' out of range")))?;
    let keys = parts
        .map(|part| parse_key(part, ctx.is_segwit(), false))
        .collect::<Result<Vec<_>, _>>()?;
    if keys.is_empty() {
        return Err(invalid("multisig requires at least one key"));
    }
    if threshold < 1 || threshold > keys.len() {
        return Err(invalid(format!(
            "multisig threshold {threshold} out of range for {} keys",
            keys.len()
        )));
    }
    let limit = match ctx {
        Context::Top => MAX_BARE_MULTISIG_KEYS,
        Context::Sh => MAX_P2SH_MULTISIG_KEYS,
        Context::Wsh => satsigner_consensus::constants::MAX_PUBKEYS_PER_MULTISIG,
    };
    if keys.len() > limit {
        return Err(invalid(format!("{} keys exceeds the limit of {limit} here", keys.len())));
    }
    Ok(Expr::Multi {
        sorted,
        threshold,
        keys,
    })
}

fn parse_key(raw: &str, segwit: bool, x_only: bool) -> Result<KeyExpression, DescriptorError> {
    let (origin, rest) = match raw.strip_prefix('[') {
        Some(tail) => {
            let (inside, rest) = tail
                .split_once(']')
                .ok_or_else(|| invalid(format!("unterminated key origin in '{raw}'")))?;
            (Some(parse_origin(inside)?), rest)
        }
        None => (None, raw),
    };

    let mut tokens = rest.split('/');
    let key_str = tokens.next().unwrap_or_default();
    if key_str.is_empty() {
        return Err(invalid(format!("missing key in '{raw}'")));
    }
    let material = parse_key_material(key_str, x_only)?;

    let mut steps = Vec::new();
    let mut wildcard = Wildcard::None;
    for token in tokens {
        if wildcard != Wildcard::None {
            return Err(invalid("wildcard must be the last derivation step"));
        }
        match token {
            "*" => wildcard = Wildcard::Unhardened,
            "*'" | "*h" | "*H" => wildcard = Wildcard::Hardened,
            step => steps.push(
                step.parse::<ChildNumber>()
                    .map_err(|err| invalid(err.to_string()))?,
            ),
        }
    }
    let steps = DerivationPath::from(steps);

    match &material {
        KeyMaterial::Extended(xkey) => {
            let hardened = steps.as_slice().iter().any(|step| step.is_hardened())
                || wildcard == Wildcard::Hardened;
            if hardened && !xkey.is_private() {
                return Err(invalid("hardened derivation requires a private extended key"));
            }
        }
        _ if !steps.is_empty() || wildcard != Wildcard::None => {
            return Err(invalid("derivation steps are only allowed after an extended key"));
        }
        _ => {}
    }

    let key = KeyExpression {
        origin,
        material,
        steps,
        wildcard,
    };
    if segwit && key.is_uncompressed() {
        return Err(invalid("uncompressed keys are not allowed in segwit scripts"));
    }
    if key.is_x_only() && !x_only {
        return Err(invalid("x-only keys are only allowed in tr() and rawtr()"));
    }
    Ok(key)
}

fn parse_origin(inside: &str) -> Result<KeyOrigin, DescriptorError> {
    let (fingerprint, path) = match inside.split_once('/') {
        Some((fingerprint, path)) => (fingerprint, path),
        None => (inside, ""),
    };
    let fingerprint: Fingerprint = fingerprint
        .parse()
        .map_err(|_| invalid(format!("invalid key origin fingerprint '{fingerprint}'")))?;
    if inside.contains('/') && path.is_empty() {
        return Err(invalid("empty key origin path"));
    }
    let path = DerivationPath::parse_steps(path).map_err(|err| invalid(err.to_string()))?;
    Ok(KeyOrigin { fingerprint, path })
}

fn parse_key_material(raw: &str, x_only: bool) -> Result<KeyMaterial, DescriptorError> {
    let is_hex = raw.bytes().all(|b| b.is_ascii_hexdigit());
    if is_hex {
        let bytes = hex::decode(raw).map_err(|_| invalid(format!("invalid hex key '{raw}'")))?;
        return match bytes.len() {
            32 if x_only => Ok(KeyMaterial::XOnly(
                XOnlyPublicKey::from_slice(&bytes)
                    .map_err(|_| invalid(format!("invalid x-only key '{raw}'")))?,
            )),
            33 | 65 => {
                let key = PublicKey::from_slice(&bytes)
                    .map_err(|_| invalid(format!("invalid public key '{raw}'")))?;
                Ok(KeyMaterial::PublicKey {
                    key,
                    compressed: bytes.len() == 33,
                })
            }
            _ => Err(invalid(format!("public key '{raw}' has an invalid length"))),
        };
    }

    let prefix = raw.get(..4).unwrap_or_default();
    if ExtendedKeyKind::from_prefix(prefix).is_some() && raw.len() == EXTENDED_KEY_STR_LEN {
        let key: ExtendedKey = raw
            .parse()
            .map_err(|err: ExtendedKeyError| invalid(format!("invalid extended key: {err}")))?;
        return Ok(KeyMaterial::Extended(key));
    }

    for network in [Network::Bitcoin, Network::Testnet] {
        if let Ok((secret, compressed)) = wif_to_secret_key(raw, network) {
            let secret = SecretKey::from_slice(&secret)
                .map_err(|_| invalid("WIF key is out of range"))?;
            return Ok(KeyMaterial::Wif {
                secret,
                compressed,
                network,
            });
        }
    }
    Err(invalid(format!("unrecognized key '{raw}'")))
}
