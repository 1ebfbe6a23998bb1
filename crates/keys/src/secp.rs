use std::sync::OnceLock;

use secp256k1::{All, Secp256k1};

static SECP256K1_ALL: OnceLock<Secp256k1<All>> = OnceLock::new();

pub(crate) fn secp256k1() -> &'static Secp256k1<All> {
    SECP256K1_ALL.get_or_init(Secp256k1::new)
}
