use satsigner_consensus::Network;
use satsigner_keys::{
    validate_address, validate_derivation_path, validate_descriptor, validate_extended_key,
    validate_fingerprint, ScriptVersion,
};

const XPUB: &str = "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8";
const XPRV: &str = "xprv9s21ZrQH143K3QTDL4LXw2F7HEK3wJUD2nW2nRk4stbPy6cq3jPPqjiChkVvvNKmPGJxWUtg6LnF5kejMRNNU3TGtRBeJgk33yuGBxrMPHi";
const YPUB: &str = "ypub6Ww3ibxVfGzLrAH1PNcjyAWenMTbbAosGNB6VvmSEgytSER9azLDWCxoJwW7Ke7icmizBMXrzBx9979FfaHxHcrArf3zbeJJJUZPf663zsP";
const ZPUB: &str = "zpub6rFR7y4Q2AijBEqTUquhVz398htDFrtymD9xYYfG1m4wAcvPhXNfE3EfH1r1ADqtfSdVCToUG868RvUUkgDKf31mGDtKsAYz2oz2AGutZYs";
const TPUB: &str = "tpubDC8msFGeGuwnKG9Upg7DM2b4DaRqg3CUZa5g8v2SRQ6K4NSkxUgd7HsL2XVWbVm39yBA4LAxysQAm397zwQSQoQgewGiYZqrA9DsP4zbQ1M";
const VPUB: &str = "vpub5Y6cjg78GGuNLsaPhmYsiw4gYX3HoQiRBiSwDaBXKUafCt9bNwWQiitDk5VZ5BVxYnQdwoTyXSs2JHRPAgjAvtbBrf8ZhDYe2jWAqvZVnsc";

#[test]
fn extended_keys_by_version_and_network() {
    for key in [XPUB, XPRV, YPUB, ZPUB, TPUB, VPUB] {
        assert!(validate_extended_key(key, None, None), "{key}");
    }
    assert!(validate_extended_key(XPUB, Some(ScriptVersion::P2pkh), Some(Network::Bitcoin)));
    assert!(validate_extended_key(XPRV, Some(ScriptVersion::P2pkh), Some(Network::Bitcoin)));
    assert!(validate_extended_key(YPUB, Some(ScriptVersion::P2shP2wpkh), Some(Network::Bitcoin)));
    assert!(validate_extended_key(ZPUB, Some(ScriptVersion::P2wpkh), None));
    assert!(validate_extended_key(VPUB, Some(ScriptVersion::P2wpkh), Some(Network::Signet)));
    assert!(validate_extended_key(TPUB, None, Some(Network::Regtest)));

    assert!(!validate_extended_key(ZPUB, Some(ScriptVersion::P2pkh), Some(Network::Bitcoin)));
    assert!(!validate_extended_key(VPUB, Some(ScriptVersion::P2wpkh), Some(Network::Bitcoin)));
    assert!(!validate_extended_key(XPUB, None, Some(Network::Testnet)));
}

#[test]
fn extended_key_shape_failures() {
    assert!(!validate_extended_key(&XPUB[..110], None, None));
    assert!(!validate_extended_key(&format!("{XPUB}1"), None, None));
    assert!(!validate_extended_key(&format!("Xpub{}", &XPUB[4..]), None, None));
    assert!(!validate_extended_key("", None, None));
    let mut flipped = XPUB.to_string();
    flipped.replace_range(50..51, if &XPUB[50..51] == "a" { "b" } else { "a" });
    assert!(!validate_extended_key(&flipped, None, None));
}

#[test]
fn taproot_is_always_rejected() {
    for network in [None, Some(Network::Bitcoin), Some(Network::Testnet)] {
        assert!(!validate_extended_key(XPUB, Some(ScriptVersion::P2tr), network));
        assert!(!validate_address(
            "bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0",
            Some(ScriptVersion::P2tr),
            network
        ));
        assert!(!validate_descriptor("raw(deadbeef)", Some(ScriptVersion::P2tr), network));
    }
    assert!(!validate_address(
        "bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0",
        None,
        None
    ));
    let tr = "tr(79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798)";
    assert!(!validate_descriptor(tr, None, None));
}

#[test]
fn addresses() {
    assert!(validate_address("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", None, None));
    assert!(validate_address(
        "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
        Some(ScriptVersion::P2pkh),
        Some(Network::Bitcoin)
    ));
    assert!(!validate_address(
        "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
        Some(ScriptVersion::P2wpkh),
        Some(Network::Bitcoin)
    ));
    assert!(!validate_address(
        "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
        None,
        Some(Network::Testnet)
    ));
    assert!(validate_address(
        "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy",
        Some(ScriptVersion::P2shP2wpkh),
        Some(Network::Bitcoin)
    ));
    assert!(validate_address(
        "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu",
        Some(ScriptVersion::P2wpkh),
        None
    ));
    assert!(validate_address(
        "tb1q6rz28mcfaxtmd6v789l9rrlrusdprr9pqcpvkl",
        Some(ScriptVersion::P2wpkh),
        Some(Network::Signet)
    ));
    assert!(validate_address(
        "mpXwg4jMtRhuSpVq4xS3HFHmCmWp9NyGKt",
        Some(ScriptVersion::P2pkh),
        Some(Network::Testnet)
    ));
    assert!(validate_address(
        "bcrt1qw508d6qejxtdg4y5r3zarvary0c5xw7kygt080",
        None,
        Some(Network::Regtest)
    ));
    assert!(!validate_address("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNb", None, None));
    assert!(!validate_address("", None, None));
}

#[test]
fn descriptors() {
    let bip84 = "wpkh([73c5da0a/84'/0'/0']xpub6CatWdiZiodmUeTDp8LT5or8nmbKNcuyvz7WyksVFkKB4RHwCD3XyuvPEbvqAQY3rAPshWcMLoP2fMFMKHPJ4ZeZXYVUhLv1VMrjPC7PW6V/0/*)#wc3n3van";
    assert!(validate_descriptor(bip84, None, None));
    assert!(validate_descriptor(bip84, Some(ScriptVersion::P2wpkh), Some(Network::Bitcoin)));
    assert!(!validate_descriptor(bip84, None, Some(Network::Testnet)));
    let bad_checksum = bip84.replace("wc3n3van", "wc3n3vaa");
    assert!(validate_descriptor(&bad_checksum, None, None));
    assert!(!validate_descriptor(&bad_checksum, None, Some(Network::Bitcoin)));
    assert!(!validate_descriptor("wpkh(", None, None));
}

#[test]
fn fingerprints_and_paths() {
    assert!(validate_fingerprint("1A2B3C4D"));
    assert!(!validate_fingerprint("1A2B3C4"));
    assert!(validate_derivation_path("m/48'/0'/0'/2'"));
    assert!(!validate_derivation_path("m/48''"));
}
