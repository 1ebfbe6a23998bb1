use satsigner_consensus::Network;
use satsigner_keys::{
    compose_multisig, compose_sorted_multisig, derive_from_seed, descriptor_from_extended_public_key,
    extended_public_key_from_mnemonic, extract_extended_key, extract_fingerprint_and_path,
    mnemonic_fingerprint, resolve_account, validate_mnemonic, AccountPolicy, DeriveError, Descriptor,
    DescriptorError, KeySource, Keychain, ScriptVersion,
};

const MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
const XPUB_84: &str = "xpub6CatWdiZiodmUeTDp8LT5or8nmbKNcuyvz7WyksVFkKB4RHwCD3XyuvPEbvqAQY3rAPshWcMLoP2fMFMKHPJ4ZeZXYVUhLv1VMrjPC7PW6V";
const ZPUB_84: &str = "zpub6rFR7y4Q2AijBEqTUquhVz398htDFrtymD9xYYfG1m4wAcvPhXNfE3EfH1r1ADqtfSdVCToUG868RvUUkgDKf31mGDtKsAYz2oz2AGutZYs";
const XPUB_A: &str = "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8";
const XPUB_B: &str = "xpub68Gmy5EdvgibQVfPdqkBBCHxA5htiqg55crXYuXoQRKfDBFA1WEjWgP6LHhwBZeNK1VTsfTFUHCdrfp1bgwQ9xv5ski8PX9rL2dZXvgGDnw";

#[test]
fn seed_descriptors_per_script_version() {
    let cases = [
        (
            ScriptVersion::P2pkh,
            "pkh([73c5da0a/44'/0'/0']xpub6BosfCnifzxcFwrSzQiqu2DBVTshkCXacvNsWGYJVVhhawA7d4R5WSWGFNbi8Aw6ZRc1brxMyWMzG3DSSSSoekkudhUd9yLb6qx39T9nMdj/0/*)#8w4z8fed",
            "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA",
        ),
        (
            ScriptVersion::P2shP2wpkh,
            "sh(wpkh([73c5da0a/49'/0'/0']xpub6C6nQwHaWbSrzs5tZ1q7m5R9cPK9eYpNMFesiXsYrgc1P8bvLLAet9JfHjYXKjToD8cBRswJXXbbFpXgwsswVPAZzKMa1jUp2kVkGVUaJa7/0/*))#gvfpdstz",
            "37VucYSaXLCAsxYyAPfbSi9eh4iEcbShgf",
        ),
        (
            ScriptVersion::P2wpkh,
            "wpkh([73c5da0a/84'/0'/0']xpub6CatWdiZiodmUeTDp8LT5or8nmbKNcuyvz7WyksVFkKB4RHwCD3XyuvPEbvqAQY3rAPshWcMLoP2fMFMKHPJ4ZeZXYVUhLv1VMrjPC7PW6V/0/*)#wc3n3van",
            "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu",
        ),
        (
            ScriptVersion::P2tr,
            "tr([73c5da0a/86'/0'/0']xpub6BgBgsespWvERF3LHQu6CnqdvfEvtMcQjYrcRzx53QJjSxarj2afYWcLteoGVky7D3UKDP9QyrLprQ3VCECoY49yfdDEHGCtMMj92pReUsQ/0/*)#rg247h69",
            "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr",
        ),
    ];
    for (version, expected, first_address) in cases {
        let descriptor = derive_from_seed(MNEMONIC, "", version, Keychain::External, Network::Bitcoin)
            .expect("derive descriptor");
        assert_eq!(descriptor.to_string_with_checksum(), expected, "{version}");
        assert_eq!(descriptor.checksum(), expected.rsplit_once('#').map(|(_, sum)| sum));
        assert_eq!(
            descriptor.derive_address(0, Network::Bitcoin).expect("first address"),
            first_address
        );
    }
}

#[test]
fn internal_keychain_uses_change_branch() {
    let internal = derive_from_seed(
        MNEMONIC,
        "",
        ScriptVersion::P2wpkh,
        Keychain::Internal,
        Network::Bitcoin,
    )
    .expect("internal descriptor");
    assert!(internal.to_string().ends_with("/1/*)"));
    assert_eq!(
        internal.derive_address(0, Network::Bitcoin).expect("change address"),
        "bc1q8c6fshw2dlwun7ekn9qwf37cu2rn755upcp6el"
    );
}

#[test]
fn testnet_derivation_uses_coin_type_one() {
    let descriptor = derive_from_seed(
        MNEMONIC,
        "",
        ScriptVersion::P2wpkh,
        Keychain::External,
        Network::Testnet,
    )
    .expect("testnet descriptor");
    assert!(descriptor.to_string().starts_with("wpkh([73c5da0a/84'/1'/0']tpubDC8msFGeGuwnKG9Upg7DM2b4DaRqg3CUZa5g8v2SRQ6K4NSkxUgd7HsL2XVWbVm39yBA4LAxysQAm397zwQSQoQgewGiYZqrA9DsP4zbQ1M/0/*)"));
    assert_eq!(
        descriptor.derive_address(0, Network::Testnet).expect("address"),
        "tb1q6rz28mcfaxtmd6v789l9rrlrusdprr9pqcpvkl"
    );
    let vpub = extended_public_key_from_mnemonic(MNEMONIC, "", ScriptVersion::P2wpkh, Network::Signet)
        .expect("vpub");
    assert_eq!(
        vpub.to_string(),
        "vpub5Y6cjg78GGuNLsaPhmYsiw4gYX3HoQiRBiSwDaBXKUafCt9bNwWQiitDk5VZ5BVxYnQdwoTyXSs2JHRPAgjAvtbBrf8ZhDYe2jWAqvZVnsc"
    );
}

#[test]
fn mnemonic_helpers() {
    assert!(validate_mnemonic(MNEMONIC));
    assert!(!validate_mnemonic("abandon abandon abandon"));
    assert!(!validate_mnemonic(&MNEMONIC.replace("about", "abandon")));
    assert_eq!(
        mnemonic_fingerprint(MNEMONIC, "", Network::Bitcoin)
            .expect("fingerprint")
            .to_string(),
        "73c5da0a"
    );
    assert_ne!(
        mnemonic_fingerprint(MNEMONIC, "TREZOR", Network::Bitcoin).expect("fingerprint"),
        mnemonic_fingerprint(MNEMONIC, "", Network::Bitcoin).expect("fingerprint")
    );
    assert_eq!(
        extended_public_key_from_mnemonic(MNEMONIC, "", ScriptVersion::P2wpkh, Network::Bitcoin)
            .expect("zpub")
            .to_string(),
        ZPUB_84
    );
    assert!(matches!(
        derive_from_seed("not a mnemonic", "", ScriptVersion::P2wpkh, Keychain::External, Network::Bitcoin),
        Err(DeriveError::Mnemonic(_))
    ));
}

#[test]
fn extracts_origin_and_key() {
    let seed = derive_from_seed(MNEMONIC, "", ScriptVersion::P2wpkh, Keychain::External, Network::Bitcoin)
        .expect("descriptor")
        .to_string_with_checksum();
    let (fingerprint, path) = extract_fingerprint_and_path(&seed).expect("origin");
    assert_eq!(fingerprint, "73c5da0a");
    assert_eq!(path, "m/84'/0'/0'");
    let key = extract_extended_key(&seed).expect("parse").expect("extended key");
    assert_eq!(key.to_string(), XPUB_84);

    let bare = format!("wpkh({XPUB_84}/0/*)");
    assert_eq!(
        extract_fingerprint_and_path(&bare).expect("no origin"),
        (String::new(), String::new())
    );
    assert!(extract_extended_key("raw(deadbeef)").expect("raw").is_none());
    assert!(matches!(
        extract_fingerprint_and_path("wpkh("),
        Err(DescriptorError::InvalidDescriptor(_))
    ));
}

#[test]
fn imported_slip132_key_becomes_xpub() {
    let descriptor = descriptor_from_extended_public_key(
        ZPUB_84,
        "73C5DA0A",
        ScriptVersion::P2wpkh,
        Keychain::External,
        Network::Bitcoin,
    )
    .expect("descriptor");
    assert_eq!(
        descriptor.to_string_with_checksum(),
        format!("wpkh([73c5da0a/84'/0'/0']{XPUB_84}/0/*)#wc3n3van")
    );
    assert!(matches!(
        descriptor_from_extended_public_key(
            ZPUB_84,
            "73c5da0a",
            ScriptVersion::P2wpkh,
            Keychain::External,
            Network::Testnet
        ),
        Err(DeriveError::NetworkMismatch(Network::Testnet))
    ));
}

#[test]
fn multisig_composition_preserves_order() {
    let keys = [
        format!("[11223344/48'/0'/0'/2']{XPUB_B}/0/*"),
        format!("[aabbccdd/48'/0'/0'/2']{XPUB_A}/0/*"),
    ];
    let descriptor = compose_multisig(2, &keys).expect("multisig");
    assert_eq!(
        descriptor.expr().to_string(),
        format!("wsh(multi(2,{},{}))", keys[0], keys[1])
    );
    assert!(descriptor.checksum().is_some());
    assert_eq!(descriptor.to_string(), descriptor.to_string_with_checksum());
    let origins: Vec<String> = descriptor
        .keys()
        .iter()
        .filter_map(|key| key.origin.as_ref().map(|origin| origin.fingerprint.to_string()))
        .collect();
    assert_eq!(origins, vec!["11223344", "aabbccdd"]);

    let sorted = compose_sorted_multisig(1, &keys).expect("sorted");
    assert!(sorted.to_string().starts_with("wsh(sortedmulti(1,"));
    assert!(compose_multisig(3, &keys).is_err());
    assert!(compose_multisig(1, &Vec::<String>::new()).is_err());
}

#[test]
fn resolves_account_policies() {
    let single = resolve_account(
        &AccountPolicy::SingleSig(KeySource::Mnemonic {
            mnemonic: MNEMONIC.to_string(),
            passphrase: String::new(),
            script_version: ScriptVersion::P2wpkh,
        }),
        Network::Bitcoin,
    )
    .expect("single sig");
    assert_eq!(single.fingerprint, "73c5da0a");
    assert_eq!(single.derivation_path, "m/84'/0'/0'");
    assert!(single.external_descriptor.ends_with("#wc3n3van"));
    assert!(single
        .internal_descriptor
        .as_deref()
        .is_some_and(|internal| internal.contains("/1/*)#")));

    let watch = resolve_account(
        &AccountPolicy::WatchOnly(KeySource::Descriptor {
            external: single.external_descriptor.clone(),
            internal: Some(String::new()),
        }),
        Network::Bitcoin,
    )
    .expect("watch only");
    assert_eq!(watch.external_descriptor, single.external_descriptor);
    assert_eq!(watch.internal_descriptor, None);
    assert_eq!(watch.fingerprint, "73c5da0a");

    let xpub = resolve_account(
        &AccountPolicy::WatchOnly(KeySource::ExtendedPublicKey {
            key: ZPUB_84.to_string(),
            fingerprint: "73c5da0a".to_string(),
            script_version: ScriptVersion::P2wpkh,
        }),
        Network::Bitcoin,
    )
    .expect("xpub import");
    assert_eq!(xpub, single);

    let multi = resolve_account(
        &AccountPolicy::MultiSig {
            threshold: 2,
            keys: vec![
                format!("[aabbccdd/0]{XPUB_A}/0/*"),
                format!("[11223344/0]{XPUB_B}/0/*"),
            ],
        },
        Network::Bitcoin,
    )
    .expect("multisig");
    assert_eq!(multi.fingerprint, "aabbccdd");
    assert_eq!(multi.derivation_path, "m/0");
    assert_eq!(multi.internal_descriptor, None);
    assert!(multi.external_descriptor.starts_with("wsh(multi(2,"));

    assert!(resolve_account(
        &AccountPolicy::MultiSig {
            threshold: 1,
            keys: vec![format!("{XPUB_A}/0/*")],
        },
        Network::Testnet,
    )
    .is_err());
}

#[test]
fn watch_only_addresses_resolve_to_addr_descriptors() {
    let cases = [
        (
            Network::Bitcoin,
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4",
            "addr(bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4)#uyjndxcw",
        ),
        (
            Network::Testnet,
            " tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx ",
            "addr(tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx)#0wnhlaqf",
        ),
    ];
    for (network, address, expected) in cases {
        let identity = resolve_account(
            &AccountPolicy::WatchOnly(KeySource::Address(address.to_string())),
            network,
        )
        .expect("address account");
        assert_eq!(identity.external_descriptor, expected, "{network}");
        assert_eq!(identity.internal_descriptor, None);
        assert_eq!(identity.fingerprint, "");
        assert_eq!(identity.derivation_path, "");
        let parsed = Descriptor::parse_with_network(&identity.external_descriptor, network)
            .expect("resolved descriptor reparses");
        assert_eq!(
            parsed.derive_address(0, network).expect("address"),
            address.trim()
        );
    }

    for (network, address) in [
        (Network::Testnet, "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"),
        (Network::Bitcoin, "not-an-address"),
        (
            Network::Bitcoin,
            "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr",
        ),
    ] {
        assert!(matches!(
            resolve_account(
                &AccountPolicy::SingleSig(KeySource::Address(address.to_string())),
                network,
            ),
            Err(DeriveError::InvalidAddress(_))
        ));
    }
}
