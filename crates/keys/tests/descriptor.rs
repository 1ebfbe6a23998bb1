use satsigner_consensus::Network;
use satsigner_keys::{
    add_checksum, verify_checksum, Descriptor, DescriptorError, KeyMaterial, ScriptKind, Wildcard,
};

const XPUB_A: &str = "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8";
const XPUB_B: &str = "xpub68Gmy5EdvgibQVfPdqkBBCHxA5htiqg55crXYuXoQRKfDBFA1WEjWgP6LHhwBZeNK1VTsfTFUHCdrfp1bgwQ9xv5ski8PX9rL2dZXvgGDnw";
const XPRV_A: &str = "xprv9s21ZrQH143K3QTDL4LXw2F7HEK3wJUD2nW2nRk4stbPy6cq3jPPqjiChkVvvNKmPGJxWUtg6LnF5kejMRNNU3TGtRBeJgk33yuGBxrMPHi";
const BIP84_EXTERNAL: &str = "wpkh([73c5da0a/84'/0'/0']xpub6CatWdiZiodmUeTDp8LT5or8nmbKNcuyvz7WyksVFkKB4RHwCD3XyuvPEbvqAQY3rAPshWcMLoP2fMFMKHPJ4ZeZXYVUhLv1VMrjPC7PW6V/0/*)#wc3n3van";
const KEY_A: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

fn sortedmulti() -> String {
    format!("wsh(sortedmulti(2,[aabbccdd/0]{XPUB_A}/0/*,[11223344/0]{XPUB_B}/0/*))")
}

#[test]
fn multisig_with_origins() {
    let descriptor = Descriptor::parse(&sortedmulti()).expect("sortedmulti");
    assert_eq!(descriptor.threshold(), Some(2));
    assert_eq!(descriptor.kind(), ScriptKind::P2wsh);
    let keys = descriptor.keys();
    assert_eq!(keys.len(), 2);
    let origin_a = keys[0].origin.as_ref().expect("first origin");
    let origin_b = keys[1].origin.as_ref().expect("second origin");
    assert_eq!(origin_a.fingerprint.to_string(), "aabbccdd");
    assert_eq!(origin_a.path.to_m_string(), "m/0");
    assert_eq!(origin_b.fingerprint.to_string(), "11223344");
    assert_eq!(keys[0].wildcard, Wildcard::Unhardened);
    assert!(matches!(keys[1].material, KeyMaterial::Extended(_)));
}

#[test]
fn sortedmulti_sorts_per_index() {
    let sorted = Descriptor::parse(&sortedmulti()).expect("sortedmulti");
    let ordered = Descriptor::parse(&sortedmulti().replace("sortedmulti", "multi")).expect("multi");

    let first = "bc1qjyvnx75km9k296t3kgr8965cr4lpmdnaaznukn0qcttzgx509kfsgf2asr";
    assert_eq!(sorted.derive_address(0, Network::Bitcoin).expect("address 0"), first);
    assert_eq!(ordered.derive_address(0, Network::Bitcoin).expect("address 0"), first);

    assert_eq!(
        sorted.derive_address(1, Network::Bitcoin).expect("address 1"),
        "bc1q87tu3a6va293xyrps37egzywu7cyux9quftepgkexheg9ycqxxfsqm6gct"
    );
    assert_eq!(
        ordered.derive_address(1, Network::Bitcoin).expect("address 1"),
        "bc1qjj36g2cs994t4duac49ylye48xxewthl43q0ynmvweh53achwm9q7eh56q"
    );
}

#[test]
fn checksums() {
    assert_eq!(
        Descriptor::parse(&sortedmulti()).expect("parse").to_string_with_checksum(),
        format!("{}#29dd0kx3", sortedmulti())
    );
    assert!(verify_checksum(BIP84_EXTERNAL).is_ok());
    assert!(verify_checksum("raw(deadbeef)").is_ok());

    let wrong = BIP84_EXTERNAL.replace("#wc3n3van", "#wc3n3vaa");
    assert!(Descriptor::parse(&wrong).is_ok());
    match Descriptor::parse_with_network(&wrong, Network::Bitcoin) {
        Err(DescriptorError::ChecksumMismatch { expected, found }) => {
            assert_eq!(expected, "wc3n3van");
            assert_eq!(found, "wc3n3vaa");
        }
        other => panic!("expected checksum mismatch, got {other:?}"),
    }
    assert_eq!(add_checksum("raw(deadbeef)").as_deref(), Some("raw(deadbeef)#89f8spxm"));
}

#[test]
fn network_is_checked_only_on_request() {
    assert!(Descriptor::parse(BIP84_EXTERNAL).is_ok());
    assert!(Descriptor::parse_with_network(BIP84_EXTERNAL, Network::Bitcoin).is_ok());
    assert!(matches!(
        Descriptor::parse_with_network(BIP84_EXTERNAL, Network::Testnet),
        Err(DescriptorError::NetworkMismatch(Network::Testnet))
    ));
    let addr = "addr(1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa)";
    assert!(Descriptor::parse_with_network(addr, Network::Bitcoin).is_ok());
    assert!(Descriptor::parse_with_network(addr, Network::Regtest).is_err());
}

#[test]
fn render_parse_is_idempotent() {
    let inputs = [
        BIP84_EXTERNAL.to_string(),
        sortedmulti(),
        format!("sh(wsh(multi(1,{KEY_A},[deadbeef/48h/0h/0h/2h]{XPUB_B}/1/*)))"),
        format!("pk({KEY_A})"),
        format!("combo({KEY_A})"),
        format!("wpkh({XPRV_A}/84'/0'/0'/0/*')"),
        "raw(6a0401020304)".to_string(),
        "addr(bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4)".to_string(),
        format!("tr({})", &KEY_A[2..]),
    ];
    let with_checksums: Vec<String> = inputs
        .iter()
        .map(|input| {
            Descriptor::parse(input)
                .expect("parse for checksum")
                .to_string_with_checksum()
        })
        .collect();
    for input in inputs.iter().chain(with_checksums.iter()) {
        let first = Descriptor::parse(input).expect("first parse");
        let rendered = first.to_string();
        let second = Descriptor::parse(&rendered).expect("second parse");
        assert_eq!(first, second, "{input}");
        assert_eq!(second.to_string(), rendered);
        assert_eq!(first.checksum().is_some(), input.contains('#'), "{input}");
    }
    let hardened_h = Descriptor::parse(&format!("wpkh([73c5da0a/84h/0h/0h]{XPUB_A}/0/*)")).expect("h markers");
    assert!(hardened_h.to_string().contains("[73c5da0a/84'/0'/0']"));
}

#[test]
fn rendering_keeps_a_parsed_checksum() {
    let parsed = Descriptor::parse("raw(deadbeef)#89f8spxm").expect("checksummed");
    assert_eq!(parsed.checksum(), Some("89f8spxm"));
    assert_eq!(parsed.to_string(), "raw(deadbeef)#89f8spxm");
    assert_eq!(Descriptor::parse(&parsed.to_string()).expect("reparse"), parsed);

    let bare = Descriptor::parse("raw(deadbeef)").expect("bare");
    assert_eq!(bare.checksum(), None);
    assert_eq!(bare.to_string(), "raw(deadbeef)");
    assert_ne!(bare, parsed);

    // A mismatched checksum is rendered in canonical form.
    let stale = Descriptor::parse("raw(deadbeef)#89f8spxq").expect("structural parse");
    assert_eq!(stale.to_string(), "raw(deadbeef)#89f8spxm");

    let hardened_h = format!("wpkh([73c5da0a/84h/0h/0h]{XPUB_A}/0/*)");
    let checksummed = Descriptor::parse(&hardened_h).expect("h markers").to_string_with_checksum();
    let reparsed = Descriptor::parse(&checksummed).expect("canonical reparse");
    assert!(verify_checksum(&reparsed.to_string()).is_ok());
}

#[test]
fn single_key_scripts() {
    let pkh = Descriptor::parse(&format!("pkh({KEY_A})")).expect("pkh");
    assert_eq!(
        pkh.derive_address(0, Network::Bitcoin).expect("address"),
        "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"
    );
    let wpkh = Descriptor::parse(&format!("wpkh({KEY_A})")).expect("wpkh");
    assert_eq!(
        wpkh.derive_address(7, Network::Bitcoin).expect("address"),
        "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"
    );
    let pk = Descriptor::parse(&format!("pk({KEY_A})")).expect("pk");
    assert_eq!(
        hex::encode(pk.derive_script(0, Network::Bitcoin).expect("script")),
        format!("21{KEY_A}ac")
    );
    assert!(matches!(
        pk.derive_address(0, Network::Bitcoin),
        Err(DescriptorError::NoAddress(ScriptKind::P2pk))
    ));
    let combo = Descriptor::parse(&format!("combo({KEY_A})")).expect("combo");
    assert_eq!(combo.derive_scripts(0, Network::Bitcoin).expect("scripts").len(), 4);
}

#[test]
fn hardened_steps_need_private_keys() {
    assert!(Descriptor::parse(&format!("wpkh({XPUB_A}/0'/*)")).is_err());
    assert!(Descriptor::parse(&format!("wpkh({XPUB_A}/0/*'))")).is_err());
    assert!(Descriptor::parse(&format!("wpkh({XPUB_A}/0/*')")).is_err());
    let private = Descriptor::parse(&format!("wpkh({XPRV_A}/0'/*')")).expect("private hardened");
    assert!(private.has_wildcard());
    assert!(private.derive_script(3, Network::Bitcoin).is_ok());
}

#[test]
fn uncompressed_keys_rejected_in_segwit() {
    let uncompressed = "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";
    assert!(Descriptor::parse(&format!("pkh({uncompressed})")).is_ok());
    assert!(Descriptor::parse(&format!("wpkh({uncompressed})")).is_err());
    assert!(Descriptor::parse(&format!("wsh(pk({uncompressed}))")).is_err());
    assert!(Descriptor::parse(&format!("sh(pk({uncompressed}))")).is_ok());
}

#[test]
fn malformed_descriptors_are_invalid() {
    for input in [
        "",
        "wpkh",
        "wpkh()",
        "foo(00)",
        "wpkh(xpub)",
        "sh(wpkh(00)",
        "multi(2,00)",
        "raw(zz)",
        "tr(00,pk(00))",
    ] {
        assert!(
            matches!(Descriptor::parse(input), Err(DescriptorError::InvalidDescriptor(_))),
            "{input}"
        );
    }
}
