use satsigner_consensus::Network;
use satsigner_primitives::base58::Base58Error;
use satsigner_primitives::{
    address_kind, address_network, address_to_script_hash, address_to_script_pubkey,
    electrum_script_hash, script_pubkey_to_address, secret_key_to_wif, wif_to_secret_key,
    AddressError, AddressKind,
};

fn script(raw: &str) -> Vec<u8> {
    hex::decode(raw).expect("valid hex")
}

#[test]
fn p2pkh_round_trip() {
    let spk = address_to_script_pubkey("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", Network::Bitcoin)
        .expect("genesis address");
    assert_eq!(
        spk,
        script("76a91462e907b15cbf27d5425399ebf6f0fb50ebb88f1888ac")
    );
    assert_eq!(
        script_pubkey_to_address(&spk, Network::Bitcoin).as_deref(),
        Some("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa")
    );
    assert_eq!(
        script_pubkey_to_address(&spk, Network::Testnet).as_deref(),
        Some("mpXwg4jMtRhuSpVq4xS3HFHmCmWp9NyGKt")
    );
}

#[test]
fn p2sh_round_trip() {
    let spk = address_to_script_pubkey("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy", Network::Bitcoin)
        .expect("p2sh address");
    assert_eq!(spk, script("a914b472a266d0bd89c13706a4132ccfb16f7c3b9fcb87"));
    assert_eq!(
        address_kind("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy", Network::Bitcoin),
        Ok(AddressKind::P2sh)
    );
}

#[test]
fn segwit_v0_addresses() {
    let spk = address_to_script_pubkey(
        "BC1QW508D6QEJXTDG4Y5R3ZARVARY0C5XW7KV8F3T4",
        Network::Bitcoin,
    )
    .expect("uppercase p2wpkh");
    assert_eq!(spk, script("0014751e76e8199196d454941c45d1b3a323f1433bd6"));
    assert_eq!(
        script_pubkey_to_address(&spk, Network::Bitcoin).as_deref(),
        Some("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4")
    );
    assert_eq!(
        script_pubkey_to_address(&spk, Network::Regtest).as_deref(),
        Some("bcrt1qw508d6qejxtdg4y5r3zarvary0c5xw7kygt080")
    );

    let p2wsh = "tb1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3q0sl5k7";
    let spk = address_to_script_pubkey(p2wsh, Network::Testnet).expect("p2wsh");
    assert_eq!(
        spk,
        script("00201863143c14c5166804bd19203356da136c985678cd4d27a1b8c6329604903262")
    );
    assert_eq!(address_kind(p2wsh, Network::Signet), Ok(AddressKind::P2wsh));
}

#[test]
fn taproot_address_maps_to_v1_program() {
    let addr = "bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0";
    let spk = address_to_script_pubkey(addr, Network::Bitcoin).expect("p2tr");
    assert_eq!(
        spk,
        script("512079be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
    );
    assert_eq!(
        script_pubkey_to_address(&spk, Network::Bitcoin).as_deref(),
        Some(addr)
    );
    assert_eq!(AddressKind::from_script(&spk), Some(AddressKind::P2tr));
}

#[test]
fn non_standard_scripts_have_no_address() {
    assert_eq!(script_pubkey_to_address(&[0x6a, 0x01, 0x00], Network::Bitcoin), None);
    assert_eq!(script_pubkey_to_address(&[], Network::Bitcoin), None);
    // witness v0 programs must be 20 or 32 bytes
    let mut bad_v0 = vec![0x00, 0x18];
    bad_v0.extend_from_slice(&[0x11; 24]);
    assert_eq!(script_pubkey_to_address(&bad_v0, Network::Bitcoin), None);
}

#[test]
fn wrong_network_is_reported() {
    let err = address_to_script_pubkey("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", Network::Testnet)
        .unwrap_err();
    assert_eq!(
        err,
        AddressError::WrongNetwork {
            expected: Network::Testnet
        }
    );
    let err = address_to_script_pubkey(
        "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4",
        Network::Regtest,
    )
    .unwrap_err();
    assert!(matches!(err, AddressError::WrongNetwork { .. }));
}

#[test]
fn corrupted_addresses_fail() {
    let err = address_to_script_pubkey("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNb", Network::Bitcoin)
        .unwrap_err();
    assert_eq!(err, AddressError::Base58(Base58Error::InvalidChecksum));
    let err = address_to_script_pubkey(
        "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t5",
        Network::Bitcoin,
    )
    .unwrap_err();
    assert!(matches!(err, AddressError::Segwit(_)));
}

#[test]
fn address_networks() {
    assert_eq!(
        address_network("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"),
        vec![Network::Bitcoin]
    );
    assert_eq!(
        address_network("2N2GDNJ4rEm6NxfMC9ck8VuRdheQzXWaNZv"),
        vec![Network::Testnet, Network::Signet, Network::Regtest]
    );
    assert_eq!(
        address_network("tb1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3q0sl5k7"),
        vec![Network::Testnet, Network::Signet]
    );
    assert!(address_network("not an address").is_empty());
}

#[test]
fn electrum_script_hashes() {
    assert_eq!(
        address_to_script_hash("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", Network::Bitcoin)
            .expect("scripthash"),
        "8b01df4e368ea28f8dc0423bcf7a4923e3a12d307c875e47a0cfbf90b5c39161"
    );
    assert_eq!(
        electrum_script_hash(&script("0014751e76e8199196d454941c45d1b3a323f1433bd6")),
        "9623df75239b5daa7f5f03042d325b51498c4bb7059c7748b17049bf96f73888"
    );
}

#[test]
fn wif_known_vectors() {
    let secret: [u8; 32] =
        hex::decode("0c28fca386c7a227600b2fe50b7cae11ec86d3bf1fbe471be89827e19d72aa1d")
            .expect("hex")
            .try_into()
            .expect("32 bytes");
    assert_eq!(
        secret_key_to_wif(&secret, Network::Bitcoin, false),
        "5HueCGU8rMjxEXxiPuD5BDku4MkFqeZyd4dZ1jvhTVqvbTLvyTJ"
    );
    assert_eq!(
        secret_key_to_wif(&secret, Network::Bitcoin, true),
        "KwdMAjGmerYanjeui5SHS7JkmpZvVipYvB2LJGU1ZxJwYvP98617"
    );
    let (decoded, compressed) = wif_to_secret_key(
        "KwdMAjGmerYanjeui5SHS7JkmpZvVipYvB2LJGU1ZxJwYvP98617",
        Network::Bitcoin,
    )
    .expect("decode wif");
    assert_eq!(decoded, secret);
    assert!(compressed);
}

#[test]
fn wif_rejects_wrong_network() {
    let secret = [0x33u8; 32];
    let wif = secret_key_to_wif(&secret, Network::Bitcoin, false);
    let err = wif_to_secret_key(&wif, Network::Testnet).unwrap_err();
    assert!(matches!(err, AddressError::UnknownPrefix));
}
