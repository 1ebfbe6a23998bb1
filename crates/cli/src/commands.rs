use std::fs;
use std::path::Path;

use satsigner_consensus::Network;
use satsigner_keys::{
    resolve_account, validate_address, validate_derivation_path, validate_extended_key,
    validate_fingerprint, verify_checksum, AccountPolicy, Descriptor, KeySource,
};
use satsigner_log::log_info;
use satsigner_primitives::{
    address_to_script_hash, address_to_script_pubkey, script_pubkey_to_address, Transaction,
};
use satsigner_script::{classify_script_pubkey, inspect_hex};
use satsigner_wallet::{build_account_view, fetch_address_activity, MemorySource};
use serde_json::{json, Value};

use crate::args::{Command, Settings};
use crate::error::CliError;
use crate::fixture::WalletFixture;

pub fn execute(command: &Command, settings: &Settings) -> Result<Value, CliError> {
    let network = settings.network();
    match command {
        Command::Decode(raw) => decode(raw, network),
        Command::Inspect(raw) => Ok(serde_json::to_value(inspect_hex(raw)?)?),
        Command::ValidateKey {
            key,
            script_version,
        } => Ok(json!({
            "valid": validate_extended_key(key, *script_version, settings.network),
        })),
        Command::ValidateAddress {
            address,
            script_version,
        } => Ok(json!({
            "valid": validate_address(address, *script_version, settings.network),
        })),
        Command::ValidatePath(path) => Ok(json!({ "valid": validate_derivation_path(path) })),
        Command::ValidateFingerprint(fingerprint) => {
            Ok(json!({ "valid": validate_fingerprint(fingerprint) }))
        }
        Command::Descriptor(raw) => describe(raw, settings.network, network),
        Command::Derive {
            mnemonic,
            script_version,
            passphrase,
        } => {
            let identity = resolve_account(
                &AccountPolicy::SingleSig(KeySource::Mnemonic {
                    mnemonic: mnemonic.clone(),
                    passphrase: passphrase.clone(),
                    script_version: *script_version,
                }),
                network,
            )?;
            let first_address =
                Descriptor::parse(&identity.external_descriptor)?.derive_address(0, network)?;
            Ok(json!({
                "externalDescriptor": identity.external_descriptor,
                "internalDescriptor": identity.internal_descriptor,
                "fingerprint": identity.fingerprint,
                "derivationPath": identity.derivation_path,
                "firstAddress": first_address,
            }))
        }
        Command::ScriptHash(address) => {
            let script = address_to_script_pubkey(address.trim(), network)?;
            Ok(json!({
                "address": address.trim(),
                "scriptPubKey": hex::encode(script),
                "scripthash": address_to_script_hash(address.trim(), network)?,
            }))
        }
        Command::Reconcile(path) => reconcile_fixture(path, network),
    }
}

fn decode(raw: &str, network: Network) -> Result<Value, CliError> {
    let tx = Transaction::from_hex(raw)?;
    let vin = tx
        .inputs
        .iter()
        .map(|input| {
            json!({
                "txid": input.prevout.txid_hex(),
                "vout": input.prevout.index,
                "scriptSig": hex::encode(&input.script_sig),
                "sequence": input.sequence,
                "witness": input.witness.iter().map(hex::encode).collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>();
    let vout = tx
        .outputs
        .iter()
        .enumerate()
        .map(|(n, output)| {
            json!({
                "n": n,
                "value": output.value,
                "scriptPubKey": hex::encode(&output.script_pubkey),
                "type": classify_script_pubkey(&output.script_pubkey).as_str(),
                "address": script_pubkey_to_address(&output.script_pubkey, network),
            })
        })
        .collect::<Vec<_>>();
    Ok(json!({
        "txid": tx.txid_hex(),
        "wtxid": tx.wtxid_hex(),
        "version": tx.version,
        "locktime": tx.lock_time,
        "lockTimeEnabled": tx.lock_time_enabled(),
        "segwit": tx.is_segwit(),
        "size": tx.size(),
        "weight": tx.weight(),
        "vsize": tx.vsize(),
        "vin": vin,
        "vout": vout,
    }))
}

fn describe(raw: &str, requested: Option<Network>, network: Network) -> Result<Value, CliError> {
    let descriptor = Descriptor::parse(raw)?;
    if let Some(requested) = requested {
        descriptor.check_network(requested)?;
    }
    // Reported next to the parse result so a caller can still use it.
    let checksum_error = verify_checksum(raw).err().map(|err| err.to_string());
    let keys = descriptor
        .keys()
        .into_iter()
        .map(|key| {
            json!({
                "key": key.to_string(),
                "fingerprint": key.origin.as_ref().map(|origin| origin.fingerprint.to_string()),
                "path": key.origin.as_ref().map(|origin| origin.path.to_m_string()),
            })
        })
        .collect::<Vec<_>>();
    let kind = descriptor.kind().to_string();
    let threshold = descriptor.threshold();
    let first_address = descriptor.derive_address(0, network).ok();
    Ok(json!({
        "descriptor": descriptor.with_checksum().to_string_with_checksum(),
        "kind": kind,
        "threshold": threshold,
        "keys": keys,
        "checksumValid": checksum_error.is_none(),
        "checksumError": checksum_error,
        "firstAddress": first_address,
    }))
}

fn reconcile_fixture(path: &Path, default_network: Network) -> Result<Value, CliError> {
    let contents = fs::read_to_string(path)?;
    let fixture: WalletFixture = serde_json::from_str(&contents)?;
    let network = match fixture.network.as_deref() {
        Some(raw) => raw
            .parse::<Network>()
            .map_err(|err| CliError::Config(format!("{err} in {}", path.display())))?,
        None => default_network,
    };

    let source = MemorySource::new();
    for raw in &fixture.transactions {
        source.insert_transaction(raw)?;
    }
    for (height, timestamp) in &fixture.block_times {
        source.set_block_time(*height, *timestamp);
    }
    for entry in &fixture.addresses {
        let script_hash = address_to_script_hash(entry.address.trim(), network)?;
        for item in &entry.history {
            source.add_history(&script_hash, item.clone());
        }
        for utxo in &entry.utxos {
            source.add_utxo(&script_hash, utxo.clone());
        }
        if let Some(balance) = entry.balance {
            source.set_balance(&script_hash, balance);
        }
    }

    let addresses = fixture
        .addresses
        .iter()
        .map(|entry| {
            fetch_address_activity(&source, &entry.address, entry.keychain, entry.index, network)
        })
        .collect::<Result<Vec<_>, _>>()?;
    log_info!(
        "reconciled {} addresses from {}",
        addresses.len(),
        path.display()
    );

    let Some(external) = fixture.external_descriptor else {
        return Ok(json!({ "addresses": addresses }));
    };
    let identity = resolve_account(
        &AccountPolicy::WatchOnly(KeySource::Descriptor {
            external,
            internal: fixture.internal_descriptor,
        }),
        network,
    )?;
    Ok(serde_json::to_value(build_account_view(&identity, &addresses))?)
}
