use std::path::PathBuf;

use satsigner_consensus::Network;
use satsigner_keys::ScriptVersion;
use satsigner_log::{Format, Level, LogConfig};

use crate::config::{load_conf, parse_conf_bool, DEFAULT_CONF_FILE};
use crate::error::CliError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Decode(String),
    Inspect(String),
    ValidateKey {
        key: String,
        script_version: Option<ScriptVersion>,
    },
    ValidateAddress {
        address: String,
        script_version: Option<ScriptVersion>,
    },
    ValidatePath(String),
    ValidateFingerprint(String),
    Descriptor(String),
    Derive {
        mnemonic: String,
        script_version: ScriptVersion,
        passphrase: String,
    },
    ScriptHash(String),
    Reconcile(PathBuf),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    /// `None` unless set by flag or config file.
    pub network: Option<Network>,
    pub log: LogConfig,
    pub conf_path: Option<PathBuf>,
    pub unsupported_conf_keys: Vec<String>,
}

impl Settings {
    pub fn network(&self) -> Network {
        self.network.unwrap_or(Network::Bitcoin)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CliAction {
    PrintHelp,
    PrintVersion,
    Run { settings: Settings, command: Command },
}

pub fn parse_args() -> Result<CliAction, CliError> {
    parse_args_from(std::env::args().skip(1))
}

fn missing_value(flag: &str) -> CliError {
    CliError::Usage(format!("missing value for {flag}\n{}", usage()))
}

pub fn parse_args_from<I>(raw_args: I) -> Result<CliAction, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut settings = Settings::default();
    let mut network_set = false;
    let mut log_level_set = false;
    let mut log_format_set = false;
    let mut log_timestamps_set = false;
    let mut conf_path: Option<PathBuf> = None;
    let mut positional: Vec<String> = Vec::new();
    let mut args = raw_args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(CliAction::PrintHelp),
            "--version" | "-V" => return Ok(CliAction::PrintVersion),
            "--conf" => {
                let value = args.next().ok_or_else(|| missing_value("--conf"))?;
                conf_path = Some(PathBuf::from(value));
            }
            "--network" => {
                let value = args.next().ok_or_else(|| missing_value("--network"))?;
                let network = value.parse::<Network>().map_err(|err| {
                    CliError::Usage(format!("{err} (expected bitcoin|testnet|signet|regtest)"))
                })?;
                settings.network = Some(network);
                network_set = true;
            }
            "--log-level" => {
                let value = args.next().ok_or_else(|| missing_value("--log-level"))?;
                settings.log.level = Level::parse(&value).ok_or_else(|| {
                    CliError::Usage(format!(
                        "invalid log level '{value}' (expected error|warn|info|debug|trace)"
                    ))
                })?;
                log_level_set = true;
            }
            "--log-format" => {
                let value = args.next().ok_or_else(|| missing_value("--log-format"))?;
                settings.log.format = Format::parse(&value).ok_or_else(|| {
                    CliError::Usage(format!("invalid log format '{value}' (expected text|json)"))
                })?;
                log_format_set = true;
            }
            "--log-timestamps" => {
                settings.log.timestamps = true;
                log_timestamps_set = true;
            }
            "--no-log-timestamps" => {
                settings.log.timestamps = false;
                log_timestamps_set = true;
            }
            flag if flag.starts_with("--") => {
                return Err(CliError::Usage(format!("unknown option '{flag}'\n{}", usage())));
            }
            _ => positional.push(arg),
        }
    }

    let explicit_conf = conf_path.is_some();
    let conf_file = conf_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONF_FILE));
    match load_conf(&conf_file)? {
        Some(conf) => {
            for (key, values) in &conf {
                let Some(raw) = values.last() else {
                    continue;
                };
                let invalid = |what: &str| {
                    CliError::Config(format!(
                        "invalid {what} value '{raw}' for {key} in {}",
                        conf_file.display()
                    ))
                };
                match key.as_str() {
                    "network" => {
                        if !network_set {
                            settings.network =
                                Some(raw.parse::<Network>().map_err(|_| invalid("network"))?);
                        }
                    }
                    "loglevel" => {
                        if !log_level_set {
                            settings.log.level =
                                Level::parse(raw).ok_or_else(|| invalid("log level"))?;
                        }
                    }
                    "logformat" => {
                        if !log_format_set {
                            settings.log.format =
                                Format::parse(raw).ok_or_else(|| invalid("log format"))?;
                        }
                    }
                    "logtimestamps" => {
                        if !log_timestamps_set {
                            settings.log.timestamps =
                                parse_conf_bool(raw).ok_or_else(|| invalid("boolean"))?;
                        }
                    }
                    _ => settings.unsupported_conf_keys.push(key.clone()),
                }
            }
            settings.unsupported_conf_keys.sort();
            settings.conf_path = Some(conf_file);
        }
        None if explicit_conf => {
            return Err(CliError::Config(format!(
                "config file {} not found",
                conf_file.display()
            )));
        }
        None => {}
    }

    let mut positional = positional.into_iter();
    let Some(name) = positional.next() else {
        return Ok(CliAction::PrintHelp);
    };
    let command = match name.as_str() {
        "help" => return Ok(CliAction::PrintHelp),
        "version" => return Ok(CliAction::PrintVersion),
        "decode" => Command::Decode(required(&mut positional, "decode", "hex")?),
        "inspect" => Command::Inspect(required(&mut positional, "inspect", "hex")?),
        "validate-key" => Command::ValidateKey {
            key: required(&mut positional, "validate-key", "key")?,
            script_version: optional_script_version(positional.next())?,
        },
        "validate-address" => Command::ValidateAddress {
            address: required(&mut positional, "validate-address", "address")?,
            script_version: optional_script_version(positional.next())?,
        },
        "validate-path" => Command::ValidatePath(required(&mut positional, "validate-path", "path")?),
        "validate-fingerprint" => Command::ValidateFingerprint(required(
            &mut positional,
            "validate-fingerprint",
            "fingerprint",
        )?),
        "descriptor" => Command::Descriptor(required(&mut positional, "descriptor", "descriptor")?),
        "derive" => {
            let mnemonic = required(&mut positional, "derive", "mnemonic")?;
            let script_version = required(&mut positional, "derive", "script-version")?;
            Command::Derive {
                mnemonic,
                script_version: parse_script_version(&script_version)?,
                passphrase: positional.next().unwrap_or_default(),
            }
        }
        "scripthash" => Command::ScriptHash(required(&mut positional, "scripthash", "address")?),
        "reconcile" => Command::Reconcile(PathBuf::from(required(
            &mut positional,
            "reconcile",
            "fixture.json",
        )?)),
        other => {
            return Err(CliError::Usage(format!("unknown command '{other}'\n{}", usage())));
        }
    };
    if let Some(extra) = positional.next() {
        return Err(CliError::Usage(format!(
            "unexpected argument '{extra}' for {name}\n{}",
            usage()
        )));
    }

    Ok(CliAction::Run { settings, command })
}

fn required<I: Iterator<Item = String>>(
    args: &mut I,
    command: &str,
    what: &str,
) -> Result<String, CliError> {
    args.next()
        .ok_or_else(|| CliError::Usage(format!("{command} requires <{what}>\n{}", usage())))
}

fn parse_script_version(raw: &str) -> Result<ScriptVersion, CliError> {
    raw.parse::<ScriptVersion>()
        .map_err(|err| CliError::Usage(err.to_string()))
}

fn optional_script_version(raw: Option<String>) -> Result<Option<ScriptVersion>, CliError> {
    raw.as_deref().map(parse_script_version).transpose()
}

pub fn usage() -> String {
    [
        "Usage:",
        "  satsigner-cli [options] <command> [args]",
        "",
        "Commands:",
        "  decode <hex>                          Decode a raw transaction",
        "  inspect <hex>                         Field-tagged byte map of a raw transaction",
        "  validate-key <key> [script-version]   Check an extended public or private key",
        "  validate-address <addr> [script-version]",
        "  validate-path <path>                  Check a derivation path",
        "  validate-fingerprint <fp>             Check an 8 hex character fingerprint",
        "  descriptor <descriptor>               Parse a descriptor and verify its checksum",
        "  derive <mnemonic> <script-version> [passphrase]",
        "  scripthash <address>                  Electrum scripthash of an address",
        "  reconcile <fixture.json>              Reconcile wallet data from a fixture file",
        "",
        "Options:",
        "  --help, -h           Print this help and exit",
        "  --version, -V        Print version and exit",
        "  --conf <path>        Config file (default: ./satsigner.conf)",
        "  --network <net>      bitcoin|testnet|signet|regtest (default: bitcoin)",
        "  --log-level <level>  error|warn|info|debug|trace (default: warn)",
        "  --log-format <fmt>   text|json (default: text)",
        "  --log-timestamps     Prefix text log lines with a timestamp",
        "  --no-log-timestamps  Omit timestamps from text log lines",
        "",
        "Script versions: P2PKH, P2SH-P2WPKH, P2WPKH, P2TR",
    ]
    .join("\n")
}
