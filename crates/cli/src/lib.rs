//! Operator tool over the satsigner core: decode and inspect transactions,
//! validate key material, resolve descriptors and reconcile fixture data.

mod args;
mod commands;
mod config;
mod error;
pub mod fixture;

use satsigner_log::log_warn;

pub use args::{parse_args_from, usage, CliAction, Command, Settings};
pub use commands::execute;
pub use config::{parse_conf, parse_conf_bool};
pub use error::CliError;

pub fn run_entry() -> Result<(), CliError> {
    let (settings, command) = match args::parse_args()? {
        CliAction::PrintHelp => {
            println!("{}", usage());
            return Ok(());
        }
        CliAction::PrintVersion => {
            println!("satsigner-cli {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        CliAction::Run { settings, command } => (settings, command),
    };

    satsigner_log::init(settings.log);
    if !settings.unsupported_conf_keys.is_empty() {
        let conf = settings
            .conf_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        log_warn!(
            "ignoring unsupported keys in {conf}: {}",
            settings.unsupported_conf_keys.join(", ")
        );
    }

    let output = execute(&command, &settings)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
