//! `satsigner.conf`: `key=value` lines, `#` or `;` comments, last value wins.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::CliError;

pub const DEFAULT_CONF_FILE: &str = "satsigner.conf";

/// Returns `None` when the file does not exist.
pub fn load_conf(path: &Path) -> Result<Option<HashMap<String, Vec<String>>>, CliError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(CliError::Io(err)),
    };
    Ok(Some(parse_conf(&contents)))
}

pub fn parse_conf(contents: &str) -> HashMap<String, Vec<String>> {
    let mut out: HashMap<String, Vec<String>> = HashMap::new();
    for raw_line in contents.lines() {
        let mut line = raw_line.trim();
        if let Some(idx) = line.find(['#', ';']) {
            line = &line[..idx];
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = match line.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => (line, "1"),
        };
        if key.is_empty() {
            continue;
        }
        out.entry(key.to_ascii_lowercase())
            .or_default()
            .push(value.to_string());
    }
    out
}

pub fn parse_conf_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.is_empty() {
        return Some(true);
    }
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conf_lines_and_comments() {
        let conf = parse_conf(
            "# satsigner\nnetwork = testnet ; trailing\n\nLogLevel=debug\nnetwork=signet\nlogtimestamps\n=ignored\n",
        );
        assert_eq!(
            conf.get("network").map(Vec::as_slice),
            Some(&["testnet".to_string(), "signet".to_string()][..])
        );
        assert_eq!(conf.get("loglevel").map(Vec::len), Some(1));
        assert_eq!(conf["logtimestamps"], vec!["1".to_string()]);
        assert!(!conf.contains_key(""));
    }

    #[test]
    fn conf_bool_values() {
        assert_eq!(parse_conf_bool(""), Some(true));
        assert_eq!(parse_conf_bool("YES"), Some(true));
        assert_eq!(parse_conf_bool("0"), Some(false));
        assert_eq!(parse_conf_bool("maybe"), None);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let path = Path::new("definitely-not-here/satsigner.conf");
        assert!(load_conf(path).expect("load").is_none());
    }
}
