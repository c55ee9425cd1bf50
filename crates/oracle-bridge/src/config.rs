//! Configuration loading for oracle-bridge.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// What to do with a line that is not a valid FEN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MalformedPolicy {
    /// Answer `error` and keep reading.
    #[default]
    Reply,
    /// Drop the connection and reopen both channels.
    AbortCycle,
}

impl FromStr for MalformedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reply" => Ok(MalformedPolicy::Reply),
            "abort-cycle" => Ok(MalformedPolicy::AbortCycle),
            other => Err(format!(
                "unknown policy '{}', expected 'reply' or 'abort-cycle'",
                other
            )),
        }
    }
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedPolicy::Reply => f.write_str("reply"),
            MalformedPolicy::AbortCycle => f.write_str("abort-cycle"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Channel the service reads FENs from.
    pub inbound: PathBuf,
    /// Channel the service writes counts to.
    pub outbound: PathBuf,
    pub on_malformed: MalformedPolicy,
    /// Stop after this many cycles; `None` serves forever.
    pub max_cycles: Option<u64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            inbound: PathBuf::from("/tmp/chess_fifo_in"),
            outbound: PathBuf::from("/tmp/chess_fifo_out"),
            on_malformed: MalformedPolicy::default(),
            max_cycles: None,
        }
    }
}

impl BridgeConfig {
    /// Looks for `bridge.toml` in the current directory or its parents,
    /// falling back to the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let paths = ["bridge.toml", "../bridge.toml", "../../bridge.toml"];

        for path in paths {
            let path = Path::new(path);
            if path.exists() {
                tracing::info!("Loaded config from {}", path.display());
                return Self::load_from(path);
            }
        }

        tracing::debug!("No bridge.toml found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_tmp_fifos() {
        let config: BridgeConfig = toml::from_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.inbound, PathBuf::from("/tmp/chess_fifo_in"));
        assert_eq!(config.outbound, PathBuf::from("/tmp/chess_fifo_out"));
        assert_eq!(config.on_malformed, MalformedPolicy::Reply);
        assert_eq!(config.max_cycles, None);
    }

    #[test]
    fn parse_full_config() {
        let config: BridgeConfig = toml::from_str(
            r#"
inbound = "/run/oracle/in"
outbound = "/run/oracle/out"
on_malformed = "abort-cycle"
max_cycles = 3
"#,
        )
        .unwrap();
        assert_eq!(config.inbound, PathBuf::from("/run/oracle/in"));
        assert_eq!(config.on_malformed, MalformedPolicy::AbortCycle);
        assert_eq!(config.max_cycles, Some(3));
    }

    #[test]
    fn policy_from_str() {
        assert_eq!("reply".parse(), Ok(MalformedPolicy::Reply));
        assert_eq!("abort-cycle".parse(), Ok(MalformedPolicy::AbortCycle));
        assert!("ignore".parse::<MalformedPolicy>().is_err());
        assert_eq!(MalformedPolicy::AbortCycle.to_string(), "abort-cycle");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        std::fs::write(&path, "max_cycles = 1\n").unwrap();
        let config = BridgeConfig::load_from(&path).unwrap();
        assert_eq!(config.max_cycles, Some(1));
        assert_eq!(config.inbound, BridgeConfig::default().inbound);

        std::fs::write(&path, "max_cycles = \"many\"\n").unwrap();
        assert!(matches!(
            BridgeConfig::load_from(&path),
            Err(ConfigError::ParseError(_))
        ));
    }
}
