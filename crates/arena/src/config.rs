//! Configuration file loading for the arena.
//!
//! Engines, match presets and timeout settings are read from `arena.toml`.
//! Everything is optional; a missing file yields the defaults.
//!
//! ```toml
//! [engines.candidate]
//! path = "./target/release/my-engine"
//! time = 0.2
//!
//! [engines.stockfish]
//! path = "/usr/bin/stockfish"
//! args = []
//! depth = 8
//!
//! [presets.quick]
//! games = 20
//! time = 0.1
//! opening = ["e2e4", "e7e5"]
//!
//! [timeouts]
//! grace_factor = 3.0
//! min_margin_ms = 500
//! ```

use crate::engine::{seconds_to_duration, SearchLimit, TimeoutPolicy};
use crate::game_runner::DEFAULT_MAX_PLIES;
use crate::match_runner::MatchConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Move time used when nothing else sets a limit.
pub const DEFAULT_MOVETIME_SECS: f64 = 0.5;

/// Errors that can occur when loading or resolving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Requested engine is neither configured nor an existing path.
    #[error("Engine not found: {0}")]
    EngineNotFound(String),
    /// Requested preset was not found in the configuration.
    #[error("Preset not found: {0}")]
    PresetNotFound(String),
    /// A time or depth setting cannot be used as a search limit.
    #[error("Invalid search limit: {0}")]
    InvalidLimit(String),
}

/// A UCI engine executable and its default search limit.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EngineConfig {
    /// Path to the engine executable.
    pub path: PathBuf,
    /// Extra command-line arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Seconds per move.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    /// Fixed search depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
}

impl EngineConfig {
    /// An engine given directly by path, with no settings of its own.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
            time: None,
            depth: None,
        }
    }
}

/// Reusable match settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PresetConfig {
    /// Number of games to play in a match. Defaults to 10.
    #[serde(default = "default_games")]
    pub games: u32,
    /// Seconds per move for both engines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    /// Search depth for both engines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    /// Forced opening moves in UCI notation.
    #[serde(default)]
    pub opening: Vec<String>,
    /// Adjudication limit in plies. Defaults to 500.
    #[serde(default = "default_max_plies")]
    pub max_plies: u32,
}

fn default_games() -> u32 {
    10
}

fn default_max_plies() -> u32 {
    DEFAULT_MAX_PLIES
}

/// The `[timeouts]` table; see [`TimeoutPolicy`].
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    pub grace_factor: f64,
    pub min_margin_ms: u64,
    pub depth_ceiling_ms: u64,
    pub handshake_ms: u64,
    pub shutdown_grace_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        let policy = TimeoutPolicy::default();
        Self {
            grace_factor: policy.grace_factor,
            min_margin_ms: policy.min_margin.as_millis() as u64,
            depth_ceiling_ms: policy.depth_ceiling.as_millis() as u64,
            handshake_ms: policy.handshake.as_millis() as u64,
            shutdown_grace_ms: policy.shutdown_grace.as_millis() as u64,
        }
    }
}

impl TimeoutConfig {
    /// Validates the table and converts it to a [`TimeoutPolicy`].
    pub fn to_policy(&self) -> Result<TimeoutPolicy, ConfigError> {
        if !self.grace_factor.is_finite() || self.grace_factor < 1.0 {
            return Err(ConfigError::InvalidLimit(format!(
                "grace_factor must be at least 1.0, got {}",
                self.grace_factor
            )));
        }
        Ok(TimeoutPolicy {
            grace_factor: self.grace_factor,
            min_margin: Duration::from_millis(self.min_margin_ms),
            depth_ceiling: Duration::from_millis(self.depth_ceiling_ms),
            handshake: Duration::from_millis(self.handshake_ms),
            shutdown_grace: Duration::from_millis(self.shutdown_grace_ms),
        })
    }
}

/// Settings given on the command line, which win over presets and engine
/// entries.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub preset: Option<String>,
    pub games: Option<u32>,
    pub time: Option<f64>,
    pub depth: Option<u32>,
    pub opening: Option<Vec<String>>,
    pub max_plies: Option<u32>,
}

/// Main arena configuration structure.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct ArenaConfig {
    /// Map of engine names to their configurations.
    #[serde(default)]
    pub engines: HashMap<String, EngineConfig>,
    /// Map of preset names to their configurations.
    #[serde(default)]
    pub presets: HashMap<String, PresetConfig>,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl ArenaConfig {
    /// Loads `arena.toml` from the working directory, or the defaults when
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads an explicitly named file; a missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Returns the default configuration file location.
    pub fn config_path() -> PathBuf {
        PathBuf::from("arena.toml")
    }

    /// Retrieves an engine configuration by name.
    pub fn get_engine(&self, name: &str) -> Result<&EngineConfig, ConfigError> {
        self.engines
            .get(name)
            .ok_or_else(|| ConfigError::EngineNotFound(name.to_string()))
    }

    /// Retrieves a preset by name.
    pub fn get_preset(&self, name: &str) -> Result<&PresetConfig, ConfigError> {
        self.presets
            .get(name)
            .ok_or_else(|| ConfigError::PresetNotFound(name.to_string()))
    }

    /// Resolves a command-line engine argument.
    ///
    /// Configured names are tried first. Anything else is accepted as a path
    /// if it contains a path separator or exists on disk.
    pub fn resolve_engine(&self, name_or_path: &str) -> Result<EngineConfig, ConfigError> {
        if let Ok(engine) = self.get_engine(name_or_path) {
            return Ok(engine.clone());
        }
        let path = Path::new(name_or_path);
        if name_or_path.contains(std::path::MAIN_SEPARATOR) || path.exists() {
            Ok(EngineConfig::from_path(path))
        } else {
            Err(ConfigError::EngineNotFound(name_or_path.to_string()))
        }
    }

    /// Builds the immutable match settings.
    ///
    /// Time and depth come from the command line, then the preset; when
    /// neither sets them each engine keeps its own entry's limit, falling
    /// back to [`DEFAULT_MOVETIME_SECS`].
    pub fn match_config(
        &self,
        candidate: &EngineConfig,
        reference: &EngineConfig,
        overrides: &Overrides,
    ) -> Result<MatchConfig, ConfigError> {
        let preset = overrides
            .preset
            .as_deref()
            .map(|name| self.get_preset(name))
            .transpose()?;

        let time = overrides.time.or(preset.and_then(|p| p.time));
        let depth = overrides.depth.or(preset.and_then(|p| p.depth));
        let limit_for = |engine: &EngineConfig| {
            if time.is_some() || depth.is_some() {
                search_limit(time, depth)
            } else {
                search_limit(engine.time, engine.depth)
            }
        };

        Ok(MatchConfig {
            games: overrides
                .games
                .or(preset.map(|p| p.games))
                .unwrap_or_else(default_games),
            candidate_limit: limit_for(candidate)?,
            reference_limit: limit_for(reference)?,
            opening: overrides
                .opening
                .clone()
                .or_else(|| preset.map(|p| p.opening.clone()))
                .unwrap_or_default(),
            max_plies: overrides
                .max_plies
                .or(preset.map(|p| p.max_plies))
                .unwrap_or(DEFAULT_MAX_PLIES),
        })
    }
}

/// Builds a search limit from optional seconds and depth, defaulting to
/// [`DEFAULT_MOVETIME_SECS`] when both are unset.
pub fn search_limit(time: Option<f64>, depth: Option<u32>) -> Result<SearchLimit, ConfigError> {
    let time = time.map(seconds_to_duration).transpose()?;
    if time.is_none() && depth.is_none() {
        return SearchLimit::from_seconds(DEFAULT_MOVETIME_SECS);
    }
    SearchLimit::new(time, depth)
}
