//! Configuration system: TOML file + env var overrides + defaults.
//!
//! The file only supplies defaults for the walk; command-line flags are layered
//! on top by the binary before a [`PolicyConfig`](crate::pruner::policy::PolicyConfig)
//! is built.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{PruneError, Result};

/// Full configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub defaults: DefaultsConfig,
    pub log: LogConfig,
}

/// Walk defaults applied before command-line flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DefaultsConfig {
    pub force: bool,
    pub verbose: bool,
    pub absolute_paths: bool,
    /// Maximum per-path depth; 0 means unlimited.
    pub max_depth: usize,
    pub remove_files: bool,
    pub remove_directories: bool,
}

/// Activity log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Append-only JSONL audit log; disabled when unset.
    pub jsonl_path: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            force: false,
            verbose: false,
            absolute_paths: false,
            max_depth: 0,
            remove_files: true,
            remove_directories: true,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            jsonl_path: None,
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl DefaultsConfig {
    /// Depth limit as the walker understands it.
    #[must_use]
    pub const fn depth_limit(&self) -> Option<usize> {
        if self.max_depth == 0 {
            None
        } else {
            Some(self.max_depth)
        }
    }
}

impl Config {
    /// Default configuration path (`$HOME/.config/stp/config.toml`).
    #[must_use]
    pub fn default_path() -> PathBuf {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[STP-CONFIG] WARNING: HOME not set, falling back to /tmp");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        home_dir.join(".config").join("stp").join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from the default path.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, env_var)
    }

    /// [`Config::load`] with an injectable environment lookup.
    pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| PruneError::Io {
                path: path_buf.clone(),
                source,
            })?;
            toml::from_str(&raw)?
        } else if path.is_some() {
            return Err(PruneError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.apply_env_overrides_from(lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut set_bool = |name: &str, slot: &mut bool| -> Result<()> {
            if let Some(raw) = lookup(name) {
                *slot = parse_env(name, &raw)?;
            }
            Ok(())
        };
        set_bool("STP_DEFAULTS_FORCE", &mut self.defaults.force)?;
        set_bool("STP_DEFAULTS_VERBOSE", &mut self.defaults.verbose)?;
        set_bool(
            "STP_DEFAULTS_ABSOLUTE_PATHS",
            &mut self.defaults.absolute_paths,
        )?;

        if let Some(raw) = lookup("STP_DEFAULTS_MAX_DEPTH") {
            self.defaults.max_depth = parse_env("STP_DEFAULTS_MAX_DEPTH", &raw)?;
        }
        if let Some(raw) = lookup("STP_LOG_JSONL_PATH") {
            self.log.jsonl_path = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup("STP_LOG_MAX_SIZE_BYTES") {
            self.log.max_size_bytes = parse_env("STP_LOG_MAX_SIZE_BYTES", &raw)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.log.max_size_bytes < 1024 {
            return Err(PruneError::InvalidConfig {
                details: format!(
                    "log.max_size_bytes ({}) must be >= 1024",
                    self.log.max_size_bytes
                ),
            });
        }
        if self.log.max_rotated_files == 0 {
            return Err(PruneError::InvalidConfig {
                details: "log.max_rotated_files must be >= 1".to_string(),
            });
        }
        if let Some(path) = &self.log.jsonl_path
            && path.as_os_str().is_empty()
        {
            return Err(PruneError::InvalidConfig {
                details: "log.jsonl_path must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| PruneError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
