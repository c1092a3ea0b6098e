// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! Layered configuration: built-in defaults, overridden by a TOML file,
//! overridden by `ATGATE_*` environment variables, overridden last by
//! explicit CLI flags.

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::GatewayError;

/// Resolved configuration for one gateway process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory of the filesystem queue.
    pub queue_root: PathBuf,
    /// Base URL of the PLC directory audit-log endpoint.
    pub plc_directory_base_url: String,
    /// Path to the JSON file mapping bot handles to their configuration.
    pub bot_config_path: PathBuf,
    /// `log` crate filter string, e.g. `"info"` or `"atgate_gateway=debug"`.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            queue_root: PathBuf::from("./queue"),
            plc_directory_base_url: "https://plc.directory".to_string(),
            bot_config_path: PathBuf::from("./bots.json"),
            log_level: "info".to_string(),
        }
    }
}

/// The subset of [`Config`]'s fields that a TOML file may set. Absent
/// keys fall back to [`Config::default`].
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FileConfig {
    queue_root: Option<PathBuf>,
    plc_directory_base_url: Option<String>,
    bot_config_path: Option<PathBuf>,
    log_level: Option<String>,
}

/// CLI-flag-level overrides, applied after defaults, file and
/// environment. `None` means "not given on the command line".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// `--queue-root`.
    pub queue_root: Option<PathBuf>,
    /// `--plc-directory-base-url`.
    pub plc_directory_base_url: Option<String>,
    /// `--bot-config`.
    pub bot_config_path: Option<PathBuf>,
    /// `--log-level`.
    pub log_level: Option<String>,
}

impl Config {
    /// Build a [`Config`] by layering, in increasing precedence:
    /// built-in defaults, an optional TOML file, `ATGATE_*` environment
    /// variables, and finally `overrides`.
    pub fn load(
        toml_path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Config, GatewayError> {
        let mut config = Config::default();

        if let Some(path) = toml_path {
            let text = std::fs::read_to_string(path)?;
            let file: FileConfig = toml::from_str(&text)
                .map_err(|e| GatewayError::Config(format!("{}: {}", path.display(), e)))?;
            if let Some(v) = file.queue_root {
                config.queue_root = v;
            }
            if let Some(v) = file.plc_directory_base_url {
                config.plc_directory_base_url = v;
            }
            if let Some(v) = file.bot_config_path {
                config.bot_config_path = v;
            }
            if let Some(v) = file.log_level {
                config.log_level = v;
            }
        }

        if let Ok(v) = env::var("ATGATE_QUEUE_ROOT") {
            config.queue_root = PathBuf::from(v);
        }
        if let Ok(v) = env::var("ATGATE_PLC_DIRECTORY_BASE_URL") {
            config.plc_directory_base_url = v;
        }
        if let Ok(v) = env::var("ATGATE_BOT_CONFIG_PATH") {
            config.bot_config_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("ATGATE_LOG_LEVEL") {
            config.log_level = v;
        }

        if let Some(v) = &overrides.queue_root {
            config.queue_root = v.clone();
        }
        if let Some(v) = &overrides.plc_directory_base_url {
            config.plc_directory_base_url = v.clone();
        }
        if let Some(v) = &overrides.bot_config_path {
            config.bot_config_path = v.clone();
        }
        if let Some(v) = &overrides.log_level {
            config.log_level = v.clone();
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_else_is_given() {
        let config = Config::load(None, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.queue_root, PathBuf::from("./queue"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atgate.toml");
        std::fs::write(&path, "logLevel = \"debug\"\n").unwrap();

        let config = Config::load(Some(&path), &ConfigOverrides::default()).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.plc_directory_base_url, "https://plc.directory");
    }

    #[test]
    fn overrides_win_over_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atgate.toml");
        std::fs::write(&path, "logLevel = \"debug\"\n").unwrap();

        let overrides = ConfigOverrides {
            log_level: Some("trace".to_string()),
            ..ConfigOverrides::default()
        };
        let config = Config::load(Some(&path), &overrides).unwrap();
        assert_eq!(config.log_level, "trace");
    }
}
