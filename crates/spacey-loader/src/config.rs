// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loader configuration
//!
//! Built from defaults, then an optional TOML file, then `SPACEY_LOADER_*`
//! environment variables, later sources winning.

use crate::error::{LoaderError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Prefix for environment overrides, e.g. `SPACEY_LOADER_ROOT`
pub const ENV_PREFIX: &str = "SPACEY_LOADER_";

/// Configuration for a [`ModuleLoader`](crate::ModuleLoader)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoaderConfig {
    /// Directory bundles are read from
    pub root: Option<PathBuf>,

    /// Accept a lone candidate even when its version misses the constraint
    pub single_candidate_shortcut: bool,

    /// Seconds to wait for a set of bundles before giving up (embedders only)
    pub fetch_timeout: Option<u64>,

    /// Default tracing filter
    pub log_level: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            root: None,
            single_candidate_shortcut: true,
            fetch_timeout: None,
            log_level: "info".to_string(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from `path` (or the default location) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.load_from_env(std::env::vars());
        Ok(config)
    }

    /// Read a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| LoaderError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse TOML config text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| LoaderError::Config(e.to_string()))
    }

    /// Apply `SPACEY_LOADER_*` overrides from an environment listing
    pub fn load_from_env(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                let config_key = config_key.to_lowercase().replace('_', "-");
                self.set(&config_key, &value);
            }
        }
    }

    /// Set a configuration value.
    pub fn set(&mut self, key: &str, value: &str) {
        match key {
            "root" => self.root = Some(PathBuf::from(value)),
            "single-candidate-shortcut" => self.single_candidate_shortcut = value == "true",
            "fetch-timeout" => match value.parse() {
                Ok(secs) => self.fetch_timeout = Some(secs),
                Err(_) => warn!("Ignoring invalid fetch-timeout '{}'", value),
            },
            "log-level" => self.log_level = value.to_string(),
            _ => warn!("Unknown loader config key '{}'", key),
        }
    }

    /// Get a configuration value.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "root" => self.root.as_ref().map(|p| p.display().to_string()),
            "single-candidate-shortcut" => Some(self.single_candidate_shortcut.to_string()),
            "fetch-timeout" => self.fetch_timeout.map(|secs| secs.to_string()),
            "log-level" => Some(self.log_level.clone()),
            _ => None,
        }
    }

    /// Bundle root, falling back to the working directory
    pub fn root_dir(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Fetch timeout as a duration
    pub fn timeout(&self) -> Option<Duration> {
        self.fetch_timeout.map(Duration::from_secs)
    }
}

/// Get the default config path.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("spacey").join("loader.toml"))
}
