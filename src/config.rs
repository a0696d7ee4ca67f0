//! didicat configuration, persisted as TOML.
//!
//! Every field has a default, so an empty or partial file is valid. The CLI
//! reads `$XDG_CONFIG_HOME/didicat/config.toml` unless told otherwise.

use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::SearchSettings;
use crate::graph::query::is_valid_iri;
use crate::mapper::MapperConfig;

/// Errors from reading or writing the config file.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(didicat::config::read),
        help("Ensure the config file exists and is readable, or create one with `didicat config init`.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(didicat::config::parse),
        help("Check the TOML syntax in the config file. {message}")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(didicat::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config value for `{field}`: {message}")]
    #[diagnostic(code(didicat::config::invalid))]
    Invalid { field: &'static str, message: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DidicatConfig {
    /// Directory holding the on-disk store. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// Named graph for peers and other application objects.
    pub object_graph: String,
    /// Named graph for filter records.
    pub filter_graph: String,
    /// Link hops resolved when loading an object.
    pub max_link_depth: usize,
    /// Per-peer probe timeout in milliseconds.
    pub probe_timeout_ms: u64,
    /// Peers probed concurrently.
    pub max_parallel_probes: usize,
    /// Fresh filter keys tried before giving up.
    pub filter_key_attempts: usize,
}

impl Default for DidicatConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            object_graph: "http://mu.semte.ch/application".into(),
            filter_graph: "http://didicat.semte.ch/v0.1/graphs/filters".into(),
            max_link_depth: 4,
            probe_timeout_ms: 5000,
            max_parallel_probes: 8,
            filter_key_attempts: 5,
        }
    }
}

impl DidicatConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise the defaults.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Reject values no component can work with.
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, graph) in [
            ("object_graph", &self.object_graph),
            ("filter_graph", &self.filter_graph),
        ] {
            if !is_valid_iri(graph) {
                return Err(ConfigError::Invalid {
                    field,
                    message: format!("{graph:?} is not an IRI"),
                });
            }
        }
        if self.probe_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "probe_timeout_ms",
                message: "must be > 0".into(),
            });
        }
        Ok(())
    }

    /// Directory of the oxigraph store, if persistent.
    pub fn store_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("oxigraph"))
    }

    pub fn mapper_config(&self) -> MapperConfig {
        MapperConfig {
            default_graph: self.object_graph.clone(),
            max_link_depth: self.max_link_depth,
        }
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            max_parallel_probes: self.max_parallel_probes,
            filter_key_attempts: self.filter_key_attempts,
        }
    }
}
