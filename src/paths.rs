//! XDG-compliant path resolution for didicat.
//!
//! Follows the XDG Base Directory Specification: configuration under
//! `$XDG_CONFIG_HOME/didicat/`, the triple store under `$XDG_DATA_HOME/didicat/`.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(didicat::paths::no_home),
        help("Set the HOME environment variable or pass --data-dir and --config explicitly.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(didicat::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Global directories for didicat.
#[derive(Debug, Clone)]
pub struct DidicatPaths {
    /// `$XDG_CONFIG_HOME/didicat/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/didicat/`
    pub data_dir: PathBuf,
}

fn xdg_dir(var: &str, home: &Path, fallback: &str) -> PathBuf {
    std::env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| home.join(fallback))
        .join("didicat")
}

impl DidicatPaths {
    /// Resolve from environment variables with the standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| PathError::NoHome)?;
        Ok(Self {
            config_dir: xdg_dir("XDG_CONFIG_HOME", &home, ".config"),
            data_dir: xdg_dir("XDG_DATA_HOME", &home, ".local/share"),
        })
    }

    /// Path to the config file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Create all base directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [&self.config_dir, &self.data_dir] {
            ensure_dir(dir)?;
        }
        Ok(())
    }
}

/// `create_dir_all` with a diagnostic error.
pub fn ensure_dir(dir: &Path) -> PathResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
        path: dir.display().to_string(),
        source: e,
    })
}
