//! OS directory resolution for config and log files.

use std::io;
use std::path::{Path, PathBuf};

use vecmap_config::Config;

const APP_NAME: &str = "vecmap";

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The OS did not provide a configuration directory.
    #[error("could not determine OS configuration directory")]
    NoConfigDir,

    #[error("platform I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Where the viewer keeps its files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformDirs {
    /// Holds `config.ron`.
    pub config_dir: PathBuf,
    /// Holds the JSON log written by debug builds.
    pub log_dir: PathBuf,
}

impl PlatformDirs {
    /// Resolve platform directories without creating them.
    ///
    /// Logs go under the local data directory, falling back to the config
    /// directory on platforms without one.
    pub fn resolve() -> Result<Self, PlatformError> {
        let config_dir = Config::default_dir().map_err(|_| PlatformError::NoConfigDir)?;
        let log_dir = dirs::data_local_dir()
            .map(|dir| dir.join(APP_NAME).join("logs"))
            .unwrap_or_else(|| config_dir.join("logs"));
        Ok(Self {
            config_dir,
            log_dir,
        })
    }

    /// Directories rooted under `root`, for tests and portable installs.
    pub fn resolve_with_root(root: &Path) -> Self {
        let app_dir = root.join(APP_NAME);
        Self {
            config_dir: app_dir.join("config"),
            log_dir: app_dir.join("logs"),
        }
    }

    /// Replaces the config directory, e.g. from `--config`.
    #[must_use]
    pub fn with_config_dir(mut self, config_dir: Option<&Path>) -> Self {
        if let Some(dir) = config_dir {
            self.config_dir = dir.to_path_buf();
        }
        self
    }

    /// Create every directory on disk.
    pub fn create_dirs(&self) -> Result<(), PlatformError> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}
