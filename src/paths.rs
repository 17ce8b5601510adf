use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::{Path, PathBuf};

use crate::config_file::backup_path_for;

/// Environment variable that overrides the SSH config location
pub const CONFIG_ENV: &str = "SSHID_CONFIG";

/// All computed paths used by sshid
#[derive(Debug, Clone)]
pub struct Paths {
    /// ~
    pub home: PathBuf,
    /// ~/.ssh
    pub ssh_dir: PathBuf,
    /// ~/.ssh/config, unless overridden
    pub ssh_config: PathBuf,
}

impl Paths {
    /// Resolve paths from the user's home directory.
    ///
    /// `config_override` comes from `--config` / `SSHID_CONFIG` and may start with `~`.
    pub fn new(config_override: Option<&str>) -> Result<Self> {
        let base_dirs = BaseDirs::new().context("Failed to determine home directory")?;
        Ok(Self::with_home(base_dirs.home_dir(), config_override))
    }

    pub fn with_home(home: &Path, config_override: Option<&str>) -> Self {
        let ssh_dir = home.join(".ssh");
        let ssh_config = match config_override {
            Some(path) => crate::keys::expand_path(path, home),
            None => ssh_dir.join("config"),
        };

        Self {
            home: home.to_path_buf(),
            ssh_dir,
            ssh_config,
        }
    }

    /// ~/.ssh/config.bak
    pub fn ssh_config_backup(&self) -> PathBuf {
        backup_path_for(&self.ssh_config)
    }

    /// Expand a key path against this home directory
    pub fn expand(&self, path: &str) -> PathBuf {
        crate::keys::expand_path(path, &self.home)
    }
}
