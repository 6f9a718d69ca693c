//! Configuration directory handling for the PeerLink CLI
//!
//! The identity settings themselves live in [`IdentityConfig`]; this module
//! only resolves where they are stored and wraps errors for the user.

use anyhow::{anyhow, Context, Result};
use peerlink_keys::IdentityConfig;
use std::path::{Path, PathBuf};

/// Directory name under the user's home
pub const DEFAULT_DIR_NAME: &str = ".peerlink";

/// `~/.peerlink`
pub fn default_config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_DIR_NAME))
        .ok_or_else(|| anyhow!("Could not determine home directory, pass --config-dir"))
}

/// Load the config in `config_dir`, or build defaults if there is none yet.
///
/// Returns whether the config already existed.
pub fn load_or_default(config_dir: &Path) -> Result<(IdentityConfig, bool)> {
    if IdentityConfig::exists(config_dir) {
        let config = IdentityConfig::load(config_dir)
            .with_context(|| format!("Failed to load config from {config_dir:?}"))?;
        Ok((config, true))
    } else {
        Ok((IdentityConfig::for_directory(config_dir), false))
    }
}

/// Load an existing config, pointing the user at `init` if there is none.
pub fn load_existing(config_dir: &Path) -> Result<IdentityConfig> {
    if !IdentityConfig::exists(config_dir) {
        return Err(anyhow!(
            "No configuration in {config_dir:?}. Run 'peerlink init' first."
        ));
    }
    IdentityConfig::load(config_dir)
        .with_context(|| format!("Failed to load config from {config_dir:?}"))
}

pub fn save(config: &IdentityConfig, config_dir: &Path) -> Result<()> {
    config
        .save(config_dir)
        .with_context(|| format!("Failed to write config to {config_dir:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let (config, existed) = load_or_default(temp_dir.path()).unwrap();

        assert!(!existed);
        assert_eq!(config, IdentityConfig::for_directory(temp_dir.path()));
        assert!(load_existing(temp_dir.path()).is_err());
    }

    #[test]
    fn saved_config_is_found() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = IdentityConfig::for_directory(temp_dir.path());
        config.ensure_device_id();
        save(&config, temp_dir.path()).unwrap();

        let (loaded, existed) = load_or_default(temp_dir.path()).unwrap();
        assert!(existed);
        assert_eq!(loaded, config);
        assert_eq!(load_existing(temp_dir.path()).unwrap(), config);
    }
}
