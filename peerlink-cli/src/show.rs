//! Print the device identity

use anyhow::{Context, Result};
use peerlink_common::logging::Logger;
use peerlink_keys::DeviceIdentity;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config;

pub struct ShowCommand {
    config_dir: PathBuf,
    logger: Arc<Logger>,
}

impl ShowCommand {
    pub fn new(config_dir: PathBuf, logger: Arc<Logger>) -> Self {
        Self { config_dir, logger }
    }

    /// Print id, fingerprint and validity; with `pem` print the public key instead.
    pub fn run(&self, pem: bool, out: &mut dyn Write) -> Result<()> {
        let identity = open_identity(&self.config_dir, &self.logger)?;

        if pem {
            write!(out, "{}", identity.public_key_pem()?)?;
            return Ok(());
        }

        let info = identity
            .certificate_info()
            .context("Failed to read certificate")?;
        writeln!(out, "Device ID:    {}", identity.device_id())?;
        writeln!(out, "Fingerprint:  {}", identity.fingerprint())?;
        writeln!(out, "Serial:       {}", info.serial_hex)?;
        writeln!(out, "Not before:   {}", info.not_before_text)?;
        writeln!(out, "Not after:    {}", info.not_after_text)?;
        if let Some(organization) = &info.organization {
            writeln!(out, "Organization: {organization}")?;
        }
        if let Some(unit) = &info.organizational_unit {
            writeln!(out, "Unit:         {unit}")?;
        }
        Ok(())
    }
}

/// Load the identity for a config directory that has already been initialized.
///
/// Unlike `init`, missing identity files are an error here rather than a
/// reason to create new ones.
pub fn open_identity(config_dir: &std::path::Path, logger: &Logger) -> Result<DeviceIdentity> {
    let identity_config = config::load_existing(config_dir)?;
    for path in [&identity_config.key_path, &identity_config.cert_path] {
        if !path.exists() {
            anyhow::bail!("Identity file {path:?} is missing. Run 'peerlink init' first.");
        }
    }
    DeviceIdentity::from_config(&identity_config, logger).context("Failed to load device identity")
}
