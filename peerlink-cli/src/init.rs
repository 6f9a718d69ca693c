//! Identity initialization command
//!
//! Creates the config (assigning a device id on first run) and then
//! creates or loads the identity files it points to.

use anyhow::{Context, Result};
use peerlink_common::logging::Logger;
use peerlink_keys::persistence::remove_if_exists;
use peerlink_keys::DeviceIdentity;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config;

pub struct InitCommand {
    config_dir: PathBuf,
    logger: Arc<Logger>,
}

impl InitCommand {
    pub fn new(config_dir: PathBuf, logger: Arc<Logger>) -> Self {
        Self { config_dir, logger }
    }

    /// Run init, printing the device id and fingerprint to `out`.
    ///
    /// With `force` the existing device id and identity files are discarded
    /// and a new identity is created.
    pub fn run(&self, force: bool, out: &mut dyn Write) -> Result<DeviceIdentity> {
        self.logger.info("Initializing PeerLink device identity");

        let (mut identity_config, existed) = config::load_or_default(&self.config_dir)?;

        if force {
            self.logger
                .warn("Force flag specified, rotating the device identity");
            identity_config.device_id = None;
            for path in [&identity_config.key_path, &identity_config.cert_path] {
                if remove_if_exists(path).with_context(|| format!("Failed to remove {path:?}"))? {
                    self.logger.info(format!("Removed {}", path.display()));
                }
            }
        }

        let assigned = identity_config.device_id.is_none();
        let device_id = identity_config.ensure_device_id().to_string();
        if assigned {
            self.logger.info(format!("Assigned device id {device_id}"));
        }
        if assigned || !existed {
            config::save(&identity_config, &self.config_dir)?;
        }

        let identity = DeviceIdentity::from_config(&identity_config, &self.logger)
            .context("Failed to create or load device identity")?;

        if identity.device_id() != device_id {
            self.logger.warn(format!(
                "Certificate carries device id {}, config says {device_id}",
                identity.device_id()
            ));
        }

        writeln!(out, "Device ID:   {}", identity.device_id())?;
        writeln!(out, "Fingerprint: {}", identity.fingerprint())?;
        writeln!(out, "Private key: {}", identity_config.key_path.display())?;
        writeln!(out, "Certificate: {}", identity_config.cert_path.display())?;

        Ok(identity)
    }
}
