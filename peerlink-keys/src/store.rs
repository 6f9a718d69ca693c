//! Load-or-generate of the device keypair.

use std::path::Path;

use peerlink_common::logging::{Component, Logger};

use crate::error::{KeyError, Result};
use crate::persistence::{self, CreateOutcome, FileMode};
use crate::provider::{KeypairProvider, RSA_KEY_BITS};

/// Owns the on-disk lifecycle of the device private key.
///
/// A key file that exists but cannot be parsed is an error, never a reason
/// to generate a replacement: peers may already trust the matching
/// certificate.
pub struct IdentityStore<'a, B: KeypairProvider> {
    backend: &'a B,
    logger: Logger,
}

impl<'a, B: KeypairProvider> IdentityStore<'a, B> {
    pub fn new(backend: &'a B, logger: &Logger) -> Self {
        Self {
            backend,
            logger: logger.with_component(Component::Keys),
        }
    }

    /// Load the keypair at `path`, generating and persisting one if the file
    /// does not exist.
    pub fn ensure_key_pair(&self, path: &Path) -> Result<B::KeyPair> {
        if path.exists() {
            return self.load_key_pair(path);
        }

        self.logger.info(format!(
            "No private key at {}, generating RSA-{RSA_KEY_BITS}",
            path.display()
        ));
        let key = self.backend.generate_keypair(RSA_KEY_BITS)?;
        let pem = self.backend.export_private_key_pem(&key)?;

        match persistence::create_new(path, &pem, FileMode::Private) {
            Ok(CreateOutcome::Created) => {
                self.logger
                    .info_args(format_args!("Private key written to {}", path.display()));
                Ok(key)
            }
            Ok(CreateOutcome::AlreadyExists) => {
                self.logger.warn(format!(
                    "Private key at {} was created concurrently, using it",
                    path.display()
                ));
                self.load_key_pair(path)
            }
            Err(e) => {
                self.logger.error(format!(
                    "Failed to write private key {}: {e}",
                    path.display()
                ));
                Err(KeyError::GenerationError(format!(
                    "Failed to write private key to {}: {e}",
                    path.display()
                )))
            }
        }
    }

    /// Load an existing keypair. The key must be RSA-2048.
    pub fn load_key_pair(&self, path: &Path) -> Result<B::KeyPair> {
        self.logger
            .debug(format!("Loading private key from {}", path.display()));
        let pem = persistence::read_existing(path)?;

        let key = self.backend.import_private_key_pem(&pem).map_err(|e| {
            self.logger
                .error(format!("Private key {} rejected: {e}", path.display()));
            e
        })?;

        let bits = self.backend.key_bits(&key);
        if bits != RSA_KEY_BITS {
            self.logger.error(format!(
                "Private key {} has {bits} bit modulus",
                path.display()
            ));
            return Err(KeyError::ImportError(format!(
                "Private key at {} is {bits} bits, expected {RSA_KEY_BITS}",
                path.display()
            )));
        }

        Ok(key)
    }
}
