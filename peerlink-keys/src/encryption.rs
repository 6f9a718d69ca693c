//! RSA decryption of peer-supplied data.
//!
//! Peers encrypt small secrets against the device public key using
//! PKCS#1 v1.5 padding. That padding is fixed by the pairing wire format and
//! cannot be changed here without breaking existing peers, even though it is
//! exposed to padding-oracle attacks if callers leak failure details back to
//! the sender.
//!
//! A block decrypted with the wrong key, or corrupted in transit, fails the
//! padding check and is reported as [`KeyError::DecryptionError`]; no
//! substitute plaintext is ever returned.

use peerlink_common::logging::{Component, Logger};

use crate::error::{KeyError, Result};
use crate::provider::CipherProvider;

pub struct DecryptionEngine<'a, B: CipherProvider> {
    backend: &'a B,
    logger: Logger,
}

impl<'a, B: CipherProvider> DecryptionEngine<'a, B> {
    pub fn new(backend: &'a B, logger: &Logger) -> Self {
        Self {
            backend,
            logger: logger.with_component(Component::Cipher),
        }
    }

    /// Decrypt one RSA block.
    ///
    /// `ciphertext` must be exactly the modulus size (256 bytes for a
    /// 2048-bit key). Invalid padding is `DecryptionError`. Errors are
    /// scoped to this call.
    pub fn decrypt(&self, key: &B::KeyPair, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let expected = self.backend.modulus_size(key);
        if ciphertext.len() != expected {
            self.logger.debug_args(format_args!(
                "Rejecting {} byte ciphertext, expected {expected}",
                ciphertext.len()
            ));
            return Err(KeyError::InvalidCiphertextLength {
                expected,
                actual: ciphertext.len(),
            });
        }

        let plaintext = self
            .backend
            .private_decrypt_pkcs1(key, ciphertext)
            .map_err(|e| {
                self.logger.warn(format!("Decryption failed: {e}"));
                e
            })?;

        self.logger.debug_args(format_args!(
            "Decrypted {} bytes into {}",
            ciphertext.len(),
            plaintext.len()
        ));
        Ok(plaintext)
    }
}
