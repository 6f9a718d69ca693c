//! PeerLink Common
//!
//! Shared utilities for the PeerLink pairing stack.
//!
//! This crate provides:
//! - Component-based structured logging with a device scope
//! - Certificate fingerprint formatting for out-of-band pairing checks

pub mod logging;

pub use logging::{Component, Logger};

/// Utility module for human-comparable certificate fingerprints
pub mod fingerprint {
    use sha2::{Digest, Sha256};

    /// SHA-256 of the given DER bytes as colon-separated uppercase hex pairs.
    ///
    /// The format matches what `openssl x509 -fingerprint -sha256` prints, so
    /// users can compare the value on both devices during pairing.
    pub fn sha256_fingerprint(der: &[u8]) -> String {
        let digest = Sha256::digest(der);
        digest
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(":")
    }
}
