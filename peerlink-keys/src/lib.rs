//! PeerLink Keys – device identity for peer pairing
//!
//! A device identity is an RSA-2048 keypair plus a self-signed X.509v3
//! certificate whose Subject CommonName carries the device UUID. Both are
//! persisted as PEM files and created lazily on first use.
//!
//! ```no_run
//! use std::path::Path;
//!
//! let identity = peerlink_keys::create_or_load_identity(
//!     Path::new("/var/lib/peerlink/private.pem"),
//!     Path::new("/var/lib/peerlink/certificate.pem"),
//!     "11111111-1111-1111-1111-111111111111",
//!     "Org",
//!     "Unit",
//!     10,
//! )?;
//! println!("{} {}", identity.device_id(), identity.fingerprint());
//! # Ok::<(), peerlink_keys::KeyError>(())
//! ```

pub mod certificate;
pub mod config;
pub mod encryption;
pub mod error;
pub mod extract;
pub mod identity;
pub mod openssl_backend;
pub mod persistence;
pub mod provider;
pub mod store;

use std::path::Path;

pub use certificate::{CertificateIssuer, CertificateProfile, MAX_COMMON_NAME_LEN};
pub use config::{new_device_id, IdentityConfig};
pub use encryption::DecryptionEngine;
pub use error::{KeyError, Result};
pub use extract::{CertificateInfo, IdentityExtractor};
pub use identity::DeviceIdentity;
pub use openssl_backend::OpensslBackend;
pub use provider::{
    CertificateProvider, CipherProvider, CryptoBackend, KeypairProvider, RSA_KEY_BITS,
    RSA_PUBLIC_EXPONENT,
};
pub use store::IdentityStore;

/// Create or load the device identity with the OpenSSL backend.
///
/// See [`DeviceIdentity::create_or_load`].
pub fn create_or_load_identity(
    key_path: &Path,
    cert_path: &Path,
    uuid: &str,
    organization: &str,
    organizational_unit: &str,
    years_valid: u32,
) -> Result<DeviceIdentity> {
    DeviceIdentity::create_or_load(
        key_path,
        cert_path,
        uuid,
        organization,
        organizational_unit,
        years_valid,
    )
}
