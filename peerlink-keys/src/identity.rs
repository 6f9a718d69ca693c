//! The device identity: one keypair plus the certificate binding it to the
//! device UUID.

use std::path::Path;

use peerlink_common::fingerprint::sha256_fingerprint;
use peerlink_common::logging::{Component, Logger};
use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs1KeyDer};

use crate::certificate::{CertificateIssuer, CertificateProfile};
use crate::config::IdentityConfig;
use crate::encryption::DecryptionEngine;
use crate::error::{KeyError, Result};
use crate::extract::{certificate_info_from_der, device_id_from_der, CertificateInfo};
use crate::openssl_backend::OpensslBackend;
use crate::provider::{CertificateProvider, CryptoBackend, KeypairProvider};
use crate::store::IdentityStore;

/// Loaded device identity.
///
/// Immutable after construction. Concurrent [`DeviceIdentity::decrypt`]
/// calls from several threads are safe.
pub struct DeviceIdentity<B: CryptoBackend = OpensslBackend> {
    backend: B,
    key_pair: B::KeyPair,
    certificate: B::Certificate,
    certificate_der: Vec<u8>,
    device_id: String,
    logger: Logger,
}

impl DeviceIdentity<OpensslBackend> {
    /// Load the identity stored at `key_path` / `cert_path`, creating
    /// whichever part is missing.
    ///
    /// `uuid`, `organization`, `organizational_unit` and `years_valid` only
    /// matter when a certificate has to be issued. An existing certificate
    /// keeps the device id it was issued with.
    pub fn create_or_load(
        key_path: &Path,
        cert_path: &Path,
        uuid: &str,
        organization: &str,
        organizational_unit: &str,
        years_valid: u32,
    ) -> Result<Self> {
        let logger = Logger::new_root(Component::Identity, "identity");
        let profile = CertificateProfile::new(organization, organizational_unit, years_valid);
        Self::create_or_load_with(OpensslBackend, &logger, key_path, cert_path, uuid, &profile)
    }

    /// Create or load the identity described by `config`.
    ///
    /// The config must carry a device id; see [`IdentityConfig::ensure_device_id`].
    pub fn from_config(config: &IdentityConfig, logger: &Logger) -> Result<Self> {
        config.validate()?;
        let uuid = config
            .device_id
            .as_deref()
            .ok_or_else(|| KeyError::Config("device_id is not set".to_string()))?;
        Self::create_or_load_with(
            OpensslBackend,
            logger,
            &config.key_path,
            &config.cert_path,
            uuid,
            &config.profile(),
        )
    }
}

impl<B: CryptoBackend> DeviceIdentity<B> {
    pub fn create_or_load_with(
        backend: B,
        logger: &Logger,
        key_path: &Path,
        cert_path: &Path,
        uuid: &str,
        profile: &CertificateProfile,
    ) -> Result<Self> {
        let logger = logger.with_component(Component::Identity);

        let key_pair = IdentityStore::new(&backend, &logger).ensure_key_pair(key_path)?;
        let certificate = CertificateIssuer::new(&backend, &logger)
            .ensure_certificate(&key_pair, cert_path, uuid, profile)?;

        let certificate_der = backend.certificate_der(&certificate)?;
        let device_id = device_id_from_der(&certificate_der)?;
        if device_id != uuid {
            logger.warn(format!(
                "Certificate at {} belongs to device {device_id}, ignoring requested {uuid}",
                cert_path.display()
            ));
        }

        let logger = logger.with_scope(device_id.clone());
        logger.info_args(format_args!(
            "Device identity ready, fingerprint {}",
            sha256_fingerprint(&certificate_der)
        ));

        Ok(Self {
            backend,
            key_pair,
            certificate,
            certificate_der,
            device_id,
            logger,
        })
    }

    /// UUID recovered from the certificate's Subject CommonName
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// SubjectPublicKeyInfo PEM (`BEGIN PUBLIC KEY`) for peers to encrypt against
    pub fn public_key_pem(&self) -> Result<String> {
        self.backend.export_public_key_pem(&self.key_pair)
    }

    /// Decrypt one PKCS#1 v1.5 block.
    ///
    /// A block of the wrong length is `InvalidCiphertextLength`; one that was
    /// encrypted for another key or corrupted is `DecryptionError`. Failures
    /// leave the identity usable.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        DecryptionEngine::new(&self.backend, &self.logger).decrypt(&self.key_pair, ciphertext)
    }

    pub fn certificate_pem(&self) -> Result<Vec<u8>> {
        self.backend.export_certificate_pem(&self.certificate)
    }

    pub fn certificate_der(&self) -> CertificateDer<'static> {
        CertificateDer::from(self.certificate_der.clone())
    }

    /// PKCS#1 DER of the private key, for handing to a TLS stack
    pub fn private_key_der(&self) -> Result<PrivateKeyDer<'static>> {
        let der = self.backend.export_private_key_der(&self.key_pair)?;
        Ok(PrivateKeyDer::Pkcs1(PrivatePkcs1KeyDer::from(der)))
    }

    /// SHA-256 of the certificate DER, colon-separated uppercase hex
    pub fn fingerprint(&self) -> String {
        sha256_fingerprint(&self.certificate_der)
    }

    pub fn certificate_info(&self) -> Result<CertificateInfo> {
        certificate_info_from_der(&self.certificate_der)
    }

    pub fn key_pair(&self) -> &B::KeyPair {
        &self.key_pair
    }

    pub fn certificate(&self) -> &B::Certificate {
        &self.certificate
    }
}

impl<B: CryptoBackend> std::fmt::Debug for DeviceIdentity<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("device_id", &self.device_id)
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const UUID: &str = "11111111-1111-1111-1111-111111111111";

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn identity_is_send_and_sync() {
        assert_send_sync::<DeviceIdentity>();
    }

    #[test]
    fn requested_uuid_is_ignored_for_existing_certificate() {
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("private.pem");
        let cert = dir.path().join("certificate.pem");

        let first = DeviceIdentity::create_or_load(&key, &cert, UUID, "Org", "Unit", 1).unwrap();
        let second = DeviceIdentity::create_or_load(
            &key,
            &cert,
            "22222222-2222-2222-2222-222222222222",
            "Other",
            "Other",
            5,
        )
        .unwrap();

        assert_eq!(second.device_id(), UUID);
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn exports_material_for_tls() {
        let dir = TempDir::new().unwrap();
        let identity = DeviceIdentity::create_or_load(
            &dir.path().join("private.pem"),
            &dir.path().join("certificate.pem"),
            UUID,
            "Org",
            "Unit",
            1,
        )
        .unwrap();

        let pem = identity.certificate_pem().unwrap();
        assert!(pem.starts_with(b"-----BEGIN CERTIFICATE-----"));
        let reparsed = OpensslBackend.import_certificate_pem(&pem).unwrap();
        assert_eq!(
            OpensslBackend.certificate_der(&reparsed).unwrap(),
            identity.certificate_der().as_ref()
        );

        match identity.private_key_der().unwrap() {
            PrivateKeyDer::Pkcs1(der) => {
                let rsa = openssl::rsa::Rsa::private_key_from_der(der.secret_pkcs1_der()).unwrap();
                assert_eq!(rsa.size(), 256);
            }
            other => panic!("unexpected key encoding: {other:?}"),
        }

        let fingerprint = identity.fingerprint();
        assert_eq!(fingerprint.len(), 32 * 3 - 1);
        assert_eq!(fingerprint, fingerprint.to_uppercase());
    }

    #[test]
    fn from_config_requires_device_id() {
        let dir = TempDir::new().unwrap();
        let logger = Logger::new_root(Component::Identity, "config-test");
        let mut config = IdentityConfig::for_directory(dir.path());

        assert!(matches!(
            DeviceIdentity::from_config(&config, &logger),
            Err(KeyError::Config(_))
        ));
        assert!(!config.key_path.exists());

        let id = config.ensure_device_id().to_string();
        let identity = DeviceIdentity::from_config(&config, &logger).unwrap();
        assert_eq!(identity.device_id(), id);

        let info = identity.certificate_info().unwrap();
        assert_eq!(info.organization.as_deref(), Some("PeerLink"));
        assert_eq!(info.organizational_unit.as_deref(), Some("PeerLink Device"));
    }

    #[test]
    fn missing_key_with_existing_certificate_is_not_reissued() {
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("private.pem");
        let cert = dir.path().join("certificate.pem");

        DeviceIdentity::create_or_load(&key, &cert, UUID, "Org", "Unit", 1).unwrap();
        let cert_bytes = fs::read(&cert).unwrap();
        fs::remove_file(&key).unwrap();

        let err = DeviceIdentity::create_or_load(&key, &cert, UUID, "Org", "Unit", 1).unwrap_err();
        assert!(matches!(err, KeyError::ImportError(_)));
        assert_eq!(fs::read(&cert).unwrap(), cert_bytes);
    }
}
