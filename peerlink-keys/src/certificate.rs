//! Self-signed device certificate issuance
//!
//! The certificate binds the device UUID (Subject CommonName) to the device
//! keypair. Validity uses fixed 365-day years, so expiry drifts from the
//! calendar date by the number of leap days in the window.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use peerlink_common::logging::{Component, Logger};

use crate::error::{KeyError, Result};
use crate::persistence::{self, CreateOutcome, FileMode};
use crate::provider::{CertificateProvider, SelfSignedRequest};

/// Length of a UUID in canonical text form; the CommonName never exceeds it
pub const MAX_COMMON_NAME_LEN: usize = 36;

pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
pub const DAYS_PER_YEAR: i64 = 365;

/// Organization fields and lifetime of a device certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateProfile {
    pub organization: String,
    pub organizational_unit: String,
    pub years_valid: u32,
}

impl CertificateProfile {
    pub fn new(
        organization: impl Into<String>,
        organizational_unit: impl Into<String>,
        years_valid: u32,
    ) -> Self {
        Self {
            organization: organization.into(),
            organizational_unit: organizational_unit.into(),
            years_valid,
        }
    }
}

/// `[now, now + years * 365 days]` in Unix seconds
pub fn validity_window(now: i64, years_valid: u32) -> Result<(i64, i64)> {
    if years_valid == 0 {
        return Err(KeyError::certificate_rejected(
            "years_valid must be at least 1",
        ));
    }
    let lifetime = i64::from(years_valid)
        .checked_mul(DAYS_PER_YEAR * SECONDS_PER_DAY)
        .and_then(|secs| now.checked_add(secs))
        .ok_or_else(|| KeyError::certificate_rejected(format!("{years_valid} years overflows")))?;
    Ok((now, lifetime))
}

/// CommonName must be a non-empty UUID-sized string with no NUL byte.
pub fn validate_common_name(common_name: &str) -> Result<()> {
    if common_name.is_empty() {
        return Err(KeyError::certificate_rejected("device UUID is empty"));
    }
    if common_name.contains('\0') {
        return Err(KeyError::certificate_rejected(
            "device UUID contains a NUL byte",
        ));
    }
    if common_name.len() > MAX_COMMON_NAME_LEN {
        return Err(KeyError::certificate_rejected(format!(
            "device UUID is {} bytes, at most {MAX_COMMON_NAME_LEN} allowed",
            common_name.len()
        )));
    }
    Ok(())
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn unix_now() -> Result<i64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| KeyError::certificate_build("System clock is before the Unix epoch", e))?;
    i64::try_from(elapsed.as_secs())
        .map_err(|e| KeyError::certificate_build("System clock out of range", e))
}

/// Builds, persists and reloads the device's self-signed certificate
pub struct CertificateIssuer<'a, B: CertificateProvider> {
    backend: &'a B,
    logger: Logger,
}

impl<'a, B: CertificateProvider> CertificateIssuer<'a, B> {
    pub fn new(backend: &'a B, logger: &Logger) -> Self {
        Self {
            backend,
            logger: logger.with_component(Component::Certificate),
        }
    }

    /// Build and self-sign a certificate for `key` with CommonName `uuid`
    pub fn issue_certificate(
        &self,
        key: &B::KeyPair,
        uuid: &str,
        profile: &CertificateProfile,
    ) -> Result<B::Certificate> {
        validate_common_name(uuid)?;
        let (not_before, not_after) = validity_window(unix_now()?, profile.years_valid)?;

        let request = SelfSignedRequest {
            common_name: uuid,
            organization: non_empty(&profile.organization),
            organizational_unit: non_empty(&profile.organizational_unit),
            not_before,
            not_after,
        };

        self.logger.debug(format!(
            "Signing certificate for {uuid}, valid {} years",
            profile.years_valid
        ));
        let certificate = self.backend.issue_self_signed(key, &request).map_err(|e| {
            self.logger
                .error(format!("Certificate issuance failed: {e}"));
            e
        })?;
        Ok(certificate)
    }

    /// Issue a certificate and persist it PEM-encoded at `path`.
    ///
    /// If another process creates `path` first, its certificate is loaded
    /// and returned instead, provided it belongs to `key`.
    pub fn issue_to_path(
        &self,
        key: &B::KeyPair,
        path: &Path,
        uuid: &str,
        profile: &CertificateProfile,
    ) -> Result<B::Certificate> {
        let certificate = self.issue_certificate(key, uuid, profile)?;
        let pem = self.backend.export_certificate_pem(&certificate)?;

        match persistence::create_new(path, &pem, FileMode::Public) {
            Ok(CreateOutcome::Created) => {
                self.logger.info_args(format_args!(
                    "Certificate for {uuid} written to {}",
                    path.display()
                ));
                Ok(certificate)
            }
            Ok(CreateOutcome::AlreadyExists) => {
                self.logger.warn(format!(
                    "Certificate at {} was created concurrently, using it",
                    path.display()
                ));
                self.load_certificate(key, path)
            }
            Err(e) => Err(KeyError::certificate_build(
                format!("Failed to write certificate to {}", path.display()),
                e,
            )),
        }
    }

    /// Load the certificate at `path`, issuing one if the file does not exist.
    pub fn ensure_certificate(
        &self,
        key: &B::KeyPair,
        path: &Path,
        uuid: &str,
        profile: &CertificateProfile,
    ) -> Result<B::Certificate> {
        if path.exists() {
            return self.load_certificate(key, path);
        }
        self.logger
            .info(format!("No certificate at {}, issuing one", path.display()));
        self.issue_to_path(key, path, uuid, profile)
    }

    /// Load an existing certificate and check it was issued for `key`.
    pub fn load_certificate(&self, key: &B::KeyPair, path: &Path) -> Result<B::Certificate> {
        self.logger
            .debug(format!("Loading certificate from {}", path.display()));
        let pem = persistence::read_existing(path)?;
        let certificate = self.backend.import_certificate_pem(&pem).map_err(|e| {
            self.logger
                .error(format!("Certificate {} rejected: {e}", path.display()));
            e
        })?;

        let embedded = self.backend.certificate_public_key_der(&certificate)?;
        if embedded != self.backend.public_key_der(key)? {
            self.logger.error(format!(
                "Certificate {} does not belong to the device key",
                path.display()
            ));
            return Err(KeyError::ImportError(format!(
                "Certificate at {} was not issued for the device key",
                path.display()
            )));
        }

        Ok(certificate)
    }
}
