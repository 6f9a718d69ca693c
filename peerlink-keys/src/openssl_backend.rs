//! OpenSSL implementation of the provider traits.
//!
//! This is the only production backend. Keys are held as `PKey<Private>`
//! and certificates as `X509`, both immutable after construction and safe
//! to share across threads.

use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::{Padding, Rsa};
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, SubjectKeyIdentifier,
};
use openssl::x509::{X509Builder, X509Name, X509NameBuilder, X509};

use crate::error::{KeyError, Result};
use crate::provider::{
    CertificateProvider, CipherProvider, KeypairProvider, SelfSignedRequest, RSA_PUBLIC_EXPONENT,
};

/// Random serial width. The top bit is forced so the value is never zero.
const SERIAL_BITS: i32 = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct OpensslBackend;

impl OpensslBackend {
    pub fn new() -> Self {
        Self
    }

    fn build_name(request: &SelfSignedRequest<'_>) -> Result<X509Name> {
        let mut name_builder = X509NameBuilder::new()
            .map_err(|e| KeyError::certificate_build("Failed to create name builder", e))?;

        if let Some(organization) = request.organization {
            name_builder
                .append_entry_by_nid(Nid::ORGANIZATIONNAME, organization)
                .map_err(|e| KeyError::certificate_build("Failed to set organization", e))?;
        }
        if let Some(unit) = request.organizational_unit {
            name_builder
                .append_entry_by_nid(Nid::ORGANIZATIONALUNITNAME, unit)
                .map_err(|e| KeyError::certificate_build("Failed to set organizational unit", e))?;
        }
        name_builder
            .append_entry_by_nid(Nid::COMMONNAME, request.common_name)
            .map_err(|e| KeyError::certificate_build("Failed to set common name", e))?;

        Ok(name_builder.build())
    }

    fn asn1_time(unix_seconds: i64, label: &str) -> Result<Asn1Time> {
        Asn1Time::from_unix(unix_seconds.try_into().map_err(|_| {
            KeyError::certificate_rejected(format!("{label} {unix_seconds} is out of range"))
        })?)
        .map_err(|e| KeyError::certificate_build(format!("Failed to create {label} time"), e))
    }
}

impl KeypairProvider for OpensslBackend {
    type KeyPair = PKey<Private>;

    fn generate_keypair(&self, bits: u32) -> Result<PKey<Private>> {
        let exponent = BigNum::from_u32(RSA_PUBLIC_EXPONENT)
            .map_err(|e| KeyError::GenerationError(format!("Failed to create exponent: {e}")))?;
        let rsa = Rsa::generate_with_e(bits, &exponent)
            .map_err(|e| KeyError::GenerationError(format!("RSA generation failed: {e}")))?;
        PKey::from_rsa(rsa)
            .map_err(|e| KeyError::GenerationError(format!("Failed to wrap RSA key: {e}")))
    }

    fn import_private_key_pem(&self, pem: &[u8]) -> Result<PKey<Private>> {
        let pkey = PKey::private_key_from_pem(pem)
            .map_err(|e| KeyError::ImportError(format!("Failed to parse private key PEM: {e}")))?;
        let rsa = pkey
            .rsa()
            .map_err(|_| KeyError::ImportError("Private key is not an RSA key".to_string()))?;
        let consistent = rsa
            .check_key()
            .map_err(|e| KeyError::ImportError(format!("RSA key check failed: {e}")))?;
        if !consistent {
            return Err(KeyError::ImportError(
                "RSA key failed the consistency check".to_string(),
            ));
        }
        Ok(pkey)
    }

    fn export_private_key_pem(&self, key: &PKey<Private>) -> Result<Vec<u8>> {
        key.rsa()
            .and_then(|rsa| rsa.private_key_to_pem())
            .map_err(|e| KeyError::GenerationError(format!("Failed to encode private key: {e}")))
    }

    fn export_private_key_der(&self, key: &PKey<Private>) -> Result<Vec<u8>> {
        key.rsa()
            .and_then(|rsa| rsa.private_key_to_der())
            .map_err(|e| KeyError::GenerationError(format!("Failed to encode private key: {e}")))
    }

    fn export_public_key_pem(&self, key: &PKey<Private>) -> Result<String> {
        let pem = key
            .public_key_to_pem()
            .map_err(|e| KeyError::ImportError(format!("Failed to encode public key: {e}")))?;
        String::from_utf8(pem)
            .map_err(|e| KeyError::ImportError(format!("Public key PEM is not text: {e}")))
    }

    fn public_key_der(&self, key: &PKey<Private>) -> Result<Vec<u8>> {
        key.public_key_to_der()
            .map_err(|e| KeyError::ImportError(format!("Failed to encode public key: {e}")))
    }

    fn key_bits(&self, key: &PKey<Private>) -> u32 {
        key.bits()
    }

    fn modulus_size(&self, key: &PKey<Private>) -> usize {
        key.size()
    }
}

impl CertificateProvider for OpensslBackend {
    type Certificate = X509;

    fn issue_self_signed(
        &self,
        key: &PKey<Private>,
        request: &SelfSignedRequest<'_>,
    ) -> Result<X509> {
        let name = Self::build_name(request)?;

        let mut cert_builder = X509Builder::new()
            .map_err(|e| KeyError::certificate_build("Failed to create certificate builder", e))?;

        // X.509 v3 is encoded as 2
        cert_builder
            .set_version(2)
            .map_err(|e| KeyError::certificate_build("Failed to set version", e))?;

        let serial_number = {
            let mut bn = BigNum::new()
                .map_err(|e| KeyError::certificate_build("Failed to create BigNum", e))?;
            bn.rand(SERIAL_BITS, MsbOption::ONE, false)
                .map_err(|e| KeyError::certificate_build("Failed to generate random serial", e))?;
            bn.to_asn1_integer()
                .map_err(|e| KeyError::certificate_build("Failed to convert serial to ASN1", e))?
        };
        cert_builder
            .set_serial_number(&serial_number)
            .map_err(|e| KeyError::certificate_build("Failed to set serial number", e))?;

        cert_builder
            .set_subject_name(&name)
            .map_err(|e| KeyError::certificate_build("Failed to set subject name", e))?;
        cert_builder
            .set_issuer_name(&name)
            .map_err(|e| KeyError::certificate_build("Failed to set issuer name", e))?;

        let not_before = Self::asn1_time(request.not_before, "not_before")?;
        let not_after = Self::asn1_time(request.not_after, "not_after")?;
        cert_builder
            .set_not_before(&not_before)
            .map_err(|e| KeyError::certificate_build("Failed to set not_before", e))?;
        cert_builder
            .set_not_after(&not_after)
            .map_err(|e| KeyError::certificate_build("Failed to set not_after", e))?;

        cert_builder
            .set_pubkey(key)
            .map_err(|e| KeyError::certificate_build("Failed to set public key", e))?;

        let basic_constraints = BasicConstraints::new()
            .critical()
            .ca()
            .build()
            .map_err(|e| KeyError::certificate_build("Failed to create basic constraints", e))?;
        cert_builder
            .append_extension(basic_constraints)
            .map_err(|e| KeyError::certificate_build("Failed to add basic constraints", e))?;

        let extended_key_usage = ExtendedKeyUsage::new()
            .client_auth()
            .server_auth()
            .build()
            .map_err(|e| {
                KeyError::certificate_build("Failed to create extended key usage extension", e)
            })?;
        cert_builder
            .append_extension(extended_key_usage)
            .map_err(|e| {
                KeyError::certificate_build("Failed to add extended key usage extension", e)
            })?;

        // SKI must be on the certificate before AKI is derived from it
        let subject_key_id = SubjectKeyIdentifier::new()
            .build(&cert_builder.x509v3_context(None, None))
            .map_err(|e| KeyError::certificate_build("Failed to create subject key id", e))?;
        cert_builder
            .append_extension(subject_key_id)
            .map_err(|e| KeyError::certificate_build("Failed to add subject key id", e))?;

        let authority_key_id = AuthorityKeyIdentifier::new()
            .keyid(true)
            .build(&cert_builder.x509v3_context(None, None))
            .map_err(|e| KeyError::certificate_build("Failed to create authority key id", e))?;
        cert_builder
            .append_extension(authority_key_id)
            .map_err(|e| KeyError::certificate_build("Failed to add authority key id", e))?;

        cert_builder
            .sign(key, MessageDigest::sha256())
            .map_err(|e| KeyError::certificate_build("Failed to sign certificate", e))?;

        Ok(cert_builder.build())
    }

    fn import_certificate_pem(&self, pem: &[u8]) -> Result<X509> {
        X509::from_pem(pem)
            .map_err(|e| KeyError::ImportError(format!("Failed to parse certificate PEM: {e}")))
    }

    fn export_certificate_pem(&self, certificate: &X509) -> Result<Vec<u8>> {
        certificate
            .to_pem()
            .map_err(|e| KeyError::certificate_build("Failed to encode certificate PEM", e))
    }

    fn certificate_der(&self, certificate: &X509) -> Result<Vec<u8>> {
        certificate
            .to_der()
            .map_err(|e| KeyError::ImportError(format!("Failed to encode certificate DER: {e}")))
    }

    fn certificate_public_key_der(&self, certificate: &X509) -> Result<Vec<u8>> {
        certificate
            .public_key()
            .and_then(|public_key| public_key.public_key_to_der())
            .map_err(|e| {
                KeyError::ImportError(format!("Failed to read certificate public key: {e}"))
            })
    }
}

impl CipherProvider for OpensslBackend {
    /// Raw RSA followed by an explicit PKCS#1 v1.5 type 2 check.
    ///
    /// OpenSSL 3.2+ answers bad padding under `Padding::PKCS1` with a
    /// synthetic plaintext instead of an error, so the block is unpadded here.
    fn private_decrypt_pkcs1(&self, key: &PKey<Private>, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let rsa = key
            .rsa()
            .map_err(|e| KeyError::DecryptionError(format!("Key is not an RSA key: {e}")))?;

        let mut block = vec![0u8; rsa.size() as usize];
        let written = rsa
            .private_decrypt(ciphertext, &mut block, Padding::NONE)
            .map_err(|e| KeyError::DecryptionError(format!("RSA decryption failed: {e}")))?;
        block.truncate(written);

        strip_pkcs1_type2(&block)
    }
}

/// Shortest padding string PKCS#1 v1.5 allows
const PKCS1_MIN_PADDING: usize = 8;

/// Unpad `0x00 || 0x02 || PS || 0x00 || M` where PS is at least eight
/// non-zero bytes. Every malformed block gets the same error text.
fn strip_pkcs1_type2(block: &[u8]) -> Result<Vec<u8>> {
    let invalid = || KeyError::DecryptionError("invalid PKCS#1 v1.5 padding".to_string());

    match block {
        [0x00, 0x02, rest @ ..] => {
            let separator = rest.iter().position(|b| *b == 0).ok_or_else(invalid)?;
            if separator < PKCS1_MIN_PADDING {
                return Err(invalid());
            }
            Ok(rest[separator + 1..].to_vec())
        }
        _ => Err(invalid()),
    }
}
