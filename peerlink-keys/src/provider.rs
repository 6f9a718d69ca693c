//! Capability traits over the cryptographic backend.
//!
//! The identity components only talk to these traits. A backend supplies
//! the primitives (key generation, PEM/DER codec, certificate signing, RSA
//! decryption); policy such as key size, validity arithmetic, file handling
//! and input validation lives in the components.

use crate::error::Result;

/// Modulus size of every device key
pub const RSA_KEY_BITS: u32 = 2048;

/// Public exponent of every device key (F4)
pub const RSA_PUBLIC_EXPONENT: u32 = 65537;

/// Subject and validity of a self-signed device certificate.
///
/// Issuer equals subject. Times are Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfSignedRequest<'a> {
    pub common_name: &'a str,
    pub organization: Option<&'a str>,
    pub organizational_unit: Option<&'a str>,
    pub not_before: i64,
    pub not_after: i64,
}

/// Asymmetric keypair generation and encoding
pub trait KeypairProvider {
    type KeyPair: Send + Sync;

    /// Generate an RSA keypair with exponent [`RSA_PUBLIC_EXPONENT`]
    fn generate_keypair(&self, bits: u32) -> Result<Self::KeyPair>;

    /// Parse a PEM private key (PKCS#1 or PKCS#8). Non-RSA keys are rejected.
    fn import_private_key_pem(&self, pem: &[u8]) -> Result<Self::KeyPair>;

    /// PKCS#1 PEM (`BEGIN RSA PRIVATE KEY`)
    fn export_private_key_pem(&self, key: &Self::KeyPair) -> Result<Vec<u8>>;

    /// PKCS#1 DER
    fn export_private_key_der(&self, key: &Self::KeyPair) -> Result<Vec<u8>>;

    /// SubjectPublicKeyInfo PEM (`BEGIN PUBLIC KEY`)
    fn export_public_key_pem(&self, key: &Self::KeyPair) -> Result<String>;

    /// SubjectPublicKeyInfo DER
    fn public_key_der(&self, key: &Self::KeyPair) -> Result<Vec<u8>>;

    fn key_bits(&self, key: &Self::KeyPair) -> u32;

    /// Modulus length in bytes; also the exact length of a valid ciphertext.
    fn modulus_size(&self, key: &Self::KeyPair) -> usize;
}

/// X.509 certificate construction and encoding
pub trait CertificateProvider: KeypairProvider {
    type Certificate: Send + Sync;

    /// Build and sign (SHA-256) a v3 certificate for `key` with basic
    /// constraints CA:TRUE, TLS client and server extended key usage, and
    /// subject/authority key identifiers derived from the public key.
    fn issue_self_signed(
        &self,
        key: &Self::KeyPair,
        request: &SelfSignedRequest<'_>,
    ) -> Result<Self::Certificate>;

    fn import_certificate_pem(&self, pem: &[u8]) -> Result<Self::Certificate>;

    fn export_certificate_pem(&self, certificate: &Self::Certificate) -> Result<Vec<u8>>;

    fn certificate_der(&self, certificate: &Self::Certificate) -> Result<Vec<u8>>;

    /// SubjectPublicKeyInfo DER of the key embedded in the certificate
    fn certificate_public_key_der(&self, certificate: &Self::Certificate) -> Result<Vec<u8>>;
}

/// Private-key operations on peer-supplied data
pub trait CipherProvider: KeypairProvider {
    /// Raw RSA private decryption with PKCS#1 v1.5 padding.
    ///
    /// Returns exactly the number of bytes the primitive produced.
    fn private_decrypt_pkcs1(&self, key: &Self::KeyPair, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// Everything a [`crate::DeviceIdentity`] needs from a backend
pub trait CryptoBackend: CertificateProvider + CipherProvider + Send + Sync {}

impl<T> CryptoBackend for T where T: CertificateProvider + CipherProvider + Send + Sync {}
