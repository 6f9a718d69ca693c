//! Recovery of the device UUID and other fields from a certificate.
//!
//! Parsing is done on the DER encoding with `x509-parser`, independent of
//! the backend that produced the certificate.

use x509_parser::extensions::ParsedExtension;
use x509_parser::prelude::*;

use crate::certificate::MAX_COMMON_NAME_LEN;
use crate::error::{KeyError, Result};
use crate::provider::CertificateProvider;

/// Decoded view of a device certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    /// X.509 version number as written in text (3 for v3)
    pub version: u32,
    /// Serial number, lowercase hex of the big-endian bytes
    pub serial_hex: String,
    /// Unix seconds
    pub not_before: i64,
    /// Unix seconds
    pub not_after: i64,
    /// ASN.1 time text, e.g. `Oct 19 08:30:00 2026 +00:00`
    pub not_before_text: String,
    pub not_after_text: String,
    pub common_name: Option<String>,
    pub organization: Option<String>,
    pub organizational_unit: Option<String>,
    /// Subject and issuer are byte-identical
    pub self_issued: bool,
    pub is_ca: bool,
    pub tls_client_auth: bool,
    pub tls_server_auth: bool,
    pub subject_key_id: Option<Vec<u8>>,
    pub authority_key_id: Option<Vec<u8>>,
}

fn parse(der: &[u8]) -> Result<X509Certificate<'_>> {
    let (_, certificate) = X509Certificate::from_der(der)
        .map_err(|e| KeyError::ImportError(format!("Failed to parse certificate: {e}")))?;
    Ok(certificate)
}

/// Extract the device UUID from the Subject CommonName of a DER certificate.
///
/// The decoded value is cut at the first NUL, as a C string would be, and
/// must still cover every byte of the encoded attribute. A name such as
/// `"<uuid>\0<junk>"` is therefore rejected instead of being read as
/// `<uuid>`.
pub fn device_id_from_der(der: &[u8]) -> Result<String> {
    let certificate = parse(der)?;
    let attribute = certificate
        .subject()
        .iter_common_name()
        .next()
        .ok_or_else(|| {
            KeyError::MissingAttribute("certificate subject has no CommonName".to_string())
        })?;

    let declared_len = attribute.attr_value().as_bytes().len();
    let decoded = attribute.as_str().map_err(|e| {
        KeyError::MalformedIdentity(format!("CommonName is not a text string: {e}"))
    })?;

    let terminated_len = decoded.find('\0').unwrap_or(decoded.len());
    if terminated_len != declared_len {
        return Err(KeyError::MalformedIdentity(format!(
            "CommonName length mismatch: {declared_len} bytes declared, {terminated_len} decoded"
        )));
    }

    let chars = decoded.chars().count();
    if chars > MAX_COMMON_NAME_LEN {
        return Err(KeyError::MalformedIdentity(format!(
            "CommonName is {chars} characters, at most {MAX_COMMON_NAME_LEN} allowed"
        )));
    }

    Ok(decoded.to_string())
}

fn first_text<'n, 'a: 'n>(
    mut values: impl Iterator<Item = &'n AttributeTypeAndValue<'a>>,
) -> Option<String> {
    values
        .next()
        .and_then(|attribute| attribute.as_str().ok())
        .map(str::to_string)
}

/// Decode the fields diagnostics and tests care about.
pub fn certificate_info_from_der(der: &[u8]) -> Result<CertificateInfo> {
    let certificate = parse(der)?;
    let subject = certificate.subject();

    let mut info = CertificateInfo {
        version: certificate.version().0 + 1,
        serial_hex: hex::encode(certificate.raw_serial()),
        not_before: certificate.validity().not_before.timestamp(),
        not_after: certificate.validity().not_after.timestamp(),
        not_before_text: certificate.validity().not_before.to_string(),
        not_after_text: certificate.validity().not_after.to_string(),
        common_name: first_text(subject.iter_common_name()),
        organization: first_text(subject.iter_organization()),
        organizational_unit: first_text(subject.iter_organizational_unit()),
        self_issued: subject.as_raw() == certificate.issuer().as_raw(),
        is_ca: false,
        tls_client_auth: false,
        tls_server_auth: false,
        subject_key_id: None,
        authority_key_id: None,
    };

    for extension in certificate.extensions() {
        match extension.parsed_extension() {
            ParsedExtension::BasicConstraints(constraints) => info.is_ca = constraints.ca,
            ParsedExtension::ExtendedKeyUsage(usage) => {
                info.tls_client_auth = usage.client_auth;
                info.tls_server_auth = usage.server_auth;
            }
            ParsedExtension::SubjectKeyIdentifier(key_id) => {
                info.subject_key_id = Some(key_id.0.to_vec())
            }
            ParsedExtension::AuthorityKeyIdentifier(authority) => {
                info.authority_key_id = authority
                    .key_identifier
                    .as_ref()
                    .map(|key_id| key_id.0.to_vec())
            }
            _ => {}
        }
    }

    Ok(info)
}

/// Backend-typed front end over the DER helpers
pub struct IdentityExtractor<'a, B: CertificateProvider> {
    backend: &'a B,
}

impl<'a, B: CertificateProvider> IdentityExtractor<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    pub fn extract_device_id(&self, certificate: &B::Certificate) -> Result<String> {
        device_id_from_der(&self.backend.certificate_der(certificate)?)
    }

    pub fn certificate_info(&self, certificate: &B::Certificate) -> Result<CertificateInfo> {
        certificate_info_from_der(&self.backend.certificate_der(certificate)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openssl_backend::{tests::shared_test_key, OpensslBackend};
    use openssl::asn1::Asn1Time;
    use openssl::hash::MessageDigest;
    use openssl::nid::Nid;
    use openssl::x509::{X509Builder, X509NameBuilder, X509};

    /// Hand-built certificate with arbitrary subject entries, bypassing the
    /// issuer's input checks.
    fn certificate_with_subject(entries: &[(Nid, &str)]) -> X509 {
        let key = shared_test_key();
        let mut name = X509NameBuilder::new().unwrap();
        for (nid, value) in entries {
            name.append_entry_by_nid(*nid, value).unwrap();
        }
        let name = name.build();

        let mut builder = X509Builder::new().unwrap();
        builder.set_version(2).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(key).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(1).unwrap())
            .unwrap();
        builder.sign(key, MessageDigest::sha256()).unwrap();
        builder.build()
    }

    fn extract(cert: &X509) -> Result<String> {
        IdentityExtractor::new(&OpensslBackend).extract_device_id(cert)
    }

    #[test]
    fn extracts_uuid_common_name() {
        let cert = certificate_with_subject(&[
            (Nid::ORGANIZATIONNAME, "Org"),
            (Nid::COMMONNAME, "11111111-1111-1111-1111-111111111111"),
        ]);
        assert_eq!(
            extract(&cert).unwrap(),
            "11111111-1111-1111-1111-111111111111"
        );
    }

    #[test]
    fn missing_common_name_is_reported() {
        let cert = certificate_with_subject(&[(Nid::ORGANIZATIONNAME, "Org")]);
        assert!(matches!(extract(&cert), Err(KeyError::MissingAttribute(_))));
    }

    #[test]
    fn embedded_nul_is_malformed() {
        let cert = certificate_with_subject(&[(
            Nid::COMMONNAME,
            "11111111-1111-1111-1111-111111111111\0x",
        )]);
        assert!(matches!(
            extract(&cert),
            Err(KeyError::MalformedIdentity(_))
        ));

        let short = certificate_with_subject(&[(Nid::COMMONNAME, "1111\0-1111")]);
        assert!(matches!(
            extract(&short),
            Err(KeyError::MalformedIdentity(_))
        ));
    }

    #[test]
    fn over_long_common_name_is_rejected_not_truncated() {
        let common_name = "11111111-1111-1111-1111-1111111111112";
        let cert = certificate_with_subject(&[(Nid::COMMONNAME, common_name)]);
        assert!(matches!(
            extract(&cert),
            Err(KeyError::MalformedIdentity(msg)) if msg.contains("37 characters")
        ));
    }

    #[test]
    fn info_reads_subject_and_validity() {
        let cert = certificate_with_subject(&[
            (Nid::ORGANIZATIONNAME, "Org"),
            (Nid::ORGANIZATIONALUNITNAME, "Unit"),
            (Nid::COMMONNAME, "abc"),
        ]);
        let info = IdentityExtractor::new(&OpensslBackend)
            .certificate_info(&cert)
            .unwrap();

        assert_eq!(info.common_name.as_deref(), Some("abc"));
        assert_eq!(info.organization.as_deref(), Some("Org"));
        assert_eq!(info.organizational_unit.as_deref(), Some("Unit"));
        assert!(info.self_issued);
        assert!(!info.is_ca);
        assert_eq!(info.subject_key_id, None);
        let window = info.not_after - info.not_before;
        assert!((86_399..=86_401).contains(&window));
        assert!(info.not_after_text.ends_with("+00:00"));
        assert_ne!(info.not_before_text, info.not_after_text);
    }

    #[test]
    fn garbage_der_is_import_error() {
        assert!(matches!(
            device_id_from_der(&[0x30, 0x03, 0x02, 0x01]),
            Err(KeyError::ImportError(_))
        ));
    }
}
