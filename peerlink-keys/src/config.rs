//! Identity configuration stored as `config.json`

use serde::{Deserialize, Serialize};
use serde_json::{from_str, to_string_pretty};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::certificate::CertificateProfile;
use crate::error::{KeyError, Result};

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_KEY_FILE_NAME: &str = "private.pem";
pub const DEFAULT_CERT_FILE_NAME: &str = "certificate.pem";

pub const DEFAULT_ORGANIZATION: &str = "PeerLink";
pub const DEFAULT_ORGANIZATIONAL_UNIT: &str = "PeerLink Device";
pub const DEFAULT_YEARS_VALID: u32 = 10;

fn default_organization() -> String {
    DEFAULT_ORGANIZATION.to_string()
}

fn default_organizational_unit() -> String {
    DEFAULT_ORGANIZATIONAL_UNIT.to_string()
}

fn default_years_valid() -> u32 {
    DEFAULT_YEARS_VALID
}

/// Fresh random device id, lowercase hyphenated
pub fn new_device_id() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Where the identity lives and what goes into its certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// PKCS#1 PEM private key
    pub key_path: PathBuf,

    /// PEM certificate
    pub cert_path: PathBuf,

    /// Device UUID, assigned on first init
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    #[serde(default = "default_organization")]
    pub organization: String,

    #[serde(default = "default_organizational_unit")]
    pub organizational_unit: String,

    #[serde(default = "default_years_valid")]
    pub years_valid: u32,
}

impl IdentityConfig {
    /// Defaults with both identity files inside `dir`
    pub fn for_directory(dir: &Path) -> Self {
        Self {
            key_path: dir.join(DEFAULT_KEY_FILE_NAME),
            cert_path: dir.join(DEFAULT_CERT_FILE_NAME),
            device_id: None,
            organization: default_organization(),
            organizational_unit: default_organizational_unit(),
            years_valid: default_years_valid(),
        }
    }

    /// Load and validate `config.json` from `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let config_file = dir.join(CONFIG_FILE_NAME);
        let content = std::fs::read_to_string(&config_file).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => KeyError::FileNotFound(config_file.clone()),
            _ => KeyError::Io(e),
        })?;

        let config: IdentityConfig = from_str(&content).map_err(|e| {
            KeyError::Config(format!(
                "Failed to parse config file {}: {e}",
                config_file.display()
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate and write `config.json` into `dir`, creating it if needed
    pub fn save(&self, dir: &Path) -> Result<()> {
        self.validate()?;
        std::fs::create_dir_all(dir)?;

        let content = to_string_pretty(self)
            .map_err(|e| KeyError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(dir.join(CONFIG_FILE_NAME), content)?;
        Ok(())
    }

    pub fn exists(dir: &Path) -> bool {
        dir.join(CONFIG_FILE_NAME).exists()
    }

    pub fn validate(&self) -> Result<()> {
        if self.key_path.as_os_str().is_empty() {
            return Err(KeyError::Config("key_path is empty".to_string()));
        }
        if self.cert_path.as_os_str().is_empty() {
            return Err(KeyError::Config("cert_path is empty".to_string()));
        }
        if self.key_path == self.cert_path {
            return Err(KeyError::Config(
                "key_path and cert_path point to the same file".to_string(),
            ));
        }
        if self.years_valid == 0 {
            return Err(KeyError::Config(
                "years_valid must be at least 1".to_string(),
            ));
        }
        if let Some(device_id) = &self.device_id {
            validate_device_id(device_id)?;
        }
        Ok(())
    }

    /// Return the configured device id, assigning a fresh one if unset.
    pub fn ensure_device_id(&mut self) -> &str {
        self.device_id.get_or_insert_with(new_device_id)
    }

    pub fn profile(&self) -> CertificateProfile {
        CertificateProfile::new(
            self.organization.clone(),
            self.organizational_unit.clone(),
            self.years_valid,
        )
    }
}

fn validate_device_id(device_id: &str) -> Result<()> {
    // hyphenated form only; parse_str also accepts simple, braced and urn forms
    if device_id.len() != 36 {
        return Err(KeyError::Config(format!(
            "device_id {device_id:?} is not a hyphenated UUID"
        )));
    }
    Uuid::parse_str(device_id)
        .map_err(|e| KeyError::Config(format!("device_id {device_id:?} is invalid: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_place_files_in_directory() {
        let dir = Path::new("/var/lib/peerlink");
        let config = IdentityConfig::for_directory(dir);

        assert_eq!(config.key_path, dir.join("private.pem"));
        assert_eq!(config.cert_path, dir.join("certificate.pem"));
        assert_eq!(config.device_id, None);
        assert_eq!(
            config.profile(),
            CertificateProfile::new("PeerLink", "PeerLink Device", 10)
        );
    }

    #[test]
    fn save_then_load_keeps_device_id() {
        let dir = TempDir::new().unwrap();
        let mut config = IdentityConfig::for_directory(dir.path());
        let id = config.ensure_device_id().to_string();

        assert!(!IdentityConfig::exists(dir.path()));
        config.save(dir.path()).unwrap();
        assert!(IdentityConfig::exists(dir.path()));

        let loaded = IdentityConfig::load(dir.path()).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.device_id.as_deref(), Some(id.as_str()));
    }

    #[test]
    fn ensure_device_id_is_stable() {
        let mut config = IdentityConfig::for_directory(Path::new("."));
        let first = config.ensure_device_id().to_string();
        assert_eq!(config.ensure_device_id(), first);
        assert_eq!(first.len(), 36);
        assert_eq!(first, first.to_lowercase());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{ "key_path": "/k.pem", "cert_path": "/c.pem" }"#,
        )
        .unwrap();

        let config = IdentityConfig::load(dir.path()).unwrap();
        assert_eq!(config.organization, "PeerLink");
        assert_eq!(config.organizational_unit, "PeerLink Device");
        assert_eq!(config.years_valid, 10);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let base = IdentityConfig::for_directory(Path::new("/tmp/id"));

        let mut zero_years = base.clone();
        zero_years.years_valid = 0;
        assert!(matches!(zero_years.validate(), Err(KeyError::Config(_))));

        let mut empty_key = base.clone();
        empty_key.key_path = PathBuf::new();
        assert!(matches!(empty_key.validate(), Err(KeyError::Config(_))));

        let mut same_file = base.clone();
        same_file.cert_path = same_file.key_path.clone();
        assert!(matches!(same_file.validate(), Err(KeyError::Config(_))));

        let mut bad_id = base.clone();
        bad_id.device_id = Some("not-a-uuid".to_string());
        assert!(matches!(bad_id.validate(), Err(KeyError::Config(_))));

        let mut simple_form = base;
        simple_form.device_id = Some("11111111111111111111111111111111".to_string());
        assert!(matches!(simple_form.validate(), Err(KeyError::Config(_))));
    }

    #[test]
    fn unparseable_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").unwrap();
        assert!(matches!(
            IdentityConfig::load(dir.path()),
            Err(KeyError::Config(_))
        ));
        assert!(matches!(
            IdentityConfig::load(&dir.path().join("absent")),
            Err(KeyError::FileNotFound(_))
        ));
    }
}
