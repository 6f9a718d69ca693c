use std::path::PathBuf;
use thiserror::Error;

/// Boxed cause carried by certificate construction failures
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for the peerlink-keys crate
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Import error: {0}")]
    ImportError(String),

    #[error("Key generation error: {0}")]
    GenerationError(String),

    #[error("Certificate build error: {context}")]
    CertificateBuildError {
        context: String,
        #[source]
        source: Option<BoxedCause>,
    },

    #[error("Missing certificate attribute: {0}")]
    MissingAttribute(String),

    #[error("Malformed identity: {0}")]
    MalformedIdentity(String),

    #[error("Invalid ciphertext length: expected {expected} bytes, got {actual}")]
    InvalidCiphertextLength { expected: usize, actual: usize },

    #[error("Decryption error: {0}")]
    DecryptionError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KeyError {
    /// Certificate construction failure with its underlying cause attached
    pub fn certificate_build<E>(context: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        KeyError::CertificateBuildError {
            context: context.into(),
            source: Some(Box::new(cause)),
        }
    }

    /// Certificate construction failure rejected before reaching the backend
    pub fn certificate_rejected(context: impl Into<String>) -> Self {
        KeyError::CertificateBuildError {
            context: context.into(),
            source: None,
        }
    }

    /// True for failures scoped to a single decrypt call; the identity stays usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            KeyError::InvalidCiphertextLength { .. } | KeyError::DecryptionError(_)
        )
    }
}

/// Result type for peerlink-keys operations
pub type Result<T> = std::result::Result<T, KeyError>;
