use thiserror::Error;

/// Top-level error type for the Lightbox system.
///
/// Adapter-level failures are absorbed into per-tier write reports, remote
/// failures degrade reads to adapter-only merges, and only total failures
/// surface to callers. Subsystem crates return this type directly so the
/// `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LightboxError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("All storage backends failed")]
    AllBackendsFailed,

    #[error("Remote source unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Record not found: {id}")]
    RecordNotFound { id: String },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Import format invalid: {0}")]
    ImportFormatInvalid(String),

    #[error("Namespace error: {0}")]
    Namespace(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for LightboxError {
    fn from(err: toml::de::Error) -> Self {
        LightboxError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for LightboxError {
    fn from(err: toml::ser::Error) -> Self {
        LightboxError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for LightboxError {
    fn from(err: serde_json::Error) -> Self {
        LightboxError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Lightbox operations.
pub type Result<T> = std::result::Result<T, LightboxError>;
