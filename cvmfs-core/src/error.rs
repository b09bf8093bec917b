//! Error types for repository access.

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Errors that can occur while locating or querying a repository
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{location} not found")]
    RepositoryNotFound { location: String },

    #[error("{fqrn} ({kind})")]
    UnknownRepositoryType { fqrn: String, kind: String },

    #[error("{repository}: configuration field {field} not found")]
    ConfigurationNotFound { repository: String, field: String },

    #[error("{file_name:?} not found in {repository}")]
    FileNotFoundInRepository { repository: String, file_name: String },

    #[error("cannot start replication of {repository}")]
    CannotReplicate { repository: String },

    #[error("CVMFS is not installed ({} does not exist)", .config_root.display())]
    CvmfsNotInstalled { config_root: std::path::PathBuf },

    #[error("{fqrn}: malformed upstream storage {value:?}")]
    InvalidUpstreamStorage { fqrn: String, value: String },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    #[error("Invalid repository URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RepositoryError {
    /// Whether this error means the repository itself could not be located.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RepositoryNotFound { .. })
    }
}
