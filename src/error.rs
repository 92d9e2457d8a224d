use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Record key prefix was not recognized
    #[error("Unclassified record: {0}")]
    Classification(String),

    /// A per-field transform failed (bad identifier name, unparseable value)
    #[error("Field transform error: {0}")]
    FieldTransform(String),

    /// The store rejected a document or batch as invalid
    #[error("Validation error: {0}")]
    Validation(String),

    /// A store call exceeded its deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Network-level failure talking to the store
    #[error("Network error: {0}")]
    Network(String),

    /// Store-side failure that is not a validation rejection
    #[error("Store error: {0}")]
    Store(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a failed batch submission should be split and retried
    /// document by document rather than failing the run.
    pub fn is_retriable_per_document(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::Timeout(_) | AppError::Store(_)
        )
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::Classification(_) => "UNCLASSIFIED_RECORD",
            AppError::FieldTransform(_) => "FIELD_TRANSFORM_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Timeout(_) => "TIMEOUT",
            AppError::Network(_) => "NETWORK_ERROR",
            AppError::Store(_) => "STORE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Conversion from reqwest::Error
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else if err.is_connect() {
            AppError::Network(err.to_string())
        } else {
            AppError::Store(err.to_string())
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
