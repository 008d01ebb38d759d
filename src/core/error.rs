use thiserror::Error;

/// Errors that can occur while computing, building or signing fiscal documents.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FiscalError {
    /// An input value was rejected at the point of assignment.
    #[error("validation failed: {0}")]
    Validation(ValidationError),

    /// Builder encountered invalid or missing configuration.
    #[error("builder error: {0}")]
    Builder(String),

    /// Private key or certificate could not be loaded or do not belong together.
    #[error("credential error: {0}")]
    Credential(String),

    /// A cryptographic primitive failed while hashing or signing.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The document cannot be signed as requested.
    #[error("signature error: {0}")]
    Signature(String),

    /// XML generation or parsing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// Configuration could not be loaded or contains invalid values.
    #[error("config error: {0}")]
    Config(String),
}

impl FiscalError {
    /// Shorthand for a [`FiscalError::Validation`] on `field`.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(field, message))
    }
}

/// A single validation error with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated path to the invalid field (e.g. "number.register").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
