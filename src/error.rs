//! Domain-specific error types for educheck

use thiserror::Error;

/// Main error type for the homework analysis pipeline
#[derive(Error, Debug)]
pub enum EduCheckError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A collaborator (segmenter, tagger, dictionary) could not do its job.
    /// No finding can be trusted without it, so the whole call fails.
    #[error("Capability unavailable: {capability}: {message}")]
    Capability {
        capability: &'static str,
        message: String,
    },

    #[error("Malformed input: {message}")]
    MalformedInput { message: String },

    #[error("Evaluation error: {message}")]
    Evaluation { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EduCheckError {
    pub fn malformed(message: impl Into<String>) -> Self {
        EduCheckError::MalformedInput {
            message: message.into(),
        }
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        EduCheckError::Evaluation {
            message: message.into(),
        }
    }

    pub fn capability(capability: &'static str, message: impl Into<String>) -> Self {
        EduCheckError::Capability {
            capability,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for EduCheckError {
    fn from(err: anyhow::Error) -> Self {
        EduCheckError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for EduCheckError {
    fn from(err: serde_json::Error) -> Self {
        EduCheckError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for EduCheckError {
    fn from(err: toml::de::Error) -> Self {
        EduCheckError::Config {
            message: format!("TOML parsing error: {}", err),
        }
    }
}

impl From<std::io::Error> for EduCheckError {
    fn from(err: std::io::Error) -> Self {
        EduCheckError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type alias for educheck operations
pub type Result<T> = std::result::Result<T, EduCheckError>;
