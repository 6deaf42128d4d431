//! Translation failures and their error-response classification

use crate::config::ConfigError;
use thiserror::Error;
use tvlink_shared::{TransportError, VocabularyError};

pub type TranslateResult<T> = Result<T, TranslateError>;

#[derive(Error, Debug)]
pub enum TranslateError {
    /// Namespace/action combination outside the supported table
    #[error("Unsupported directive {namespace}.{name}")]
    Unsupported { namespace: String, name: String },

    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),

    /// A field the action needs is absent or malformed
    #[error("Directive {name} is missing {field}")]
    MissingField { name: String, field: &'static str },

    #[error("Failed to publish to {topic}: {error}")]
    Transport {
        topic: String,
        #[source]
        error: TransportError,
    },

    /// The request body is not a directive envelope
    #[error("Malformed directive: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TranslateError {
    /// Error type reported back to the assistant platform
    pub fn error_type(&self) -> &'static str {
        match self {
            TranslateError::Unsupported { .. }
            | TranslateError::Vocabulary(_)
            | TranslateError::MissingField { .. }
            | TranslateError::Malformed(_) => "INVALID_DIRECTIVE",
            TranslateError::Transport { .. } => "ENDPOINT_UNREACHABLE",
            TranslateError::Encode(_) | TranslateError::Config(_) => "INTERNAL_ERROR",
        }
    }

    /// True for directives outside the recognized table
    pub fn is_classification(&self) -> bool {
        self.error_type() == "INVALID_DIRECTIVE"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        let unsupported = TranslateError::Unsupported {
            namespace: "Alexa.PowerController".into(),
            name: "Toggle".into(),
        };
        assert_eq!(unsupported.error_type(), "INVALID_DIRECTIVE");
        assert!(unsupported.is_classification());

        let transport = TranslateError::Transport {
            topic: "tv_topic/tv1".into(),
            error: TransportError::Closed,
        };
        assert_eq!(transport.error_type(), "ENDPOINT_UNREACHABLE");
        assert!(!transport.is_classification());

        assert_eq!(
            TranslateError::from(ConfigError::Missing("BROKER_ADDRESS")).error_type(),
            "INTERNAL_ERROR"
        );
    }
}
