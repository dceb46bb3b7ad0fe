//! Error types for the SignalForm provider.

use thiserror::Error;

/// Errors returned by provider operations.
///
/// Every variant is terminal for the operation that produced it. Nothing in
/// this crate retries; the host decides whether to abort the apply.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credential resolution or provider setup failed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request never produced an HTTP response, or its body could not be read.
    #[error("Failed sending {method} request to SignalFx: {source}")]
    Transport {
        /// HTTP method of the failed request.
        method: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The vendor answered with a status the operation does not accept.
    #[error("For the resource {resource} SignalFx returned status {status}: \n{body}")]
    Api {
        /// Name of the declared resource.
        resource: String,
        /// HTTP status code returned by the vendor.
        status: u16,
        /// Raw response body, kept verbatim for diagnosis.
        body: String,
    },

    /// A successful response did not carry the expected `id`/`lastUpdated` shape.
    #[error("Failed unmarshaling for the resource {resource} during {phase}: {source}")]
    Decode {
        /// Name of the declared resource.
        resource: String,
        /// Operation phase: create, read or update.
        phase: &'static str,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// Declared configuration failed validation or typed parsing.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// The operation needs a remote id the state does not have.
    #[error("Resource has not been created: {0}")]
    NotCreated(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Get the error message as a string.
    ///
    /// Variants that wrap another error return a fixed description; use
    /// `Display` for the full text.
    pub fn message(&self) -> &str {
        match self {
            Self::Configuration(msg) => msg,
            Self::Transport { .. } => "transport error (see Display output)",
            Self::Api { body, .. } => body,
            Self::Decode { .. } => "decode error (see Display output)",
            Self::Validation(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::NotCreated(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
        }
    }

    /// HTTP status carried by a protocol error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn api(resource: &str, status: u16, body: &[u8]) -> Self {
        Self::Api {
            resource: resource.to_string(),
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }

    pub(crate) fn decode(resource: &str, phase: &'static str, source: serde_json::Error) -> Self {
        Self::Decode {
            resource: resource.to_string(),
            phase,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::Configuration("auth_token: required field is not set".to_string());
        assert_eq!(
            format!("{}", err),
            "Configuration error: auth_token: required field is not set"
        );

        let err = ProviderError::Validation("invalid input".to_string());
        assert_eq!(format!("{}", err), "Validation error: invalid input");

        let err = ProviderError::UnknownResource("signalform_widget".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: signalform_widget");
    }

    #[test]
    fn test_api_error_keeps_body_verbatim() {
        let err = ProviderError::api("cpu", 400, b"{\"message\":\"bad programText\"}");
        assert_eq!(err.status(), Some(400));
        assert_eq!(
            format!("{}", err),
            "For the resource cpu SignalFx returned status 400: \n{\"message\":\"bad programText\"}"
        );
        assert_eq!(err.message(), "{\"message\":\"bad programText\"}");
    }

    #[test]
    fn test_decode_error_names_phase() {
        let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = ProviderError::decode("cpu", "read", source);
        let text = format!("{}", err);
        assert!(text.starts_with("Failed unmarshaling for the resource cpu during read:"));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::NotCreated("cpu".to_string());
        assert_eq!(err.message(), "cpu");

        let err = ProviderError::Configuration("invalid config".to_string());
        assert_eq!(err.message(), "invalid config");
    }
}
