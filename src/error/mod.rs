//! Error Types
//!
//! Error hierarchy for the TSDB API client. All failures surface to the
//! direct caller; the library performs no automatic retries.

use std::time::Duration;
use thiserror::Error;

/// Root error type for the TSDB API client.
#[derive(Error, Debug)]
pub enum TsdbError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("authentication error: {0}")]
    Authentication(#[from] AuthenticationError),

    #[error("interactive authentication timed out after {waited:?}")]
    AuthenticationTimeout { waited: Duration },

    #[error("API request failed with status {status} {reason}: {message}")]
    RemoteApi {
        status: u16,
        reason: String,
        message: String,
    },

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("invalid response: {message}")]
    InvalidResponse { message: String },
}

impl TsdbError {
    /// Error code for log fields.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "TSDB_CONFIG",
            Self::Authentication(_) => "TSDB_AUTH",
            Self::AuthenticationTimeout { .. } => "TSDB_AUTH_TIMEOUT",
            Self::RemoteApi { .. } => "TSDB_REMOTE_API",
            Self::Network(_) => "TSDB_NETWORK",
            Self::InvalidResponse { .. } => "TSDB_RESPONSE",
        }
    }

    /// Whether the error means the caller has to sign in again.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            Self::Authentication(AuthenticationError::ProviderRejected { .. })
                | Self::AuthenticationTimeout { .. }
        )
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("unknown environment: {name}")]
    UnknownEnvironment { name: String },

    #[error("unknown access mode: {name}")]
    UnknownAccessMode { name: String },

    #[error("client secret is not valid base64: {message}")]
    InvalidClientSecret { message: String },

    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Authentication/authorization flow error.
#[derive(Error, Debug)]
pub enum AuthenticationError {
    /// The identity provider rejected a token or authorization-code exchange.
    #[error("provider rejected the exchange ({code}): {description}")]
    ProviderRejected { code: String, description: String },

    /// The authorization redirect carried an error instead of a code.
    #[error("authorization callback returned {error}: {}", description.as_deref().unwrap_or("no description"))]
    CallbackError {
        error: String,
        description: Option<String>,
    },

    #[error("authorization callback is missing the authorization code")]
    MissingAuthorizationCode,

    #[error("state parameter mismatch (expected {expected}, received {received})")]
    StateMismatch { expected: String, received: String },

    #[error("redirect listener failed: {message}")]
    ListenerFailed { message: String },
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("request timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Result type for TSDB API operations.
pub type TsdbResult<T> = Result<T, TsdbError>;

/// OAuth2 error response body from the identity provider.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProviderErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Build an [`AuthenticationError`] from a non-success token endpoint
/// response. Falls back to the HTTP status when the body is not the standard
/// OAuth2 error shape.
pub fn provider_error_from_response(status: u16, body: &str) -> AuthenticationError {
    match serde_json::from_str::<ProviderErrorResponse>(body) {
        Ok(response) => AuthenticationError::ProviderRejected {
            description: response
                .error_description
                .unwrap_or_else(|| response.error.clone()),
            code: response.error,
        },
        Err(_) => AuthenticationError::ProviderRejected {
            code: format!("http_{status}"),
            description: format!("token endpoint returned HTTP {status}"),
        },
    }
}
