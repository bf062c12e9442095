//! Configuration Types
//!
//! Client configuration: identity provider endpoints, credentials, named
//! environments and access mode. Built once via
//! [`ConfigBuilder`](crate::builders::ConfigBuilder) and held by value.

use secrecy::SecretString;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigurationError;

/// Named API environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Production,
    Staging,
    Test,
}

impl FromStr for Environment {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "test" => Ok(Self::Test),
            other => Err(ConfigurationError::UnknownEnvironment {
                name: other.to_string(),
            }),
        }
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Test => "test",
        }
    }
}

/// How time series data is accessed.
///
/// `Public` and `Preview` bypass authentication: `Public` reads public time
/// series, `Preview` reads previews with the latest two years of data
/// missing. `OAuth` is fully authenticated access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessMode {
    OAuth,
    Public,
    Preview,
}

impl FromStr for AccessMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oauth" => Ok(Self::OAuth),
            "public" => Ok(Self::Public),
            "preview" => Ok(Self::Preview),
            other => Err(ConfigurationError::UnknownAccessMode {
                name: other.to_string(),
            }),
        }
    }
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OAuth => "oauth",
            Self::Public => "public",
            Self::Preview => "preview",
        }
    }

    /// Whether requests in this mode carry a bearer token.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::OAuth)
    }
}

/// Identity provider settings.
#[derive(Clone)]
pub struct OAuthConfig {
    /// OAuth client identifier.
    pub client_id: String,
    /// Decoded client secret.
    pub client_secret: SecretString,
    /// Token endpoint URL.
    pub token_url: String,
    /// Authorization endpoint URL.
    pub auth_url: String,
    /// Offline (non-expiring) refresh token for non-interactive sessions.
    pub offline_token: Option<SecretString>,
    /// Local port for the redirect listener. Zero picks an ephemeral port.
    pub callback_port: u16,
    /// How long to wait for the browser redirect before giving up.
    pub auth_timeout: Duration,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_url", &self.token_url)
            .field("auth_url", &self.auth_url)
            .field("offline_token", &self.offline_token.as_ref().map(|_| "[REDACTED]"))
            .field("callback_port", &self.callback_port)
            .field("auth_timeout", &self.auth_timeout)
            .finish()
    }
}

/// Base API URLs per environment.
#[derive(Clone, Debug)]
pub struct EnvironmentUrls {
    pub production: String,
    pub staging: String,
    pub test: String,
}

/// Complete client configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub oauth: OAuthConfig,
    pub environment: Environment,
    pub urls: EnvironmentUrls,
    pub access_mode: AccessMode,
    /// Whether to read time series vintages before their official release.
    /// Only has an effect for callers with pre-release access.
    pub read_before_release: bool,
    /// HTTP timeout for API and token endpoint requests.
    pub timeout: Duration,
    /// Slack subtracted from token expiry to avoid racing server-side expiry.
    pub safety_margin: Duration,
}

impl Config {
    /// Base API URL for the configured environment.
    pub fn base_url(&self) -> &str {
        match self.environment {
            Environment::Production => &self.urls.production,
            Environment::Staging => &self.urls.staging,
            Environment::Test => &self.urls.test,
        }
    }

    /// Absolute URL for an API path relative to the base URL.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}
