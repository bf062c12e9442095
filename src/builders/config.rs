//! Configuration Builder
//!
//! Fluent builder for [`Config`]. Defaults target the production service;
//! every option can be overridden explicitly or through `TSDBAPI_*`
//! environment variables. Validation happens at build time: unknown
//! environment or access mode names and malformed secrets are rejected here,
//! not on first use.

use secrecy::SecretString;
use std::time::Duration;

use base64::Engine;

use crate::error::{ConfigurationError, TsdbError, TsdbResult};
use crate::types::{AccessMode, Config, Environment, EnvironmentUrls, OAuthConfig};

const DEFAULT_CLIENT_ID: &str = "tsdb-api";
// The published public-client secret, base64-encoded as in the service docs.
const DEFAULT_CLIENT_SECRET_B64: &str = "TXUydEpTNERpeXk3eVRjZVFRbHhteEV3a3JGWGlid3c=";
const DEFAULT_TOKEN_URL: &str =
    "https://keycloak.kof.ethz.ch/realms/main/protocol/openid-connect/token";
const DEFAULT_AUTH_URL: &str =
    "https://keycloak.kof.ethz.ch/realms/main/protocol/openid-connect/auth";
const DEFAULT_URL_PRODUCTION: &str = "https://tsdb-api.kof.ethz.ch/v2/";
const DEFAULT_URL_STAGING: &str = "https://tsdb-api.stage.kof.ethz.ch/v2/";
const DEFAULT_URL_TEST: &str = "http://localhost:3001/v2/";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(10);

/// Configuration builder.
pub struct ConfigBuilder {
    client_id: String,
    client_secret_base64: String,
    token_url: String,
    auth_url: String,
    url_production: String,
    url_staging: String,
    url_test: String,
    environment: String,
    access_mode: String,
    offline_token: Option<String>,
    read_before_release: bool,
    callback_port: u16,
    auth_timeout: Duration,
    timeout: Duration,
    safety_margin: Duration,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_secret_base64: DEFAULT_CLIENT_SECRET_B64.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            url_production: DEFAULT_URL_PRODUCTION.to_string(),
            url_staging: DEFAULT_URL_STAGING.to_string(),
            url_test: DEFAULT_URL_TEST.to_string(),
            environment: "production".to_string(),
            access_mode: "oauth".to_string(),
            offline_token: None,
            read_before_release: true,
            callback_port: 0,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            timeout: DEFAULT_TIMEOUT,
            safety_margin: DEFAULT_SAFETY_MARGIN,
        }
    }
}

impl ConfigBuilder {
    /// Create a builder with the service defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `TSDBAPI_*` environment variable overrides on top of the current
    /// values.
    pub fn from_env(mut self) -> Self {
        let mut read = |name: &str, target: &mut String| {
            if let Ok(value) = std::env::var(name) {
                *target = value;
            }
        };

        read("TSDBAPI_OAUTH_CLIENT_ID", &mut self.client_id);
        read("TSDBAPI_OAUTH_CLIENT_SECRET", &mut self.client_secret_base64);
        read("TSDBAPI_OAUTH_TOKEN_URL", &mut self.token_url);
        read("TSDBAPI_OAUTH_AUTH_URL", &mut self.auth_url);
        read("TSDBAPI_URL_PRODUCTION", &mut self.url_production);
        read("TSDBAPI_URL_STAGING", &mut self.url_staging);
        read("TSDBAPI_URL_TEST", &mut self.url_test);
        read("TSDBAPI_ENVIRONMENT", &mut self.environment);
        read("TSDBAPI_ACCESS_TYPE", &mut self.access_mode);

        if let Ok(value) = std::env::var("TSDBAPI_OAUTH_OFFLINE_TOKEN") {
            self.offline_token = Some(value);
        }
        if let Ok(value) = std::env::var("TSDBAPI_READ_BEFORE_RELEASE") {
            self.read_before_release = matches!(value.as_str(), "true" | "1" | "TRUE" | "True");
        }

        self
    }

    /// Set the OAuth client identifier.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the base64-encoded OAuth client secret.
    pub fn client_secret_base64(mut self, secret: impl Into<String>) -> Self {
        self.client_secret_base64 = secret.into();
        self
    }

    /// Set the token endpoint URL.
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Set the authorization endpoint URL.
    pub fn auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Set the production base URL.
    pub fn url_production(mut self, url: impl Into<String>) -> Self {
        self.url_production = url.into();
        self
    }

    /// Set the staging base URL.
    pub fn url_staging(mut self, url: impl Into<String>) -> Self {
        self.url_staging = url.into();
        self
    }

    /// Set the test base URL.
    pub fn url_test(mut self, url: impl Into<String>) -> Self {
        self.url_test = url.into();
        self
    }

    /// Select the named environment ("production", "staging" or "test").
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Select the access mode ("oauth", "public" or "preview").
    pub fn access_mode(mut self, access_mode: impl Into<String>) -> Self {
        self.access_mode = access_mode.into();
        self
    }

    /// Set an offline (non-expiring) refresh token for non-interactive use.
    pub fn offline_token(mut self, token: impl Into<String>) -> Self {
        self.offline_token = Some(token.into());
        self
    }

    /// Whether to read vintages before their official release.
    pub fn read_before_release(mut self, enabled: bool) -> Self {
        self.read_before_release = enabled;
        self
    }

    /// Fix the redirect listener port. Zero (the default) picks an ephemeral
    /// port.
    pub fn callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }

    /// Bound the wait for the browser redirect during interactive login.
    pub fn auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    /// Set the HTTP timeout for API and token endpoint requests.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the expiry safety margin.
    pub fn safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> TsdbResult<Config> {
        let environment: Environment = self.environment.parse()?;
        let access_mode: AccessMode = self.access_mode.parse()?;

        if self.client_id.is_empty() {
            return Err(TsdbError::Configuration(ConfigurationError::MissingField {
                field: "client_id".to_string(),
            }));
        }

        let secret_bytes = base64::engine::general_purpose::STANDARD
            .decode(self.client_secret_base64.as_bytes())
            .map_err(|e| ConfigurationError::InvalidClientSecret {
                message: e.to_string(),
            })?;
        let client_secret = String::from_utf8(secret_bytes).map_err(|e| {
            TsdbError::Configuration(ConfigurationError::InvalidClientSecret {
                message: e.to_string(),
            })
        })?;

        for (field, url) in [
            ("token_url", &self.token_url),
            ("auth_url", &self.auth_url),
            ("url_production", &self.url_production),
            ("url_staging", &self.url_staging),
            ("url_test", &self.url_test),
        ] {
            if url::Url::parse(url).is_err() {
                return Err(TsdbError::Configuration(ConfigurationError::InvalidEndpoint {
                    url: format!("{field}: {url}"),
                }));
            }
        }

        Ok(Config {
            oauth: OAuthConfig {
                client_id: self.client_id,
                client_secret: SecretString::new(client_secret),
                token_url: self.token_url,
                auth_url: self.auth_url,
                offline_token: self.offline_token.map(SecretString::new),
                callback_port: self.callback_port,
                auth_timeout: self.auth_timeout,
            },
            environment,
            urls: EnvironmentUrls {
                production: self.url_production,
                staging: self.url_staging,
                test: self.url_test,
            },
            access_mode,
            read_before_release: self.read_before_release,
            timeout: self.timeout,
            safety_margin: self.safety_margin,
        })
    }
}

/// Create a new configuration builder.
pub fn tsdb_config() -> ConfigBuilder {
    ConfigBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TsdbError;

    #[test]
    fn test_defaults_build() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.access_mode, AccessMode::OAuth);
        assert_eq!(config.base_url(), DEFAULT_URL_PRODUCTION);
        assert_eq!(config.oauth.client_id, "tsdb-api");
        assert!(config.read_before_release);
        assert_eq!(config.safety_margin, Duration::from_secs(10));
    }

    #[test]
    fn test_environment_selects_base_url() {
        let config = ConfigBuilder::new()
            .environment("test")
            .url_test("http://localhost:3001/v2/")
            .build()
            .unwrap();
        assert_eq!(config.base_url(), "http://localhost:3001/v2/");
        assert_eq!(config.api_url("ts"), "http://localhost:3001/v2/ts");
    }

    #[test]
    fn test_unknown_environment_rejected_at_build() {
        let result = ConfigBuilder::new().environment("qa").build();
        match result {
            Err(TsdbError::Configuration(ConfigurationError::UnknownEnvironment { name })) => {
                assert_eq!(name, "qa");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_access_mode_rejected_at_build() {
        let result = ConfigBuilder::new().access_mode("anonymous").build();
        assert!(matches!(
            result,
            Err(TsdbError::Configuration(ConfigurationError::UnknownAccessMode { .. }))
        ));
    }

    #[test]
    fn test_invalid_secret_rejected_at_build() {
        let result = ConfigBuilder::new().client_secret_base64("not!base64").build();
        assert!(matches!(
            result,
            Err(TsdbError::Configuration(ConfigurationError::InvalidClientSecret { .. }))
        ));
    }

    #[test]
    fn test_invalid_endpoint_rejected_at_build() {
        let result = ConfigBuilder::new().token_url("not a url").build();
        assert!(matches!(
            result,
            Err(TsdbError::Configuration(ConfigurationError::InvalidEndpoint { .. }))
        ));
    }

    #[test]
    fn test_client_secret_decoded() {
        use secrecy::ExposeSecret;
        // "secret" in base64.
        let config = ConfigBuilder::new()
            .client_secret_base64("c2VjcmV0")
            .build()
            .unwrap();
        assert_eq!(config.oauth.client_secret.expose_secret(), "secret");
    }

    #[test]
    fn test_offline_token_carried() {
        let config = ConfigBuilder::new().offline_token("offline-tok").build().unwrap();
        assert!(config.oauth.offline_token.is_some());
    }
}
