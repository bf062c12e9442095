//! Token Manager
//!
//! Token lifecycle: decide before every authenticated request whether the
//! current token is still usable, refresh it, or run a full
//! re-authentication. Expiry checks apply a safety margin so a token that is
//! about to lapse is never sent.
//!
//! The decision matrix, checked against `now + safety_margin`:
//!
//! * no token: obtain one (offline refresh token if configured, interactive
//!   sign-in otherwise)
//! * refresh token expiring: full re-authentication
//! * access token expiring: refresh grant
//! * otherwise: reuse the token, no network traffic

use chrono::Utc;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::interactive::{Authorizer, LoopbackAuthorizer};
use crate::core::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::{provider_error_from_response, TsdbError, TsdbResult};
use crate::types::{CallbackParams, CapturedRedirect, Config, Token, TokenResponse};

/// Manages the client's OAuth2 token.
pub struct TokenManager<T: HttpTransport> {
    config: Config,
    transport: Arc<T>,
    authorizer: Arc<dyn Authorizer>,
}

impl<T: HttpTransport> TokenManager<T> {
    /// Create a manager with the interactive loopback authorizer.
    pub fn new(config: Config, transport: Arc<T>) -> Self {
        Self::with_authorizer(config, transport, Arc::new(LoopbackAuthorizer::default()))
    }

    /// Create a manager with a custom authorizer.
    pub fn with_authorizer(
        config: Config,
        transport: Arc<T>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            config,
            transport,
            authorizer,
        }
    }

    /// Return a token valid for at least the safety margin, obtaining or
    /// renewing one as needed. A still-valid token is returned unchanged
    /// without network traffic.
    pub async fn ensure_valid_token(&self, current: Option<&Token>) -> TsdbResult<Token> {
        let margin = self.config.safety_margin;
        let now = Utc::now();

        let token = match current {
            None => {
                debug!("no token yet, obtaining one");
                return self.obtain_token().await;
            }
            Some(token) => token,
        };

        if token.refresh_expires_within(margin, now) {
            info!("refresh token about to expire, re-authenticating");
            return self.obtain_token().await;
        }

        if token.access_expires_within(margin, now) {
            match &token.refresh_token {
                Some(refresh_token) => {
                    debug!("access token about to expire, refreshing");
                    return self.refresh(refresh_token).await;
                }
                None => {
                    info!("access token about to expire and no refresh token, re-authenticating");
                    return self.obtain_token().await;
                }
            }
        }

        Ok(token.clone())
    }

    /// Obtain a fresh token: from the configured offline token when present,
    /// via interactive sign-in otherwise.
    async fn obtain_token(&self) -> TsdbResult<Token> {
        if let Some(offline_token) = &self.config.oauth.offline_token {
            debug!("obtaining access token from offline token");
            return self.refresh(offline_token.expose_secret()).await;
        }

        let redirect = self.authorizer.authorize(&self.config).await?;
        self.exchange_code(&redirect, false).await
    }

    /// Run the interactive flow and return a non-expiring offline refresh
    /// token. The returned value must be treated like a secret.
    pub async fn mint_offline_token(&self) -> TsdbResult<String> {
        let redirect = self.authorizer.authorize(&self.config).await?;
        let token = self.exchange_code(&redirect, true).await?;
        token
            .refresh_token
            .ok_or_else(|| TsdbError::InvalidResponse {
                message: "token endpoint returned no refresh token for an offline exchange"
                    .to_string(),
            })
    }

    /// Refresh-token grant.
    async fn refresh(&self, refresh_token: &str) -> TsdbResult<Token> {
        let form = vec![
            ("grant_type", "refresh_token"),
            ("client_id", self.config.oauth.client_id.as_str()),
            ("client_secret", self.config.oauth.client_secret.expose_secret().as_str()),
            ("refresh_token", refresh_token),
        ];
        self.token_request(&form).await
    }

    /// Authorization-code grant. `offline` marks the exchange so the
    /// provider issues a non-expiring refresh token.
    async fn exchange_code(
        &self,
        redirect: &CapturedRedirect,
        offline: bool,
    ) -> TsdbResult<Token> {
        let params = CallbackParams::from_url(&redirect.url);
        let code = params.code.ok_or_else(|| {
            TsdbError::Authentication(
                crate::error::AuthenticationError::MissingAuthorizationCode,
            )
        })?;

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("client_id", self.config.oauth.client_id.as_str()),
            ("client_secret", self.config.oauth.client_secret.expose_secret().as_str()),
            ("code", code.as_str()),
            ("redirect_uri", redirect.redirect_uri.as_str()),
        ];
        if offline {
            form.push(("access_type", "offline"));
        }
        self.token_request(&form).await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> TsdbResult<Token> {
        let body = serde_urlencoded::to_string(form).map_err(|e| TsdbError::InvalidResponse {
            message: format!("failed to encode token request: {e}"),
        })?;

        let mut request = HttpRequest::post_form(&self.config.oauth.token_url, body);
        request.timeout = Some(self.config.timeout);

        let response = self.transport.send(request).await?;
        self.parse_token_response(response)
    }

    fn parse_token_response(&self, response: HttpResponse) -> TsdbResult<Token> {
        if !response.is_success() {
            return Err(provider_error_from_response(response.status, &response.body).into());
        }

        let parsed: TokenResponse =
            serde_json::from_str(&response.body).map_err(|e| TsdbError::InvalidResponse {
                message: format!("malformed token response: {e}"),
            })?;
        debug!(
            expires_in = parsed.expires_in,
            refresh_expires_in = parsed.refresh_expires_in,
            "token obtained"
        );
        Ok(Token::from_response(&parsed))
    }
}
