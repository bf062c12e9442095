//! Token Types
//!
//! The OAuth2 token owned by a client and the token endpoint response shape.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// Token response from the identity provider's token endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type (usually "Bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Refresh token lifetime in seconds. Keycloak reports 0 for offline
    /// (non-expiring) refresh tokens.
    #[serde(default)]
    pub refresh_expires_in: Option<u64>,
    /// Additional fields.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// The one live token of a client.
///
/// Created by the first authenticated call, replaced wholesale on full
/// re-authentication, updated on refresh. `obtained_at` is stamped when the
/// exchange that produced the token completed.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub obtained_at: DateTime<Utc>,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// Refresh token lifetime in seconds. Zero means non-expiring.
    pub refresh_expires_in: u64,
}

impl Token {
    /// Build a token from a token endpoint response, stamping `obtained_at`
    /// with the current time.
    pub fn from_response(response: &TokenResponse) -> Self {
        Self {
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone(),
            obtained_at: Utc::now(),
            expires_in: response.expires_in.unwrap_or(0),
            refresh_expires_in: response.refresh_expires_in.unwrap_or(0),
        }
    }

    pub fn access_expires_at(&self) -> DateTime<Utc> {
        self.obtained_at + Duration::seconds(self.expires_in as i64)
    }

    pub fn refresh_expires_at(&self) -> Option<DateTime<Utc>> {
        if self.refresh_expires_in == 0 {
            None
        } else {
            Some(self.obtained_at + Duration::seconds(self.refresh_expires_in as i64))
        }
    }

    /// True when the access token expires before `now + margin`.
    pub fn access_expires_within(&self, margin: std::time::Duration, now: DateTime<Utc>) -> bool {
        self.access_expires_at() < now + Duration::from_std(margin).unwrap_or_default()
    }

    /// True when the refresh token expires before `now + margin`.
    /// Non-expiring (offline) refresh tokens never report expiry.
    pub fn refresh_expires_within(&self, margin: std::time::Duration, now: DateTime<Utc>) -> bool {
        match self.refresh_expires_at() {
            Some(at) => at < now + Duration::from_std(margin).unwrap_or_default(),
            None => false,
        }
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("obtained_at", &self.obtained_at)
            .field("expires_in", &self.expires_in)
            .field("refresh_expires_in", &self.refresh_expires_in)
            .finish()
    }
}
