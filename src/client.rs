//! TSDB API Client
//!
//! The client object: owns the configuration, the HTTP transport, the token
//! manager and the one live token. All read operations go through
//! [`TsdbClient::request`], which renews the token as needed before the API
//! call goes out.

use chrono::{Local, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::auth::{Authorizer, TokenManager};
use crate::core::{HttpRequest, HttpResponse, HttpTransport, ReqwestHttpTransport};
use crate::error::{TsdbError, TsdbResult};
use crate::types::{
    ts_data_to_rows, ts_metadata_to_rows, Config, Token, TsMetadataEntry, TsObservation,
};

/// Client for the time series database API.
///
/// Cheap to share behind an `Arc`; the token is renewed lazily on the first
/// request that needs it.
pub struct TsdbClient<T: HttpTransport = ReqwestHttpTransport> {
    config: Config,
    transport: Arc<T>,
    manager: TokenManager<T>,
    token: Mutex<Option<Token>>,
}

impl TsdbClient<ReqwestHttpTransport> {
    /// Create a client with the default HTTP transport.
    pub fn new(config: Config) -> Self {
        let transport = Arc::new(ReqwestHttpTransport::with_timeout(config.timeout));
        Self::with_transport(config, transport)
    }
}

impl<T: HttpTransport + 'static> TsdbClient<T> {
    /// Create a client with a custom HTTP transport.
    pub fn with_transport(config: Config, transport: Arc<T>) -> Self {
        let manager = TokenManager::new(config.clone(), Arc::clone(&transport));
        Self {
            config,
            transport,
            manager,
            token: Mutex::new(None),
        }
    }

    /// Create a client with a custom transport and authorizer.
    pub fn with_components(
        config: Config,
        transport: Arc<T>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        let manager =
            TokenManager::with_authorizer(config.clone(), Arc::clone(&transport), authorizer);
        Self {
            config,
            transport,
            manager,
            token: Mutex::new(None),
        }
    }

    /// Read time series by key. The vintage is selected by `valid_on`
    /// (today when omitted).
    pub async fn read_ts(
        &self,
        ts_keys: &[&str],
        valid_on: Option<NaiveDate>,
        ignore_missing: bool,
    ) -> TsdbResult<Vec<TsObservation>> {
        let data = self
            .request(
                "ts",
                vec![
                    ("keys".to_string(), ts_keys.join(",")),
                    ("df".to_string(), "Y-m-d".to_string()),
                    ("mime".to_string(), "json".to_string()),
                    ("valid_on".to_string(), format_valid_on(valid_on)),
                    (
                        "ignore_missing".to_string(),
                        bool_query_param(ignore_missing).to_string(),
                    ),
                ],
            )
            .await?;
        ts_data_to_rows(data)
    }

    /// Read all time series in a collection. `owner` is the collection
    /// owner's username, defaulting to the signed-in user.
    pub async fn read_collection_ts(
        &self,
        collection: &str,
        owner: Option<&str>,
        valid_on: Option<NaiveDate>,
        ignore_missing: bool,
    ) -> TsdbResult<Vec<TsObservation>> {
        let owner = owner.unwrap_or("self");
        let data = self
            .request(
                &format!("collections/{owner}/{collection}/ts"),
                vec![
                    ("df".to_string(), "Y-m-d".to_string()),
                    ("mime".to_string(), "json".to_string()),
                    ("valid_on".to_string(), format_valid_on(valid_on)),
                    (
                        "ignore_missing".to_string(),
                        bool_query_param(ignore_missing).to_string(),
                    ),
                ],
            )
            .await?;
        ts_data_to_rows(data)
    }

    /// Read time series metadata. `locale` selects the metadata language;
    /// omit it for unlocalized metadata.
    pub async fn read_ts_metadata(
        &self,
        ts_keys: &[&str],
        locale: Option<&str>,
        ignore_missing: bool,
    ) -> TsdbResult<Vec<TsMetadataEntry>> {
        let mut query = vec![("keys".to_string(), ts_keys.join(","))];
        if let Some(locale) = locale {
            query.push(("locale".to_string(), locale.to_string()));
        }
        query.push((
            "ignore_missing".to_string(),
            bool_query_param(ignore_missing).to_string(),
        ));

        let data = self.request("ts/metadata", query).await?;
        ts_metadata_to_rows(data)
    }

    /// Request a non-expiring offline refresh token via interactive sign-in.
    /// Store it in the configuration of non-interactive sessions; treat it
    /// like a secret.
    pub async fn get_offline_token(&self) -> TsdbResult<String> {
        self.manager.mint_offline_token().await
    }

    /// Send an authenticated GET request to an API path and parse the JSON
    /// response.
    async fn request(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> TsdbResult<serde_json::Value> {
        let mut request = HttpRequest::get(self.config.api_url(path), query);
        request.timeout = Some(self.config.timeout);

        if self.config.access_mode.is_authenticated() {
            // The lock is held across the validity check so concurrent
            // requests do not race each other into duplicate refreshes.
            let mut guard = self.token.lock().await;
            let token = self.manager.ensure_valid_token(guard.as_ref()).await?;
            request = request.with_header("authorization", token.authorization_header());
            *guard = Some(token);
        }

        debug!(path, "sending API request");
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(remote_error(&response));
        }

        serde_json::from_str(&response.body).map_err(|e| TsdbError::InvalidResponse {
            message: format!("malformed API response: {e}"),
        })
    }
}

fn format_valid_on(valid_on: Option<NaiveDate>) -> String {
    valid_on
        .unwrap_or_else(|| Local::now().date_naive())
        .format("%Y-%m-%d")
        .to_string()
}

fn bool_query_param(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        ""
    }
}

/// API error body shape.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

fn remote_error(response: &HttpResponse) -> TsdbError {
    let message = serde_json::from_str::<ApiErrorBody>(&response.body)
        .map(|body| body.message)
        .unwrap_or_else(|_| response.body.trim().to_string());
    TsdbError::RemoteApi {
        status: response.status,
        reason: response.status_text.clone(),
        message,
    }
}
