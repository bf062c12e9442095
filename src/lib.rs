//! # tsdbapi
//!
//! Client for a time series database API guarded by an OAuth2 identity
//! provider. Handles sign-in (interactive browser flow or offline token),
//! token renewal with a safety margin, and returns time series data and
//! metadata as flat typed tables.
//!
//! ## Example
//!
//! ```no_run
//! use tsdbapi::{ConfigBuilder, TsdbClient};
//!
//! # async fn run() -> tsdbapi::TsdbResult<()> {
//! let config = ConfigBuilder::new()
//!     .from_env()
//!     .environment("production")
//!     .build()?;
//! let client = TsdbClient::new(config);
//!
//! let rows = client.read_ts(&["ch.kof.barometer"], None, false).await?;
//! for row in rows {
//!     println!("{} {} {:?}", row.ts_key, row.time, row.value);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Non-interactive sessions
//!
//! Request an offline token once with [`TsdbClient::get_offline_token`] and
//! configure it via `ConfigBuilder::offline_token` (or the
//! `TSDBAPI_OAUTH_OFFLINE_TOKEN` environment variable) to avoid browser
//! sign-in entirely.

pub mod auth;
pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod types;

pub use auth::{Authorizer, BrowserOpener, LoopbackAuthorizer, SystemBrowser, TokenManager};
pub use builders::{tsdb_config, ConfigBuilder};
pub use client::TsdbClient;
pub use core::{HttpRequest, HttpResponse, HttpTransport, MockHttpTransport, ReqwestHttpTransport};
pub use error::{
    AuthenticationError, ConfigurationError, NetworkError, TsdbError, TsdbResult,
};
pub use types::{
    AccessMode, CallbackParams, CapturedRedirect, Config, Environment, EnvironmentUrls,
    OAuthConfig, Token, TokenResponse, TsMetadataEntry, TsObservation,
};
