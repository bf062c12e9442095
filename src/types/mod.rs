//! Data structures: tokens, configuration, callbacks and tables.

pub mod callback;
pub mod config;
pub mod table;
pub mod token;

pub use callback::{CallbackParams, CapturedRedirect};
pub use config::{AccessMode, Config, Environment, EnvironmentUrls, OAuthConfig};
pub use table::{ts_data_to_rows, ts_metadata_to_rows, TsMetadataEntry, TsObservation};
pub use token::{Token, TokenResponse};
