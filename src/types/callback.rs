//! Callback Types
//!
//! Parsing of the authorization redirect captured by the loopback listener.

use url::Url;

/// Query parameters of an authorization redirect.
#[derive(Clone, Debug)]
pub struct CallbackParams {
    /// Authorization code (on success).
    pub code: Option<String>,
    /// State parameter echoed by the provider.
    pub state: Option<String>,
    /// Error code (when authorization failed).
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse callback parameters from a redirect URL.
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self {
            code: None,
            state: None,
            error: None,
            error_description: None,
        };

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => params.code = Some(value.into_owned()),
                "state" => params.state = Some(value.into_owned()),
                "error" => params.error = Some(value.into_owned()),
                "error_description" => params.error_description = Some(value.into_owned()),
                _ => {}
            }
        }

        params
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.code.is_some() && self.error.is_none()
    }
}

/// Redirect captured by the loopback listener, handed to the code exchange.
#[derive(Clone, Debug)]
pub struct CapturedRedirect {
    /// Full redirect URL including query string.
    pub url: Url,
    /// The redirect URI the listener was registered under.
    pub redirect_uri: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_params_from_url() {
        let url = Url::parse("http://127.0.0.1:41321/?code=abc&state=xyz").unwrap();
        let params = CallbackParams::from_url(&url);

        assert_eq!(params.code, Some("abc".to_string()));
        assert_eq!(params.state, Some("xyz".to_string()));
        assert!(params.is_success());
        assert!(!params.is_error());
    }

    #[test]
    fn test_callback_params_error() {
        let url = Url::parse(
            "http://127.0.0.1:41321/?error=access_denied&error_description=User%20denied",
        )
        .unwrap();
        let params = CallbackParams::from_url(&url);

        assert!(params.code.is_none());
        assert_eq!(params.error, Some("access_denied".to_string()));
        assert_eq!(params.error_description, Some("User denied".to_string()));
        assert!(params.is_error());
        assert!(!params.is_success());
    }

    #[test]
    fn test_unknown_params_ignored() {
        let url = Url::parse("http://127.0.0.1:41321/?code=abc&session_state=ss").unwrap();
        let params = CallbackParams::from_url(&url);
        assert_eq!(params.code, Some("abc".to_string()));
        assert!(params.state.is_none());
    }
}
