//! Interactive Authorization
//!
//! Browser-based authorization-code flow. A loopback listener captures the
//! redirect from the identity provider, the user's browser does the actual
//! sign-in. The listener is scoped to one authorization attempt: it binds,
//! serves exactly one redirect and is torn down, whether the attempt
//! succeeds, fails or times out.

use async_trait::async_trait;
use base64::Engine;
use rand::RngCore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AuthenticationError, TsdbError, TsdbResult};
use crate::types::{CallbackParams, CapturedRedirect, Config};

const REDIRECT_RESPONSE_BODY: &str = "Authentication complete. You can close this page now.";

/// Authorization seam: produce a redirect carrying an authorization code.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Run the authorization flow and return the captured redirect.
    async fn authorize(&self, config: &Config) -> TsdbResult<CapturedRedirect>;
}

/// Opens a URL in the user's browser.
pub trait BrowserOpener: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Browser opener using the platform's URL handler.
pub struct SystemBrowser;

impl BrowserOpener for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        #[cfg(target_os = "macos")]
        let program = "open";
        #[cfg(not(target_os = "macos"))]
        let program = "xdg-open";

        std::process::Command::new(program)
            .arg(url)
            .spawn()
            .map(|_| ())
    }
}

/// Authorizer that captures the redirect on a loopback listener.
pub struct LoopbackAuthorizer {
    browser: Box<dyn BrowserOpener>,
}

impl Default for LoopbackAuthorizer {
    fn default() -> Self {
        Self::new(Box::new(SystemBrowser))
    }
}

impl LoopbackAuthorizer {
    pub fn new(browser: Box<dyn BrowserOpener>) -> Self {
        Self { browser }
    }

    fn build_authorization_url(
        config: &Config,
        redirect_uri: &str,
        state: &str,
    ) -> TsdbResult<Url> {
        let mut url = Url::parse(&config.oauth.auth_url).map_err(|e| {
            TsdbError::InvalidResponse {
                message: format!("invalid authorization URL: {e}"),
            }
        })?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &config.oauth.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", state);
        Ok(url)
    }

    fn generate_state() -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }
}

#[async_trait]
impl Authorizer for LoopbackAuthorizer {
    async fn authorize(&self, config: &Config) -> TsdbResult<CapturedRedirect> {
        let listener = TcpListener::bind(("127.0.0.1", config.oauth.callback_port))
            .await
            .map_err(|e| AuthenticationError::ListenerFailed {
                message: format!("failed to bind redirect listener: {e}"),
            })?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthenticationError::ListenerFailed {
                message: format!("failed to read listener address: {e}"),
            })?
            .port();
        let redirect_uri = format!("http://127.0.0.1:{port}/");

        let state = Self::generate_state();
        let auth_url = Self::build_authorization_url(config, &redirect_uri, &state)?;

        let (tx, rx) = oneshot::channel::<TsdbResult<String>>();
        let capture = tokio::spawn(capture_redirect(listener, tx));

        info!(url = %auth_url, "waiting for authentication in browser");
        if let Err(e) = self.browser.open(auth_url.as_str()) {
            warn!(error = %e, "could not open browser, open the URL manually");
        }

        let timeout = config.oauth.auth_timeout;
        let target = match tokio::time::timeout(timeout, rx).await {
            Err(_) => {
                // Tear the listener down before reporting the timeout.
                capture.abort();
                let _ = capture.await;
                return Err(TsdbError::AuthenticationTimeout { waited: timeout });
            }
            Ok(Err(_)) => {
                return Err(AuthenticationError::ListenerFailed {
                    message: "redirect listener stopped before a redirect arrived".to_string(),
                }
                .into())
            }
            Ok(Ok(result)) => {
                let _ = capture.await;
                result?
            }
        };

        // The redirect target is relative to the listener.
        let url = Url::parse(&redirect_uri)
            .and_then(|base| base.join(&target))
            .map_err(|e| AuthenticationError::ListenerFailed {
                message: format!("malformed redirect target: {e}"),
            })?;

        let params = CallbackParams::from_url(&url);
        if let Some(error) = params.error {
            return Err(AuthenticationError::CallbackError {
                error,
                description: params.error_description,
            }
            .into());
        }
        match params.state {
            Some(received) if received == state => {}
            Some(received) => {
                return Err(AuthenticationError::StateMismatch {
                    expected: state,
                    received,
                }
                .into())
            }
            None => {
                return Err(AuthenticationError::StateMismatch {
                    expected: state,
                    received: String::new(),
                }
                .into())
            }
        }
        if params.code.is_none() {
            return Err(AuthenticationError::MissingAuthorizationCode.into());
        }

        debug!("authorization redirect captured");
        Ok(CapturedRedirect { url, redirect_uri })
    }
}

/// Accept one connection, extract the request target from the request line
/// and acknowledge with a plain-text page.
async fn capture_redirect(listener: TcpListener, tx: oneshot::Sender<TsdbResult<String>>) {
    let result = accept_one(&listener).await;
    let _ = tx.send(result);
}

async fn accept_one(listener: &TcpListener) -> TsdbResult<String> {
    let (mut stream, _) = listener
        .accept()
        .await
        .map_err(|e| AuthenticationError::ListenerFailed {
            message: format!("accept failed: {e}"),
        })?;

    // The request line may arrive in several segments; keep reading until it
    // is complete.
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    while !buf.windows(2).any(|w| w == b"\r\n") && buf.len() < 8192 {
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|e| AuthenticationError::ListenerFailed {
                message: format!("failed to read redirect request: {e}"),
            })?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf);
    let target = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .ok_or_else(|| AuthenticationError::ListenerFailed {
            message: "malformed redirect request".to_string(),
        })?;

    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        REDIRECT_RESPONSE_BODY.len(),
        REDIRECT_RESPONSE_BODY
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        warn!(error = %e, "failed to acknowledge redirect");
    }
    let _ = stream.shutdown().await;

    Ok(target)
}
