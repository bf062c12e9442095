//! HTTP Transport
//!
//! HTTP client interface and implementations. The trait is the seam that
//! makes the token lifecycle and the API wrappers testable without a live
//! server.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{NetworkError, TsdbError};

/// HTTP request definition.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request URL without query string.
    pub url: String,
    /// Query parameters, appended in order.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Form-encoded request body.
    pub body: Option<String>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// A GET request with query parameters.
    pub fn get(url: impl Into<String>, query: Vec<(String, String)>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            query,
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// A form-encoded POST request.
    pub fn post_form(url: impl Into<String>, body: String) -> Self {
        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        headers.insert("accept".to_string(), "application/json".to_string());
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            query: Vec::new(),
            headers,
            body: Some(body),
            timeout: None,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// HTTP response definition.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase.
    pub status_text: String,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP transport interface (for dependency injection).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TsdbError>;
}

/// Default reqwest-based HTTP transport.
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl ReqwestHttpTransport {
    /// Create new transport with default settings.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create transport with a custom default timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            client,
            default_timeout: timeout,
        }
    }
}

impl Default for ReqwestHttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TsdbError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        if !request.query.is_empty() {
            req_builder = req_builder.query(&request.query);
        }

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        req_builder = req_builder.timeout(timeout);

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TsdbError::Network(NetworkError::Timeout { timeout })
            } else {
                TsdbError::Network(NetworkError::ConnectionFailed {
                    message: e.to_string(),
                })
            }
        })?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("")
            .to_string();

        let body = response.text().await.map_err(|e| TsdbError::InvalidResponse {
            message: e.to_string(),
        })?;

        Ok(HttpResponse {
            status,
            status_text,
            body,
        })
    }
}

/// Mock HTTP transport for testing.
#[derive(Default)]
pub struct MockHttpTransport {
    responses: std::sync::Mutex<Vec<HttpResponse>>,
    request_history: std::sync::Mutex<Vec<HttpRequest>>,
}

impl MockHttpTransport {
    /// Create new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to return. Responses are served in FIFO order.
    pub fn queue_response(&self, response: HttpResponse) -> &Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    /// Queue a JSON response.
    pub fn queue_json_response<T: serde::Serialize>(&self, status: u16, body: &T) -> &Self {
        self.queue_response(HttpResponse {
            status,
            status_text: if status == 200 { "OK" } else { "Error" }.to_string(),
            body: serde_json::to_string(body).unwrap(),
        })
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        self.request_history.lock().unwrap().clone()
    }

    /// Get last request.
    pub fn get_last_request(&self) -> Option<HttpRequest> {
        self.request_history.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TsdbError> {
        self.request_history.lock().unwrap().push(request);

        let response = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                None
            } else {
                Some(responses.remove(0))
            }
        };

        response.ok_or_else(|| {
            TsdbError::Network(NetworkError::ConnectionFailed {
                message: "no mock response available".to_string(),
            })
        })
    }
}
