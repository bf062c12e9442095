//! Core infrastructure: the HTTP transport seam.

pub mod transport;

pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport, ReqwestHttpTransport,
};
