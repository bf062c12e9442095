//! Authentication: token lifecycle and the interactive authorization flow.

pub mod interactive;
pub mod manager;

pub use interactive::{Authorizer, BrowserOpener, LoopbackAuthorizer, SystemBrowser};
pub use manager::TokenManager;
