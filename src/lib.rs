// Safir client - library root

pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;

pub use auth::{AuthOptions, ScopeOptions, ServiceType, SessionManager, StaticToken, TokenProvider};
pub use config::ClientConfig;
pub use error::{AuthError, Error, Result};
pub use http_client::ServiceClient;
