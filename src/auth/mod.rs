// Authentication module
// Manages the identity handshake, service catalog discovery and token lifecycle

mod catalog;
mod credentials;
mod identity;
mod manager;
mod provider;
mod types;

pub use catalog::{build_endpoint_url, discover_endpoints, locate_endpoint, normalize_endpoint, LookupMiss};
pub use credentials::{resolve, tokens_url, AuthMethod, Credentials, Scope};
pub use manager::{SessionManager, TOKEN_SAFETY_MARGIN_SECS};
pub use provider::{StaticToken, TokenProvider};
pub use types::{
    AuthInfo, AuthOptions, CatalogEndpoint, CatalogEntry, IdOrName, Interface, ScopeOptions,
    ServiceType, TokenData,
};
