// Error handling module
// Defines the error taxonomy shared by the session manager and service clients

use reqwest::Method;
use thiserror::Error;

use crate::auth::ServiceType;

/// Errors returned by the Safir client
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or incomplete options, detected before any network call
    #[error("Validation error for field '{field}': {message}")]
    Validation { field: String, message: String },

    /// Authentication or token lifecycle failure
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Non-success response from a Safir service
    #[error("API error: {method} {url} returned {status}: {message}")]
    Api {
        status: u16,
        message: String,
        method: Method,
        url: String,
    },

    /// Service was not present in the catalog at the last authentication
    #[error("Endpoint for service {0} was not discovered")]
    EndpointNotFound(ServiceType),

    /// Request body could not be serialized
    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// Response body could not be parsed
    #[error("Failed to parse response: {source} (body: {body})")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    /// Connection, timeout or other transport failure
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Authentication failures
#[derive(Error, Debug)]
pub enum AuthError {
    /// Identity service could not be reached or returned an unusable response
    #[error("identity handshake failed: {0}")]
    Handshake(String),

    /// Identity service refused the credentials
    #[error("identity service returned {status}: {message}")]
    IdentityRejected { status: u16, message: String },

    #[error("token expired and automatic reauthentication is disabled")]
    TokenExpired,

    #[error("token is empty")]
    EmptyToken,

    #[error("token provider does not support reauthentication")]
    ReauthUnsupported,

    /// Service answered 401 and no further reauthentication is possible
    #[error("{method} {url} was rejected: token expired or invalid")]
    Unauthorized { method: Method, url: String },
}

impl Error {
    pub(crate) fn validation(field: &str, message: &str) -> Self {
        Error::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Auth(AuthError::IdentityRejected { status, .. }) => Some(*status),
            Error::Auth(AuthError::Unauthorized { .. }) => Some(401),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    fn api_status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.api_status() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.api_status() == Some(409)
    }

    pub fn is_forbidden(&self) -> bool {
        self.api_status() == Some(403)
    }

    pub fn is_bad_request(&self) -> bool {
        self.api_status() == Some(400)
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self.api_status(), Some(500..=599))
    }

    /// True for a downstream 401, whether or not a reauthentication was attempted
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Auth(AuthError::Unauthorized { .. })) || self.api_status() == Some(401)
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;
