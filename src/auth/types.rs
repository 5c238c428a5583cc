// Authentication types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Safir services discoverable through the identity service catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    #[serde(rename = "safiroptimization")]
    Optimization,
    #[serde(rename = "migration")]
    Migration,
    #[serde(rename = "cloud_watcher")]
    CloudWatcher,
}

impl ServiceType {
    /// Every service looked up during endpoint discovery
    pub const ALL: [ServiceType; 3] = [
        ServiceType::Optimization,
        ServiceType::Migration,
        ServiceType::CloudWatcher,
    ];

    /// Service type as it appears in the catalog
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Optimization => "safiroptimization",
            ServiceType::Migration => "migration",
            ServiceType::CloudWatcher => "cloud_watcher",
        }
    }

    /// Path segment between the catalog URL and the API version
    pub fn api_prefix(&self) -> &'static str {
        match self {
            ServiceType::Optimization => "/api",
            ServiceType::Migration | ServiceType::CloudWatcher => "",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "optimization" | "safiroptimization" => Ok(ServiceType::Optimization),
            "migration" => Ok(ServiceType::Migration),
            "cloud_watcher" | "cloudwatcher" => Ok(ServiceType::CloudWatcher),
            _ => Err(format!("Unknown service type: {}", s)),
        }
    }
}

/// Endpoint visibility preference used when reading the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interface {
    #[default]
    Admin,
    Internal,
    Public,
}

impl Interface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interface::Admin => "admin",
            Interface::Internal => "internal",
            Interface::Public => "public",
        }
    }
}

impl std::fmt::Display for Interface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Interface {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Keystone v2 style names are still common in clouds.yaml files
        match s.to_lowercase().trim_end_matches("url") {
            "admin" => Ok(Interface::Admin),
            "internal" => Ok(Interface::Internal),
            "public" => Ok(Interface::Public),
            _ => Err(format!("Unknown interface: {}", s)),
        }
    }
}

/// Either an ID or a name of an identity resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdOrName {
    Id(String),
    Name(String),
}

/// User-facing authentication options
///
/// Fields left as `None` (or empty) are ignored. The options are resolved into a single
/// authentication method before any request is made.
#[derive(Clone, Default)]
pub struct AuthOptions {
    pub identity_endpoint: String,
    pub username: Option<String>,
    pub user_id: Option<String>,
    pub password: Option<String>,
    pub user_domain_id: Option<String>,
    pub user_domain_name: Option<String>,
    pub token: Option<String>,
    pub application_credential_id: Option<String>,
    pub application_credential_name: Option<String>,
    pub application_credential_secret: Option<String>,
    pub scope: Option<ScopeOptions>,
}

impl std::fmt::Debug for AuthOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("AuthOptions")
            .field("identity_endpoint", &self.identity_endpoint)
            .field("username", &self.username)
            .field("user_id", &self.user_id)
            .field("password", &redact(&self.password))
            .field("user_domain_id", &self.user_domain_id)
            .field("user_domain_name", &self.user_domain_name)
            .field("token", &redact(&self.token))
            .field("application_credential_id", &self.application_credential_id)
            .field("application_credential_name", &self.application_credential_name)
            .field(
                "application_credential_secret",
                &redact(&self.application_credential_secret),
            )
            .field("scope", &self.scope)
            .finish()
    }
}

/// Project or domain the token should be scoped to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeOptions {
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub domain_id: Option<String>,
    pub domain_name: Option<String>,
}

/// Token data from a successful identity handshake
#[derive(Debug, Clone)]
pub struct TokenData {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub catalog: Vec<CatalogEntry>,
}

/// Diagnostic snapshot of the current session
#[derive(Debug, Clone, Serialize)]
pub struct AuthInfo {
    pub username: Option<String>,
    pub user_id: Option<String>,
    pub project_name: Option<String>,
    pub project_id: Option<String>,
    pub domain_name: Option<String>,
    pub domain_id: Option<String>,
    pub token_expiry: Option<DateTime<Utc>>,
    pub is_expired: bool,
    pub seconds_until_expiry: Option<i64>,
    pub services: Vec<ServiceType>,
}

/// Keystone v3 token request
#[derive(Serialize)]
pub struct TokenRequest {
    pub auth: AuthRequest,
}

#[derive(Serialize)]
pub struct AuthRequest {
    pub identity: IdentityRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeRequest>,
}

#[derive(Serialize, Default)]
pub struct IdentityRequest {
    pub methods: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<PasswordRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenIdRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_credential: Option<ApplicationCredentialRequest>,
}

#[derive(Serialize)]
pub struct PasswordRequest {
    pub user: UserRequest,
}

#[derive(Serialize)]
pub struct UserRequest {
    #[serde(flatten)]
    pub user: IdOrName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<IdOrName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct TokenIdRequest {
    pub id: String,
}

#[derive(Serialize)]
pub struct ApplicationCredentialRequest {
    #[serde(flatten)]
    pub credential: IdOrName,
    pub secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRequest>,
}

#[derive(Serialize, Default)]
pub struct ScopeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectScopeRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<IdOrName>,
}

#[derive(Serialize)]
pub struct ProjectScopeRequest {
    #[serde(flatten)]
    pub project: IdOrName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<IdOrName>,
}

/// Keystone v3 token response body
#[derive(Deserialize)]
pub struct TokenResponse {
    pub token: TokenBody,
}

#[derive(Deserialize)]
pub struct TokenBody {
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub catalog: Option<Vec<CatalogEntry>>,
}

/// Service catalog entry
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEndpoint {
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_id: Option<String>,
    pub url: String,
}
