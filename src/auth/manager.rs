use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};

use super::catalog;
use super::credentials::{self, Credentials};
use super::identity;
use super::provider::TokenProvider;
use super::types::{AuthInfo, AuthOptions, CatalogEntry, ServiceType};
use crate::config::ClientConfig;
use crate::error::{AuthError, Error, Result};
use crate::http_client::USER_AGENT;

/// Tokens expiring within this many seconds are treated as unusable
pub const TOKEN_SAFETY_MARGIN_SECS: i64 = 300;

/// One authenticated session, always replaced as a whole
#[derive(Debug, Default)]
struct Session {
    token: String,
    expires_at: Option<DateTime<Utc>>,
    endpoints: HashMap<ServiceType, String>,
    /// Incremented on every successful authentication
    generation: u64,
}

/// Session manager
/// Keeps one authenticated session usable across sequential and concurrent requests
pub struct SessionManager {
    /// Options as given, kept for diagnostics
    options: AuthOptions,

    /// Credentials resolved at construction
    credentials: Credentials,

    /// Discovery and reauthentication settings
    config: ClientConfig,

    /// HTTP client for identity requests
    client: Client,

    /// Current session; the lock is never held across network calls
    session: RwLock<Session>,

    /// Serializes authentications so concurrent refreshes collapse into one
    refresh_lock: Mutex<()>,
}

impl SessionManager {
    /// Validate options and perform the initial authentication
    pub async fn new(options: AuthOptions, config: ClientConfig) -> Result<Self> {
        let manager = Self::unauthenticated(options, config)?;

        tracing::info!(
            identity_endpoint = %manager.credentials.identity_endpoint,
            method = manager.credentials.method.name(),
            "Performing initial authentication"
        );
        manager.authenticate().await?;

        Ok(manager)
    }

    fn unauthenticated(options: AuthOptions, config: ClientConfig) -> Result<Self> {
        let credentials = credentials::resolve(&options)?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            options,
            credentials,
            config,
            client,
            session: RwLock::new(Session::default()),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Create a SessionManager with a preset session (no identity call)
    /// Available in test builds and with the `test-utils` feature
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_for_testing(
        token: String,
        expires_at: Option<DateTime<Utc>>,
        endpoints: HashMap<ServiceType, String>,
        config: ClientConfig,
    ) -> Result<Self> {
        // Nothing listens on the discard port, so an unexpected handshake fails fast
        let options = AuthOptions {
            identity_endpoint: "http://127.0.0.1:9/v3".to_string(),
            username: Some("test-user".to_string()),
            password: Some("test-password".to_string()),
            user_domain_id: Some("default".to_string()),
            ..Default::default()
        };

        let mut manager = Self::unauthenticated(options, config)?;
        manager.session = RwLock::new(Session {
            token,
            expires_at,
            endpoints,
            generation: 1,
        });
        Ok(manager)
    }

    /// Perform the identity handshake and replace the session
    ///
    /// On failure the previous session is left untouched.
    pub async fn authenticate(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        self.authenticate_locked().await?;
        Ok(())
    }

    /// Returns the token of the session it swapped in
    async fn authenticate_locked(&self) -> Result<String> {
        let token_data = identity::request_token(&self.client, &self.credentials)
            .await
            .map_err(|e| {
                tracing::error!("Authentication failed: {}", e);
                e
            })?;

        let endpoints = self.discover_endpoints(&token_data.catalog);

        let mut session = self.session.write().await;
        let generation = session.generation + 1;
        *session = Session {
            token: token_data.token,
            expires_at: token_data.expires_at,
            endpoints,
            generation,
        };

        tracing::debug!(
            generation,
            services = session.endpoints.len(),
            "Session replaced"
        );
        Ok(session.token.clone())
    }

    /// Resolve the base URL of every known service from a catalog
    ///
    /// Services that cannot be located are left out and logged.
    pub fn discover_endpoints(&self, catalog: &[CatalogEntry]) -> HashMap<ServiceType, String> {
        catalog::discover_endpoints(catalog, self.config.interface, self.config.region.as_deref())
    }

    /// Get a usable token, reauthenticating if it is within the safety margin
    pub async fn get_token(&self) -> Result<String> {
        let (token, expires_at, generation) = {
            let session = self.session.read().await;
            (session.token.clone(), session.expires_at, session.generation)
        };

        if !needs_refresh(expires_at, Utc::now()) {
            return Ok(token);
        }

        if !self.config.allow_reauth {
            tracing::warn!("Token is expiring and automatic reauthentication is disabled");
            return Err(AuthError::TokenExpired.into());
        }

        tracing::info!("Token expires within safety margin, reauthenticating...");
        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock
        {
            let session = self.session.read().await;
            if session.generation != generation {
                tracing::debug!("Session already refreshed by a concurrent caller");
                return Ok(session.token.clone());
            }
        }

        self.authenticate_locked().await
    }

    /// Cached base URL of a service
    pub async fn get_endpoint(&self, service: ServiceType) -> Result<String> {
        let session = self.session.read().await;
        session
            .endpoints
            .get(&service)
            .cloned()
            .ok_or(Error::EndpointNotFound(service))
    }

    /// Reauthenticate regardless of the tracked expiry
    ///
    /// Returns the newly issued token as is, even if it already falls within the safety margin.
    pub async fn force_reauthenticate(&self) -> Result<String> {
        tracing::info!("Forcing reauthentication");
        let _guard = self.refresh_lock.lock().await;
        self.authenticate_locked().await
    }

    /// Whether automatic reauthentication is enabled
    pub fn allows_reauth(&self) -> bool {
        self.config.allow_reauth
    }

    /// Check if the token is past its expiry (not just within the safety margin)
    pub async fn is_expired(&self) -> bool {
        let session = self.session.read().await;
        session.expires_at.is_some_and(|exp| Utc::now() >= exp)
    }

    pub async fn token_expiry(&self) -> Option<DateTime<Utc>> {
        self.session.read().await.expires_at
    }

    /// Snapshot of the current session for diagnostics
    pub async fn session_info(&self) -> AuthInfo {
        let session = self.session.read().await;
        let now = Utc::now();

        let mut services: Vec<ServiceType> = session.endpoints.keys().copied().collect();
        services.sort_by_key(|s| s.as_str());

        let scope = self.options.scope.clone().unwrap_or_default();

        AuthInfo {
            username: self.options.username.clone(),
            user_id: self.options.user_id.clone(),
            project_name: scope.project_name,
            project_id: scope.project_id,
            domain_name: self.options.user_domain_name.clone(),
            domain_id: self.options.user_domain_id.clone(),
            token_expiry: session.expires_at,
            is_expired: session.expires_at.is_some_and(|exp| now >= exp),
            seconds_until_expiry: session.expires_at.map(|exp| (exp - now).num_seconds()),
            services,
        }
    }
}

#[async_trait]
impl TokenProvider for SessionManager {
    async fn token(&self) -> Result<String> {
        self.get_token().await
    }

    fn can_reauthenticate(&self) -> bool {
        self.allows_reauth()
    }

    async fn reauthenticate(&self) -> Result<String> {
        self.force_reauthenticate().await
    }
}

/// Check if a token must be refreshed before use
///
/// Tokens without a reported expiry never need a refresh.
fn needs_refresh(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires_at {
        None => false,
        Some(exp) => exp - now < Duration::seconds(TOKEN_SAFETY_MARGIN_SECS),
    }
}
