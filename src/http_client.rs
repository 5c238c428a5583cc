use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{
    build_endpoint_url, normalize_endpoint, ServiceType, SessionManager, StaticToken,
    TokenProvider,
};
use crate::config::ClientConfig;
use crate::error::{AuthError, Error, Result};

/// Client identifier sent with every request
pub const USER_AGENT: &str = concat!("safir-client/", env!("CARGO_PKG_VERSION"));

/// Header carrying the token on service requests
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// HTTP client for one Safir service with transparent reauthentication
pub struct ServiceClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Token source (session manager or static token)
    provider: Arc<dyn TokenProvider>,

    /// Versioned base URL, without trailing slash
    endpoint: String,

    api_version: String,

    service_type: ServiceType,

    timeout: Duration,
}

impl ServiceClient {
    /// Create a client for an explicit endpoint
    pub fn new(
        endpoint: &str,
        provider: Arc<dyn TokenProvider>,
        service_type: ServiceType,
        config: &ClientConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        let endpoint = build_endpoint_url(endpoint, &config.api_version);
        tracing::debug!(service = %service_type, endpoint = %endpoint, "Service client created");

        Ok(Self {
            client,
            provider,
            endpoint,
            api_version: config.api_version.clone(),
            service_type,
            timeout: config.timeout,
        })
    }

    /// Create a client for a service discovered by the session
    pub async fn for_service(
        session: Arc<SessionManager>,
        service_type: ServiceType,
        config: &ClientConfig,
    ) -> Result<Self> {
        let base = session.get_endpoint(service_type).await?;
        let endpoint = format!("{}{}", base, service_type.api_prefix());
        Self::new(&endpoint, session, service_type, config)
    }

    /// Create a client from a known endpoint and a pre-issued token
    ///
    /// No identity call is made and a 401 is always final.
    pub fn with_token(
        endpoint: &str,
        token: impl Into<String>,
        service_type: ServiceType,
        config: &ClientConfig,
    ) -> Result<Self> {
        let endpoint = format!("{}{}", normalize_endpoint(endpoint), service_type.api_prefix());
        Self::new(
            &endpoint,
            Arc::new(StaticToken::new(token)),
            service_type,
            config,
        )
    }

    /// Execute an authenticated request
    ///
    /// A 401 triggers one forced reauthentication and one retry when the token provider
    /// supports it. Other error statuses are returned as [`Error::Api`] without retrying.
    pub async fn do_request<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.endpoint, path);
        let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();

        let mut token = self.provider.token().await?;

        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(Error::Encode)?;

        let mut reauthenticated = false;

        loop {
            tracing::debug!(
                request_id = %request_id,
                method = %method,
                url = %url,
                retry = reauthenticated,
                "Sending HTTP request"
            );

            let mut request = self
                .client
                .request(method.clone(), &url)
                .header(AUTH_TOKEN_HEADER, token.as_str())
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, "application/json");
            if let Some(ref bytes) = payload {
                request = request.body(bytes.clone());
            }

            let response = request.send().await.map_err(|e| {
                let error_kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connection_failed"
                } else {
                    "request_error"
                };
                tracing::warn!(
                    request_id = %request_id,
                    error_kind = error_kind,
                    error = %e,
                    url = %url,
                    "HTTP request error"
                );
                Error::Transport(e)
            })?;

            let status = response.status();
            tracing::debug!(request_id = %request_id, status = %status, "Received HTTP response");

            if status == StatusCode::UNAUTHORIZED {
                if reauthenticated || !self.provider.can_reauthenticate() {
                    tracing::error!(
                        request_id = %request_id,
                        method = %method,
                        url = %url,
                        after_reauth = reauthenticated,
                        "Request rejected as unauthorized"
                    );
                    return Err(AuthError::Unauthorized {
                        method,
                        url,
                    }
                    .into());
                }

                tracing::warn!(
                    request_id = %request_id,
                    "Received 401, reauthenticating and retrying once..."
                );
                token = self.provider.reauthenticate().await?;
                reauthenticated = true;
                continue;
            }

            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                tracing::warn!(
                    request_id = %request_id,
                    status = status.as_u16(),
                    method = %method,
                    url = %url,
                    response_body = %message,
                    "HTTP request failed with error response"
                );
                return Err(Error::Api {
                    status: status.as_u16(),
                    message,
                    method,
                    url,
                });
            }

            return Ok(response);
        }
    }

    /// Parse a JSON response body
    ///
    /// An empty body is valid (typical for DELETE) and yields `None`.
    pub async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<Option<T>> {
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| Error::Decode {
                source,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            })
    }

    /// Execute a request with an optional JSON body and decode the JSON response
    pub async fn send_json<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.do_request(method, path, body).await?;
        Self::parse_response(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        let response = self.do_request::<()>(Method::DELETE, path, None).await?;
        Self::parse_response::<serde_json::Value>(response).await?;
        Ok(())
    }

    /// Check that the service API answers authenticated requests
    pub async fn ping(&self) -> Result<()> {
        self.do_request::<()>(Method::GET, "/", None).await?;
        tracing::debug!(service = %self.service_type, "Ping succeeded");
        Ok(())
    }

    /// API version document served at the unversioned endpoint root
    pub async fn version(&self) -> Result<serde_json::Value> {
        let suffix = format!("/{}", self.api_version);
        let base = self.endpoint.strip_suffix(&suffix).unwrap_or(&self.endpoint);
        let url = format!("{}/", base);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
                method: Method::GET,
                url,
            });
        }

        Self::parse_response(response)
            .await?
            .ok_or_else(|| Error::Api {
                status: status.as_u16(),
                message: "empty version document".to_string(),
                method: Method::GET,
                url,
            })
    }

    /// Versioned base URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_client_endpoint() {
        let client = ServiceClient::with_token(
            "http://h:9323/",
            "gAAAA",
            ServiceType::Optimization,
            &ClientConfig::default(),
        )
        .unwrap();

        assert_eq!(client.endpoint(), "http://h:9323/api/v1");
        assert_eq!(client.api_version(), "v1");
        assert_eq!(client.service_type(), ServiceType::Optimization);
        assert_eq!(client.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_custom_api_version() {
        let config = ClientConfig {
            api_version: "v2".to_string(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let client =
            ServiceClient::with_token("http://cw:9325", "t", ServiceType::CloudWatcher, &config)
                .unwrap();

        assert_eq!(client.endpoint(), "http://cw:9325/v2");
        assert_eq!(client.timeout(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_for_service_uses_discovered_endpoint() {
        let mut endpoints = std::collections::HashMap::new();
        endpoints.insert(ServiceType::Migration, "http://mig:9324".to_string());
        let session = Arc::new(
            SessionManager::new_for_testing(
                "token".to_string(),
                None,
                endpoints,
                ClientConfig::default(),
            )
            .unwrap(),
        );

        let client = ServiceClient::for_service(
            session.clone(),
            ServiceType::Migration,
            &ClientConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(client.endpoint(), "http://mig:9324/v1");

        let missing = ServiceClient::for_service(
            session,
            ServiceType::CloudWatcher,
            &ClientConfig::default(),
        )
        .await;
        assert!(matches!(
            missing,
            Err(Error::EndpointNotFound(ServiceType::CloudWatcher))
        ));
    }

    #[tokio::test]
    async fn test_empty_static_token_fails_before_sending() {
        let client = ServiceClient::with_token(
            "http://127.0.0.1:9",
            "",
            ServiceType::Optimization,
            &ClientConfig::default(),
        )
        .unwrap();

        let err = client.ping().await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::EmptyToken)));
    }

    #[tokio::test]
    async fn test_unserializable_body_is_local_error() {
        let client = ServiceClient::with_token(
            "http://127.0.0.1:9",
            "gAAAA",
            ServiceType::Optimization,
            &ClientConfig::default(),
        )
        .unwrap();

        // Maps with non-string keys cannot be encoded as JSON objects
        let mut body = std::collections::HashMap::new();
        body.insert(vec![1u8], "value");

        let err = client
            .do_request(Method::POST, "/clusters", Some(&body))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Encode(_)));
    }
}
