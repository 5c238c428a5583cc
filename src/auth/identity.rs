// Identity handshake against a Keystone v3 compatible service

use reqwest::header::ACCEPT;
use reqwest::Client;

use super::credentials::{self, Credentials};
use super::types::{TokenData, TokenResponse};
use crate::error::{AuthError, Result};

/// Response header carrying the issued token
const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Request a new token and service catalog
pub async fn request_token(client: &Client, creds: &Credentials) -> Result<TokenData> {
    let url = credentials::tokens_url(&creds.identity_endpoint);
    let body = credentials::token_request(creds);

    tracing::debug!(
        url = %url,
        method = creds.method.name(),
        scoped = creds.scope.is_some(),
        "Sending identity token request"
    );

    let response = client
        .post(&url)
        .header(ACCEPT, "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            let kind = if e.is_timeout() {
                "timeout"
            } else if e.is_connect() {
                "connection_failed"
            } else {
                "request_error"
            };
            tracing::warn!(error_kind = kind, error = %e, url = %url, "Identity request error");
            AuthError::Handshake(format!("failed to reach identity service: {}", e))
        })?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        tracing::error!(
            status = status.as_u16(),
            url = %url,
            response_body = %message,
            "Identity service rejected token request"
        );
        return Err(AuthError::IdentityRejected {
            status: status.as_u16(),
            message,
        }
        .into());
    }

    let token = response
        .headers()
        .get(SUBJECT_TOKEN_HEADER)
        .ok_or_else(|| AuthError::Handshake("missing X-Subject-Token header".to_string()))?
        .to_str()
        .map_err(|_| AuthError::Handshake("invalid X-Subject-Token header".to_string()))?
        .to_string();

    if token.is_empty() {
        return Err(AuthError::Handshake("identity service returned an empty token".to_string()).into());
    }

    let data: TokenResponse = response
        .json()
        .await
        .map_err(|e| AuthError::Handshake(format!("failed to parse token response: {}", e)))?;

    // Unscoped tokens come without a catalog
    let catalog = data.token.catalog.unwrap_or_default();
    if catalog.is_empty() {
        tracing::warn!("Token response has no service catalog, no endpoints will be discovered");
    }

    match data.token.expires_at {
        Some(expires_at) => tracing::info!(
            "Authenticated against identity service, expires: {}",
            expires_at.to_rfc3339()
        ),
        None => tracing::info!("Authenticated against identity service, no expiry reported"),
    }

    Ok(TokenData {
        token,
        expires_at: data.token.expires_at,
        catalog,
    })
}
