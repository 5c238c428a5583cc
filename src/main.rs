use anyhow::{Context, Result};
use reqwest::Method;
use std::sync::Arc;

use safir_client::config::{Command, Config};
use safir_client::{ServiceClient, ServiceType, SessionManager};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level; stdout is reserved for command output
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!(command = ?config.command, "Safir CLI starting");

    // Dropping the in-flight future cancels the request
    tokio::select! {
        result = run(&config) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Received Ctrl+C, cancelling request");
            Ok(())
        }
    }
}

async fn run(config: &Config) -> Result<()> {
    match &config.command {
        Command::Session => {
            let session = connect(config).await?;
            let info = session.session_info().await;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Ping { service } => {
            let client = service_client(config, *service).await?;
            client
                .ping()
                .await
                .with_context(|| format!("Ping of {} failed", service))?;
            println!("{} is reachable at {}", service, client.endpoint());
        }
        Command::Version { service } => {
            let client = service_client(config, *service).await?;
            let versions = client.version().await?;
            println!("{}", serde_json::to_string_pretty(&versions)?);
        }
        Command::Request {
            method,
            path,
            data,
            service,
        } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .with_context(|| format!("Invalid HTTP method: {}", method))?;
            let body: Option<serde_json::Value> = data
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("Request body is not valid JSON")?;

            let client = service_client(config, *service).await?;
            let response: Option<serde_json::Value> =
                client.send_json(method, path, body.as_ref()).await?;

            match response {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => tracing::info!("Request succeeded with an empty response body"),
            }
        }
    }

    Ok(())
}

/// Authenticate against the identity service
async fn connect(config: &Config) -> Result<SessionManager> {
    if config.static_endpoint.is_some() {
        anyhow::bail!("Session details are unavailable with a static endpoint and token");
    }

    tracing::info!("Initializing authentication...");
    let session = SessionManager::new(config.auth.clone(), config.client.clone())
        .await
        .context("Authentication failed")?;

    let info = session.session_info().await;
    tracing::info!(
        services = ?info.services,
        expires_at = ?info.token_expiry,
        "Authentication successful"
    );
    Ok(session)
}

/// Build a client for one service, either from discovery or from a static endpoint and token
async fn service_client(config: &Config, service: ServiceType) -> Result<ServiceClient> {
    if let Some(ref endpoint) = config.static_endpoint {
        let token = config.auth.token.clone().unwrap_or_default();
        tracing::info!(endpoint = %endpoint, "Using static endpoint and token");
        return Ok(ServiceClient::with_token(
            endpoint,
            token,
            service,
            &config.client,
        )?);
    }

    let session = Arc::new(connect(config).await?);
    let client = ServiceClient::for_service(session, service, &config.client)
        .await
        .with_context(|| format!("Service {} is not available", service))?;
    Ok(client)
}
