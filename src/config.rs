use anyhow::Result;
use clap::{Parser, Subcommand};
use std::time::Duration;

use crate::auth::{AuthOptions, Interface, ScopeOptions, ServiceType};

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default API version appended to service endpoints
pub const DEFAULT_API_VERSION: &str = "v1";

/// Client settings shared by the session manager and service clients
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Timeout applied to every HTTP call, including the identity handshake
    pub timeout: Duration,

    /// Version segment appended to service endpoints (default: "v1")
    pub api_version: String,

    /// Catalog interface to use for endpoint discovery (default: admin)
    pub interface: Interface,

    /// Restrict endpoint discovery to one region
    pub region: Option<String>,

    /// Reauthenticate transparently when the token is about to expire (default: true)
    pub allow_reauth: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            api_version: DEFAULT_API_VERSION.to_string(),
            interface: Interface::Admin,
            region: None,
            allow_reauth: true,
        }
    }
}

/// Safir CLI - Rust client for Safir cloud services
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Identity service URL
    #[arg(long, env = "OS_AUTH_URL")]
    pub auth_url: Option<String>,

    /// User name
    #[arg(short, long, env = "OS_USERNAME")]
    pub username: Option<String>,

    /// User ID
    #[arg(long, env = "OS_USER_ID")]
    pub user_id: Option<String>,

    /// Password
    #[arg(long, env = "OS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Domain ID of the user
    #[arg(long, env = "OS_USER_DOMAIN_ID")]
    pub user_domain_id: Option<String>,

    /// Domain name of the user
    #[arg(long, env = "OS_USER_DOMAIN_NAME")]
    pub user_domain_name: Option<String>,

    /// Project name to scope the token to
    #[arg(long, env = "OS_PROJECT_NAME")]
    pub project_name: Option<String>,

    /// Project ID to scope the token to
    #[arg(long, env = "OS_PROJECT_ID")]
    pub project_id: Option<String>,

    /// Domain ID of the project (or of the domain scope)
    #[arg(long, env = "OS_PROJECT_DOMAIN_ID")]
    pub project_domain_id: Option<String>,

    /// Domain name of the project (or of the domain scope)
    #[arg(long, env = "OS_PROJECT_DOMAIN_NAME")]
    pub project_domain_name: Option<String>,

    /// Existing token
    #[arg(long, env = "OS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Application credential ID
    #[arg(long, env = "OS_APPLICATION_CREDENTIAL_ID")]
    pub application_credential_id: Option<String>,

    /// Application credential name
    #[arg(long, env = "OS_APPLICATION_CREDENTIAL_NAME")]
    pub application_credential_name: Option<String>,

    /// Application credential secret
    #[arg(long, env = "OS_APPLICATION_CREDENTIAL_SECRET", hide_env_values = true)]
    pub application_credential_secret: Option<String>,

    /// Catalog interface (admin, internal, public)
    #[arg(long, env = "OS_INTERFACE", default_value = "admin")]
    pub interface: Interface,

    /// Region used for endpoint discovery
    #[arg(long, env = "OS_REGION_NAME")]
    pub region: Option<String>,

    /// Service endpoint to call with --token, skipping the identity service
    #[arg(long, env = "SAFIR_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Reauthenticate automatically when the token expires
    #[arg(long, env = "SAFIR_ALLOW_REAUTH", default_value_t = true, action = clap::ArgAction::Set)]
    pub allow_reauth: bool,

    /// HTTP request timeout in seconds
    #[arg(long, env = "SAFIR_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// API version of the Safir services
    #[arg(long, env = "SAFIR_API_VERSION", default_value = DEFAULT_API_VERSION)]
    pub api_version: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Authenticate and print the session details
    Session,

    /// Check that a service API answers authenticated requests
    Ping {
        #[arg(short, long, default_value = "optimization")]
        service: ServiceType,
    },

    /// Print the API versions advertised by a service
    Version {
        #[arg(short, long, default_value = "optimization")]
        service: ServiceType,
    },

    /// Send an authenticated request and print the JSON response
    Request {
        /// HTTP method
        method: String,

        /// Path relative to the versioned service endpoint, e.g. /clusters
        path: String,

        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,

        #[arg(short, long, default_value = "optimization")]
        service: ServiceType,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    // Identity
    pub auth: AuthOptions,

    // Static token mode
    pub static_endpoint: Option<String>,

    // HTTP client
    pub client: ClientConfig,

    // Logging
    pub log_level: String,

    pub command: Command,
}

impl Config {
    /// Load configuration with priority: CLI > ENV (including .env) > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Ok(Self::from_args(CliArgs::parse()))
    }

    pub fn from_args(args: CliArgs) -> Self {
        let has_scope = args.project_name.is_some()
            || args.project_id.is_some()
            || args.project_domain_id.is_some()
            || args.project_domain_name.is_some();

        let scope = has_scope.then(|| ScopeOptions {
            project_id: args.project_id,
            project_name: args.project_name,
            domain_id: args.project_domain_id,
            domain_name: args.project_domain_name,
        });

        Config {
            auth: AuthOptions {
                identity_endpoint: args.auth_url.unwrap_or_default(),
                username: args.username,
                user_id: args.user_id,
                password: args.password,
                user_domain_id: args.user_domain_id,
                user_domain_name: args.user_domain_name,
                token: args.token,
                application_credential_id: args.application_credential_id,
                application_credential_name: args.application_credential_name,
                application_credential_secret: args.application_credential_secret,
                scope,
            },
            static_endpoint: args.endpoint,
            client: ClientConfig {
                timeout: Duration::from_secs(args.timeout),
                api_version: args.api_version,
                interface: args.interface,
                region: args.region,
                allow_reauth: args.allow_reauth,
            },
            log_level: args.log_level,
            command: args.command,
        }
    }

    /// Validate configuration
    ///
    /// Credential details are checked by the session manager; this only covers what the CLI
    /// needs to pick a mode.
    pub fn validate(&self) -> Result<()> {
        if self.client.timeout.is_zero() {
            anyhow::bail!("SAFIR_TIMEOUT must be greater than zero");
        }

        match self.static_endpoint {
            Some(_) => {
                if self.auth.token.as_deref().unwrap_or_default().is_empty() {
                    anyhow::bail!("OS_TOKEN is required when SAFIR_ENDPOINT is set (use --token)");
                }
            }
            None => {
                if self.auth.identity_endpoint.is_empty() {
                    anyhow::bail!(
                        "OS_AUTH_URL is required (use --auth-url or set OS_AUTH_URL env var)"
                    );
                }
            }
        }

        Ok(())
    }
}
