// Credential resolution and validation
// Turns user-facing options into exactly one authentication method before any network call

use reqwest::Url;

use super::catalog::normalize_endpoint;
use super::types::{
    ApplicationCredentialRequest, AuthOptions, AuthRequest, IdOrName, IdentityRequest,
    PasswordRequest, ProjectScopeRequest, ScopeOptions, ScopeRequest, TokenIdRequest,
    TokenRequest, UserRequest,
};
use crate::error::{Error, Result};

/// Authentication method resolved from [`AuthOptions`]
#[derive(Clone)]
pub enum AuthMethod {
    Password {
        user: IdOrName,
        domain: Option<IdOrName>,
        password: String,
    },
    Token(String),
    ApplicationCredential {
        id: String,
        secret: String,
    },
    ApplicationCredentialName {
        name: String,
        secret: String,
        user: IdOrName,
        domain: Option<IdOrName>,
    },
}

impl AuthMethod {
    /// Keystone method name
    pub fn name(&self) -> &'static str {
        match self {
            AuthMethod::Password { .. } => "password",
            AuthMethod::Token(_) => "token",
            AuthMethod::ApplicationCredential { .. }
            | AuthMethod::ApplicationCredentialName { .. } => "application_credential",
        }
    }
}

impl std::fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMethod::Password { user, domain, .. } => f
                .debug_struct("Password")
                .field("user", user)
                .field("domain", domain)
                .finish_non_exhaustive(),
            AuthMethod::Token(_) => f.write_str("Token(<redacted>)"),
            AuthMethod::ApplicationCredential { id, .. } => f
                .debug_struct("ApplicationCredential")
                .field("id", id)
                .finish_non_exhaustive(),
            AuthMethod::ApplicationCredentialName { name, user, .. } => f
                .debug_struct("ApplicationCredentialName")
                .field("name", name)
                .field("user", user)
                .finish_non_exhaustive(),
        }
    }
}

/// Resolved token scope
#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    Project {
        project: IdOrName,
        domain: Option<IdOrName>,
    },
    Domain(IdOrName),
}

/// Validated credential set
#[derive(Debug, Clone)]
pub struct Credentials {
    pub identity_endpoint: String,
    pub method: AuthMethod,
    pub scope: Option<Scope>,
}

/// Treat empty strings the same as missing values
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn id_or_name(id: &Option<String>, name: &Option<String>) -> Option<IdOrName> {
    non_empty(id)
        .map(|v| IdOrName::Id(v.to_string()))
        .or_else(|| non_empty(name).map(|v| IdOrName::Name(v.to_string())))
}

/// Resolve options into credentials
///
/// Methods are tried in order: password, token, application credential ID, application
/// credential name. Fails with a validation error when none of them is complete.
pub fn resolve(opts: &AuthOptions) -> Result<Credentials> {
    if opts.identity_endpoint.trim().is_empty() {
        return Err(Error::validation("identity_endpoint", "is required"));
    }
    Url::parse(&opts.identity_endpoint)
        .map_err(|_| Error::validation("identity_endpoint", "is not a valid URL"))?;

    let user = id_or_name(&opts.user_id, &opts.username);
    let domain = id_or_name(&opts.user_domain_id, &opts.user_domain_name);

    let method = if let (Some(user), Some(password)) = (user.clone(), non_empty(&opts.password)) {
        require_user_domain(&user, &domain)?;
        AuthMethod::Password {
            user,
            domain,
            password: password.to_string(),
        }
    } else if let Some(token) = non_empty(&opts.token) {
        AuthMethod::Token(token.to_string())
    } else if let (Some(id), Some(secret)) = (
        non_empty(&opts.application_credential_id),
        non_empty(&opts.application_credential_secret),
    ) {
        AuthMethod::ApplicationCredential {
            id: id.to_string(),
            secret: secret.to_string(),
        }
    } else if let (Some(name), Some(secret)) = (
        non_empty(&opts.application_credential_name),
        non_empty(&opts.application_credential_secret),
    ) {
        let user = user.ok_or_else(|| {
            Error::validation(
                "username",
                "is required when authenticating with an application credential name",
            )
        })?;
        require_user_domain(&user, &domain)?;
        AuthMethod::ApplicationCredentialName {
            name: name.to_string(),
            secret: secret.to_string(),
            user,
            domain,
        }
    } else {
        return Err(Error::validation(
            "authentication",
            "no valid authentication method provided",
        ));
    };

    let scope = opts.scope.as_ref().map(resolve_scope).transpose()?;

    Ok(Credentials {
        identity_endpoint: opts.identity_endpoint.clone(),
        method,
        scope,
    })
}

fn require_user_domain(user: &IdOrName, domain: &Option<IdOrName>) -> Result<()> {
    if matches!(user, IdOrName::Name(_)) && domain.is_none() {
        return Err(Error::validation(
            "user_domain",
            "is required when the user is given by name",
        ));
    }
    Ok(())
}

fn resolve_scope(scope: &ScopeOptions) -> Result<Scope> {
    let domain = id_or_name(&scope.domain_id, &scope.domain_name);

    if let Some(id) = non_empty(&scope.project_id) {
        return Ok(Scope::Project {
            project: IdOrName::Id(id.to_string()),
            domain,
        });
    }

    if let Some(name) = non_empty(&scope.project_name) {
        let domain = domain.ok_or_else(|| {
            Error::validation("scope", "project name requires a domain ID or name")
        })?;
        return Ok(Scope::Project {
            project: IdOrName::Name(name.to_string()),
            domain: Some(domain),
        });
    }

    domain
        .map(Scope::Domain)
        .ok_or_else(|| Error::validation("scope", "must specify either project or domain"))
}

/// URL of the Keystone v3 token endpoint
pub fn tokens_url(identity_endpoint: &str) -> String {
    let base = normalize_endpoint(identity_endpoint);
    if base.ends_with("/v3") {
        format!("{}/auth/tokens", base)
    } else {
        format!("{}/v3/auth/tokens", base)
    }
}

/// Build the token request body for the resolved credentials
pub fn token_request(creds: &Credentials) -> TokenRequest {
    let mut identity = IdentityRequest {
        methods: vec![creds.method.name()],
        ..Default::default()
    };

    match &creds.method {
        AuthMethod::Password {
            user,
            domain,
            password,
        } => {
            identity.password = Some(PasswordRequest {
                user: UserRequest {
                    user: user.clone(),
                    domain: domain.clone(),
                    password: Some(password.clone()),
                },
            });
        }
        AuthMethod::Token(token) => {
            identity.token = Some(TokenIdRequest { id: token.clone() });
        }
        AuthMethod::ApplicationCredential { id, secret } => {
            identity.application_credential = Some(ApplicationCredentialRequest {
                credential: IdOrName::Id(id.clone()),
                secret: secret.clone(),
                user: None,
            });
        }
        AuthMethod::ApplicationCredentialName {
            name,
            secret,
            user,
            domain,
        } => {
            identity.application_credential = Some(ApplicationCredentialRequest {
                credential: IdOrName::Name(name.clone()),
                secret: secret.clone(),
                user: Some(UserRequest {
                    user: user.clone(),
                    domain: domain.clone(),
                    password: None,
                }),
            });
        }
    }

    // Application credentials are bound to their own project
    let scope = match creds.method {
        AuthMethod::ApplicationCredential { .. } | AuthMethod::ApplicationCredentialName { .. } => {
            if creds.scope.is_some() {
                tracing::debug!("Ignoring explicit scope for application credential authentication");
            }
            None
        }
        _ => creds.scope.as_ref().map(scope_request),
    };

    TokenRequest {
        auth: AuthRequest { identity, scope },
    }
}

fn scope_request(scope: &Scope) -> ScopeRequest {
    match scope {
        Scope::Project { project, domain } => ScopeRequest {
            project: Some(ProjectScopeRequest {
                project: project.clone(),
                domain: domain.clone(),
            }),
            domain: None,
        },
        Scope::Domain(domain) => ScopeRequest {
            project: None,
            domain: Some(domain.clone()),
        },
    }
}
