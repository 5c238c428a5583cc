// Token providers consumed by service clients

use async_trait::async_trait;

use crate::error::{AuthError, Result};

/// Source of tokens for authenticated requests
///
/// Service clients branch on [`TokenProvider::can_reauthenticate`] when a request is rejected
/// with 401: refreshable providers get one forced reauthentication, static ones fail at once.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Currently usable token
    async fn token(&self) -> Result<String>;

    /// Whether [`TokenProvider::reauthenticate`] can produce a new token
    fn can_reauthenticate(&self) -> bool;

    /// Obtain a new token regardless of the tracked expiry and return it
    async fn reauthenticate(&self) -> Result<String>;
}

/// Pre-issued token without refresh capability
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(AuthError::EmptyToken.into());
        }
        Ok(self.token.clone())
    }

    fn can_reauthenticate(&self) -> bool {
        false
    }

    async fn reauthenticate(&self) -> Result<String> {
        Err(AuthError::ReauthUnsupported.into())
    }
}
