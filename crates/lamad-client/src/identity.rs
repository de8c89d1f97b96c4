//! Identity provider contract and implementations
//!
//! The client never issues, refreshes or revokes credentials; it only asks
//! the provider to turn a bearer token into a stable subject id.

use async_trait::async_trait;
use dashmap::DashMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject_id: String,
}

impl Identity {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
        }
    }
}

/// Turns an auth-proof token into an identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `None` when the token is missing, malformed, expired or unknown.
    async fn verify(&self, token: &str) -> Option<Identity>;
}

// =============================================================================
// Static provider
// =============================================================================

/// Token table, for tests and local demos.
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    tokens: DashMap<String, String>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, token: impl Into<String>, subject_id: impl Into<String>) -> Self {
        self.insert(token, subject_id);
        self
    }

    pub fn insert(&self, token: impl Into<String>, subject_id: impl Into<String>) {
        self.tokens.insert(token.into(), subject_id.into());
    }

    pub fn revoke(&self, token: &str) {
        self.tokens.remove(token);
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify(&self, token: &str) -> Option<Identity> {
        self.tokens.get(token).map(|subject| Identity::new(subject.value().clone()))
    }
}

// =============================================================================
// JWT provider
// =============================================================================

/// Claims the client reads from an identity token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Expiry (seconds since epoch)
    pub exp: u64,
    /// Issued at
    #[serde(default)]
    pub iat: u64,
}

/// Validates HS256-signed tokens issued by the identity service.
pub struct JwtIdentityProvider {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Only accept tokens carrying this `iss` claim.
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify(&self, token: &str) -> Option<Identity> {
        let token = token.strip_prefix("Bearer ").unwrap_or(token);
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) if !data.claims.sub.is_empty() => Some(Identity::new(data.claims.sub)),
            Ok(_) => {
                debug!("token has empty subject");
                None
            }
            Err(e) => {
                debug!(error = %e, "token rejected");
                None
            }
        }
    }
}
