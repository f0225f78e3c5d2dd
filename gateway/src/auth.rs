//! Caller identity checks. Every proxy invocation carries a bearer
//! token for the surrounding application's identity provider; the
//! vendor session token is a separate concern handled by
//! [`crate::session`].

use crate::errors::{Error, Result};

/// The resolved identity of whoever invoked the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: String,
}

/// Resolves a bearer token to a caller identity, or rejects it.
/// Injected so the proxy is testable without the identity provider.
#[async_trait::async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, bearer_token: &str) -> Result<CallerIdentity>;
}

/// Accepts any non-empty token and uses it as the user id. Suitable
/// for embedding behind an upstream gateway that has already
/// authenticated the caller, and for tests.
pub struct StaticIdentityVerifier;

#[async_trait::async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, bearer_token: &str) -> Result<CallerIdentity> {
        let token = bearer_token.trim();
        if token.is_empty() {
            return Err(Error::Unauthorized);
        }
        Ok(CallerIdentity {
            user_id: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_token_is_unauthorized() {
        let verifier = StaticIdentityVerifier;
        assert!(matches!(
            verifier.verify("").await.unwrap_err(),
            Error::Unauthorized
        ));
        assert!(matches!(
            verifier.verify("   ").await.unwrap_err(),
            Error::Unauthorized
        ));
    }

    #[tokio::test]
    async fn token_becomes_identity() {
        let verifier = StaticIdentityVerifier;
        let identity = verifier.verify("user-17").await.unwrap();
        assert_eq!(identity.user_id, "user-17");
    }
}
