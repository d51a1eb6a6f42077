//! Identity verification.
//!
//! - [`firebase`] -- Firebase ID tokens checked against Google's JWK set.
//! - [`dev`] -- HS256 tokens issued by the development login endpoint.
//!
//! Both implement [`IdentityVerifier`]; [`VerifierChain`] tries them in order.

pub mod dev;
pub mod firebase;

use std::sync::Arc;

use async_trait::async_trait;
use imageai_core::error::CoreError;

use crate::error::AppError;

/// The verified caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub uid: String,
    pub email: Option<String>,
    pub is_admin: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid or expired token: {0}")]
    InvalidToken(String),

    #[error("Signing key '{0}' is not published")]
    UnknownKey(String),

    /// The published key set could not be fetched or parsed.
    #[error("Failed to fetch signing keys: {0}")]
    KeyFetch(String),

    #[error("No identity verifier is configured")]
    NoVerifier,
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::InvalidToken(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::KeyFetch(_) | AuthError::NoVerifier => {
                tracing::warn!(error = %err, "Token could not be verified");
            }
            AuthError::InvalidToken(_) | AuthError::UnknownKey(_) => {
                tracing::debug!(error = %err, "Token rejected");
            }
        }
        AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
    }
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError>;
}

/// Tries each verifier in order and returns the first success. When all
/// fail, the last failure is returned.
#[derive(Default, Clone)]
pub struct VerifierChain {
    verifiers: Vec<Arc<dyn IdentityVerifier>>,
}

impl VerifierChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.verifiers.push(verifier);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.verifiers.is_empty()
    }
}

#[async_trait]
impl IdentityVerifier for VerifierChain {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let mut last = AuthError::NoVerifier;
        for verifier in &self.verifiers {
            match verifier.verify(token).await {
                Ok(principal) => return Ok(principal),
                Err(e) => last = e,
            }
        }
        Err(last)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    struct Fixed(Option<&'static str>);

    #[async_trait]
    impl IdentityVerifier for Fixed {
        async fn verify(&self, _token: &str) -> Result<Principal, AuthError> {
            match self.0 {
                Some(uid) => Ok(Principal {
                    uid: uid.into(),
                    email: None,
                    is_admin: false,
                }),
                None => Err(AuthError::InvalidToken(String::from("nope"))),
            }
        }
    }

    #[tokio::test]
    async fn empty_chain_rejects() {
        assert_matches!(
            VerifierChain::new().verify("t").await,
            Err(AuthError::NoVerifier)
        );
    }

    #[tokio::test]
    async fn first_success_wins() {
        let chain = VerifierChain::new()
            .with(Arc::new(Fixed(None)))
            .with(Arc::new(Fixed(Some("a"))))
            .with(Arc::new(Fixed(Some("b"))));
        assert_eq!(chain.verify("t").await.unwrap().uid, "a");
    }

    #[tokio::test]
    async fn last_failure_is_reported() {
        let chain = VerifierChain::new().with(Arc::new(Fixed(None)));
        assert_matches!(chain.verify("t").await, Err(AuthError::InvalidToken(_)));
    }
}
