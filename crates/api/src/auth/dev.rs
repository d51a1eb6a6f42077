//! Development-only login.
//!
//! `POST /dev/login` checks the configured admin email and password and
//! issues an HS256 token. Tokens are always admin.

use async_trait::async_trait;
use imageai_core::roles::ROLE_ADMIN;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuthError, IdentityVerifier, Principal};
use crate::config::DevAuthConfig;

/// Claims carried by a dev token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DevClaims {
    /// Subject -- the admin email.
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

pub struct DevTokenVerifier {
    config: DevAuthConfig,
}

impl DevTokenVerifier {
    pub fn new(config: DevAuthConfig) -> Self {
        Self { config }
    }

    /// Exact match on the trimmed email and password.
    pub fn check_credentials(&self, email: &str, password: &str) -> bool {
        email.trim() == self.config.admin_email && password.trim() == self.config.admin_password
    }

    pub fn token_ttl_secs(&self) -> i64 {
        self.config.token_ttl_mins * 60
    }

    pub fn issue(&self, email: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now().timestamp();
        let claims = DevClaims {
            sub: email.to_string(),
            role: ROLE_ADMIN.to_string(),
            exp: now + self.token_ttl_secs(),
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
    }
}

#[async_trait]
impl IdentityVerifier for DevTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let data = decode::<DevClaims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &Validation::default(),
        )?;
        let claims = data.claims;
        Ok(Principal {
            email: Some(claims.sub.clone()),
            uid: claims.sub,
            is_admin: claims.role == ROLE_ADMIN,
        })
    }
}
