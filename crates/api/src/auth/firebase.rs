//! Firebase ID token verification.
//!
//! Tokens are RS256 JWTs signed by one of the keys Google publishes as a JWK
//! set. The set is cached until its `Cache-Control: max-age` expires.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{AuthError, IdentityVerifier, Principal};
use crate::config::AuthConfig;

/// Google's published signing keys for Firebase ID tokens.
pub const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Cache lifetime when the key response carries no usable `max-age`.
const DEFAULT_KEY_TTL: Duration = Duration::from_secs(60 * 60);

/// An unknown key id triggers at most one refetch per interval.
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    email: Option<String>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

struct CachedKeys {
    set: JwkSet,
    fetched_at: Instant,
    expires_at: Instant,
}

/// Outcome of consulting the cached key set.
#[derive(Debug)]
enum Lookup {
    Hit(Jwk),
    /// The set is fresh and was fetched recently; the key is simply unknown.
    Miss,
    Refetch,
}

impl CachedKeys {
    fn lookup(cached: Option<&CachedKeys>, kid: &str, now: Instant) -> Lookup {
        let Some(cached) = cached.filter(|c| c.expires_at > now) else {
            return Lookup::Refetch;
        };
        if let Some(jwk) = cached.set.find(kid) {
            return Lookup::Hit(jwk.clone());
        }
        if now.saturating_duration_since(cached.fetched_at) < MIN_REFETCH_INTERVAL {
            Lookup::Miss
        } else {
            Lookup::Refetch
        }
    }
}

pub struct FirebaseVerifier {
    client: reqwest::Client,
    jwks_url: String,
    project_id: String,
    admin_claim_key: String,
    admin_emails: Vec<String>,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseVerifier {
    pub fn new(client: reqwest::Client, project_id: String, auth: &AuthConfig) -> Self {
        Self {
            client,
            jwks_url: GOOGLE_JWKS_URL.to_string(),
            project_id,
            admin_claim_key: auth.admin_claim_key.clone(),
            admin_emails: auth.admin_emails.clone(),
            keys: RwLock::new(None),
        }
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    /// Look up `kid`, refetching the key set when the cache is stale or
    /// does not know the key (Google rotates keys ahead of expiry). Unknown
    /// keys refetch at most once per [`MIN_REFETCH_INTERVAL`].
    async fn key(&self, kid: &str) -> Result<Jwk, AuthError> {
        let lookup = CachedKeys::lookup(self.keys.read().await.as_ref(), kid, Instant::now());
        match lookup {
            Lookup::Hit(jwk) => return Ok(jwk),
            Lookup::Miss => return Err(AuthError::UnknownKey(kid.to_string())),
            Lookup::Refetch => {}
        }

        let fresh = self.fetch_keys().await?;
        let jwk = fresh.set.find(kid).cloned();
        *self.keys.write().await = Some(fresh);
        jwk.ok_or_else(|| AuthError::UnknownKey(kid.to_string()))
    }

    async fn fetch_keys(&self) -> Result<CachedKeys, AuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeyFetch(format!(
                "key endpoint returned {}",
                response.status()
            )));
        }

        let ttl = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_KEY_TTL);

        let set = response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        tracing::debug!(keys = set.keys.len(), ttl_secs = ttl.as_secs(), "Refreshed Firebase signing keys");

        let fetched_at = Instant::now();
        Ok(CachedKeys {
            set,
            fetched_at,
            expires_at: fetched_at + ttl,
        })
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!("unexpected algorithm {:?}", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token has no key id".into()))?;

        let jwk = self.key(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[self.issuer()]);

        let claims = decode::<FirebaseClaims>(token, &key, &validation)?.claims;
        let is_admin = is_admin(
            &claims.extra,
            claims.email.as_deref(),
            &self.admin_claim_key,
            &self.admin_emails,
        );

        Ok(Principal {
            uid: claims.sub,
            email: claims.email,
            is_admin,
        })
    }
}

/// Admin iff the custom claim is literally `true` or the email is on the
/// allow-list (case-insensitive).
fn is_admin(
    claims: &HashMap<String, Value>,
    email: Option<&str>,
    claim_key: &str,
    admin_emails: &[String],
) -> bool {
    if claims.get(claim_key) == Some(&Value::Bool(true)) {
        return true;
    }
    email
        .map(|e| e.trim().to_lowercase())
        .is_some_and(|e| admin_emails.iter().any(|a| *a == e))
}

/// Extract `max-age` from a `Cache-Control` header value.
fn parse_max_age(header: &str) -> Option<Duration> {
    header
        .split(',')
        .filter_map(|d| d.trim().strip_prefix("max-age="))
        .find_map(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn max_age_is_parsed() {
        assert_eq!(
            parse_max_age("public, max-age=19302, must-revalidate, no-transform"),
            Some(Duration::from_secs(19302))
        );
        assert_eq!(parse_max_age("no-cache"), None);
        assert_eq!(parse_max_age("max-age=soon"), None);
    }

    fn cached(fetched_ago: Duration, ttl: Duration) -> (CachedKeys, Instant) {
        let fetched_at = Instant::now();
        let set: JwkSet = serde_json::from_value(json!({
            "keys": [{
                "kty": "RSA",
                "kid": "k1",
                "alg": "RS256",
                "use": "sig",
                "n": "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw",
                "e": "AQAB"
            }]
        }))
        .unwrap();
        let keys = CachedKeys {
            set,
            fetched_at,
            expires_at: fetched_at + ttl,
        };
        (keys, fetched_at + fetched_ago)
    }

    #[test]
    fn known_key_is_served_from_cache() {
        let (keys, now) = cached(Duration::ZERO, DEFAULT_KEY_TTL);
        assert!(matches!(CachedKeys::lookup(Some(&keys), "k1", now), Lookup::Hit(_)));
    }

    #[test]
    fn unknown_key_refetches_at_most_once_per_interval() {
        let (keys, now) = cached(Duration::from_secs(5), DEFAULT_KEY_TTL);
        assert!(matches!(CachedKeys::lookup(Some(&keys), "rogue", now), Lookup::Miss));

        let (keys, now) = cached(MIN_REFETCH_INTERVAL, DEFAULT_KEY_TTL);
        assert!(matches!(CachedKeys::lookup(Some(&keys), "rogue", now), Lookup::Refetch));
    }

    #[test]
    fn stale_or_empty_cache_refetches() {
        assert!(matches!(CachedKeys::lookup(None, "k1", Instant::now()), Lookup::Refetch));

        let (keys, now) = cached(Duration::from_secs(120), Duration::from_secs(60));
        assert!(matches!(CachedKeys::lookup(Some(&keys), "k1", now), Lookup::Refetch));
    }

    #[test]
    fn admin_by_claim_or_email() {
        let admins = vec!["boss@example.com".to_string()];
        let mut claims = HashMap::new();

        assert!(!is_admin(&claims, Some("user@example.com"), "admin", &admins));
        assert!(is_admin(&claims, Some("Boss@Example.com"), "admin", &admins));

        claims.insert("admin".to_string(), json!(true));
        assert!(is_admin(&claims, None, "admin", &admins));

        claims.insert("admin".to_string(), json!("true"));
        assert!(!is_admin(&claims, None, "admin", &admins));
        assert!(!is_admin(&claims, None, "staff", &admins));
    }
}
