//! Bearer-token authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use imageai_core::error::CoreError;
use imageai_core::roles::{ROLE_ADMIN, ROLE_USER};

use crate::auth::IdentityVerifier;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated caller, verified through the configured
/// [`VerifierChain`](crate::auth::VerifierChain).
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<ApiResponse<()>> {
///     tracing::info!(uid = %user.uid, role = %user.role, "handling request");
///     Ok(ApiResponse::empty())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Stable subject id from the identity provider.
    pub uid: String,
    /// Verified email, when the token carries one.
    pub email: Option<String>,
    /// `"admin"` or `"user"`.
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Invalid Authorization format. Expected: Bearer <token>".into(),
                ))
            })?;

        let principal = state.verifier.verify(token).await?;

        Ok(AuthUser {
            uid: principal.uid,
            email: principal.email,
            role: if principal.is_admin { ROLE_ADMIN } else { ROLE_USER }.to_string(),
        })
    }
}
