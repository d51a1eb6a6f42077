//! Development-only login endpoints. Mounted only when dev auth is enabled.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use imageai_core::error::CoreError;
use imageai_core::roles::ROLE_ADMIN;
use serde::{Deserialize, Serialize};

use crate::auth::dev::DevTokenVerifier;
use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DevLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct DevLoginResponse {
    pub token: String,
    pub email: String,
    pub role: &'static str,
    /// Token lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub uid: String,
    pub email: Option<String>,
    pub role: String,
}

fn dev_verifier(state: &AppState) -> AppResult<&Arc<DevTokenVerifier>> {
    state
        .dev_auth
        .as_ref()
        .ok_or_else(|| AppError::Core(CoreError::Forbidden("dev auth disabled".into())))
}

/// POST /api/v1/dev/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<DevLoginRequest>,
) -> AppResult<impl IntoResponse> {
    let verifier = dev_verifier(&state)?;

    if !verifier.check_credentials(&input.email, &input.password) {
        tracing::warn!("Dev login rejected");
        return Err(CoreError::Unauthorized("invalid email or password".into()).into());
    }

    let email = input.email.trim().to_string();
    let token = verifier
        .issue(&email)
        .map_err(|e| AppError::InternalError(format!("Failed to sign dev token: {e}")))?;

    tracing::info!(email = %email, "Dev login");

    Ok(ApiResponse::ok(DevLoginResponse {
        token,
        email,
        role: ROLE_ADMIN,
        expires_in: verifier.token_ttl_secs(),
    }))
}

/// GET /api/v1/dev/whoami
pub async fn whoami(user: AuthUser) -> AppResult<impl IntoResponse> {
    Ok(ApiResponse::ok(WhoAmIResponse {
        uid: user.uid,
        email: user.email,
        role: user.role,
    }))
}
