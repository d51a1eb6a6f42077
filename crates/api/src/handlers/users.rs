//! User profile registration.

use axum::extract::State;
use axum::response::IntoResponse;
use imageai_core::error::CoreError;
use imageai_db::models::user_profile::RegisterUser;
use imageai_db::repositories::UserProfileRepo;
use serde::Serialize;

use crate::error::AppResult;
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// The email the profile is keyed by.
    pub user_id: String,
    pub message: &'static str,
}

/// The verified token email wins over the one in the body.
fn resolve_email(user: &AuthUser, input: &RegisterUser) -> String {
    user.email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| input.email.trim())
        .to_string()
}

/// POST /api/v1/users/register
///
/// Creates or refreshes the caller's profile, keyed by email.
pub async fn register_user(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterUser>,
) -> AppResult<impl IntoResponse> {
    let name = input.name.trim();
    let email = resolve_email(&user, &input);

    let mut missing = Vec::new();
    if name.is_empty() {
        missing.push("name".to_string());
    }
    if email.is_empty() {
        missing.push("email".to_string());
    }
    if !missing.is_empty() {
        return Err(CoreError::InvalidRequest {
            fields: missing,
            message: "name and email are required".into(),
        }
        .into());
    }

    let profile =
        UserProfileRepo::upsert(&state.pool, &email, name, Some(input.avatar_url.as_str())).await?;

    tracing::info!(profile_id = profile.id, uid = %user.uid, "User profile registered");

    Ok(ApiResponse::ok(RegisterResponse {
        user_id: profile.email,
        message: "User registered/updated successfully.",
    }))
}
