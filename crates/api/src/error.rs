use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use imageai_core::error::CoreError;
use imageai_core::storage::StorageError;
use serde_json::json;

use crate::response::{Envelope, ErrorBody};

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce the error envelope.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed request that never reached validation (bad JSON, bad
    /// query string, bad path segment).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request body hit the transport limit before it could be read.
    #[error("Request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("Route not found")]
    RouteNotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl AppError {
    fn parts(&self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Core(core) => core_parts(core),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                body("invalid_request", msg.clone(), None),
            ),
            AppError::BodyTooLarge { limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                body(
                    "payload_too_large",
                    self.to_string(),
                    Some(json!({ "limit": limit })),
                ),
            ),
            AppError::RouteNotFound => (
                StatusCode::NOT_FOUND,
                body("not_found", "route not found".into(), None),
            ),
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                body("method_not_allowed", "method not allowed".into(), None),
            ),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.parts();
        Envelope::error(error).into_response_with(status)
    }
}

fn core_parts(core: &CoreError) -> (StatusCode, ErrorBody) {
    match core {
        CoreError::NotFound { .. } => (
            StatusCode::NOT_FOUND,
            body("not_found", core.to_string(), None),
        ),
        CoreError::Validation { fields, message } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            body("validation_error", message.clone(), Some(json!({ "fields": fields }))),
        ),
        CoreError::InvalidRequest { fields, message } => {
            let details = (!fields.is_empty()).then(|| json!({ "fields": fields }));
            (
                StatusCode::BAD_REQUEST,
                body("invalid_request", message.clone(), details),
            )
        }
        CoreError::ThumbnailRequired { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            body(
                "validation_thumbnail_required",
                "thumbnail required for publish".into(),
                Some(json!({ "fields": ["thumbnail_url"] })),
            ),
        ),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, body("conflict", msg.clone(), None)),
        CoreError::Unauthorized(msg) => (
            StatusCode::UNAUTHORIZED,
            body("unauthorized", msg.clone(), None),
        ),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, body("forbidden", msg.clone(), None)),
        CoreError::PayloadTooLarge { size, limit } => (
            StatusCode::PAYLOAD_TOO_LARGE,
            body(
                "payload_too_large",
                core.to_string(),
                Some(json!({ "size": size, "limit": limit })),
            ),
        ),
        CoreError::UnsupportedMediaType(msg) => (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            body("unsupported_media_type", msg.clone(), None),
        ),
        CoreError::Upstream(msg) => (
            StatusCode::BAD_GATEWAY,
            body("upstream_error", msg.clone(), None),
        ),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

/// Classify a sqlx error into an HTTP status and error body.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, ErrorBody) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            body("not_found", "Resource not found".into(), None),
        ),
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        body(
                            "conflict",
                            format!("Duplicate value violates unique constraint: {constraint}"),
                            None,
                        ),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

fn body(code: &'static str, message: String, details: Option<serde_json::Value>) -> ErrorBody {
    ErrorBody {
        code,
        message,
        details,
    }
}

fn internal() -> (StatusCode, ErrorBody) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        body("internal_error", INTERNAL_MESSAGE.into(), None),
    )
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Core(err.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::BodyTooLarge {
                limit: crate::handlers::template_assets::UPLOAD_BODY_LIMIT,
            };
        }
        AppError::BadRequest(err.body_text())
    }
}
