//! The `{ success, data, error, meta }` response envelope.
//!
//! Handlers return [`ApiResponse`]; errors go through
//! [`AppError`](crate::error::AppError). Both render a body without `meta`
//! and stash an [`Envelope`] in the response extensions. The
//! [`attach_meta`](crate::middleware::envelope::attach_meta) middleware
//! re-renders that envelope with the request id and timestamp.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// Error half of the envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub request_id: String,
    pub timestamp: String,
}

/// A fully-formed envelope, kept in response extensions until the request
/// metadata is attached.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl Envelope {
    pub fn error(error: ErrorBody) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            meta: None,
        }
    }

    /// Render with `status`, keeping a copy in the extensions.
    pub fn into_response_with(self, status: StatusCode) -> Response {
        let mut response = (status, Json(&self)).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Successful response carrying `data`.
///
/// ```ignore
/// Ok(ApiResponse::created(template))
/// ```
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    status: StatusCode,
    data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data: Some(data),
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// `{ success: true }` with no data, used by deletes.
    pub fn empty() -> Self {
        Self {
            status: StatusCode::OK,
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let data = match self.data.map(serde_json::to_value).transpose() {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response data");
                return Envelope::error(ErrorBody {
                    code: "internal_error",
                    message: "An internal error occurred".into(),
                    details: None,
                })
                .into_response_with(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        Envelope {
            success: true,
            data,
            error: None,
            meta: None,
        }
        .into_response_with(self.status)
    }
}
