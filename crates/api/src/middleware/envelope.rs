//! Attaches `meta` (`requestId`, `timestamp`) to enveloped responses.

use axum::extract::Request;
use axum::http::header::CONTENT_LENGTH;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};

use crate::response::{Envelope, Meta};

/// Re-render any response carrying an [`Envelope`] extension with `meta`
/// filled in. Responses without one (static files, timeouts) pass through.
///
/// Must run inside the request-id layer so `x-request-id` is already set.
pub async fn attach_meta(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let response = next.run(request).await;
    let Some(mut envelope) = response.extensions().get::<Envelope>().cloned() else {
        return response;
    };

    envelope.meta = Some(Meta {
        request_id,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    });

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    let body = axum::Json(&envelope).into_response().into_body();
    Response::from_parts(parts, body)
}
