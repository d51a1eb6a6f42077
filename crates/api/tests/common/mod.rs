//! Shared harness for API integration tests.
//!
//! Builds the production router via [`build_app_router`] with a stub image
//! generator, temp-dir blob stores, and two verifiers: the real dev-token
//! verifier and a static one that maps fixed tokens to principals.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use imageai_api::auth::dev::DevTokenVerifier;
use imageai_api::auth::{AuthError, IdentityVerifier, Principal, VerifierChain};
use imageai_api::config::{
    AuthConfig, DevAuthConfig, GeminiConfig, ServerConfig, StorageConfig, PROCESSED_BASE_URL,
};
use imageai_api::router::build_app_router;
use imageai_api::state::AppState;
use imageai_core::storage::LocalBlobStore;
use imageai_genai::{GeminiError, GenerateRequest, GeneratedImage, ImageGenerator};
use serde_json::Value;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN: &str = "admin-token";
pub const USER: &str = "user-token";
pub const USER_EMAIL: &str = "user@example.com";

pub const DEV_EMAIL: &str = "dev@example.com";
pub const DEV_PASSWORD: &str = "dev-password";

/// Smallest byte strings the format sniffer recognises.
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR-test-png";
pub const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0-test-jpeg";
pub const GIF: &[u8] = b"GIF89a-test-gif";

// ---------------------------------------------------------------------------
// Collaborator stubs
// ---------------------------------------------------------------------------

/// Accepts [`ADMIN`] and [`USER`] verbatim.
struct StaticVerifier;

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        match token {
            ADMIN => Ok(Principal {
                uid: "admin-uid".into(),
                email: Some("admin@example.com".into()),
                is_admin: true,
            }),
            USER => Ok(Principal {
                uid: "user-uid".into(),
                email: Some(USER_EMAIL.into()),
                is_admin: false,
            }),
            _ => Err(AuthError::InvalidToken("unknown test token".into())),
        }
    }
}

/// A call the stub generator received.
#[derive(Debug, Clone)]
pub struct GenerateCall {
    pub prompt: String,
    pub model: Option<String>,
    pub mime_type: String,
    pub image: Vec<u8>,
}

#[derive(Default)]
pub struct StubGenerator {
    pub calls: Mutex<Vec<GenerateCall>>,
    pub fail: Mutex<bool>,
    /// Replaces the default PNG answer when set.
    pub output: Mutex<Option<GeneratedImage>>,
}

#[async_trait]
impl ImageGenerator for StubGenerator {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<GeneratedImage, GeminiError> {
        self.calls.lock().unwrap().push(GenerateCall {
            prompt: request.prompt.to_string(),
            model: request.model.map(str::to_string),
            mime_type: request.mime_type.to_string(),
            image: request.image.to_vec(),
        });
        if *self.fail.lock().unwrap() {
            return Err(GeminiError::Api {
                status: 500,
                body: "stub failure".into(),
            });
        }
        let output = self.output.lock().unwrap().clone();
        Ok(output.unwrap_or_else(|| GeneratedImage {
            bytes: PNG.to_vec(),
            mime_type: Some("image/png".into()),
        }))
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub pool: PgPool,
    pub generator: Arc<StubGenerator>,
    pub assets_dir: PathBuf,
    pub processed_dir: PathBuf,
    _dir: TempDir,
}

/// Build a test `ServerConfig` rooted at `dir`.
pub fn test_config(dir: &TempDir, dev_auth: bool) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_url: String::new(),
        storage: StorageConfig {
            assets_dir: dir.path().join("assets"),
            assets_base_url: "/assets".to_string(),
            processed_dir: dir.path().join("processed"),
        },
        gemini: GeminiConfig {
            api_key: String::new(),
            base_url: "http://127.0.0.1:9".to_string(),
            model: imageai_genai::DEFAULT_MODEL.to_string(),
        },
        auth: AuthConfig {
            firebase_project_id: None,
            admin_emails: Vec::new(),
            admin_claim_key: "admin".to_string(),
            dev: dev_auth.then(|| DevAuthConfig {
                admin_email: DEV_EMAIL.to_string(),
                admin_password: DEV_PASSWORD.to_string(),
                secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
                token_ttl_mins: 15,
            }),
        },
    }
}

pub fn build_test_app(pool: PgPool) -> TestApp {
    build_test_app_with(pool, true)
}

pub fn build_test_app_with(pool: PgPool, dev_auth: bool) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir, dev_auth);
    let generator = Arc::new(StubGenerator::default());

    let dev = config
        .auth
        .dev
        .clone()
        .map(|dev| Arc::new(DevTokenVerifier::new(dev)));
    let mut verifier = VerifierChain::new();
    if let Some(dev) = &dev {
        verifier = verifier.with(dev.clone());
    }
    verifier = verifier.with(Arc::new(StaticVerifier));

    let state = AppState {
        pool: pool.clone(),
        assets: Arc::new(LocalBlobStore::new(
            &config.storage.assets_dir,
            &config.storage.assets_base_url,
        )),
        processed: Arc::new(LocalBlobStore::new(
            &config.storage.processed_dir,
            PROCESSED_BASE_URL,
        )),
        generator: generator.clone(),
        verifier: Arc::new(verifier),
        dev_auth: dev,
    };

    TestApp {
        router: build_app_router(state, &config).unwrap(),
        pool,
        generator,
        assets_dir: config.storage.assets_dir.clone(),
        processed_dir: config.storage.processed_dir.clone(),
        _dir: dir,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or_else(|e| {
            panic!(
                "response is not JSON ({e}): {}",
                String::from_utf8_lossy(&self.bytes)
            )
        })
    }
}

pub async fn send(app: &TestApp, request: Request<Body>) -> TestResponse {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    TestResponse {
        status,
        headers,
        bytes,
    }
}

fn builder(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

pub async fn get(app: &TestApp, uri: &str, token: Option<&str>) -> TestResponse {
    send(app, builder(Method::GET, uri, token).body(Body::empty()).unwrap()).await
}

pub async fn delete(app: &TestApp, uri: &str, token: Option<&str>) -> TestResponse {
    send(app, builder(Method::DELETE, uri, token).body(Body::empty()).unwrap()).await
}

pub async fn post_empty(app: &TestApp, uri: &str, token: Option<&str>) -> TestResponse {
    send(app, builder(Method::POST, uri, token).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: &TestApp, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
    send_json(app, Method::POST, uri, token, body).await
}

pub async fn put_json(app: &TestApp, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
    send_json(app, Method::PUT, uri, token, body).await
}

async fn send_json(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> TestResponse {
    let request = builder(method, uri, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// One part of a multipart form.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        filename: &'a str,
        bytes: &'a [u8],
    },
}

pub async fn post_multipart(
    app: &TestApp,
    uri: &str,
    token: Option<&str>,
    parts: &[Part<'_>],
) -> TestResponse {
    const BOUNDARY: &str = "----imageai-test-boundary";
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                filename,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let request = builder(Method::POST, uri, token)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Create a template through the API and return its JSON.
pub async fn create_template(app: &TestApp, body: Value) -> Value {
    let response = post_json(app, "/api/v1/admin/templates", Some(ADMIN), body).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.json());
    response.json()["data"].clone()
}

/// Create a draft, public template with no tags.
pub async fn create_draft(app: &TestApp, slug: &str) -> Value {
    create_template(
        app,
        serde_json::json!({
            "slug": slug,
            "name": format!("Template {slug}"),
            "status": "draft",
            "visibility": "public",
        }),
    )
    .await
}

/// Upload an asset and return its JSON.
pub async fn upload_asset(app: &TestApp, slug: &str, kind: &str, bytes: &[u8]) -> Value {
    let response = post_multipart(
        app,
        &format!("/api/v1/admin/templates/{slug}/assets"),
        Some(ADMIN),
        &[
            Part::Text("kind", kind),
            Part::File {
                name: "file",
                filename: "photo.png",
                bytes,
            },
        ],
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.json());
    response.json()["data"].clone()
}
