mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::*;
use imageai_db::repositories::UserProfileRepo;
use serde_json::json;
use sqlx::PgPool;

async fn dev_login(app: &TestApp, email: &str, password: &str) -> TestResponse {
    post_json(
        app,
        "/api/v1/dev/login",
        None,
        json!({ "email": email, "password": password }),
    )
    .await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn dev_login_issues_admin_token(pool: PgPool) {
    let app = build_test_app(pool);

    let response = dev_login(&app, DEV_EMAIL, DEV_PASSWORD).await;

    assert_eq!(response.status, StatusCode::OK);
    let data = response.json()["data"].clone();
    assert_eq!(data["email"], DEV_EMAIL);
    assert_eq!(data["role"], "admin");
    assert_eq!(data["expires_in"], 15 * 60);
    let token = data["token"].as_str().unwrap().to_string();

    let whoami = get(&app, "/api/v1/dev/whoami", Some(&token)).await;
    assert_eq!(whoami.status, StatusCode::OK);
    let me = whoami.json()["data"].clone();
    assert_eq!(me["email"], DEV_EMAIL);
    assert_eq!(me["role"], "admin");

    // The dev token works on admin routes.
    let list = get(&app, "/api/v1/admin/templates", Some(&token)).await;
    assert_eq!(list.status, StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn dev_login_rejects_bad_credentials(pool: PgPool) {
    let app = build_test_app(pool);

    let response = dev_login(&app, DEV_EMAIL, "wrong").await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["error"]["message"], "invalid email or password");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn dev_routes_absent_when_disabled(pool: PgPool) {
    let app = build_test_app_with(pool, false);

    let response = dev_login(&app, DEV_EMAIL, DEV_PASSWORD).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"]["code"], "not_found");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn whoami_reports_non_admin_role(pool: PgPool) {
    let app = build_test_app(pool);

    let response = get(&app, "/api/v1/dev/whoami", Some(USER)).await;

    assert_eq!(response.status, StatusCode::OK);
    let data = response.json()["data"].clone();
    assert_eq!(data["uid"], "user-uid");
    assert_eq!(data["role"], "user");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_keys_profile_by_token_email(pool: PgPool) {
    let app = build_test_app(pool.clone());

    let response = post_json(
        &app,
        "/api/v1/users/register",
        Some(USER),
        json!({ "name": "Ada", "email": "someone-else@example.com", "avatar_url": "https://a/x.png" }),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    let data = response.json()["data"].clone();
    assert_eq!(data["user_id"], USER_EMAIL);
    assert_eq!(data["message"], "User registered/updated successfully.");

    let profile = UserProfileRepo::find_by_email(&pool, USER_EMAIL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.name, "Ada");
    assert!(UserProfileRepo::find_by_email(&pool, "someone-else@example.com")
        .await
        .unwrap()
        .is_none());

    // Registering again updates in place.
    let response = post_json(
        &app,
        "/api/v1/users/register",
        Some(USER),
        json!({ "name": "Ada L." }),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let again = UserProfileRepo::find_by_email(&pool, USER_EMAIL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.id, profile.id);
    assert_eq!(again.name, "Ada L.");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_requires_name(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_json(&app, "/api/v1/users/register", Some(USER), json!({})).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let json = response.json();
    assert_eq!(json["error"]["message"], "name and email are required");
    assert_eq!(json["error"]["details"]["fields"], json!(["name"]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_route_and_wrong_method_use_envelope(pool: PgPool) {
    let app = build_test_app(pool);

    let response = get(&app, "/api/v1/nothing-here", Some(ADMIN)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let json = response.json();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "not_found");
    assert!(json["meta"]["requestId"].is_string());

    let response = send(
        &app,
        Request::builder()
            .method(Method::PATCH)
            .uri("/api/v1/admin/templates")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.json()["error"]["code"], "method_not_allowed");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn incoming_request_id_is_echoed(pool: PgPool) {
    let app = build_test_app(pool);

    let response = send(
        &app,
        Request::builder()
            .uri("/api/v1/templates")
            .header("x-request-id", "req-123")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers.get("x-request-id").unwrap(), "req-123");
    assert_eq!(response.json()["meta"]["requestId"], "req-123");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn health_reports_database(pool: PgPool) {
    let app = build_test_app(pool);

    let response = get(&app, "/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    let json = response.json();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["db_healthy"], true);
    assert!(json["version"].is_string());
}
