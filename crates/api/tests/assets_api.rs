mod common;

use axum::http::StatusCode;
use common::*;
use imageai_core::asset::MAX_ASSET_BYTES;
use serde_json::json;
use sqlx::PgPool;

fn assets_uri(slug: &str) -> String {
    format!("/api/v1/admin/templates/{slug}/assets")
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_stores_file_and_serves_it(pool: PgPool) {
    let app = build_test_app(pool);
    create_draft(&app, "summer").await;

    let asset = upload_asset(&app, "summer", "thumbnail", PNG).await;

    assert_eq!(asset["kind"], "thumbnail");
    assert_eq!(asset["sort_order"], 0);
    let url = asset["url"].as_str().unwrap();
    assert!(url.starts_with("/assets/templates/summer/"), "{url}");
    assert!(url.ends_with(".png"), "{url}");
    assert!(asset.get("template_id").is_none());

    let served = get(&app, url, None).await;
    assert_eq!(served.status, StatusCode::OK);
    assert_eq!(served.bytes, PNG);

    let template = get(&app, "/api/v1/admin/templates/summer", Some(ADMIN)).await.json();
    assert_eq!(template["data"]["thumbnail_url"], url);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_names_file_by_sniffed_type(pool: PgPool) {
    let app = build_test_app(pool);
    create_draft(&app, "jpeg").await;

    // Filename says .png, the bytes are JPEG.
    let asset = upload_asset(&app, "jpeg", "cover", JPEG).await;

    assert!(asset["url"].as_str().unwrap().ends_with(".jpg"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_rejects_other_image_types(pool: PgPool) {
    let app = build_test_app(pool);
    create_draft(&app, "gif").await;

    let response = post_multipart(
        &app,
        &assets_uri("gif"),
        Some(ADMIN),
        &[
            Part::Text("kind", "preview"),
            Part::File {
                name: "file",
                filename: "anim.gif",
                bytes: GIF,
            },
        ],
    )
    .await;

    assert_eq!(response.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(response.json()["error"]["code"], "unsupported_media_type");
    assert!(!app.assets_dir.join("templates/gif").exists());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_validates_kind_and_file(pool: PgPool) {
    let app = build_test_app(pool);
    create_draft(&app, "form").await;

    let response = post_multipart(
        &app,
        &assets_uri("form"),
        Some(ADMIN),
        &[
            Part::Text("kind", "banner"),
            Part::File {
                name: "file",
                filename: "a.png",
                bytes: PNG,
            },
        ],
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json()["error"]["details"]["fields"], json!(["kind"]));

    let response = post_multipart(
        &app,
        &assets_uri("form"),
        Some(ADMIN),
        &[Part::Text("kind", "cover")],
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"]["details"]["fields"], json!(["file"]));

    let response = post_multipart(
        &app,
        &assets_uri("form"),
        Some(ADMIN),
        &[
            Part::Text("kind", "cover"),
            Part::Text("sort_order", "first"),
            Part::File {
                name: "file",
                filename: "a.png",
                bytes: PNG,
            },
        ],
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json()["error"]["details"]["fields"], json!(["sort_order"]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_rejects_oversized_file(pool: PgPool) {
    let app = build_test_app(pool);
    create_draft(&app, "big").await;

    let mut bytes = PNG.to_vec();
    bytes.resize(MAX_ASSET_BYTES + 1, 0);

    let response = post_multipart(
        &app,
        &assets_uri("big"),
        Some(ADMIN),
        &[
            Part::Text("kind", "cover"),
            Part::File {
                name: "file",
                filename: "big.png",
                bytes: &bytes,
            },
        ],
    )
    .await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    let json = response.json();
    assert_eq!(json["error"]["code"], "payload_too_large");
    assert_eq!(json["error"]["details"]["limit"], MAX_ASSET_BYTES);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_to_unknown_template_is_not_found(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_multipart(
        &app,
        &assets_uri("missing"),
        Some(ADMIN),
        &[
            Part::Text("kind", "cover"),
            Part::File {
                name: "file",
                filename: "a.png",
                bytes: PNG,
            },
        ],
    )
    .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn second_thumbnail_demotes_first(pool: PgPool) {
    let app = build_test_app(pool);
    create_draft(&app, "twice").await;

    let first = upload_asset(&app, "twice", "thumbnail", PNG).await;
    let second = upload_asset(&app, "twice", "thumbnail", JPEG).await;

    let list = get(&app, &assets_uri("twice"), Some(ADMIN)).await;
    assert_eq!(list.status, StatusCode::OK);
    let assets = list.json()["data"]["assets"].as_array().unwrap().clone();
    assert_eq!(assets.len(), 2);

    let kind_of = |id: &serde_json::Value| {
        assets
            .iter()
            .find(|a| a["id"] == *id)
            .map(|a| a["kind"].as_str().unwrap().to_string())
            .unwrap()
    };
    assert_eq!(kind_of(&first["id"]), "preview");
    assert_eq!(kind_of(&second["id"]), "thumbnail");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_asset_to_thumbnail_enables_publish(pool: PgPool) {
    let app = build_test_app(pool);
    create_draft(&app, "promote").await;
    let cover = upload_asset(&app, "promote", "cover", PNG).await;

    let response = put_json(
        &app,
        &format!("{}/{}", assets_uri("promote"), cover["id"]),
        Some(ADMIN),
        json!({ "kind": "thumbnail", "sort_order": 3 }),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let data = &response.json()["data"];
    assert_eq!(data["kind"], "thumbnail");
    assert_eq!(data["sort_order"], 3);

    let response = post_empty(
        &app,
        "/api/v1/admin/templates/promote/publish",
        Some(ADMIN),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = put_json(
        &app,
        &format!("{}/{}", assets_uri("promote"), cover["id"]),
        Some(ADMIN),
        json!({ "kind": "poster" }),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_asset_removes_row_and_file(pool: PgPool) {
    let app = build_test_app(pool);
    create_draft(&app, "owner").await;
    create_draft(&app, "other").await;
    let asset = upload_asset(&app, "owner", "preview", PNG).await;
    let url = asset["url"].as_str().unwrap().to_string();

    // Scoped to the owning template.
    let response = delete(
        &app,
        &format!("{}/{}", assets_uri("other"), asset["id"]),
        Some(ADMIN),
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = delete(
        &app,
        &format!("{}/{}", assets_uri("owner"), asset["id"]),
        Some(ADMIN),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["success"], true);

    assert_eq!(get(&app, &url, None).await.status, StatusCode::NOT_FOUND);
    let list = get(&app, &assets_uri("owner"), Some(ADMIN)).await.json();
    assert_eq!(list["data"]["assets"], json!([]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_template_removes_asset_files(pool: PgPool) {
    let app = build_test_app(pool);
    create_draft(&app, "cascade").await;
    let asset = upload_asset(&app, "cascade", "cover", PNG).await;
    let url = asset["url"].as_str().unwrap().to_string();

    let response = delete(&app, "/api/v1/admin/templates/cascade", Some(ADMIN)).await;
    assert_eq!(response.status, StatusCode::OK);

    assert_eq!(get(&app, &url, None).await.status, StatusCode::NOT_FOUND);
    let response = get(&app, &assets_uri("cascade"), Some(ADMIN)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn replacing_thumbnail_by_url_removes_stored_file(pool: PgPool) {
    let app = build_test_app(pool);
    create_draft(&app, "swap").await;
    let asset = upload_asset(&app, "swap", "thumbnail", PNG).await;
    let old_url = asset["url"].as_str().unwrap().to_string();

    let response = put_json(
        &app,
        "/api/v1/admin/templates/swap",
        Some(ADMIN),
        json!({
            "name": "Swap",
            "status": "draft",
            "visibility": "public",
            "thumbnail_url": "https://cdn.example.com/swap.png",
        }),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json()["data"]["thumbnail_url"],
        "https://cdn.example.com/swap.png"
    );

    assert_eq!(get(&app, &old_url, None).await.status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn asset_routes_require_admin(pool: PgPool) {
    let app = build_test_app(pool);
    create_draft(&app, "locked").await;

    let response = get(&app, &assets_uri("locked"), Some(USER)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = post_multipart(
        &app,
        &assets_uri("locked"),
        None,
        &[Part::Text("kind", "cover")],
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
