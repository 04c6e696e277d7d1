//! Image upload proxy and signed object downloads.

#![allow(clippy::unwrap_used)]

use axum::http::{StatusCode, header};
use chrono::Utc;

use stockroom_core::{Email, UserId};
use stockroom_integration_tests::{
    TEST_MAX_UPLOAD_BYTES, TestApp, body_bytes, body_json, expect_status, get, local_path,
    multipart_upload,
};
use stockroom_server::models::CurrentUser;
use stockroom_server::services::storage::NEVER_EXPIRES;

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png";

async fn signed_in(app: &TestApp) -> String {
    app.session_cookie(&CurrentUser {
        id: UserId::new(7),
        email: Email::parse("stock@stockroom.test").unwrap(),
        display_name: "Stock Room".to_string(),
    })
    .await
}

#[tokio::test]
async fn test_upload_then_download() {
    let app = TestApp::without_database();
    let cookie = signed_in(&app).await;

    let response = expect_status(
        app.send(multipart_upload(
            Some(&cookie),
            "file",
            "My Coffee.png",
            "image/png",
            PNG_BYTES,
        ))
        .await,
        StatusCode::OK,
    );
    let body = body_json(response).await;
    assert_eq!(body["success"], true);

    let key = body["key"].as_str().unwrap();
    assert!(key.starts_with("products/product_"), "key was {key}");
    assert!(key.ends_with("_My_Coffee.png"), "key was {key}");

    let url = body["url"].as_str().unwrap();
    let response = expect_status(app.send(get(local_path(url), None)).await, StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "image/png"
    );
    assert_eq!(body_bytes(response).await, PNG_BYTES);
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let app = TestApp::without_database();
    let cookie = signed_in(&app).await;

    let response = expect_status(
        app.send(multipart_upload(
            Some(&cookie),
            "attachment",
            "photo.png",
            "image/png",
            PNG_BYTES,
        ))
        .await,
        StatusCode::BAD_REQUEST,
    );
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No file uploaded");
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let app = TestApp::without_database();
    let cookie = signed_in(&app).await;
    let too_big = vec![0_u8; TEST_MAX_UPLOAD_BYTES + 1];

    let response = app
        .send(multipart_upload(
            Some(&cookie),
            "file",
            "huge.png",
            "image/png",
            &too_big,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_download_checks_signature() {
    let app = TestApp::without_database();
    let key = "products/product_1_shelf.jpg";
    app.state.objects().put(key, b"jpeg bytes").await.unwrap();

    let url = app.state.objects().signed_url(key, NEVER_EXPIRES).unwrap();
    let path = local_path(&url);
    let response = expect_status(app.send(get(path, None)).await, StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");

    let (base, signature) = path.rsplit_once("signature=").unwrap();
    let mut forged = signature.to_owned();
    let last = if forged.ends_with('0') { "1" } else { "0" };
    forged.replace_range(forged.len() - 1.., last);
    let tampered = format!("{base}signature={forged}");
    expect_status(app.send(get(&tampered, None)).await, StatusCode::FORBIDDEN);

    let other_key = path.replace("shelf.jpg", "other.jpg");
    expect_status(app.send(get(&other_key, None)).await, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_download_rejects_expired_url() {
    let app = TestApp::without_database();
    let key = "products/product_2_old.png";
    app.state.objects().put(key, PNG_BYTES).await.unwrap();

    let expired = Utc::now().timestamp() - 60;
    let url = app.state.objects().signed_url(key, expired).unwrap();
    expect_status(
        app.send(get(local_path(&url), None)).await,
        StatusCode::FORBIDDEN,
    );
}

#[tokio::test]
async fn test_download_missing_object() {
    let app = TestApp::without_database();
    let url = app
        .state
        .objects()
        .signed_url("products/product_3_gone.png", NEVER_EXPIRES)
        .unwrap();
    expect_status(
        app.send(get(local_path(&url), None)).await,
        StatusCode::NOT_FOUND,
    );
}

#[tokio::test]
async fn test_download_without_signature() {
    let app = TestApp::without_database();
    let response = app
        .send(get("/objects/products/product_1_shelf.jpg", None))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
