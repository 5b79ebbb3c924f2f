//! # Request ID レイヤーのテスト
//!
//! Relay Service のルーターで Request ID が付与・伝播されることを検証する。
//!
//! - レスポンスに `X-Request-Id` ヘッダーが含まれる
//! - クライアント提供の `X-Request-Id` がそのまま返される
//! - 自動生成の `X-Request-Id` が UUID v7 形式である

mod helpers;

use axum::body::Body;
use helpers::spawn_app;
use http::{Request, StatusCode};
use tower::ServiceExt;

fn health_request() -> http::request::Builder {
    Request::builder().uri("/health")
}

#[tokio::test(start_paused = true)]
async fn test_レスポンスにx_request_idヘッダーが含まれる() {
    let app = spawn_app(false).await;

    let response = app
        .router
        .oneshot(health_request().body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers().contains_key("x-request-id"),
        "レスポンスに x-request-id ヘッダーが含まれること"
    );
}

#[tokio::test(start_paused = true)]
async fn test_クライアント提供のx_request_idがそのまま返される() {
    let app = spawn_app(false).await;
    let custom_id = "client-provided-request-id-123";

    let response = app
        .router
        .oneshot(
            health_request()
                .header("x-request-id", custom_id)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .unwrap()
            .to_str()
            .unwrap(),
        custom_id,
        "クライアント提供の Request ID がそのまま返されること"
    );
}

#[tokio::test(start_paused = true)]
async fn test_自動生成のx_request_idがuuid_v7形式である() {
    let app = spawn_app(false).await;

    let response = app
        .router
        .oneshot(health_request().body(Body::empty()).unwrap())
        .await
        .unwrap();

    let value = response
        .headers()
        .get("x-request-id")
        .unwrap()
        .to_str()
        .unwrap();
    let uuid = uuid::Uuid::parse_str(value).expect("UUID として解析できること");
    assert_eq!(uuid.get_version(), Some(uuid::Version::SortRand));
}
