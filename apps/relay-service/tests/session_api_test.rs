//! # セッション管理 API とヘルスチェックの統合テスト

mod helpers;

use axum::body::Body;
use formrelay_domain::session::ConnectionEvent;
use helpers::{
    ALLOWED_ORIGIN,
    RECONNECT_DELAY,
    get,
    opened,
    send,
    send_as_admin,
    settle,
    spawn_app,
    spawn_app_with,
};
use http::{Method, Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;


#[tokio::test(start_paused = true)]
async fn test_接続済みのstatusはアカウントを返す() {
    let app = spawn_app(true).await;

    let (status, body) = get(&app.router, "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": true, "connected": true, "user": "919999999999@s.whatsapp.net"})
    );
}

#[tokio::test(start_paused = true)]
async fn test_未接続のstatusはuserがnull() {
    let app = spawn_app(false).await;

    let (_, body) = get(&app.router, "/api/status").await;

    assert_eq!(
        body,
        json!({"success": true, "connected": false, "user": null})
    );
}

#[tokio::test(start_paused = true)]
async fn test_認証待ちの間はqrを返す() {
    let app = spawn_app(false).await;
    app.client
        .emit(ConnectionEvent::QrChallenge {
            code: "2@abc".to_string(),
        })
        .await;
    settle().await;

    let (status, body) = send_as_admin(&app.router, Method::GET, "/api/session/qr").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"qr": "2@abc"}));
}

#[tokio::test(start_paused = true)]
async fn test_認証待ちでなければqrは404() {
    let app = spawn_app(true).await;

    let (status, body) = send_as_admin(&app.router, Method::GET, "/api/session/qr").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test(start_paused = true)]
async fn test_接続済みの間の開始要求は何もしない() {
    let app = spawn_app(true).await;

    let (status, body) = send_as_admin(&app.router, Method::POST, "/api/session/start").await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({"started": false}));
    assert_eq!(app.client.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ログアウト後の開始要求で再接続する() {
    let app = spawn_app(true).await;
    app.client
        .emit(ConnectionEvent::Closed {
            status_code: Some(401),
        })
        .await;
    settle().await;
    tokio::time::sleep(RECONNECT_DELAY * 2).await;
    assert_eq!(app.client.connect_count(), 1);

    let (status, body) = send_as_admin(&app.router, Method::POST, "/api/session/start").await;
    settle().await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({"started": true}));
    assert_eq!(app.client.connect_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_一時的な切断中の予約は503で再接続後は成功する() {
    let app = spawn_app(true).await;
    app.client
        .emit(ConnectionEvent::Closed {
            status_code: Some(428),
        })
        .await;
    settle().await;

    let (status, _) = helpers::post_json(
        &app.router,
        "/api/appointment",
        json!({
            "name": "A", "phone": "9000000000", "email": "a@example.com",
            "category": "Career", "place": "Online", "date": "2026-11-02", "time": "10:30"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    tokio::time::sleep(RECONNECT_DELAY).await;
    settle().await;
    app.client.emit(opened()).await;
    settle().await;

    assert!(app.session.is_ready());
    assert_eq!(app.client.connect_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_管理トークンなしのセッション管理要求は401() {
    let app = spawn_app(false).await;
    app.client
        .emit(ConnectionEvent::QrChallenge {
            code: "2@abc".to_string(),
        })
        .await;
    settle().await;

    let (status, body) = get(&app.router, "/api/session/qr").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"success": false, "message": "Unauthorized"}));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/session/start")
        .header("authorization", "Bearer wrong-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.client.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_管理トークン未設定ならセッション管理apiは公開しない() {
    let app = spawn_app_with(false, None).await;

    let (status, _) = get(&app.router, "/api/session/qr").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send_as_admin(&app.router, Method::POST, "/api/session/start").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // 状態確認は管理トークンなしで使える
    let (status, _) = get(&app.router, "/api/status").await;
    assert_eq!(status, StatusCode::OK);
}

// ===== ヘルスチェック =====

#[tokio::test(start_paused = true)]
async fn test_healthは常にhealthy() {
    let app = spawn_app(false).await;

    let (status, body) = get(&app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["version"], json!(env!("CARGO_PKG_VERSION")));
}

#[tokio::test(start_paused = true)]
async fn test_接続済みならreadyは200() {
    let app = spawn_app(true).await;

    let (status, body) = get(&app.router, "/health/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "ready", "checks": {"messaging": "ok"}})
    );
}

#[tokio::test(start_paused = true)]
async fn test_未接続ならreadyは503() {
    let app = spawn_app(false).await;

    let (status, body) = get(&app.router, "/health/ready").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body,
        json!({"status": "not_ready", "checks": {"messaging": "error"}})
    );
}

// ===== CORS =====

#[tokio::test(start_paused = true)]
async fn test_許可したオリジンのプリフライトは許可ヘッダーを返す() {
    let app = spawn_app(false).await;
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/contact")
        .header("origin", ALLOWED_ORIGIN)
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        ALLOWED_ORIGIN
    );
    assert_eq!(
        headers.get("access-control-allow-credentials").unwrap(),
        "true"
    );
}

#[tokio::test(start_paused = true)]
async fn test_許可していないオリジンには許可ヘッダーを返さない() {
    let app = spawn_app(false).await;
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/contact")
        .header("origin", "https://evil.example")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}
