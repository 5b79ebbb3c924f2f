//! 統合テスト用ヘルパー
//!
//! モックのメール送信・メッセージングクライアントでアプリケーションを組み立てる。

#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use axum::{Router, body::Body, http::HeaderValue};
use formrelay_domain::{
    chat::ChatId,
    session::{ConnectionEvent, SessionIdentity},
};
use formrelay_infra::mock::{InMemoryCredentialStore, MockMailer, MockMessagingClient};
use formrelay_relay_service::{
    app_builder::build_app,
    config::Recipients,
    session::{MessagingSession, SessionSettings},
    usecase::{FormRelayUseCase, TemplateRenderer},
};
use http::{Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

pub const ALLOWED_ORIGIN: &str = "https://careercafe.co";
pub const OPERATOR_NUMBER: &str = "919999999999";
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub const ADMIN_TOKEN: &str = "test-admin-token";

pub struct TestApp {
    pub router:  Router,
    pub client:  MockMessagingClient,
    pub mailer:  MockMailer,
    pub session: MessagingSession,
}

pub fn recipients() -> Recipients {
    Recipients {
        company_email:        "hello@careercafe.co".to_string(),
        operator_sender:      "mailer@careercafe.co".to_string(),
        operator_email:       "ceo@careercafe.co".to_string(),
        operator_chat:        ChatId::from_phone(OPERATOR_NUMBER, None).unwrap(),
        default_country_code: "91".to_string(),
        brand_name:           "CAREER CAFE".to_string(),
    }
}

/// スケジュール済みのタスクを進める
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub fn opened() -> ConnectionEvent {
    ConnectionEvent::Opened {
        identity: SessionIdentity::new(format!("{OPERATOR_NUMBER}@s.whatsapp.net")),
    }
}

/// アプリケーションを組み立て、セッションを開始する
///
/// `connected` が `true` ならセッションを接続済みにする。
/// セッション管理 API は [`ADMIN_TOKEN`] で保護される。
pub async fn spawn_app(connected: bool) -> TestApp {
    spawn_app_with(connected, Some(ADMIN_TOKEN)).await
}

pub async fn spawn_app_with(connected: bool, admin_token: Option<&str>) -> TestApp {
    let client = MockMessagingClient::new();
    let mailer = MockMailer::new();

    let session = MessagingSession::new(
        Arc::new(client.clone()),
        Arc::new(InMemoryCredentialStore::new()),
        SessionSettings {
            namespace:       "default".to_string(),
            reconnect_delay: RECONNECT_DELAY,
        },
    );
    session.start();
    settle().await;
    if connected {
        client.emit(opened()).await;
        settle().await;
    }

    let usecase = FormRelayUseCase::new(
        session.clone(),
        Arc::new(mailer.clone()),
        TemplateRenderer::new("CAREER CAFE").unwrap(),
        recipients(),
    );
    let router = build_app(
        vec![HeaderValue::from_static(ALLOWED_ORIGIN)],
        admin_token.map(str::to_string),
        session.clone(),
        usecase,
    );

    TestApp {
        router,
        client,
        mailer,
        session,
    }
}

/// リクエストを送り、ステータスと JSON 本文を返す
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(router, request).await
}

/// 管理トークン付きでリクエストを送る
pub async fn send_as_admin(router: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    send(router, request).await
}
