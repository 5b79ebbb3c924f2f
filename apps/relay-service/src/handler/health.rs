//! # ヘルスチェックハンドラ
//!
//! - `/health`: Liveness Check（常に `"healthy"` を返す）
//! - `/health/ready`: Readiness Check（メッセージングセッションの接続状態を確認）
//!
//! メール送信はリクエストごとに SMTP 接続を行うため、Readiness には含めない。

use std::{collections::HashMap, sync::Arc};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use formrelay_shared::{CheckStatus, HealthResponse, ReadinessResponse};

use crate::session::MessagingSession;

/// Relay Service のヘルスチェックエンドポイント
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy(env!("CARGO_PKG_VERSION")))
}

/// Readiness Check 用の State
pub struct ReadinessState {
    pub session: MessagingSession,
}

/// Relay Service の Readiness Check エンドポイント
///
/// メッセージングセッションが接続済みなら 200、それ以外は 503。
#[tracing::instrument(skip_all)]
pub async fn readiness_check(State(state): State<Arc<ReadinessState>>) -> impl IntoResponse {
    let mut checks = HashMap::new();
    checks.insert(
        "messaging".to_string(),
        CheckStatus::from(state.session.is_ready()),
    );

    let response = ReadinessResponse::from_checks(checks);
    let http_status = if response.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (http_status, Json(response))
}
