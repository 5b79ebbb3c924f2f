//! # メッセージングセッション管理ハンドラ
//!
//! 運用者がセッションの状態を確認し、再認証を行うためのエンドポイント。
//!
//! - `GET /api/status`: 接続状態
//! - `GET /api/session/qr`: 認証待ちの QR コード（管理トークン必須）
//! - `POST /api/session/start`: セッションの開始（ログアウト後の再認証、管理トークン必須）

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{error::StatusMessageResponse, session::MessagingSession};

/// セッション管理ハンドラの State
pub struct MessagingState {
    pub session: MessagingSession,
}

/// 接続状態レスポンス
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success:   bool,
    pub connected: bool,
    /// 接続済みアカウント（未接続なら `null`）
    pub user:      Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QrResponse {
    pub qr: String,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    /// 新しい接続試行を始めたか
    pub started: bool,
}

/// 接続状態を返す
///
/// `connected` と `user` は同じ時点の状態から求める。
pub async fn get_status(State(state): State<Arc<MessagingState>>) -> Json<StatusResponse> {
    let status = state.session.status();
    Json(StatusResponse {
        success:   true,
        connected: status.is_ready(),
        user:      status.identity().map(|id| id.as_str().to_string()),
    })
}

/// 認証待ちの QR コードを返す
///
/// 認証待ちでなければ 404。
pub async fn get_qr(State(state): State<Arc<MessagingState>>) -> Response {
    match state.session.pending_challenge() {
        Some(qr) => Json(QrResponse { qr }).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(StatusMessageResponse::failed("No QR code is pending")),
        )
            .into_response(),
    }
}

/// セッションを開始する
///
/// 接続中・接続済みの間は何もせず `started: false` を返す。
#[tracing::instrument(skip_all)]
pub async fn start_session(State(state): State<Arc<MessagingState>>) -> impl IntoResponse {
    let started = state.session.start();
    tracing::info!(started, "セッション開始の要求を受け付けた");
    (StatusCode::ACCEPTED, Json(StartResponse { started }))
}
