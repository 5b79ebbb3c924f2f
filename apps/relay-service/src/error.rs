//! # Relay Service エラー定義
//!
//! フォーム中継で発生するエラーと、HTTP レスポンスへの変換を定義する。
//!
//! エンドポイントごとにレスポンス本文の形が異なる:
//!
//! | エンドポイント | 本文 |
//! |---|---|
//! | 予約・セッション管理 | `{"success": false, "message": ...}`（[`RelayError`] の `IntoResponse`） |
//! | パートナー登録・お問い合わせ | `{"error": ...}`（[`MailFormError`] の `IntoResponse`） |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use formrelay_domain::notification::NotificationError;
use serde::Serialize;
use thiserror::Error;

/// Relay Service で発生するエラー
#[derive(Debug, Error)]
pub enum RelayError {
    /// リクエスト本文が不正
    #[error("不正なリクエスト: {0}")]
    Validation(String),

    /// メッセージングセッションが接続済みでない
    #[error("メッセージングチャネルが利用できません")]
    ChannelUnavailable,

    /// 通知の送信に失敗
    #[error("通知の送信に失敗: {0}")]
    Notification(NotificationError),
}

impl From<NotificationError> for RelayError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::ChannelUnavailable => Self::ChannelUnavailable,
            other => Self::Notification(other),
        }
    }
}

impl RelayError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::ChannelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Notification(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// 予約 API のレスポンス本文
#[derive(Debug, Serialize)]
pub struct StatusMessageResponse {
    pub success: bool,
    pub message: String,
}

impl StatusMessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Validation(detail) => detail.clone(),
            Self::ChannelUnavailable => "Messaging client is not ready".to_string(),
            Self::Notification(_) => "Failed to send message".to_string(),
        };
        (
            self.status_code(),
            Json(StatusMessageResponse::failed(message)),
        )
            .into_response()
    }
}

/// メール送信系 API のエラーレスポンス本文
#[derive(Debug, Serialize)]
pub struct MailErrorResponse {
    pub error: String,
}

/// メール送信系 API のエラー
///
/// 変換規則は [`RelayError`] と同じで、本文の形だけが異なる。
#[derive(Debug)]
pub struct MailFormError(pub RelayError);

impl From<RelayError> for MailFormError {
    fn from(err: RelayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for MailFormError {
    fn into_response(self) -> Response {
        let error = match &self.0 {
            RelayError::Validation(detail) => detail.clone(),
            RelayError::ChannelUnavailable | RelayError::Notification(_) => {
                "Failed to send email".to_string()
            }
        };
        (self.0.status_code(), Json(MailErrorResponse { error })).into_response()
    }
}
