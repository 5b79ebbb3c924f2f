//! # インフラ層エラー定義
//!
//! 認証情報ストアや外部サービスとの通信で発生するエラーを表現する。
//!
//! ## 構造
//!
//! `std::io::Error` と同じ struct + enum パターンを採用:
//! - [`InfraError`]: エラー種別（[`InfraErrorKind`]）と [`SpanTrace`] を保持するラッパー
//! - [`InfraErrorKind`]: エラーの具体的な種別（Io, Http, Gateway 等）
//!
//! `From` 実装や convenience constructor でエラーを生成すると、
//! その時点のスパン情報（呼び出し経路）が自動的に記録される。

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
///
/// エラー種別に応じた処理には [`kind()`](InfraError::kind) を使用する:
///
/// ```ignore
/// match error.kind() {
///     InfraErrorKind::Gateway { status, .. } => { /* ゲートウェイ応答エラー */ }
///     _ => { /* その他 */ }
/// }
/// ```
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// インフラ層エラーの種別
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// ファイル I/O エラー
    ///
    /// 認証情報ストアの読み書きで発生する。
    #[error("I/O エラー: {0}")]
    Io(#[source] std::io::Error),

    /// シリアライズ/デシリアライズエラー
    #[error("シリアライズエラー: {0}")]
    Serialization(#[source] serde_json::Error),

    /// HTTP 通信エラー
    ///
    /// メッセージングゲートウェイへの接続失敗、タイムアウトなど。
    #[error("HTTP 通信エラー: {0}")]
    Http(#[source] reqwest::Error),

    /// ゲートウェイがエラー応答を返した
    #[error("ゲートウェイエラー: status={status}, {message}")]
    Gateway {
        /// HTTP ステータスコード
        status:  u16,
        /// 応答本文
        message: String,
    },

    /// SMTP トランスポートの構築エラー
    #[error("SMTP 設定エラー: {0}")]
    Smtp(String),

    /// 不正な入力
    #[error("入力エラー: {0}")]
    InvalidInput(String),
}

// ===== InfraError のメソッド =====

impl InfraError {
    /// エラー種別を取得する
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    /// SpanTrace を取得する
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    fn from_kind(kind: InfraErrorKind) -> Self {
        Self {
            kind,
            span_trace: SpanTrace::capture(),
        }
    }

    // ===== Convenience constructors =====

    /// ゲートウェイのエラー応答を生成する
    pub fn gateway(status: u16, message: impl Into<String>) -> Self {
        Self::from_kind(InfraErrorKind::Gateway {
            status,
            message: message.into(),
        })
    }

    /// SMTP 設定エラーを生成する
    pub fn smtp(msg: impl Into<String>) -> Self {
        Self::from_kind(InfraErrorKind::Smtp(msg.into()))
    }

    /// 不正な入力エラーを生成する
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::from_kind(InfraErrorKind::InvalidInput(msg.into()))
    }
}

// ===== トレイト実装 =====

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

// ===== From 実装（SpanTrace 自動キャプチャ） =====

impl From<std::io::Error> for InfraError {
    fn from(source: std::io::Error) -> Self {
        Self::from_kind(InfraErrorKind::Io(source))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(source: serde_json::Error) -> Self {
        Self::from_kind(InfraErrorKind::Serialization(source))
    }
}

impl From<reqwest::Error> for InfraError {
    fn from(source: reqwest::Error) -> Self {
        Self::from_kind(InfraErrorKind::Http(source))
    }
}
