//! # メッセージングクライアント
//!
//! チャットネットワークとのセッション接続を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **接続単位のハンドル**: [`MessagingClient::connect`] は 1 回の接続試行ごとに
//!   [`MessagingConnection`]（送信ハンドル + イベントストリーム）を返す
//! - **状態は持たない**: 接続状態の管理はセッション管理側の責務。
//!   クライアントはイベントを流すだけ
//! - **2 つの実装**: HTTP ゲートウェイ（本番）、Noop（ローカル開発用）
//! - **イベントストリームの終端**: 送信側が閉じたら切断とみなす
//!   （ゲートウェイ実装は終端前に必ず `Closed` を流す）

mod gateway;
mod noop;

use std::sync::Arc;

use async_trait::async_trait;
use formrelay_domain::{
    notification::{ChatMessage, NotificationError},
    session::ConnectionEvent,
};
pub use gateway::GatewayMessagingClient;
pub use noop::NoopMessagingClient;
use tokio::sync::mpsc;

use crate::error::InfraError;

/// 1 接続あたりのイベントバッファ
pub const EVENT_BUFFER: usize = 32;

/// メッセージングクライアント
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// 保存済みの認証情報（あれば）を使ってセッションを開く
    ///
    /// 戻り値の `events` には QR・認証情報更新・接続・切断などのイベントが届く。
    async fn connect(
        &self,
        namespace: &str,
        credentials: Option<serde_json::Value>,
    ) -> Result<MessagingConnection, InfraError>;
}

/// 開いたセッションへの送信ハンドル
#[async_trait]
pub trait ChatSender: Send + Sync {
    /// テキストメッセージを送信する
    async fn send_text(&self, message: &ChatMessage) -> Result<(), NotificationError>;

    /// セッションを閉じる（失敗してもエラーは返さない）
    async fn close(&self);
}

/// 1 回の接続試行の結果
pub struct MessagingConnection {
    pub sender: Arc<dyn ChatSender>,
    pub events: mpsc::Receiver<ConnectionEvent>,
}
