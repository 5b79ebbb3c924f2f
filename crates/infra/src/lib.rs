//! # FormRelay インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! このクレートは外部システムの詳細をカプセル化し、trait の背後に隠す。
//! アプリケーション層は `Arc<dyn Trait>` で受け取り、環境変数で実装を切り替える。
//!
//! ## 責務
//!
//! - **メール送信**: SMTP（lettre）/ Noop
//! - **メッセージング**: HTTP ゲートウェイ（reqwest）/ Noop
//! - **認証情報ストア**: メッセージングセッションの認証情報をファイルに永続化
//!
//! ## 依存関係
//!
//! ```text
//! relay-service → infra → domain
//!        ↘                  ↑
//!          shared ──────────┘ (独立)
//! ```
//!
//! ## モジュール構成
//!
//! - [`credential_store`] - 認証情報ストア
//! - [`error`] - インフラ層エラー定義
//! - [`mailer`] - メール送信
//! - [`messaging`] - メッセージングクライアント
//! - `mock` - テスト用モック（`test-utils` feature）

pub mod credential_store;
pub mod error;
pub mod mailer;
pub mod messaging;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use credential_store::{CredentialStore, FileCredentialStore};
pub use error::{InfraError, InfraErrorKind};
pub use mailer::{Mailer, NoopMailer, SmtpMailer, SmtpSecurity, SmtpSettings};
pub use messaging::{
    ChatSender,
    GatewayMessagingClient,
    MessagingClient,
    MessagingConnection,
    NoopMessagingClient,
};
