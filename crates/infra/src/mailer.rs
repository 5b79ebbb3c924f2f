//! # メール送信
//!
//! パートナー登録・お問い合わせの通知メールを送信するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: [`Mailer`] trait でメール送信を抽象化
//! - **2 つの実装**: SMTP（本番・Mailpit）、Noop（ローカル開発・テスト用）
//! - **環境変数切替**: `MAIL_BACKEND` でランタイム選択
//! - **送信元はメッセージが持つ**: 送信者宛てと運営者宛てで送信元アドレスが異なるため

mod noop;
mod smtp;

use async_trait::async_trait;
use formrelay_domain::notification::{EmailMessage, NotificationError};
pub use noop::NoopMailer;
pub use smtp::{SmtpMailer, SmtpSecurity, SmtpSettings};

/// メール送信トレイト
///
/// SMTP / Noop の 2 実装を環境変数で切り替える。
#[async_trait]
pub trait Mailer: Send + Sync {
    /// メールを送信する
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError>;
}
