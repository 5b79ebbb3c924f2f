//! Noop メール送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! SMTP サーバーを用意できないローカル開発で使用する。

use async_trait::async_trait;
use formrelay_domain::notification::{EmailMessage, NotificationError};

use super::Mailer;

/// Noop メール送信（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        tracing::info!(
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            "Noop: メール送信をスキップ"
        );
        Ok(())
    }
}
