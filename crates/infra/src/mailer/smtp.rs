//! SMTP メール送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! トランスポートは起動時に 1 度だけ構築し、全リクエストで共有する。

use std::time::Duration;

use async_trait::async_trait;
use formrelay_domain::notification::{EmailMessage, NotificationError};
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    message::{Message, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use super::Mailer;
use crate::error::InfraError;

/// SMTP 接続の暗号化方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// 接続開始時から TLS（SMTPS、既定ポート 465）
    Implicit,
    /// 平文で接続して STARTTLS で昇格（既定ポート 587）
    StartTls,
    /// 暗号化なし・認証なし（Mailpit 等のローカル SMTP 向け）
    Plain,
}

impl SmtpSecurity {
    /// 方式ごとの既定ポート
    pub fn default_port(self) -> u16 {
        match self {
            Self::Implicit => 465,
            Self::StartTls => 587,
            Self::Plain => 1025,
        }
    }
}

/// SMTP 接続設定
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host:     String,
    pub port:     u16,
    pub security: SmtpSecurity,
    pub username: String,
    pub password: String,
    /// 1 回の送信に許す最大時間
    pub timeout:  Duration,
}

/// SMTP メール送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// 設定からトランスポートを構築する
    ///
    /// 接続はこの時点では行わない（最初の送信時に確立される）。
    pub fn new(settings: &SmtpSettings) -> Result<Self, InfraError> {
        let builder = match settings.security {
            SmtpSecurity::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|e| InfraError::smtp(format!("TLS 設定に失敗: {e}")))?,
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                    .map_err(|e| InfraError::smtp(format!("STARTTLS 設定に失敗: {e}")))?
            }
            SmtpSecurity::Plain => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
            }
        };

        let builder = builder
            .port(settings.port)
            .timeout(Some(settings.timeout));

        let builder = if settings.security == SmtpSecurity::Plain {
            builder
        } else {
            builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
        };

        Ok(Self {
            transport: builder.build(),
        })
    }

    fn build_message(email: &EmailMessage) -> Result<Message, NotificationError> {
        Message::builder()
            .from(
                email
                    .from
                    .parse()
                    .map_err(|e| NotificationError::SendFailed(format!("送信元アドレス不正: {e}")))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|e| NotificationError::SendFailed(format!("宛先アドレス不正: {e}")))?)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body.clone()),
                    ),
            )
            .map_err(|e| NotificationError::SendFailed(format!("メッセージ構築失敗: {e}")))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        let message = Self::build_message(email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SMTP 送信失敗: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn settings(security: SmtpSecurity) -> SmtpSettings {
        SmtpSettings {
            host: "smtp.example.com".to_string(),
            port: security.default_port(),
            security,
            username: "mailer@example.com".to_string(),
            password: "secret".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    fn email(from: &str, to: &str) -> EmailMessage {
        EmailMessage {
            from:      from.to_string(),
            to:        to.to_string(),
            subject:   "件名".to_string(),
            html_body: "<p>本文</p>".to_string(),
            text_body: "本文".to_string(),
        }
    }

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SmtpMailer>();
    }

    #[rstest]
    #[case(SmtpSecurity::Implicit, 465)]
    #[case(SmtpSecurity::StartTls, 587)]
    #[case(SmtpSecurity::Plain, 1025)]
    fn test_暗号化方式ごとの既定ポート(#[case] security: SmtpSecurity, #[case] port: u16) {
        assert_eq!(security.default_port(), port);
    }

    #[rstest]
    #[case(SmtpSecurity::Implicit)]
    #[case(SmtpSecurity::StartTls)]
    #[case(SmtpSecurity::Plain)]
    #[tokio::test]
    async fn test_全ての暗号化方式でトランスポートを構築できる(#[case] security: SmtpSecurity) {
        let result = SmtpMailer::new(&settings(security));
        assert!(result.is_ok());
    }

    #[test]
    fn test_送信元アドレスが不正ならsend_failedを返す() {
        let result = SmtpMailer::build_message(&email("not an address", "to@example.com"));
        assert!(matches!(result, Err(NotificationError::SendFailed(msg)) if msg.contains("送信元")));
    }

    #[test]
    fn test_宛先アドレスが不正ならsend_failedを返す() {
        let result = SmtpMailer::build_message(&email("from@example.com", ""));
        assert!(matches!(result, Err(NotificationError::SendFailed(msg)) if msg.contains("宛先")));
    }

    #[test]
    fn test_正しいアドレスならメッセージを構築できる() {
        let result = SmtpMailer::build_message(&email("from@example.com", "to@example.com"));
        assert!(result.is_ok());
    }
}
