//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンで通知本文を生成する。
//! チャットはプレーンテキストのみ、メールは HTML/plaintext 両形式。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **HTML は自動エスケープ**: `.html` テンプレートではフォーム入力がエスケープされる
//! - **ブランド名は設定値**: 全テンプレートに `brand` として渡す

use formrelay_domain::notification::{
    ChatMessage,
    ChatNotification,
    EmailMessage,
    EmailNotification,
    NotificationError,
};
use tera::{Context, Tera};

/// テンプレートレンダラー
///
/// tera テンプレートエンジンをラップし、通知イベントから
/// [`ChatMessage`] / [`EmailMessage`] を生成する。
pub struct TemplateRenderer {
    engine: Tera,
    brand:  String,
}

impl TemplateRenderer {
    /// 新しいレンダラーインスタンスを作成
    ///
    /// `include_str!` で埋め込んだテンプレートを tera に登録する。
    pub fn new(brand: impl Into<String>) -> Result<Self, NotificationError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (
                    "appointment_operator.txt",
                    include_str!("../../../templates/notifications/appointment_operator.txt"),
                ),
                (
                    "appointment_confirmation.txt",
                    include_str!("../../../templates/notifications/appointment_confirmation.txt"),
                ),
                (
                    "partner_welcome.html",
                    include_str!("../../../templates/notifications/partner_welcome.html"),
                ),
                (
                    "partner_welcome.txt",
                    include_str!("../../../templates/notifications/partner_welcome.txt"),
                ),
                (
                    "partner_operator.html",
                    include_str!("../../../templates/notifications/partner_operator.html"),
                ),
                (
                    "partner_operator.txt",
                    include_str!("../../../templates/notifications/partner_operator.txt"),
                ),
                (
                    "contact_operator.html",
                    include_str!("../../../templates/notifications/contact_operator.html"),
                ),
                (
                    "contact_operator.txt",
                    include_str!("../../../templates/notifications/contact_operator.txt"),
                ),
            ])
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(Self {
            engine,
            brand: brand.into(),
        })
    }

    /// チャット通知イベントからメッセージを生成する
    pub fn render_chat(
        &self,
        notification: &ChatNotification,
    ) -> Result<ChatMessage, NotificationError> {
        let (template_name, context) = match notification {
            ChatNotification::AppointmentReceived { appointment, .. } => {
                ("appointment_operator", self.context_from(appointment)?)
            }
            ChatNotification::AppointmentConfirmed { name, .. } => {
                let mut context = self.base_context();
                context.insert("name", name);
                ("appointment_confirmation", context)
            }
        };

        let text = self.render(&format!("{template_name}.txt"), &context)?;

        Ok(ChatMessage {
            to:   notification.recipient().clone(),
            text: text.trim_end().to_string(),
        })
    }

    /// メール通知イベントからメールメッセージを生成する
    ///
    /// # 引数
    ///
    /// - `notification`: メール通知イベント
    /// - `from`: 送信元メールアドレス
    pub fn render_email(
        &self,
        notification: &EmailNotification,
        from: &str,
    ) -> Result<EmailMessage, NotificationError> {
        let (template_name, subject, context) = match notification {
            EmailNotification::PartnerWelcome { name, .. } => {
                let mut context = self.base_context();
                context.insert("name", name);
                (
                    "partner_welcome",
                    format!("{}: Partnership Request Received", self.brand),
                    context,
                )
            }
            EmailNotification::PartnerReceived { registration, .. } => (
                "partner_operator",
                "New Partnership Request".to_string(),
                self.context_from(registration)?,
            ),
            EmailNotification::ContactReceived { inquiry, .. } => (
                "contact_operator",
                format!("New Contact Message from {}", inquiry.name),
                self.context_from(inquiry)?,
            ),
        };

        let html_body = self.render(&format!("{template_name}.html"), &context)?;
        let text_body = self.render(&format!("{template_name}.txt"), &context)?;

        Ok(EmailMessage {
            from: from.to_string(),
            to: notification.recipient_email().to_string(),
            subject,
            html_body,
            text_body,
        })
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("brand", &self.brand);
        context
    }

    /// フォーム送信内容の全フィールドをコンテキストに展開する
    fn context_from<T: serde::Serialize>(&self, value: &T) -> Result<Context, NotificationError> {
        let mut context = Context::from_serialize(value)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;
        context.insert("brand", &self.brand);
        Ok(context)
    }

    fn render(&self, template_name: &str, context: &Context) -> Result<String, NotificationError> {
        self.engine
            .render(template_name, context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))
    }
}
