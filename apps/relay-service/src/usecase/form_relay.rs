//! # フォーム中継ユースケース
//!
//! フォーム送信を通知に変換し、チャット・メールで送信する。
//!
//! ## 送信順序と失敗時の扱い
//!
//! | フォーム | 送信 | 失敗時 |
//! |---|---|---|
//! | 予約 | 運営者へチャット → 送信者へ確認チャット | 運営者宛ては失敗、確認はログのみ |
//! | パートナー登録 | 送信者へお礼メール → 運営者へ通知メール | 最初の失敗で中断 |
//! | お問い合わせ | 運営者へ通知メール | 失敗 |
//!
//! 予約の確認チャットは送信者と運営者が同じ宛先なら送らない。

use std::sync::Arc;

use formrelay_domain::{
    chat::ChatId,
    form::{Appointment, ContactInquiry, FormKind, PartnerRegistration},
    notification::{ChatNotification, EmailNotification, NotificationError},
};
use formrelay_infra::Mailer;
use formrelay_shared::{
    event_log::{error, event},
    log_business_event,
};

use super::TemplateRenderer;
use crate::{config::Recipients, error::RelayError, session::MessagingSession};

/// 電話番号が不正な場合のメッセージ
pub const INVALID_PHONE_MESSAGE: &str = "phone must contain 7 to 15 digits";

/// フォーム中継ユースケース
pub struct FormRelayUseCase {
    session:    MessagingSession,
    mailer:     Arc<dyn Mailer>,
    renderer:   TemplateRenderer,
    recipients: Recipients,
}

impl FormRelayUseCase {
    pub fn new(
        session: MessagingSession,
        mailer: Arc<dyn Mailer>,
        renderer: TemplateRenderer,
        recipients: Recipients,
    ) -> Self {
        Self {
            session,
            mailer,
            renderer,
            recipients,
        }
    }

    /// 送信者の電話番号からチャット宛先を求める
    pub fn submitter_chat_id(&self, phone: &str) -> Result<ChatId, RelayError> {
        ChatId::from_phone(phone, Some(&self.recipients.default_country_code))
            .map_err(|_| RelayError::Validation(INVALID_PHONE_MESSAGE.to_string()))
    }

    /// 予約申込を運営者に通知し、送信者に確認メッセージを送る
    ///
    /// メッセージングセッションが接続済みでなければ何も送らず
    /// `ChannelUnavailable` を返す。
    pub async fn submit_appointment(&self, appointment: Appointment) -> Result<(), RelayError> {
        log_form_received(FormKind::Appointment);

        let submitter = self.submitter_chat_id(&appointment.phone)?;
        if !self.session.is_ready() {
            tracing::warn!("メッセージングセッションが未接続のため予約を通知できない");
            return Err(RelayError::ChannelUnavailable);
        }

        let name = appointment.name.clone();
        let operator = self.recipients.operator_chat.clone();
        let needs_confirmation = submitter != operator;

        self.send_chat(ChatNotification::AppointmentReceived {
            appointment,
            operator,
        })
        .await?;

        if needs_confirmation
            && let Err(e) = self
                .send_chat(ChatNotification::AppointmentConfirmed { name, submitter })
                .await
        {
            tracing::warn!(error = %e, "確認メッセージの送信に失敗。予約は受付済みとして扱う");
        }

        Ok(())
    }

    /// パートナー登録のお礼を送信者に、登録内容を運営者に送る
    pub async fn register_partner(
        &self,
        registration: PartnerRegistration,
    ) -> Result<(), RelayError> {
        log_form_received(FormKind::PartnerRegistration);

        let welcome = EmailNotification::PartnerWelcome {
            name:  registration.name.clone(),
            email: registration.email.clone(),
        };
        self.send_email(welcome, &self.recipients.company_email)
            .await?;

        let received = EmailNotification::PartnerReceived {
            registration,
            operator_email: self.recipients.operator_email.clone(),
        };
        self.send_email(received, &self.recipients.operator_sender)
            .await?;

        Ok(())
    }

    /// お問い合わせ内容を運営者に送る
    pub async fn submit_contact(&self, inquiry: ContactInquiry) -> Result<(), RelayError> {
        log_form_received(FormKind::Contact);

        let received = EmailNotification::ContactReceived {
            inquiry,
            operator_email: self.recipients.operator_email.clone(),
        };
        self.send_email(received, &self.recipients.operator_sender)
            .await?;

        Ok(())
    }

    async fn send_chat(&self, notification: ChatNotification) -> Result<(), NotificationError> {
        let event_type: &str = notification.event_type().into();
        let message = self
            .renderer
            .render_chat(&notification)
            .inspect_err(|e| log_render_failure(event_type, e))?;

        let result = self.session.send_text(&message).await;
        log_notification_result(
            event::entity_type::CHAT_MESSAGE,
            error::kind::MESSAGING,
            event_type,
            message.to.as_str(),
            &result,
        );
        result
    }

    async fn send_email(
        &self,
        notification: EmailNotification,
        from: &str,
    ) -> Result<(), NotificationError> {
        let event_type: &str = notification.event_type().into();
        let email = self
            .renderer
            .render_email(&notification, from)
            .inspect_err(|e| log_render_failure(event_type, e))?;

        let result = self.mailer.send_email(&email).await;
        log_notification_result(
            event::entity_type::EMAIL,
            error::kind::SMTP,
            event_type,
            &email.to,
            &result,
        );
        result
    }
}

fn log_form_received(kind: FormKind) {
    let kind: &str = kind.into();
    log_business_event!(
        event.category = event::category::FORM,
        event.action = event::action::FORM_RECEIVED,
        event.result = event::result::SUCCESS,
        form.kind = kind,
        "フォーム送信を受け付けた"
    );
}

fn log_render_failure(event_type: &str, e: &NotificationError) {
    tracing::error!(
        error.category = error::category::INFRASTRUCTURE,
        error.kind = error::kind::TEMPLATE,
        notification.event_type = event_type,
        error = %e,
        "通知本文の生成に失敗"
    );
}

fn log_notification_result(
    entity_type: &str,
    error_kind: &str,
    event_type: &str,
    recipient: &str,
    result: &Result<(), NotificationError>,
) {
    match result {
        Ok(()) => log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::NOTIFICATION_SENT,
            event.entity_type = entity_type,
            event.result = event::result::SUCCESS,
            notification.event_type = event_type,
            notification.recipient = recipient,
            "通知送信成功"
        ),
        Err(e) => log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::NOTIFICATION_FAILED,
            event.entity_type = entity_type,
            event.result = event::result::FAILURE,
            notification.event_type = event_type,
            notification.recipient = recipient,
            error.category = error::category::EXTERNAL_SERVICE,
            error.kind = error_kind,
            error = %e,
            "通知送信失敗"
        ),
    }
}
