//! # 通知
//!
//! フォーム送信から生成される通知に関するドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 送信チャネル |
//! |---|------------|------|
//! | [`ChatNotification`] | チャット通知イベント | メッセージングセッション |
//! | [`EmailNotification`] | メール通知イベント | SMTP |
//! | [`NotificationEventType`] | 通知イベント種別 | 5 種類 |
//!
//! ## 設計方針
//!
//! - **enum による通知イベント**: 各バリアントが 1 つのテンプレートに対応
//! - **テンプレート分離**: 通知イベントと本文生成は分離（TemplateRenderer は relay-service）
//! - **宛先はイベントが持つ**: 運営者宛てか送信者宛てかをバリアントで区別する

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;

use crate::{
    chat::ChatId,
    form::{Appointment, ContactInquiry, PartnerRegistration},
};

/// 通知送信エラー
#[derive(Debug, Error)]
pub enum NotificationError {
    /// メッセージングセッションが接続済みでない
    #[error("メッセージングチャネルが利用できません")]
    ChannelUnavailable,

    /// 送信に失敗（トランスポート層のエラーを保持する）
    #[error("送信に失敗: {0}")]
    SendFailed(String),

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),
}

/// 通知イベント種別
///
/// ビジネスイベントログの `notification.event_type` に出力される値。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationEventType {
    /// 予約受付: 運営者に送信
    AppointmentReceived,
    /// 予約確定: 送信者に送信
    AppointmentConfirmed,
    /// パートナー登録のお礼: 送信者に送信
    PartnerWelcome,
    /// パートナー登録受付: 運営者に送信
    PartnerReceived,
    /// お問い合わせ受付: 運営者に送信
    ContactReceived,
}

/// メールメッセージ
///
/// テンプレートレンダリングの出力。Mailer に渡される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// 送信元メールアドレス
    pub from:      String,
    /// 送信先メールアドレス
    pub to:        String,
    /// 件名
    pub subject:   String,
    /// HTML 本文
    pub html_body: String,
    /// プレーンテキスト本文
    pub text_body: String,
}

/// チャットメッセージ
///
/// テンプレートレンダリングの出力。メッセージングセッションに渡される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub to:   ChatId,
    pub text: String,
}

/// チャット通知イベント
#[derive(Debug, Clone)]
pub enum ChatNotification {
    /// 予約受付: 予約内容を運営者に送る
    AppointmentReceived {
        appointment: Appointment,
        operator:    ChatId,
    },
    /// 予約確定: 送信者に確認メッセージを送る
    AppointmentConfirmed { name: String, submitter: ChatId },
}

impl ChatNotification {
    /// 通知イベント種別を返す
    pub fn event_type(&self) -> NotificationEventType {
        match self {
            Self::AppointmentReceived { .. } => NotificationEventType::AppointmentReceived,
            Self::AppointmentConfirmed { .. } => NotificationEventType::AppointmentConfirmed,
        }
    }

    /// 宛先を返す
    pub fn recipient(&self) -> &ChatId {
        match self {
            Self::AppointmentReceived { operator, .. } => operator,
            Self::AppointmentConfirmed { submitter, .. } => submitter,
        }
    }
}

/// メール通知イベント
#[derive(Debug, Clone)]
pub enum EmailNotification {
    /// パートナー登録のお礼: 送信者に送る
    PartnerWelcome { name: String, email: String },
    /// パートナー登録受付: 登録内容を運営者に送る
    PartnerReceived {
        registration:   PartnerRegistration,
        operator_email: String,
    },
    /// お問い合わせ受付: 問い合わせ内容を運営者に送る
    ContactReceived {
        inquiry:        ContactInquiry,
        operator_email: String,
    },
}

impl EmailNotification {
    /// 通知イベント種別を返す
    pub fn event_type(&self) -> NotificationEventType {
        match self {
            Self::PartnerWelcome { .. } => NotificationEventType::PartnerWelcome,
            Self::PartnerReceived { .. } => NotificationEventType::PartnerReceived,
            Self::ContactReceived { .. } => NotificationEventType::ContactReceived,
        }
    }

    /// 受信者のメールアドレスを返す
    pub fn recipient_email(&self) -> &str {
        match self {
            Self::PartnerWelcome { email, .. } => email,
            Self::PartnerReceived { operator_email, .. }
            | Self::ContactReceived { operator_email, .. } => operator_email,
        }
    }
}
