//! # フォーム受付ハンドラ
//!
//! Web フォームの送信を受け付け、入力検証後にユースケースへ委譲する。
//!
//! ## エンドポイント
//!
//! - `POST /api/appointment`: 予約申込（チャット）
//! - `POST /api/patnerRegister`: パートナー登録（メール）
//! - `POST /api/contact`: お問い合わせ（メール）
//!
//! 入力検証は `validator` で行い、欠落したフィールドは空文字として扱って
//! 検証エラー（400）にする。

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use formrelay_domain::{
    chat::ChatId,
    form::{Appointment, ContactInquiry, PartnerRegistration},
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    error::{MailFormError, RelayError, StatusMessageResponse},
    usecase::{FormRelayUseCase, form_relay::INVALID_PHONE_MESSAGE},
};

/// 予約受付時のメッセージ
pub const APPOINTMENT_BOOKED_MESSAGE: &str = "Appointment booked & WhatsApp message sent!";
/// パートナー登録受付時のメッセージ
pub const PARTNER_REGISTERED_MESSAGE: &str = "Appointment booked and emails sent successfully!";
/// お問い合わせ受付時のメッセージ
pub const CONTACT_RECEIVED_MESSAGE: &str = "We will contact you soon!";

/// フォーム受付ハンドラの State
pub struct FormState {
    pub usecase: FormRelayUseCase,
}

// --- リクエスト型 ---

/// 予約申込リクエスト
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct AppointmentRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name:     String,
    #[validate(custom(function = "validate_phone"))]
    pub phone:    String,
    #[validate(email(message = "email is invalid"))]
    pub email:    String,
    #[validate(length(min = 1, message = "category is required"))]
    pub category: String,
    #[validate(length(min = 1, message = "place is required"))]
    pub place:    String,
    #[validate(length(min = 1, message = "date is required"))]
    pub date:     String,
    #[validate(length(min = 1, message = "time is required"))]
    pub time:     String,
}

/// パートナー登録リクエスト
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct PartnerRegistrationRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name:   String,
    #[validate(email(message = "email is invalid"))]
    pub email:  String,
    #[validate(length(min = 1, message = "mobile is required"))]
    pub mobile: String,
    #[validate(length(min = 1, message = "state is required"))]
    pub state:  String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city:   String,
}

/// お問い合わせリクエスト
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ContactRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name:    String,
    #[validate(email(message = "email is invalid"))]
    pub email:   String,
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
}

impl From<AppointmentRequest> for Appointment {
    fn from(req: AppointmentRequest) -> Self {
        Self {
            name:     req.name,
            phone:    req.phone,
            email:    req.email,
            category: req.category,
            place:    req.place,
            date:     req.date,
            time:     req.time,
        }
    }
}

impl From<PartnerRegistrationRequest> for PartnerRegistration {
    fn from(req: PartnerRegistrationRequest) -> Self {
        Self {
            name:   req.name,
            email:  req.email,
            mobile: req.mobile,
            state:  req.state,
            city:   req.city,
        }
    }
}

impl From<ContactRequest> for ContactInquiry {
    fn from(req: ContactRequest) -> Self {
        Self {
            name:    req.name,
            email:   req.email,
            message: req.message,
        }
    }
}

// --- レスポンス型 ---

/// メール送信系 API の成功レスポンス本文
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

// --- ハンドラ ---

/// 予約申込を受け付ける
///
/// 運営者へのチャット通知が送れた時点で成功とする。
#[tracing::instrument(skip_all)]
pub async fn submit_appointment(
    State(state): State<Arc<FormState>>,
    payload: Result<Json<AppointmentRequest>, JsonRejection>,
) -> Result<Json<StatusMessageResponse>, RelayError> {
    let req = parse(payload)?;
    state.usecase.submit_appointment(req.into()).await?;
    Ok(Json(StatusMessageResponse::ok(APPOINTMENT_BOOKED_MESSAGE)))
}

/// パートナー登録を受け付ける
#[tracing::instrument(skip_all)]
pub async fn register_partner(
    State(state): State<Arc<FormState>>,
    payload: Result<Json<PartnerRegistrationRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, MailFormError> {
    let req = parse(payload)?;
    state.usecase.register_partner(req.into()).await?;
    Ok(Json(MessageResponse::new(PARTNER_REGISTERED_MESSAGE)))
}

/// お問い合わせを受け付ける
#[tracing::instrument(skip_all)]
pub async fn submit_contact(
    State(state): State<Arc<FormState>>,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, MailFormError> {
    let req = parse(payload)?;
    state.usecase.submit_contact(req.into()).await?;
    Ok(Json(MessageResponse::new(CONTACT_RECEIVED_MESSAGE)))
}

// --- 入力検証 ---

/// JSON 本文を取り出して検証する
fn parse<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> Result<T, RelayError> {
    let Json(req) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "リクエスト本文の解析に失敗");
        RelayError::Validation(rejection.body_text())
    })?;
    req.validate()
        .map_err(|errors| RelayError::Validation(describe(&errors)))?;
    Ok(req)
}

/// 検証エラーをフィールド名順の 1 行にまとめる
fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));
    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    ChatId::from_phone(phone, None)
        .map(|_| ())
        .map_err(|_| ValidationError::new("phone").with_message(INVALID_PHONE_MESSAGE.into()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn valid_appointment() -> AppointmentRequest {
        AppointmentRequest {
            name:     "A".to_string(),
            phone:    "9000000000".to_string(),
            email:    "a@example.com".to_string(),
            category: "Career".to_string(),
            place:    "Online".to_string(),
            date:     "2026-11-02".to_string(),
            time:     "10:30".to_string(),
        }
    }

    #[test]
    fn test_正しい予約リクエストは検証を通る() {
        assert!(valid_appointment().validate().is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("12-34")]
    #[case("1234567890123456")]
    fn test_不正な電話番号は検証エラー(#[case] phone: &str) {
        let req = AppointmentRequest {
            phone: phone.to_string(),
            ..valid_appointment()
        };

        let errors = req.validate().unwrap_err();

        assert_eq!(describe(&errors), INVALID_PHONE_MESSAGE);
    }

    #[test]
    fn test_検証エラーはフィールド名順にまとめる() {
        let req = ContactRequest {
            name:    String::new(),
            email:   "not-an-email".to_string(),
            message: String::new(),
        };

        let errors = req.validate().unwrap_err();

        assert_eq!(
            describe(&errors),
            "email is invalid; message is required; name is required"
        );
    }

    #[test]
    fn test_欠落したフィールドは空文字として検証される() {
        let req: PartnerRegistrationRequest =
            serde_json::from_str(r#"{"name": "Asha", "email": "asha@example.com"}"#).unwrap();

        let errors = req.validate().unwrap_err();

        assert_eq!(
            describe(&errors),
            "city is required; mobile is required; state is required"
        );
    }
}
