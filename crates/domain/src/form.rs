//! # フォーム送信
//!
//! Web フォームから受け取る 3 種類の送信内容を定義する。
//! 永続化はせず、1 リクエストの間だけ存在する。

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// フォーム種別
///
/// ログの `form.kind` フィールドに出力される値。
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum FormKind {
    /// 予約申込
    Appointment,
    /// パートナー登録
    PartnerRegistration,
    /// お問い合わせ
    Contact,
}

/// 予約申込
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub name:     String,
    pub phone:    String,
    pub email:    String,
    pub category: String,
    pub place:    String,
    pub date:     String,
    pub time:     String,
}

/// パートナー登録
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerRegistration {
    pub name:   String,
    pub email:  String,
    pub mobile: String,
    pub state:  String,
    pub city:   String,
}

/// お問い合わせ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInquiry {
    pub name:    String,
    pub email:   String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_kindの文字列表現() {
        assert_eq!(FormKind::Appointment.to_string(), "appointment");
        assert_eq!(
            FormKind::PartnerRegistration.to_string(),
            "partner_registration"
        );
        let contact: &str = FormKind::Contact.into();
        assert_eq!(contact, "contact");
    }
}
