//! # チャット宛先
//!
//! チャットネットワーク上のユーザーを表す識別子（ChatId）を定義する。
//!
//! 形式は `<国番号付きの数字>@s.whatsapp.net`。フォームに入力された電話番号から
//! 記号・空白を取り除いて生成する。

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::DomainError;

/// 個人ユーザー宛先のサーバー部
pub const CHAT_USER_SERVER: &str = "s.whatsapp.net";

/// 電話番号として受け付ける最小桁数
const MIN_PHONE_DIGITS: usize = 7;

/// 電話番号として受け付ける最大桁数（E.164）
const MAX_PHONE_DIGITS: usize = 15;

/// 国番号なしの国内番号の桁数
const NATIONAL_NUMBER_DIGITS: usize = 10;

/// チャット宛先（値オブジェクト）
///
/// 同じ電話番号からは常に同じ値が得られるため、
/// 運営者宛てと送信者宛ての宛先比較にそのまま使用できる。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct ChatId(String);

impl ChatId {
    /// 電話番号から宛先を作成する
    ///
    /// # 変換規則
    ///
    /// - 数字以外（`+`、空白、ハイフン等）は除去する
    /// - 10 桁の国内番号で `default_country_code` が指定されていれば先頭に付与する
    /// - 7〜15 桁以外はエラー
    pub fn from_phone(
        phone: &str,
        default_country_code: Option<&str>,
    ) -> Result<Self, DomainError> {
        let digits: String = phone.chars().filter(char::is_ascii_digit).collect();

        if digits.len() < MIN_PHONE_DIGITS {
            return Err(DomainError::Validation(format!(
                "電話番号は{MIN_PHONE_DIGITS}桁以上である必要があります"
            )));
        }

        let digits = match default_country_code {
            Some(code) if digits.len() == NATIONAL_NUMBER_DIGITS => format!("{code}{digits}"),
            _ => digits,
        };

        if digits.len() > MAX_PHONE_DIGITS {
            return Err(DomainError::Validation(format!(
                "電話番号は{MAX_PHONE_DIGITS}桁以内である必要があります"
            )));
        }

        Ok(Self(format!("{digits}@{CHAT_USER_SERVER}")))
    }

    /// 文字列参照を取得する
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("9000000000", Some("91"), "919000000000@s.whatsapp.net")]
    #[case("+91 90000-00000", Some("91"), "919000000000@s.whatsapp.net")]
    #[case("919000000000", Some("91"), "919000000000@s.whatsapp.net")]
    #[case("9000000000", None, "9000000000@s.whatsapp.net")]
    #[case("(415) 555-0100", Some("1"), "14155550100@s.whatsapp.net")]
    fn test_from_phoneで記号を除去して宛先を作る(
        #[case] phone: &str,
        #[case] country_code: Option<&str>,
        #[case] expected: &str,
    ) {
        let id = ChatId::from_phone(phone, country_code).unwrap();
        assert_eq!(id.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("12345")]
    #[case("1234567890123456")]
    fn test_from_phoneで不正な桁数はエラー(#[case] phone: &str) {
        let result = ChatId::from_phone(phone, Some("91"));
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_同じ番号の表記揺れは同一の宛先になる() {
        let a = ChatId::from_phone("90000 00000", Some("91")).unwrap();
        let b = ChatId::from_phone("+919000000000", Some("91")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_displayは宛先文字列を返す() {
        let id = ChatId::from_phone("9000000000", Some("91")).unwrap();
        assert_eq!(id.to_string(), "919000000000@s.whatsapp.net");
    }
}
