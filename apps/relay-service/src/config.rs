//! # Relay Service 設定
//!
//! 環境変数から Relay Service の設定を読み込む。
//!
//! パースは環境変数の参照関数を受け取る純関数 [`RelayConfig::from_lookup`] で行い、
//! テストではプロセスの環境変数に触れずに検証する。

use std::time::Duration;

use axum::http::HeaderValue;
use formrelay_domain::chat::ChatId;
use formrelay_infra::{SmtpSecurity, SmtpSettings};
use thiserror::Error;
use validator::ValidateEmail;

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 必須の環境変数が未設定
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    /// 値が不正
    #[error("{var} の値が不正です: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// メール送信バックエンド
#[derive(Debug, Clone)]
pub enum MailBackend {
    Smtp(SmtpSettings),
    Noop,
}

/// メッセージングバックエンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagingBackend {
    /// HTTP ゲートウェイ（ベース URL）
    Gateway(String),
    Noop,
}

/// 通知の送信元・宛先
#[derive(Debug, Clone)]
pub struct Recipients {
    /// 送信者宛て確認メールの送信元
    pub company_email:        String,
    /// 運営者宛て通知メールの送信元
    ///
    /// `OPERATOR_SENDER` → `SMTP_USER` → `COMPANY_EMAIL` の順に決まる。
    pub operator_sender:      String,
    /// 運営者宛て通知メールの宛先
    pub operator_email:       String,
    /// 運営者のチャット宛先
    pub operator_chat:        ChatId,
    /// 10 桁の国内番号に付与する国番号
    pub default_country_code: String,
    /// テンプレートの見出しに使うブランド名
    pub brand_name:           String,
}

/// メッセージングセッションの設定
#[derive(Debug, Clone)]
pub struct MessagingConfig {
    pub backend:         MessagingBackend,
    /// 認証情報ストアのルートディレクトリ
    pub auth_dir:        String,
    /// 認証情報の namespace
    pub session_name:    String,
    /// 一時的な切断から再接続するまでの固定遅延
    pub reconnect_delay: Duration,
}

/// Relay Service の設定
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// バインドアドレス
    pub host:                String,
    /// ポート番号
    pub port:                u16,
    /// CORS で許可するオリジン
    pub allowed_origins:     Vec<HeaderValue>,
    pub mail:                MailBackend,
    pub messaging:           MessagingConfig,
    pub recipients:          Recipients,
    /// 外部呼び出し 1 回あたりのタイムアウト
    pub outbound_timeout:    Duration,
    /// セッション管理 API の Bearer トークン（未設定ならセッション管理 API を公開しない）
    pub session_admin_token: Option<String>,
}

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_BRAND_NAME: &str = "CAREER CAFE";
const DEFAULT_COUNTRY_CODE: &str = "91";
const DEFAULT_AUTH_DIR: &str = "messaging_auth";
const DEFAULT_SESSION_NAME: &str = "default";
const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;
const DEFAULT_OUTBOUND_TIMEOUT_SECS: u64 = 30;

impl RelayConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 参照関数から設定を読み込む
    ///
    /// 空文字列は未設定として扱う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let outbound_timeout = Duration::from_secs(
            env.parse_or("OUTBOUND_TIMEOUT_SECS", DEFAULT_OUTBOUND_TIMEOUT_SECS)?,
        );

        let mail = match env.optional("MAIL_BACKEND").as_deref() {
            None | Some("smtp") => MailBackend::Smtp(smtp_settings(&env, outbound_timeout)?),
            Some("noop") => MailBackend::Noop,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var:    "MAIL_BACKEND",
                    reason: format!("smtp または noop を指定してください: {other}"),
                });
            }
        };

        let company_email = env.email("COMPANY_EMAIL")?;
        let operator_sender = match env.optional("OPERATOR_SENDER") {
            Some(_) => env.email("OPERATOR_SENDER")?,
            None => match env.optional("SMTP_USER") {
                Some(user) => check_email("SMTP_USER", user)?,
                None => company_email.clone(),
            },
        };

        let default_country_code = env
            .optional("DEFAULT_COUNTRY_CODE")
            .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string());
        if !default_country_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::Invalid {
                var:    "DEFAULT_COUNTRY_CODE",
                reason: "数字のみで指定してください".to_string(),
            });
        }

        let operator_chat = ChatId::from_phone(
            &env.required("OPERATOR_NUMBER")?,
            Some(&default_country_code),
        )
        .map_err(|e| ConfigError::Invalid {
            var:    "OPERATOR_NUMBER",
            reason: e.to_string(),
        })?;

        let recipients = Recipients {
            company_email,
            operator_sender,
            operator_email: env.email("OPERATOR_EMAIL")?,
            operator_chat,
            default_country_code,
            brand_name: env
                .optional("BRAND_NAME")
                .unwrap_or_else(|| DEFAULT_BRAND_NAME.to_string()),
        };

        let backend = match env.optional("MESSAGING_BACKEND").as_deref() {
            None | Some("gateway") => {
                MessagingBackend::Gateway(env.required("MESSAGING_GATEWAY_URL")?)
            }
            Some("noop") => MessagingBackend::Noop,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var:    "MESSAGING_BACKEND",
                    reason: format!("gateway または noop を指定してください: {other}"),
                });
            }
        };

        let messaging = MessagingConfig {
            backend,
            auth_dir: env
                .optional("MESSAGING_AUTH_DIR")
                .unwrap_or_else(|| DEFAULT_AUTH_DIR.to_string()),
            session_name: env
                .optional("MESSAGING_SESSION_NAME")
                .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string()),
            reconnect_delay: Duration::from_secs(
                env.parse_or("RECONNECT_DELAY_SECS", DEFAULT_RECONNECT_DELAY_SECS)?,
            ),
        };

        Ok(Self {
            host: env
                .optional("RELAY_HOST")
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env.parse_or("RELAY_PORT", DEFAULT_PORT)?,
            allowed_origins: parse_origins(&env.required("ALLOWED_ORIGINS")?)?,
            mail,
            messaging,
            recipients,
            outbound_timeout,
            session_admin_token: env.optional("SESSION_ADMIN_TOKEN"),
        })
    }
}

/// SMTP 関連の環境変数を読み込む
///
/// `SMTP_SECURE`: `true` → SMTPS、`false`（既定）→ STARTTLS、`none` → 平文・認証なし
fn smtp_settings<F>(env: &Env<F>, timeout: Duration) -> Result<SmtpSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let security = match env.optional("SMTP_SECURE").as_deref() {
        Some("true") => SmtpSecurity::Implicit,
        None | Some("false") => SmtpSecurity::StartTls,
        Some("none") => SmtpSecurity::Plain,
        Some(other) => {
            return Err(ConfigError::Invalid {
                var:    "SMTP_SECURE",
                reason: format!("true / false / none のいずれかを指定してください: {other}"),
            });
        }
    };

    let (username, password) = if security == SmtpSecurity::Plain {
        (
            env.optional("SMTP_USER").unwrap_or_default(),
            env.optional("SMTP_PASSWORD").unwrap_or_default(),
        )
    } else {
        (env.required("SMTP_USER")?, env.required("SMTP_PASSWORD")?)
    };

    Ok(SmtpSettings {
        host: env.required("SMTP_HOST")?,
        port: env.parse_or("SMTP_PORT", security.default_port())?,
        security,
        username,
        password,
        timeout,
    })
}

fn check_email(var: &'static str, value: String) -> Result<String, ConfigError> {
    if value.as_str().validate_email() {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            var,
            reason: format!("メールアドレスとして解釈できません: {value}"),
        })
    }
}

fn parse_origins(raw: &str) -> Result<Vec<HeaderValue>, ConfigError> {
    let origins = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                var:    "ALLOWED_ORIGINS",
                reason: format!("{origin}: {e}"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if origins.is_empty() {
        return Err(ConfigError::Missing("ALLOWED_ORIGINS"));
    }
    Ok(origins)
}

/// 環境変数の参照ヘルパー
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    fn email(&self, key: &'static str) -> Result<String, ConfigError> {
        check_email(key, self.required(key)?)
    }

    fn parse_or<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var:    key,
                reason: e.to_string(),
            }),
        }
    }
}
