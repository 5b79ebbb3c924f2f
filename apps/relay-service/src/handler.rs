//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュールで re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、送信手順はユースケースに委譲
//!
//! ## ハンドラ一覧
//!
//! - `health`: ヘルスチェック
//! - `form`: フォーム受付（予約、パートナー登録、お問い合わせ）
//! - `session`: メッセージングセッションの状態確認と再認証

pub mod form;
pub mod health;
pub mod session;

pub use form::{FormState, register_partner, submit_appointment, submit_contact};
pub use health::{ReadinessState, health_check, readiness_check};
pub use session::{MessagingState, get_qr, get_status, start_session};
