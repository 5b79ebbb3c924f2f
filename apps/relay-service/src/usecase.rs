//! # ユースケース層
//!
//! Relay Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: メール送信は `Arc<dyn Mailer>` で外部から注入
//! - **薄いハンドラ**: ハンドラは入力検証とレスポンス変換のみ、送信手順はユースケースに集約
//!
//! ## モジュール構成
//!
//! - `form_relay`: フォーム送信の中継
//! - `notification`: 通知本文の生成

pub mod form_relay;
pub mod notification;

pub use form_relay::FormRelayUseCase;
pub use notification::TemplateRenderer;
