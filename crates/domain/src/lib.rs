//! # FormRelay ドメイン層
//!
//! フォーム送信を通知へ変換するためのドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **値オブジェクト**: 生成時に検証し、不正な値を作らせない（例: [`chat::ChatId`]）
//! - **純粋な状態遷移**: メッセージングセッションのライフサイクルは
//!   [`session::SessionStatus::on_event`] の純関数として表現する
//! - **外部依存なし**: SMTP やゲートウェイの詳細は infra 層に閉じ込める
//!
//! ## 依存関係の方向
//!
//! ```text
//! relay-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`error`] - ドメイン層で発生するエラーの定義
//! - [`chat`] - チャットネットワーク上の宛先識別子
//! - [`form`] - フォーム送信内容
//! - [`notification`] - 通知メッセージと通知エラー
//! - [`session`] - メッセージングセッションの状態機械
//!
//! ## 使用例
//!
//! ```rust
//! use formrelay_domain::chat::ChatId;
//!
//! let id = ChatId::from_phone("+91 90000-00000", Some("91")).unwrap();
//! assert_eq!(id.as_str(), "919000000000@s.whatsapp.net");
//! ```

pub mod chat;
pub mod error;
pub mod form;
pub mod notification;
pub mod session;

pub use error::DomainError;
