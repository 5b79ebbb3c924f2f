//! # Relay Service ライブラリ
//!
//! Web フォームの送信をチャット・メールの通知として中継するサーバーのコアモジュール。
//!
//! ## モジュール構成
//!
//! - `app_builder`: ルーターの構築
//! - `config`: 環境変数からの設定読み込み
//! - `error`: エラーと HTTP レスポンスへの変換
//! - `handler`: HTTP ハンドラ
//! - `middleware`: ミドルウェア（管理トークン検証）
//! - `session`: メッセージングセッションの管理
//! - `usecase`: フォーム中継と通知本文の生成

pub mod app_builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod session;
pub mod usecase;
