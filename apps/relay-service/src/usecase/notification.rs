//! # 通知ユースケース
//!
//! 通知イベントの本文生成を担当する。
//!
//! ## モジュール構成
//!
//! - [`template_renderer`] - tera テンプレートエンジンによる本文生成

pub mod template_renderer;

pub use template_renderer::TemplateRenderer;
