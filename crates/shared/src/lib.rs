//! # FormRelay 共有ユーティリティ
//!
//! このクレートは、FormRelay のすべてのクレートで使用される共通ユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - axum などの Web フレームワークには依存しない（`http` 型のみ使用）
//! - トレーシング関連の依存は `observability` feature に閉じ込める

pub mod event_log;
pub mod health;
pub mod observability;

pub use health::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};
