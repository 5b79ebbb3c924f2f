//! # ミドルウェア
//!
//! Relay Service 用のミドルウェアを提供する。

mod admin_token;

pub use admin_token::{AdminTokenState, require_admin_token};
