//! # 管理トークン検証ミドルウェア
//!
//! セッション管理 API（QR コードの取得、セッションの開始）を
//! `Authorization: Bearer <SESSION_ADMIN_TOKEN>` を持つリクエストに限定する。
//!
//! QR コードを読み取った端末がボットのアカウントになるため、
//! トークンなしでは 401 を返す。

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::error::StatusMessageResponse;

/// 管理トークン検証の状態
pub struct AdminTokenState {
    pub token: String,
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(StatusMessageResponse::failed("Unauthorized")),
    )
        .into_response()
}

/// `Authorization` ヘッダーから Bearer トークンを取り出す
fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// 管理トークン検証ミドルウェア
pub async fn require_admin_token(
    State(state): State<Arc<AdminTokenState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(provided) = bearer_token(&request) else {
        tracing::warn!(path = %request.uri().path(), "管理トークンなしのセッション管理要求を拒否");
        return unauthorized();
    };

    // タイミング攻撃対策として定数時間比較を使用
    let is_valid: bool = state.token.as_bytes().ct_eq(provided.as_bytes()).into();
    if !is_valid {
        tracing::warn!(path = %request.uri().path(), "不正な管理トークンを拒否");
        return unauthorized();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use axum::{Router, middleware::from_fn_with_state, routing::get};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route("/admin", get(|| async { "ok" }))
            .layer(from_fn_with_state(
                Arc::new(AdminTokenState {
                    token: "s3cret".to_string(),
                }),
                require_admin_token,
            ))
    }

    #[rstest]
    #[case(None, StatusCode::UNAUTHORIZED)]
    #[case(Some("s3cret"), StatusCode::UNAUTHORIZED)]
    #[case(Some("Bearer wrong"), StatusCode::UNAUTHORIZED)]
    #[case(Some("Bearer s3cre"), StatusCode::UNAUTHORIZED)]
    #[case(Some("Bearer s3cret"), StatusCode::OK)]
    #[tokio::test]
    async fn test_bearerトークンが一致するときだけ通す(
        #[case] authorization: Option<&str>,
        #[case] expected: StatusCode,
    ) {
        let mut builder = Request::builder().uri("/admin");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }

        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), expected);
    }
}
