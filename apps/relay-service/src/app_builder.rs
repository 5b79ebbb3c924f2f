//! # Relay Service アプリケーション構築
//!
//! State の初期化とルーター構築を担当する。
//! `main.rs` はインフラ初期化とサーバー起動に集中する。

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use formrelay_shared::observability::{MakeRequestUuidV7, make_request_span};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    handler::{
        FormState,
        MessagingState,
        ReadinessState,
        get_qr,
        get_status,
        health_check,
        readiness_check,
        register_partner,
        start_session,
        submit_appointment,
        submit_contact,
    },
    middleware::{AdminTokenState, require_admin_token},
    session::MessagingSession,
    usecase::FormRelayUseCase,
};

/// State の構築とルーター定義を行う
///
/// 初期化済みのセッションとユースケースを受け取り、State → Router の順に組み立てる。
/// `session_admin_token` が未設定なら QR コード取得とセッション開始のルートは登録しない。
pub fn build_app(
    allowed_origins: Vec<HeaderValue>,
    session_admin_token: Option<String>,
    session: MessagingSession,
    usecase: FormRelayUseCase,
) -> Router {
    let form_state = Arc::new(FormState { usecase });
    let messaging_state = Arc::new(MessagingState {
        session: session.clone(),
    });
    let readiness_state = Arc::new(ReadinessState { session });

    let mut session_routes = Router::new().route("/api/status", get(get_status));
    match session_admin_token {
        Some(token) => {
            session_routes = session_routes.merge(
                Router::new()
                    .route("/api/session/qr", get(get_qr))
                    .route("/api/session/start", post(start_session))
                    .layer(from_fn_with_state(
                        Arc::new(AdminTokenState { token }),
                        require_admin_token,
                    )),
            );
        }
        None => {
            tracing::warn!(
                "SESSION_ADMIN_TOKEN が未設定のためセッション管理 API を無効化。QR コードはログにのみ出力する"
            );
        }
    }

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/health/ready",
            get(readiness_check).with_state(readiness_state),
        )
        .merge(
            Router::new()
                .route("/api/appointment", post(submit_appointment))
                .route("/api/patnerRegister", post(register_partner))
                .route("/api/contact", post(submit_contact))
                .with_state(form_state),
        )
        .merge(session_routes.with_state(messaging_state))
        .layer(cors_layer(allowed_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
}

/// 許可したオリジンからのブラウザリクエストのみ受け付ける CORS 設定
fn cors_layer(allowed_origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
