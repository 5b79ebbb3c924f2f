//! # Relay Service サーバー
//!
//! Web フォームの送信を受け付け、運営者と送信者に通知を中継する API サーバー。
//!
//! ## アーキテクチャ
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │   Browser    │────▶│Relay Service │────▶│ Messaging Gateway│
//! │  (Web Form)  │     │  port: 5000  │     └──────────────────┘
//! └──────────────┘     └──────────────┘
//!                             │
//!                             ▼
//!                      ┌──────────────┐
//!                      │ SMTP Server  │
//!                      └──────────────┘
//! ```
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `RELAY_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `RELAY_PORT` | No | ポート番号（デフォルト: `5000`） |
//! | `ALLOWED_ORIGINS` | **Yes** | CORS で許可するオリジン（カンマ区切り） |
//! | `SMTP_HOST` / `SMTP_USER` / `SMTP_PASSWORD` | **Yes** | SMTP 接続情報 |
//! | `COMPANY_EMAIL` | **Yes** | 送信者宛てメールの送信元 |
//! | `OPERATOR_EMAIL` | **Yes** | 運営者宛てメールの宛先 |
//! | `OPERATOR_NUMBER` | **Yes** | 運営者のチャット番号 |
//! | `MESSAGING_GATEWAY_URL` | **Yes** | メッセージングゲートウェイの URL |
//! | `SESSION_ADMIN_TOKEN` | No | セッション管理 API の Bearer トークン（未設定なら API を無効化） |
//!
//! 全ての変数は [`formrelay_relay_service::config`] を参照。
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（.env ファイルを使用）
//! cargo run -p formrelay-relay-service
//!
//! # 外部サービスなしで起動
//! MAIL_BACKEND=noop MESSAGING_BACKEND=noop cargo run -p formrelay-relay-service
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use formrelay_infra::{
    CredentialStore,
    FileCredentialStore,
    GatewayMessagingClient,
    Mailer,
    MessagingClient,
    NoopMailer,
    NoopMessagingClient,
    SmtpMailer,
};
use formrelay_relay_service::{
    app_builder::build_app,
    config::{MailBackend, MessagingBackend, RelayConfig},
    session::{MessagingSession, SessionSettings},
    usecase::{FormRelayUseCase, TemplateRenderer},
};
use formrelay_shared::observability::TracingConfig;
use tokio::net::TcpListener;

/// Relay Service サーバーのエントリーポイント
///
/// 以下の順序で初期化を行う:
///
/// 1. 環境変数の読み込み（.env ファイル）
/// 2. トレーシングの初期化
/// 3. アプリケーション設定の読み込み
/// 4. メール送信・メッセージングクライアントの初期化とセッション開始
/// 5. HTTP サーバーの起動
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    let tracing_config = TracingConfig::from_env("relay-service");
    formrelay_shared::observability::init_tracing(tracing_config);
    let _tracing_guard = tracing::info_span!("app", service = "relay-service").entered();

    let config = RelayConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!(
        "Relay Service を起動します: {}:{}",
        config.host,
        config.port
    );

    let mailer: Arc<dyn Mailer> = match &config.mail {
        MailBackend::Smtp(settings) => Arc::new(
            SmtpMailer::new(settings).context("SMTP トランスポートの構築に失敗しました")?,
        ),
        MailBackend::Noop => {
            tracing::warn!("MAIL_BACKEND=noop: メールは送信されません");
            Arc::new(NoopMailer)
        }
    };

    let client: Arc<dyn MessagingClient> = match &config.messaging.backend {
        MessagingBackend::Gateway(base_url) => Arc::new(
            GatewayMessagingClient::new(base_url, config.outbound_timeout)
                .context("メッセージングゲートウェイクライアントの構築に失敗しました")?,
        ),
        MessagingBackend::Noop => {
            tracing::warn!("MESSAGING_BACKEND=noop: チャットメッセージは送信されません");
            Arc::new(NoopMessagingClient)
        }
    };

    let store: Arc<dyn CredentialStore> =
        Arc::new(FileCredentialStore::new(&config.messaging.auth_dir));

    let session = MessagingSession::new(
        client,
        store,
        SessionSettings {
            namespace:       config.messaging.session_name.clone(),
            reconnect_delay: config.messaging.reconnect_delay,
        },
    );
    session.start();

    let renderer = TemplateRenderer::new(config.recipients.brand_name.clone())
        .context("通知テンプレートの読み込みに失敗しました")?;
    let usecase = FormRelayUseCase::new(
        session.clone(),
        mailer,
        renderer,
        config.recipients.clone(),
    );

    let app = build_app(
        config.allowed_origins.clone(),
        config.session_admin_token.clone(),
        session,
        usecase,
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("バインドアドレスが不正です")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("{addr} へのバインドに失敗しました"))?;
    tracing::info!("Relay Service が起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
