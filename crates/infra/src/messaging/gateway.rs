//! HTTP ゲートウェイ メッセージングクライアント実装
//!
//! チャットネットワークのプロトコル処理はゲートウェイ（サイドカー）が担い、
//! 本サービスは HTTP で操作する。
//!
//! ## エンドポイント
//!
//! - `POST {base}/sessions` - セッション開始（`{namespace, credentials}` → `{session_id}`）
//! - `GET {base}/sessions/{id}/events?wait={秒}` - イベントのロングポーリング
//! - `POST {base}/sessions/{id}/messages` - テキスト送信（`{to, text}`）
//! - `DELETE {base}/sessions/{id}` - セッション終了

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use formrelay_domain::{
    notification::{ChatMessage, NotificationError},
    session::{ConnectionEvent, SessionIdentity},
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::{ChatSender, EVENT_BUFFER, MessagingClient, MessagingConnection};
use crate::error::InfraError;

/// ロングポーリングでゲートウェイに待たせる最大時間
pub const DEFAULT_POLL_WAIT: Duration = Duration::from_secs(20);

// --- リクエスト/レスポンス型 ---

#[derive(Debug, Serialize)]
struct OpenSessionRequest<'a> {
    namespace:   &'a str,
    credentials: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OpenSessionResponse {
    session_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    to:   &'a str,
    text: &'a str,
}

/// ゲートウェイが返すイベント
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum GatewayEvent {
    Qr {
        code: String,
    },
    Credentials {
        data: serde_json::Value,
    },
    Open {
        identity: String,
    },
    Close {
        #[serde(default)]
        status_code: Option<u16>,
    },
    Message {
        from: String,
        text: String,
    },
}

impl From<GatewayEvent> for ConnectionEvent {
    fn from(event: GatewayEvent) -> Self {
        match event {
            GatewayEvent::Qr { code } => Self::QrChallenge { code },
            GatewayEvent::Credentials { data } => Self::CredentialsUpdated(data),
            GatewayEvent::Open { identity } => Self::Opened {
                identity: SessionIdentity::new(identity),
            },
            GatewayEvent::Close { status_code } => Self::Closed { status_code },
            GatewayEvent::Message { from, text } => Self::MessageReceived { from, text },
        }
    }
}

/// HTTP ゲートウェイ メッセージングクライアント
pub struct GatewayMessagingClient {
    base_url:  String,
    client:    reqwest::Client,
    timeout:   Duration,
    poll_wait: Duration,
}

impl GatewayMessagingClient {
    /// 新しいクライアントを作成する
    ///
    /// # 引数
    ///
    /// - `base_url`: ゲートウェイのベース URL（例: `http://localhost:3100`）
    /// - `timeout`: 1 回の呼び出しに許す最大時間（ロングポーリングは待機時間に加算）
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, InfraError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout,
            poll_wait: DEFAULT_POLL_WAIT,
        })
    }

    /// ロングポーリングの待機時間を変更する
    pub fn with_poll_wait(mut self, poll_wait: Duration) -> Self {
        self.poll_wait = poll_wait;
        self
    }
}

#[async_trait]
impl MessagingClient for GatewayMessagingClient {
    #[tracing::instrument(skip_all, fields(namespace = %namespace))]
    async fn connect(
        &self,
        namespace: &str,
        credentials: Option<serde_json::Value>,
    ) -> Result<MessagingConnection, InfraError> {
        let url = format!("{}/sessions", self.base_url);
        let request = OpenSessionRequest {
            namespace,
            credentials,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InfraError::gateway(status.as_u16(), body));
        }
        let opened = response.json::<OpenSessionResponse>().await?;

        tracing::debug!(session_id = %opened.session_id, "ゲートウェイセッションを開始");

        let session = Arc::new(GatewaySession {
            base_url:   self.base_url.clone(),
            client:     self.client.clone(),
            session_id: opened.session_id,
        });

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(poll_events(
            session.clone(),
            self.poll_wait,
            self.poll_wait + self.timeout,
            tx,
        ));

        Ok(MessagingConnection {
            sender: session,
            events: rx,
        })
    }
}

/// 開いたゲートウェイセッション
struct GatewaySession {
    base_url:   String,
    client:     reqwest::Client,
    session_id: String,
}

impl GatewaySession {
    fn url(&self, suffix: &str) -> String {
        format!("{}/sessions/{}{}", self.base_url, self.session_id, suffix)
    }

    async fn fetch_events(
        &self,
        wait: Duration,
        timeout: Duration,
    ) -> Result<Vec<ConnectionEvent>, InfraError> {
        let url = format!("{}?wait={}", self.url("/events"), wait.as_secs());
        let response = self.client.get(&url).timeout(timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InfraError::gateway(status.as_u16(), body));
        }

        let events = response.json::<Vec<GatewayEvent>>().await?;
        Ok(events.into_iter().map(ConnectionEvent::from).collect())
    }
}

#[async_trait]
impl ChatSender for GatewaySession {
    async fn send_text(&self, message: &ChatMessage) -> Result<(), NotificationError> {
        let request = SendMessageRequest {
            to:   message.to.as_str(),
            text: &message.text,
        };

        let response = self
            .client
            .post(self.url("/messages"))
            .json(&request)
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(format!("ゲートウェイ通信失敗: {e}")))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            reqwest::StatusCode::CONFLICT | reqwest::StatusCode::NOT_FOUND => {
                Err(NotificationError::ChannelUnavailable)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(NotificationError::SendFailed(format!(
                    "予期しないステータス {}: {}",
                    status, body
                )))
            }
        }
    }

    async fn close(&self) {
        if let Err(e) = self.client.delete(self.url("")).send().await {
            tracing::debug!(error = %e, session_id = %self.session_id, "ゲートウェイセッションの終了に失敗");
        }
    }
}

/// イベントをロングポーリングし、チャネルに流す
///
/// 受信側が破棄されるか、`Closed` を流した時点で終了する。
/// 取得に失敗した場合は `Closed { status_code: None }` を流して終了する。
async fn poll_events(
    session: Arc<GatewaySession>,
    wait: Duration,
    timeout: Duration,
    tx: mpsc::Sender<ConnectionEvent>,
) {
    loop {
        let batch = tokio::select! {
            () = tx.closed() => {
                tracing::debug!(session_id = %session.session_id, "イベントの受信側が破棄された");
                return;
            }
            result = session.fetch_events(wait, timeout) => result,
        };

        match batch {
            Ok(events) => {
                for event in events {
                    let closed = matches!(event, ConnectionEvent::Closed { .. });
                    if tx.send(event).await.is_err() || closed {
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    session_id = %session.session_id,
                    "ゲートウェイからのイベント取得に失敗"
                );
                let _ = tx.send(ConnectionEvent::Closed { status_code: None }).await;
                return;
            }
        }
    }
}
