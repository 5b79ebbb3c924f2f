//! Noop メッセージングクライアント実装
//!
//! 接続すると即座に `Opened` を流し、送信はログ出力のみ行う。
//! ゲートウェイを用意できないローカル開発で使用する。

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use formrelay_domain::{
    notification::{ChatMessage, NotificationError},
    session::{ConnectionEvent, SessionIdentity},
};
use tokio::sync::mpsc;

use super::{ChatSender, EVENT_BUFFER, MessagingClient, MessagingConnection};
use crate::error::InfraError;

/// Noop セッションに割り当てるアカウント
pub const NOOP_IDENTITY: &str = "noop@s.whatsapp.net";

/// Noop メッセージングクライアント
#[derive(Debug, Clone, Default)]
pub struct NoopMessagingClient;

#[async_trait]
impl MessagingClient for NoopMessagingClient {
    async fn connect(
        &self,
        namespace: &str,
        _credentials: Option<serde_json::Value>,
    ) -> Result<MessagingConnection, InfraError> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tx.send(ConnectionEvent::Opened {
            identity: SessionIdentity::new(NOOP_IDENTITY),
        })
        .await
        .map_err(|_| InfraError::invalid_input("イベントストリームが閉じています"))?;

        tracing::info!(namespace, "Noop: メッセージングセッションを開始");

        Ok(MessagingConnection {
            // 送信側を保持し続けることでストリームを開いたままにする
            sender: Arc::new(NoopChatSender {
                events: Mutex::new(Some(tx)),
            }),
            events: rx,
        })
    }
}

struct NoopChatSender {
    events: Mutex<Option<mpsc::Sender<ConnectionEvent>>>,
}

#[async_trait]
impl ChatSender for NoopChatSender {
    async fn send_text(&self, message: &ChatMessage) -> Result<(), NotificationError> {
        tracing::info!(
            to = %message.to,
            length = message.text.len(),
            "Noop: メッセージ送信をスキップ"
        );
        Ok(())
    }

    async fn close(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use formrelay_domain::chat::ChatId;

    use super::*;

    #[tokio::test]
    async fn test_接続直後にopenedが届く() {
        let mut conn = NoopMessagingClient.connect("default", None).await.unwrap();

        let event = conn.events.recv().await;
        assert_eq!(
            event,
            Some(ConnectionEvent::Opened {
                identity: SessionIdentity::new(NOOP_IDENTITY),
            })
        );
    }

    #[tokio::test]
    async fn test_closeでイベントストリームが終端する() {
        let mut conn = NoopMessagingClient.connect("default", None).await.unwrap();
        let _ = conn.events.recv().await;

        conn.sender.close().await;

        assert_eq!(conn.events.recv().await, None);
    }

    #[tokio::test]
    async fn test_send_textがエラーを返さない() {
        let conn = NoopMessagingClient.connect("default", None).await.unwrap();
        let message = ChatMessage {
            to:   ChatId::from_phone("9000000000", Some("91")).unwrap(),
            text: "hello".to_string(),
        };

        assert!(conn.sender.send_text(&message).await.is_ok());
    }
}
