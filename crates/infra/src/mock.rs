//! # テスト用モック
//!
//! ユースケース・ルーターテストで使用するインメモリ実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! formrelay-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use formrelay_domain::{
    chat::ChatId,
    notification::{ChatMessage, EmailMessage, NotificationError},
    session::ConnectionEvent,
};
use tokio::sync::mpsc;

use crate::{
    credential_store::CredentialStore,
    error::InfraError,
    mailer::Mailer,
    messaging::{ChatSender, EVENT_BUFFER, MessagingClient, MessagingConnection},
};

// ===== MockMailer =====

/// 送信したメールを記録するモック
///
/// `fail_for` で指定した宛先、または `fail_all` 後は全宛先で送信失敗を返す。
#[derive(Clone, Default)]
pub struct MockMailer {
    attempts: Arc<Mutex<Vec<EmailMessage>>>,
    sent:     Arc<Mutex<Vec<EmailMessage>>>,
    failing:  Arc<Mutex<Vec<String>>>,
    fail_all: Arc<AtomicBool>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定した宛先への送信を失敗させる
    pub fn fail_for(&self, to: impl Into<String>) {
        self.failing.lock().unwrap().push(to.into());
    }

    /// 全ての送信を失敗させる
    pub fn fail_all(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    /// 送信に成功したメール
    pub fn sent_emails(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// 失敗したものを含む全ての送信試行
    pub fn attempted_emails(&self) -> Vec<EmailMessage> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        self.attempts.lock().unwrap().push(email.clone());

        let failing = self.fail_all.load(Ordering::SeqCst)
            || self.failing.lock().unwrap().iter().any(|to| to == &email.to);
        if failing {
            return Err(NotificationError::SendFailed(format!(
                "mock failure: {}",
                email.to
            )));
        }

        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// ===== MockMessagingClient =====

#[derive(Default)]
struct MessagingState {
    connects:          Mutex<Vec<(String, Option<serde_json::Value>)>>,
    event_senders:     Mutex<Vec<mpsc::Sender<ConnectionEvent>>>,
    close_delay:       Mutex<Duration>,
    fail_connect:      AtomicBool,
    sent:              Mutex<Vec<ChatMessage>>,
    failing:           Mutex<Vec<ChatId>>,
    closed:            AtomicUsize,
}

/// 接続試行と送信を記録するモック
///
/// 接続ごとにイベントチャネルを作り、テストから [`emit`](Self::emit) で
/// イベントを流し込める。
#[derive(Clone, Default)]
pub struct MockMessagingClient {
    state: Arc<MessagingState>,
}

impl MockMessagingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// `close` が完了するまでの時間を設定する
    pub fn set_close_delay(&self, delay: Duration) {
        *self.state.close_delay.lock().unwrap() = delay;
    }

    /// 接続の成否を切り替える
    pub fn set_fail_connect(&self, fail: bool) {
        self.state.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// 指定した宛先への送信を失敗させる
    pub fn fail_sends_to(&self, to: ChatId) {
        self.state.failing.lock().unwrap().push(to);
    }

    /// 接続試行の回数（失敗を含む）
    pub fn connect_count(&self) -> usize {
        self.state.connects.lock().unwrap().len()
    }

    /// 接続試行時の引数（namespace, 認証情報）
    pub fn connect_calls(&self) -> Vec<(String, Option<serde_json::Value>)> {
        self.state.connects.lock().unwrap().clone()
    }

    /// 最新の接続にイベントを流す
    ///
    /// 受信側が既に破棄されている場合は `false` を返す。
    pub async fn emit(&self, event: ConnectionEvent) -> bool {
        let sender = self.state.event_senders.lock().unwrap().last().cloned();
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// `index` 番目（0 始まり）の接続にイベントを流す
    pub async fn emit_to(&self, index: usize, event: ConnectionEvent) -> bool {
        let sender = self.state.event_senders.lock().unwrap().get(index).cloned();
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// 全ての接続のイベント送信側を破棄し、ストリームを終端させる
    pub fn drop_event_senders(&self) {
        self.state.event_senders.lock().unwrap().clear();
    }

    /// 送信に成功したメッセージ
    pub fn sent_messages(&self) -> Vec<ChatMessage> {
        self.state.sent.lock().unwrap().clone()
    }

    /// `close` が呼ばれた回数
    pub fn closed_count(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessagingClient for MockMessagingClient {
    async fn connect(
        &self,
        namespace: &str,
        credentials: Option<serde_json::Value>,
    ) -> Result<MessagingConnection, InfraError> {
        self.state
            .connects
            .lock()
            .unwrap()
            .push((namespace.to_string(), credentials));

        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(InfraError::gateway(503, "mock connect failure"));
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        self.state.event_senders.lock().unwrap().push(tx);

        Ok(MessagingConnection {
            sender: Arc::new(MockChatSender {
                state: self.state.clone(),
            }),
            events: rx,
        })
    }
}

struct MockChatSender {
    state: Arc<MessagingState>,
}

#[async_trait]
impl ChatSender for MockChatSender {
    async fn send_text(&self, message: &ChatMessage) -> Result<(), NotificationError> {
        if self.state.failing.lock().unwrap().contains(&message.to) {
            return Err(NotificationError::SendFailed(format!(
                "mock failure: {}",
                message.to
            )));
        }
        self.state.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn close(&self) {
        let delay = *self.state.close_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.state.closed.fetch_add(1, Ordering::SeqCst);
    }
}

// ===== InMemoryCredentialStore =====

/// メモリ上の認証情報ストア
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    entries: Arc<Mutex<HashMap<String, serde_json::Value>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存済みの認証情報を直接参照する
    pub fn get(&self, namespace: &str) -> Option<serde_json::Value> {
        self.entries.lock().unwrap().get(namespace).cloned()
    }

    /// 認証情報を事前に登録する
    pub fn insert(&self, namespace: impl Into<String>, credentials: serde_json::Value) {
        self.entries
            .lock()
            .unwrap()
            .insert(namespace.into(), credentials);
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self, namespace: &str) -> Result<Option<serde_json::Value>, InfraError> {
        Ok(self.get(namespace))
    }

    async fn save(
        &self,
        namespace: &str,
        credentials: &serde_json::Value,
    ) -> Result<(), InfraError> {
        self.insert(namespace, credentials.clone());
        Ok(())
    }

    async fn clear(&self, namespace: &str) -> Result<(), InfraError> {
        self.entries.lock().unwrap().remove(namespace);
        Ok(())
    }
}
