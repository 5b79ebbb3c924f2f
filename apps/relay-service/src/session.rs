//! # メッセージングセッション管理
//!
//! プロセスで唯一のメッセージングセッションを所有し、接続・認証情報の永続化・
//! 再接続を管理する。
//!
//! ## 設計方針
//!
//! - **状態遷移はドメイン層**: イベントの解釈は [`SessionStatus::on_event`] に任せ、
//!   ここでは遷移結果の [`SessionAction`] を実行するだけにする
//! - **世代管理**: 接続試行ごとに世代番号を進め、古い接続から届いたイベントは捨てる
//! - **ロックは check-and-set のみ**: `std::sync::Mutex` を `.await` をまたいで保持しない
//! - **1 回の切断につき再接続は 1 回**: 固定遅延後に 1 度だけ接続を試みる。
//!   ログアウト（401）では再接続せず、認証情報を破棄して手動の開始を待つ

use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use formrelay_domain::{
    notification::{ChatMessage, NotificationError},
    session::{ConnectionEvent, SessionAction, SessionIdentity, SessionStatus},
};
use formrelay_infra::{ChatSender, CredentialStore, MessagingClient};
use formrelay_shared::{
    event_log::{error, event},
    log_business_event,
};
use tokio::sync::mpsc;

/// セッション管理の設定
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// 認証情報の namespace
    pub namespace:       String,
    /// 一時的な切断から再接続するまでの固定遅延
    pub reconnect_delay: Duration,
}

/// メッセージングセッション
///
/// `Clone` はハンドルの複製で、全てのクローンが同じセッションを共有する。
#[derive(Clone)]
pub struct MessagingSession {
    inner: Arc<Inner>,
}

struct Inner {
    client:   Arc<dyn MessagingClient>,
    store:    Arc<dyn CredentialStore>,
    settings: SessionSettings,
    state:    Mutex<SessionState>,
}

struct SessionState {
    status:         SessionStatus,
    generation:     u64,
    sender:         Option<Arc<dyn ChatSender>>,
    /// ログアウト後の認証情報破棄と切断が完了していない
    logout_pending: bool,
}

impl MessagingSession {
    pub fn new(
        client: Arc<dyn MessagingClient>,
        store: Arc<dyn CredentialStore>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                store,
                settings,
                state: Mutex::new(SessionState {
                    status:         SessionStatus::Idle,
                    generation:     0,
                    sender:         None,
                    logout_pending: false,
                }),
            }),
        }
    }

    /// セッションを開始する
    ///
    /// 未接続またはログアウト後のみ新しい接続試行を始め、`true` を返す。
    /// 接続中・接続済み・再接続待ちの間と、ログアウト後の認証情報破棄が
    /// 終わるまでは何もせず `false` を返す。
    pub fn start(&self) -> bool {
        let generation = {
            let mut state = self.inner.lock();
            if !state.status.accepts_start() {
                tracing::debug!(
                    status = state.status.label(),
                    "セッションは既に開始済みのため開始操作を無視"
                );
                return false;
            }
            if state.logout_pending {
                tracing::debug!("ログアウト処理中のため開始操作を無視");
                return false;
            }
            state.status = SessionStatus::Connecting;
            state.generation += 1;
            state.generation
        };

        tokio::spawn(self.inner.clone().connect(generation));
        true
    }

    /// 送信に使用できるか
    pub fn is_ready(&self) -> bool {
        self.inner.lock().status.is_ready()
    }

    /// 現在の状態
    pub fn status(&self) -> SessionStatus {
        self.inner.lock().status.clone()
    }

    /// 接続済みアカウント
    pub fn identity(&self) -> Option<SessionIdentity> {
        self.inner.lock().status.identity().cloned()
    }

    /// 提示中の認証チャレンジ（QR コード）
    pub fn pending_challenge(&self) -> Option<String> {
        self.inner
            .lock()
            .status
            .pending_challenge()
            .map(str::to_string)
    }

    /// テキストメッセージを送信する
    ///
    /// 接続済みでなければ送信を試みず `ChannelUnavailable` を返す。
    pub async fn send_text(&self, message: &ChatMessage) -> Result<(), NotificationError> {
        let sender = {
            let state = self.inner.lock();
            if !state.status.is_ready() {
                return Err(NotificationError::ChannelUnavailable);
            }
            state
                .sender
                .clone()
                .ok_or(NotificationError::ChannelUnavailable)?
        };

        sender.send_text(message).await
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 接続を試み、イベントを処理し続ける
    ///
    /// 再接続タスクからも呼ばれるため、戻り値の型を明示している。
    fn connect(self: Arc<Self>, generation: u64) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let namespace = self.settings.namespace.as_str();

            log_business_event!(
                event.category = event::category::SESSION,
                event.action = event::action::SESSION_CONNECTING,
                event.entity_type = event::entity_type::SESSION,
                event.entity_id = namespace,
                event.result = event::result::SUCCESS,
                session.generation = generation,
                "メッセージングセッションに接続"
            );

            let credentials = match self.store.load(namespace).await {
                Ok(credentials) => credentials,
                Err(e) => {
                    tracing::warn!(
                        error.category = error::category::INFRASTRUCTURE,
                        error.kind = error::kind::CREDENTIAL_STORE,
                        error = %e,
                        "認証情報の読み込みに失敗。新規認証で接続する"
                    );
                    None
                }
            };

            let connection = match self.client.connect(namespace, credentials).await {
                Ok(connection) => connection,
                Err(e) => {
                    tracing::warn!(
                        error.category = error::category::EXTERNAL_SERVICE,
                        error.kind = error::kind::MESSAGING,
                        error = %e,
                        "メッセージングセッションの接続に失敗"
                    );
                    self.apply(generation, ConnectionEvent::Closed { status_code: None })
                        .await;
                    return;
                }
            };

            let accepted = {
                let mut state = self.lock();
                if state.generation == generation {
                    state.sender = Some(connection.sender.clone());
                    true
                } else {
                    false
                }
            };
            if !accepted {
                connection.sender.close().await;
                return;
            }

            self.run_events(generation, connection.events).await;
        })
    }

    async fn run_events(
        self: &Arc<Self>,
        generation: u64,
        mut events: mpsc::Receiver<ConnectionEvent>,
    ) {
        while let Some(event) = events.recv().await {
            if !self.apply(generation, event).await {
                return;
            }
        }
        // 切断通知なしにストリームが終わった場合は一時的な切断とみなす
        self.apply(generation, ConnectionEvent::Closed { status_code: None })
            .await;
    }

    /// イベントを適用し、遷移に伴う副作用を実行する
    ///
    /// このセッションのイベント処理を続けるなら `true` を返す。
    async fn apply(self: &Arc<Self>, generation: u64, event: ConnectionEvent) -> bool {
        let (transition, previous, closed_sender) = {
            let mut state = self.lock();
            if state.generation != generation {
                tracing::debug!(
                    generation,
                    current = state.generation,
                    "古いセッションのイベントを破棄"
                );
                return false;
            }
            let previous = state.status.label();
            let transition = state.status.on_event(event);
            state.status = transition.next.clone();
            let closed_sender = if is_closed(&state.status) {
                state.sender.take()
            } else {
                None
            };
            if transition.action == SessionAction::ClearCredentials {
                state.logout_pending = true;
            }
            (transition, previous, closed_sender)
        };

        if previous != transition.next.label() {
            tracing::debug!(
                from = previous,
                to = transition.next.label(),
                "セッション状態が遷移"
            );
        }
        if let SessionStatus::Connected { identity } = &transition.next
            && previous != transition.next.label()
        {
            log_business_event!(
                event.category = event::category::SESSION,
                event.action = event::action::SESSION_OPENED,
                event.entity_type = event::entity_type::SESSION,
                event.entity_id = %self.settings.namespace,
                event.result = event::result::SUCCESS,
                session.identity = %identity,
                "メッセージングセッションが接続済みになった"
            );
        }

        let logged_out = transition.action == SessionAction::ClearCredentials;

        // 認証情報の破棄は切断より先に行う
        self.execute(generation, transition.action).await;

        if let Some(sender) = closed_sender {
            sender.close().await;
        }
        if logged_out {
            self.lock().logout_pending = false;
        }

        !is_closed(&transition.next)
    }

    async fn execute(self: &Arc<Self>, generation: u64, action: SessionAction) {
        let namespace = self.settings.namespace.as_str();
        match action {
            SessionAction::None => {}
            SessionAction::PresentChallenge(code) => {
                tracing::info!(
                    qr = %code,
                    "端末のリンク済みデバイス画面で QR コードを読み取ってください"
                );
            }
            SessionAction::PersistCredentials(bundle) => {
                if let Err(e) = self.store.save(namespace, &bundle).await {
                    tracing::error!(
                        error.category = error::category::INFRASTRUCTURE,
                        error.kind = error::kind::CREDENTIAL_STORE,
                        error = %e,
                        "認証情報の保存に失敗"
                    );
                }
            }
            SessionAction::ScheduleReconnect => {
                let delay = self.settings.reconnect_delay;
                log_business_event!(
                    event.category = event::category::SESSION,
                    event.action = event::action::SESSION_CLOSED,
                    event.entity_type = event::entity_type::SESSION,
                    event.entity_id = namespace,
                    event.result = event::result::FAILURE,
                    reconnect_delay_secs = delay.as_secs(),
                    "メッセージングセッションが切断された。再接続を予約"
                );
                let inner = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    inner.reconnect(generation).await;
                });
            }
            SessionAction::ClearCredentials => {
                log_business_event!(
                    event.category = event::category::SESSION,
                    event.action = event::action::SESSION_LOGGED_OUT,
                    event.entity_type = event::entity_type::SESSION,
                    event.entity_id = namespace,
                    event.result = event::result::FAILURE,
                    "ログアウトされた。再認証には開始操作が必要"
                );
                if let Err(e) = self.store.clear(namespace).await {
                    tracing::error!(
                        error.category = error::category::INFRASTRUCTURE,
                        error.kind = error::kind::CREDENTIAL_STORE,
                        error = %e,
                        "認証情報の破棄に失敗"
                    );
                }
            }
            SessionAction::RecordIncoming { from, text } => {
                tracing::debug!(from = %from, length = text.len(), "メッセージを受信");
            }
        }
    }

    /// 予約済みの再接続を実行する
    ///
    /// 予約後に開始操作などで別の試行が始まっていれば何もしない。
    async fn reconnect(self: Arc<Self>, scheduled_by: u64) {
        let generation = {
            let mut state = self.lock();
            if state.generation != scheduled_by || !state.status.accepts_reconnect() {
                return;
            }
            state.status = SessionStatus::Connecting;
            state.generation += 1;
            state.generation
        };

        self.connect(generation).await;
    }
}

/// 現在の接続が終わった状態か
fn is_closed(status: &SessionStatus) -> bool {
    matches!(
        status,
        SessionStatus::Idle | SessionStatus::ReconnectScheduled | SessionStatus::LoggedOut
    )
}
