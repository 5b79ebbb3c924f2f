//! # メッセージングセッション
//!
//! チャットネットワークへの接続（セッション）のライフサイクルを状態機械として定義する。
//!
//! ## 状態遷移
//!
//! ```text
//!            start()                 Opened
//!   Idle ─────────────▶ Connecting ─────────▶ Connected
//!    ▲                   │      ▲                │
//!    │              QrChallenge │                │ Closed(401 以外)
//!    │                   ▼      │ reconnect()    ▼
//!    │      AwaitingAuthentication    ReconnectScheduled
//!    │
//!    └── start() ── LoggedOut ◀── Closed(401) ── (接続中の全状態)
//! ```
//!
//! ## 設計方針
//!
//! - **純関数**: [`SessionStatus::on_event`] は副作用を持たず、
//!   次の状態と実行すべき [`SessionAction`] を返す
//! - **再入防止**: 接続中・接続済み・再接続待ちの間は [`SessionStatus::accepts_start`] が
//!   `false` を返し、セッションが二重に作られない
//! - **1 回の切断につき再接続は 1 回**: 既に切断済みの状態で届いた `Closed` は無視する

use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// ログアウト（端末側での連携解除）を示す切断ステータスコード
///
/// このコードで切断された場合は自動再接続せず、手動での再認証を待つ。
pub const LOGGED_OUT_STATUS_CODE: u16 = 401;

/// 接続済みセッションに割り当てられたアカウント識別子
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct SessionIdentity(String);

impl SessionIdentity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// メッセージングクライアントから届く接続イベント
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// 認証待ち（QR コードを端末で読み取って承認する）
    QrChallenge { code: String },
    /// 認証情報が更新された（永続化が必要）
    CredentialsUpdated(serde_json::Value),
    /// 接続確立・認証完了
    Opened { identity: SessionIdentity },
    /// 切断（ステータスコードは不明な場合 `None`）
    Closed { status_code: Option<u16> },
    /// メッセージ受信
    MessageReceived { from: String, text: String },
}

/// セッション状態
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    /// 未接続（起動直後）
    Idle,
    /// 接続処理中
    Connecting,
    /// 接続処理中で、端末での承認を待っている
    AwaitingAuthentication { challenge: String },
    /// 接続済み
    Connected { identity: SessionIdentity },
    /// 一時的な切断。一定時間後に 1 回だけ再接続する
    ReconnectScheduled,
    /// ログアウトによる切断。手動での再認証を待つ
    LoggedOut,
}

/// 状態遷移に伴って実行すべき副作用
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// 何もしない
    None,
    /// 認証チャレンジを運用者に提示する
    PresentChallenge(String),
    /// 認証情報を保存する
    PersistCredentials(serde_json::Value),
    /// 固定遅延後の再接続を 1 回予約する
    ScheduleReconnect,
    /// 保存済みの認証情報を破棄する（次回は新規認証）
    ClearCredentials,
    /// 受信メッセージを記録する
    RecordIncoming { from: String, text: String },
}

/// 状態遷移の結果
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next:   SessionStatus,
    pub action: SessionAction,
}

impl Transition {
    fn stay(current: &SessionStatus) -> Self {
        Self {
            next:   current.clone(),
            action: SessionAction::None,
        }
    }
}

impl SessionStatus {
    /// 接続イベントを適用し、次の状態と副作用を返す
    pub fn on_event(&self, event: ConnectionEvent) -> Transition {
        match event {
            ConnectionEvent::QrChallenge { code } if self.is_connecting() => Transition {
                next:   Self::AwaitingAuthentication {
                    challenge: code.clone(),
                },
                action: SessionAction::PresentChallenge(code),
            },
            ConnectionEvent::CredentialsUpdated(bundle) if self.is_active() => Transition {
                next:   self.clone(),
                action: SessionAction::PersistCredentials(bundle),
            },
            ConnectionEvent::Opened { identity } if self.is_active() => Transition {
                next:   Self::Connected { identity },
                action: SessionAction::None,
            },
            ConnectionEvent::Closed { status_code } if self.is_active() => {
                if status_code == Some(LOGGED_OUT_STATUS_CODE) {
                    Transition {
                        next:   Self::LoggedOut,
                        action: SessionAction::ClearCredentials,
                    }
                } else {
                    Transition {
                        next:   Self::ReconnectScheduled,
                        action: SessionAction::ScheduleReconnect,
                    }
                }
            }
            ConnectionEvent::MessageReceived { from, text } => Transition {
                next:   self.clone(),
                action: SessionAction::RecordIncoming { from, text },
            },
            _ => Transition::stay(self),
        }
    }

    /// 手動の開始操作を受け付けるか
    ///
    /// 未接続またはログアウト後のみ。それ以外では開始操作は何もしない。
    pub fn accepts_start(&self) -> bool {
        matches!(self, Self::Idle | Self::LoggedOut)
    }

    /// 予約済みの再接続を実行できるか
    pub fn accepts_reconnect(&self) -> bool {
        matches!(self, Self::ReconnectScheduled)
    }

    /// 送信に使用できるか（接続済みかつアカウントが割り当て済み）
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Connected { identity } if !identity.as_str().is_empty())
    }

    /// 接続済みアカウントを返す
    pub fn identity(&self) -> Option<&SessionIdentity> {
        match self {
            Self::Connected { identity } => Some(identity),
            _ => None,
        }
    }

    /// 提示中の認証チャレンジを返す
    pub fn pending_challenge(&self) -> Option<&str> {
        match self {
            Self::AwaitingAuthentication { challenge } => Some(challenge),
            _ => None,
        }
    }

    /// ログ出力用の状態名
    pub fn label(&self) -> &'static str {
        self.into()
    }

    fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting | Self::AwaitingAuthentication { .. })
    }

    /// 現在のセッションがイベントを受け付ける状態か
    fn is_active(&self) -> bool {
        self.is_connecting() || matches!(self, Self::Connected { .. })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn connected() -> SessionStatus {
        SessionStatus::Connected {
            identity: SessionIdentity::new("919999999999@s.whatsapp.net"),
        }
    }

    fn awaiting() -> SessionStatus {
        SessionStatus::AwaitingAuthentication {
            challenge: "2@abc".to_string(),
        }
    }

    #[test]
    fn test_接続中にqrを受け取ると認証待ちになる() {
        let t = SessionStatus::Connecting.on_event(ConnectionEvent::QrChallenge {
            code: "2@abc".to_string(),
        });

        assert_eq!(t.next, awaiting());
        assert_eq!(t.action, SessionAction::PresentChallenge("2@abc".to_string()));
        assert_eq!(t.next.pending_challenge(), Some("2@abc"));
    }

    #[test]
    fn test_qrの再発行でチャレンジが更新される() {
        let t = awaiting().on_event(ConnectionEvent::QrChallenge {
            code: "2@def".to_string(),
        });

        assert_eq!(t.next.pending_challenge(), Some("2@def"));
    }

    #[rstest]
    #[case(SessionStatus::Connecting)]
    #[case(awaiting())]
    #[case(connected())]
    fn test_接続中の全状態でopenedにより接続済みになる(#[case] status: SessionStatus) {
        let identity = SessionIdentity::new("919999999999@s.whatsapp.net");
        let t = status.on_event(ConnectionEvent::Opened {
            identity: identity.clone(),
        });

        assert_eq!(t.next, SessionStatus::Connected { identity });
        assert!(t.next.is_ready());
    }

    #[rstest]
    #[case(SessionStatus::Connecting)]
    #[case(awaiting())]
    #[case(connected())]
    fn test_401での切断はログアウトになり再接続しない(#[case] status: SessionStatus) {
        let t = status.on_event(ConnectionEvent::Closed {
            status_code: Some(LOGGED_OUT_STATUS_CODE),
        });

        assert_eq!(t.next, SessionStatus::LoggedOut);
        assert_eq!(t.action, SessionAction::ClearCredentials);
    }

    #[rstest]
    #[case(None)]
    #[case(Some(408))]
    #[case(Some(428))]
    #[case(Some(500))]
    #[case(Some(515))]
    fn test_401以外の切断は再接続を1回予約する(#[case] status_code: Option<u16>) {
        let t = connected().on_event(ConnectionEvent::Closed { status_code });

        assert_eq!(t.next, SessionStatus::ReconnectScheduled);
        assert_eq!(t.action, SessionAction::ScheduleReconnect);
    }

    #[rstest]
    #[case(SessionStatus::Idle)]
    #[case(SessionStatus::ReconnectScheduled)]
    #[case(SessionStatus::LoggedOut)]
    fn test_切断済みの状態で届いたclosedは無視する(#[case] status: SessionStatus) {
        let t = status.on_event(ConnectionEvent::Closed { status_code: None });

        assert_eq!(t.next, status);
        assert_eq!(t.action, SessionAction::None);
    }

    #[test]
    fn test_認証情報の更新は状態を変えずに保存する() {
        let bundle = json!({"me": {"id": "919999999999"}});
        let t = connected().on_event(ConnectionEvent::CredentialsUpdated(bundle.clone()));

        assert_eq!(t.next, connected());
        assert_eq!(t.action, SessionAction::PersistCredentials(bundle));
    }

    #[test]
    fn test_ログアウト後の認証情報更新は保存しない() {
        let t = SessionStatus::LoggedOut.on_event(ConnectionEvent::CredentialsUpdated(json!({})));

        assert_eq!(t.action, SessionAction::None);
    }

    #[test]
    fn test_接続済みのときqrは無視する() {
        let t = connected().on_event(ConnectionEvent::QrChallenge {
            code: "2@abc".to_string(),
        });

        assert_eq!(t.next, connected());
        assert_eq!(t.action, SessionAction::None);
    }

    #[test]
    fn test_メッセージ受信は記録のみ() {
        let t = connected().on_event(ConnectionEvent::MessageReceived {
            from: "919000000000@s.whatsapp.net".to_string(),
            text: "hi".to_string(),
        });

        assert_eq!(t.next, connected());
        assert!(matches!(t.action, SessionAction::RecordIncoming { .. }));
    }

    #[rstest]
    #[case(SessionStatus::Idle, true, false)]
    #[case(SessionStatus::Connecting, false, false)]
    #[case(awaiting(), false, false)]
    #[case(connected(), false, false)]
    #[case(SessionStatus::ReconnectScheduled, false, true)]
    #[case(SessionStatus::LoggedOut, true, false)]
    fn test_開始と再接続の受付可否(
        #[case] status: SessionStatus,
        #[case] start: bool,
        #[case] reconnect: bool,
    ) {
        assert_eq!(status.accepts_start(), start);
        assert_eq!(status.accepts_reconnect(), reconnect);
    }

    #[test]
    fn test_空のアカウントでは送信可能とみなさない() {
        let status = SessionStatus::Connected {
            identity: SessionIdentity::new(""),
        };
        assert!(!status.is_ready());
        assert!(!SessionStatus::Connecting.is_ready());
    }

    #[test]
    fn test_labelは状態名を返す() {
        assert_eq!(SessionStatus::ReconnectScheduled.label(), "reconnect_scheduled");
        assert_eq!(awaiting().label(), "awaiting_authentication");
    }
}
