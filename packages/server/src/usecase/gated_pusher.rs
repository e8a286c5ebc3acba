//! テスト用の MessagePusher
//!
//! 指定した操作の最初の 1 回だけを止め、テスト側が解放するまで待たせます。
//! 並行する 2 つの操作の処理順を決め打ちで再現するために使います。

use async_trait::async_trait;
use tokio::sync::{Mutex, oneshot};

use crate::{
    domain::{MessagePushError, MessagePusher, Notification, PusherChannel, SessionId},
    infrastructure::message_pusher::WebSocketMessagePusher,
};

/// 止める操作
pub(crate) enum Gate {
    /// 指定したセッションの register_client
    Register(SessionId),
    /// 最初の broadcast
    Broadcast,
}

pub(crate) struct GatedPusher {
    inner: WebSocketMessagePusher,
    gate: Gate,
    pending: Mutex<Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>>,
}

impl GatedPusher {
    /// 返り値: (pusher, 操作が止まったことの通知, 解放用の sender)
    pub(crate) fn new(gate: Gate) -> (Self, oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        let pusher = Self {
            inner: WebSocketMessagePusher::default(),
            gate,
            pending: Mutex::new(Some((entered_tx, release_rx))),
        };
        (pusher, entered_rx, release_tx)
    }

    async fn hold(&self) {
        let pending = self.pending.lock().await.take();
        if let Some((entered, release)) = pending {
            let _ = entered.send(());
            let _ = release.await;
        }
    }
}

#[async_trait]
impl MessagePusher for GatedPusher {
    async fn register_client(&self, session_id: SessionId, sender: PusherChannel) {
        if matches!(&self.gate, Gate::Register(gated) if *gated == session_id) {
            self.hold().await;
        }
        self.inner.register_client(session_id, sender).await;
    }

    async fn unregister_client(&self, session_id: &SessionId) {
        self.inner.unregister_client(session_id).await;
    }

    async fn push_to(
        &self,
        session_id: &SessionId,
        notification: &Notification,
    ) -> Result<(), MessagePushError> {
        self.inner.push_to(session_id, notification).await
    }

    async fn broadcast(
        &self,
        targets: Vec<SessionId>,
        notification: &Notification,
    ) -> Result<(), MessagePushError> {
        if matches!(self.gate, Gate::Broadcast) {
            self.hold().await;
        }
        self.inner.broadcast(targets, notification).await
    }
}
