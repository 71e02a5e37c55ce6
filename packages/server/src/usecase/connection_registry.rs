//! Per-scope voice connection records.
//!
//! At most one record exists per scope. Replacing or removing a record always
//! goes through `ConnectionRecord::close`, which stops the watchdog before
//! the transport is released.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{sync::watch, task::JoinHandle};

use crate::domain::{
    AudioPlayer, ConnectionStatus, PlayerStatus, ScopeId, VoiceTarget, VoiceTransport,
};

pub struct ConnectionRecord {
    id: u64,
    scope_id: ScopeId,
    target: VoiceTarget,
    transport: Arc<dyn VoiceTransport>,
    player: Mutex<Option<Arc<dyn AudioPlayer>>>,
    watchdog: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl ConnectionRecord {
    pub fn new(
        id: u64,
        scope_id: ScopeId,
        target: VoiceTarget,
        transport: Arc<dyn VoiceTransport>,
    ) -> Self {
        Self {
            id,
            scope_id,
            target,
            transport,
            player: Mutex::new(None),
            watchdog: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn scope_id(&self) -> &ScopeId {
        &self.scope_id
    }

    pub fn target(&self) -> &VoiceTarget {
        &self.target
    }

    pub fn transport(&self) -> &Arc<dyn VoiceTransport> {
        &self.transport
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.transport.status().borrow()
    }

    /// Make `player` the current player, stopping the previous one
    pub fn replace_player(&self, player: Arc<dyn AudioPlayer>) {
        let previous = self
            .player
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(player);
        if let Some(previous) = previous {
            previous.stop();
        }
    }

    /// Whether a different player has taken over from `player_id`
    pub fn is_player_superseded(&self, player_id: u64) -> bool {
        self.player
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|current| current.id() != player_id)
    }

    /// Drop the current player if it is no longer playing.
    ///
    /// Returns whether a player was released.
    pub fn release_idle_player(&self) -> bool {
        let mut slot = self.player.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = slot.as_ref().is_some_and(|player| {
            matches!(
                *player.status().borrow(),
                PlayerStatus::Idle | PlayerStatus::Errored(_)
            )
        });
        if idle {
            *slot = None;
        }
        idle
    }

    /// Attach the watchdog task. Aborted right away if the record is closed.
    pub fn set_watchdog(&self, handle: JoinHandle<()>) {
        let mut watchdog = self.watchdog.lock().unwrap_or_else(PoisonError::into_inner);
        if self.closed.load(Ordering::Acquire) {
            handle.abort();
            return;
        }
        if let Some(previous) = watchdog.replace(handle) {
            previous.abort();
        }
    }

    /// Stop the watchdog and player, then release the transport. Idempotent.
    pub fn close(&self) {
        {
            let mut watchdog = self.watchdog.lock().unwrap_or_else(PoisonError::into_inner);
            if self.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            if let Some(watchdog) = watchdog.take() {
                watchdog.abort();
            }
        }
        if let Some(player) = self
            .player
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            self.transport.unsubscribe(player.id());
            player.stop();
        }
        self.transport.destroy();
        tracing::info!("Voice connection for scope '{}' closed", self.scope_id);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Connection records keyed by scope
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    records: Arc<Mutex<HashMap<ScopeId, Arc<ConnectionRecord>>>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_record_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Insert `record`, returning the record it replaced. The caller closes it.
    pub fn insert(&self, record: Arc<ConnectionRecord>) -> Option<Arc<ConnectionRecord>> {
        self.lock().insert(record.scope_id().clone(), record)
    }

    pub fn get(&self, scope_id: &ScopeId) -> Option<Arc<ConnectionRecord>> {
        self.lock().get(scope_id).cloned()
    }

    /// Remove and close the scope's record. Returns whether one existed.
    pub fn teardown(&self, scope_id: &ScopeId) -> bool {
        let removed = self.lock().remove(scope_id);
        match removed {
            Some(record) => {
                record.close();
                true
            }
            None => false,
        }
    }

    /// Like `teardown`, but only if the scope's record is still `record_id`.
    pub fn teardown_record(&self, scope_id: &ScopeId, record_id: u64) -> bool {
        let removed = {
            let mut records = self.lock();
            if records
                .get(scope_id)
                .is_some_and(|record| record.id() == record_id)
            {
                records.remove(scope_id)
            } else {
                None
            }
        };
        match removed {
            Some(record) => {
                record.close();
                true
            }
            None => false,
        }
    }

    /// All records ordered by scope
    pub fn records(&self) -> Vec<Arc<ConnectionRecord>> {
        let mut records: Vec<Arc<ConnectionRecord>> = self.lock().values().cloned().collect();
        records.sort_by(|a, b| a.scope_id().cmp(b.scope_id()));
        records
    }

    /// Remove every record without closing it
    pub fn drain(&self) -> Vec<Arc<ConnectionRecord>> {
        self.lock().drain().map(|(_, record)| record).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ScopeId, Arc<ConnectionRecord>>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Watch a record's transport and tear the record down when it dies.
///
/// A `Disconnected` transport gets `grace` to start reconnecting; `Destroyed`
/// or a closed status channel tears down right away. The task holds no
/// reference to the record itself.
pub fn spawn_watchdog(
    registry: ConnectionRegistry,
    scope_id: ScopeId,
    record_id: u64,
    mut status: watch::Receiver<ConnectionStatus>,
    grace: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if status.changed().await.is_err() {
                break;
            }
            let current = *status.borrow_and_update();
            match current {
                ConnectionStatus::Disconnected => {
                    let recovered = tokio::time::timeout(
                        grace,
                        status.wait_for(|s| s.is_reconnecting() || *s == ConnectionStatus::Ready),
                    )
                    .await
                    .is_ok_and(|result| result.is_ok());
                    if recovered {
                        tracing::info!("Voice connection for scope '{}' is reconnecting", scope_id);
                    } else {
                        tracing::warn!(
                            "Voice connection for scope '{}' did not recover within {:?}",
                            scope_id,
                            grace
                        );
                        break;
                    }
                }
                ConnectionStatus::Destroyed => {
                    tracing::warn!("Voice connection for scope '{}' was destroyed", scope_id);
                    break;
                }
                other => {
                    tracing::debug!("Voice connection for scope '{}': {}", scope_id, other);
                }
            }
        }
        registry.teardown_record(&scope_id, record_id);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChannelId, VoiceGateway},
        infrastructure::voice::LoopbackVoiceGateway,
    };

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - スコープごとに 1 レコードであること
    // - 古いレコード ID での teardown が新しいレコードを壊さないこと
    // - watchdog の猶予時間内の復帰と、復帰しない場合の破棄
    // ========================================

    fn scope() -> ScopeId {
        ScopeId::new("guild-1".to_string()).unwrap()
    }

    fn target() -> VoiceTarget {
        VoiceTarget {
            channel_id: ChannelId::new("voice-1".to_string()).unwrap(),
        }
    }

    async fn create_test_record(
        gateway: &LoopbackVoiceGateway,
        registry: &ConnectionRegistry,
    ) -> Arc<ConnectionRecord> {
        let transport = gateway.connect(&scope(), &target()).await.unwrap();
        Arc::new(ConnectionRecord::new(
            registry.next_record_id(),
            scope(),
            target(),
            transport,
        ))
    }

    #[tokio::test]
    async fn test_insert_replaces_record_of_same_scope() {
        // テスト項目: 同じスコープへの挿入は既存レコードを置き換える
        // given (前提条件):
        let gateway = LoopbackVoiceGateway::default();
        let registry = ConnectionRegistry::new();
        let first = create_test_record(&gateway, &registry).await;
        let second = create_test_record(&gateway, &registry).await;
        registry.insert(first.clone());

        // when (操作):
        let replaced = registry.insert(second.clone());

        // then (期待する結果):
        assert_eq!(replaced.map(|r| r.id()), Some(first.id()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&scope()).unwrap().id(), second.id());
    }

    #[tokio::test]
    async fn test_teardown_record_ignores_stale_id() {
        // テスト項目: 古い ID での teardown は現在のレコードを残す
        // given (前提条件):
        let gateway = LoopbackVoiceGateway::default();
        let registry = ConnectionRegistry::new();
        let record = create_test_record(&gateway, &registry).await;
        registry.insert(record.clone());

        // when (操作):
        let stale = registry.teardown_record(&scope(), record.id() + 100);
        let current = registry.teardown_record(&scope(), record.id());

        // then (期待する結果):
        assert!(!stale);
        assert!(current);
        assert!(registry.is_empty());
        assert!(record.is_closed());
        assert_eq!(record.status(), ConnectionStatus::Destroyed);
    }

    #[tokio::test]
    async fn test_close_stops_current_player() {
        // テスト項目: close で再生中のプレイヤーが停止され購読が解除される
        // given (前提条件):
        let gateway = LoopbackVoiceGateway::default();
        let registry = ConnectionRegistry::new();
        let record = create_test_record(&gateway, &registry).await;
        let player = record.transport().create_player();
        record.transport().subscribe(player.clone());
        record.replace_player(player.clone());

        // when (操作):
        record.close();

        // then (期待する結果):
        assert_eq!(*player.status().borrow(), PlayerStatus::Idle);
        assert_eq!(gateway.transport(&scope()).unwrap().subscriber(), None);
    }

    #[tokio::test]
    async fn test_release_idle_player() {
        // テスト項目: 停止済みのプレイヤーだけが解放される
        // given (前提条件):
        let gateway = LoopbackVoiceGateway::default();
        let registry = ConnectionRegistry::new();
        let record = create_test_record(&gateway, &registry).await;
        let player = record.transport().create_player();
        record.replace_player(player);

        // when (操作):
        let released = record.release_idle_player();
        let again = record.release_idle_player();

        // then (期待する結果):
        assert!(released);
        assert!(!again);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_tears_down_unrecovered_connection() {
        // テスト項目: 切断後に猶予時間内に再接続しないとレコードが破棄される
        // given (前提条件):
        let gateway = LoopbackVoiceGateway::default();
        let registry = ConnectionRegistry::new();
        let record = create_test_record(&gateway, &registry).await;
        registry.insert(record.clone());
        let handle = spawn_watchdog(
            registry.clone(),
            scope(),
            record.id(),
            record.transport().status(),
            Duration::from_secs(5),
        );
        record.set_watchdog(handle);

        // when (操作):
        gateway
            .transport(&scope())
            .unwrap()
            .set_status(ConnectionStatus::Disconnected);
        tokio::time::sleep(Duration::from_secs(6)).await;

        // then (期待する結果):
        assert!(registry.get(&scope()).is_none());
        assert!(record.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_keeps_recovering_connection() {
        // テスト項目: 猶予時間内に再接続を始めればレコードは残る
        // given (前提条件):
        let gateway = LoopbackVoiceGateway::default();
        let registry = ConnectionRegistry::new();
        let record = create_test_record(&gateway, &registry).await;
        registry.insert(record.clone());
        let handle = spawn_watchdog(
            registry.clone(),
            scope(),
            record.id(),
            record.transport().status(),
            Duration::from_secs(5),
        );
        record.set_watchdog(handle);
        let transport = gateway.transport(&scope()).unwrap();

        // when (操作):
        transport.set_status(ConnectionStatus::Disconnected);
        tokio::time::sleep(Duration::from_secs(2)).await;
        transport.set_status(ConnectionStatus::Signalling);
        tokio::time::sleep(Duration::from_secs(10)).await;

        // then (期待する結果):
        assert_eq!(registry.get(&scope()).map(|r| r.id()), Some(record.id()));
        assert!(!record.is_closed());
    }
}
