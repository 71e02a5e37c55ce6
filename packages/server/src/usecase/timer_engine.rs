//! UseCase: セッションタイマーエンジン
//!
//! ## 責務
//!
//! - セッションの開始・一時停止・再開・停止
//! - フェーズ期限の管理（1 セッションにつき未処理のタイマーは常に 1 つ）
//! - フェーズ境界でのイベント通知
//!
//! ## 設計ノート
//!
//! タイマータスクは期限まで眠り、`PhaseExpired` をドライバータスクへ送るだけです。
//! ドライバーはセッションのロックを取ってから「そのタイマーがまだ現役か」を確認し、
//! 現役の場合だけフェーズを進めます。一時停止とタイマー満了の競合はこの確認で解決します。

use std::sync::{
    Arc, PoisonError, Weak,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use focusbell_shared::time::{Clock, format_mm_ss};
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
    time::Instant,
};

use crate::domain::{
    NewSession, ScheduledTimer, ScopeId, Session, SessionEntry, SessionError, SessionEvent,
    SessionId, SessionRepository, SessionSnapshot, TimerId, Timestamp, UserId,
};

/// Receives phase boundary events from the engine.
///
/// Events of one session arrive in order. Most come from the engine's
/// driver task; a pause that lands on an overdue phase delivers its event
/// from the pausing task.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionEventListener: Send + Sync {
    async fn on_session_event(&self, event: SessionEvent);
}

/// Message sent by a timer task when its deadline passes
#[derive(Debug)]
struct PhaseExpired {
    user_id: UserId,
    session_id: SessionId,
    timer_id: TimerId,
}

struct EngineInner {
    repository: Arc<dyn SessionRepository>,
    listener: Arc<dyn SessionEventListener>,
    clock: Arc<dyn Clock>,
    expiry_tx: mpsc::UnboundedSender<PhaseExpired>,
    next_timer_id: AtomicU64,
    driver: std::sync::Mutex<Option<JoinHandle<()>>>,
}

/// Session timer engine
///
/// Cheap to clone; all clones drive the same sessions.
#[derive(Clone)]
pub struct TimerEngine {
    inner: Arc<EngineInner>,
}

impl TimerEngine {
    /// Create the engine and spawn its driver task.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn spawn(
        repository: Arc<dyn SessionRepository>,
        listener: Arc<dyn SessionEventListener>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(EngineInner {
            repository,
            listener,
            clock,
            expiry_tx,
            next_timer_id: AtomicU64::new(1),
            driver: std::sync::Mutex::new(None),
        });
        let driver = tokio::spawn(drive(Arc::downgrade(&inner), expiry_rx));
        *inner.driver.lock().unwrap_or_else(PoisonError::into_inner) = Some(driver);
        Self { inner }
    }

    /// Start a session in its first work phase.
    ///
    /// # Errors
    ///
    /// * `AlreadyActive` - the user already has a live session
    pub async fn start_session(&self, params: NewSession) -> Result<SessionSnapshot, SessionError> {
        let inner = &self.inner;
        if inner.repository.get(&params.user_id).await.is_some() {
            return Err(SessionError::AlreadyActive);
        }

        let id = SessionId::generate();
        let now = Instant::now();
        let deadline = now + params.config.work_duration();
        let timer = inner.schedule(&params.user_id, id, deadline);
        let started_at = Timestamp::new(inner.clock.now_millis());
        let session = Session::start(id, params, started_at, deadline, timer);
        let snapshot = session.snapshot(now);

        let entry = SessionEntry {
            id,
            user_id: snapshot.user_id.clone(),
            scope_id: snapshot.scope_id.clone(),
            notifications_enabled: snapshot.notifications_enabled,
            session: Arc::new(Mutex::new(session)),
        };
        // a rejected entry is dropped here together with its timer
        inner
            .repository
            .insert_if_absent(entry)
            .await
            .map_err(|_| SessionError::AlreadyActive)?;

        tracing::info!(
            "Session {} started for '{}' ({}/{} min x {})",
            id,
            snapshot.user_id,
            snapshot.config.work_minutes(),
            snapshot.config.break_minutes(),
            snapshot.config.total_cycles()
        );
        Ok(snapshot)
    }

    /// Pause the user's session, freezing the time left in the phase.
    ///
    /// A phase whose deadline has already passed is completed first, so the
    /// pause applies to the phase that follows it.
    ///
    /// # Errors
    ///
    /// * `NotFound` - no live session, or the overdue phase was the last one
    /// * `NotRunning` - already paused
    pub async fn pause(&self, user_id: &UserId) -> Result<SessionSnapshot, SessionError> {
        let entry = self.live_entry(user_id).await?;
        let mut session = entry.session.lock().await;
        let now = Instant::now();

        // the next phase is left paused at its full length
        let overdue = session
            .is_overdue(now)
            .then(|| self.inner.advance(&mut session, now, false));
        let result = match &overdue {
            Some(event) if event.snapshot.terminated => Err(SessionError::NotFound),
            Some(event) => Ok(event.snapshot.clone()),
            None => match session.pause(now) {
                Ok(_) => Ok(session.snapshot(now)),
                Err(e) => Err(e),
            },
        };
        drop(session);

        if let Some(event) = overdue {
            self.inner.publish(&entry, event).await;
        }
        if let Ok(snapshot) = &result {
            tracing::info!(
                "Session {} of '{}' paused with {} left",
                entry.id,
                user_id,
                format_mm_ss(snapshot.remaining)
            );
        }
        result
    }

    /// Resume a paused session with the time it had left.
    ///
    /// # Errors
    ///
    /// * `NotFound` - no live session
    /// * `NotPaused` - the session is running
    pub async fn resume(&self, user_id: &UserId) -> Result<SessionSnapshot, SessionError> {
        let entry = self.live_entry(user_id).await?;
        let mut session = entry.session.lock().await;
        let now = Instant::now();
        let deadline = session.resume_deadline(now)?;
        let timer = self.inner.schedule(user_id, entry.id, deadline);
        session.arm(deadline, timer);
        tracing::info!(
            "Session {} of '{}' resumed with {} left",
            entry.id,
            user_id,
            format_mm_ss(deadline - now)
        );
        Ok(session.snapshot(now))
    }

    /// Stop the user's session. Idempotent.
    ///
    /// Returns whether a live session was stopped.
    pub async fn stop(&self, user_id: &UserId) -> bool {
        let Some(entry) = self.inner.repository.get(user_id).await else {
            return false;
        };
        let stopped = terminate(&entry).await;
        self.inner.repository.remove(user_id, entry.id).await;
        if stopped {
            tracing::info!("Session {} of '{}' stopped", entry.id, user_id);
        }
        stopped
    }

    /// Stop every notified session in `scope_id`, returning their owners.
    pub async fn stop_notified_in_scope(&self, scope_id: &ScopeId) -> Vec<UserId> {
        let mut stopped = Vec::new();
        for entry in self.inner.repository.list_notified_in_scope(scope_id).await {
            let was_live = terminate(&entry).await;
            self.inner.repository.remove(&entry.user_id, entry.id).await;
            if was_live {
                stopped.push(entry.user_id);
            }
        }
        stopped.sort();
        if !stopped.is_empty() {
            tracing::info!(
                "Stopped {} notified session(s) in scope '{}'",
                stopped.len(),
                scope_id
            );
        }
        stopped
    }

    pub async fn snapshot(&self, user_id: &UserId) -> Option<SessionSnapshot> {
        let entry = self.inner.repository.get(user_id).await?;
        let session = entry.session.lock().await;
        if session.is_terminated() {
            return None;
        }
        Some(session.snapshot(Instant::now()))
    }

    /// Snapshots of every live session, ordered by user
    pub async fn snapshots(&self) -> Vec<SessionSnapshot> {
        let mut snapshots = Vec::new();
        for entry in self.inner.repository.list().await {
            let session = entry.session.lock().await;
            if !session.is_terminated() {
                snapshots.push(session.snapshot(Instant::now()));
            }
        }
        snapshots
    }

    /// Drop store entries whose session has terminated.
    ///
    /// Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let mut removed = 0;
        for entry in self.inner.repository.list().await {
            let terminated = entry.session.lock().await.is_terminated();
            if terminated
                && self
                    .inner
                    .repository
                    .remove(&entry.user_id, entry.id)
                    .await
                    .is_some()
            {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!("Swept {} finished session(s)", removed);
        }
        removed
    }

    /// Stop the driver, cancel every timer and empty the store.
    pub async fn shutdown(&self) {
        if let Some(driver) = self
            .inner
            .driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            driver.abort();
        }
        let entries = self.inner.repository.drain().await;
        for entry in &entries {
            terminate(entry).await;
        }
        tracing::info!("Timer engine stopped ({} session(s) cancelled)", entries.len());
    }

    async fn live_entry(&self, user_id: &UserId) -> Result<SessionEntry, SessionError> {
        self.inner
            .repository
            .get(user_id)
            .await
            .ok_or(SessionError::NotFound)
    }
}

impl EngineInner {
    /// Spawn a timer task that reports `deadline` to the driver.
    fn schedule(&self, user_id: &UserId, session_id: SessionId, deadline: Instant) -> ScheduledTimer {
        let timer_id = TimerId::new(self.next_timer_id.fetch_add(1, Ordering::Relaxed));
        let expired = PhaseExpired {
            user_id: user_id.clone(),
            session_id,
            timer_id,
        };
        let expiry_tx = self.expiry_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            // fails only once the engine is gone
            let _ = expiry_tx.send(expired);
        });
        ScheduledTimer::new(timer_id, handle)
    }

    async fn handle_expiry(&self, expired: PhaseExpired) {
        let Some(entry) = self.repository.get(&expired.user_id).await else {
            tracing::debug!("Expiry for '{}' has no session", expired.user_id);
            return;
        };
        if entry.id != expired.session_id {
            tracing::debug!("Expiry for an older session of '{}'", expired.user_id);
            return;
        }

        let mut session = entry.session.lock().await;
        if !session.is_current_timer(expired.timer_id) {
            tracing::debug!(
                "Ignoring stale timer {} of session {}",
                expired.timer_id.value(),
                entry.id
            );
            return;
        }

        let event = self.advance(&mut session, Instant::now(), true);
        drop(session);
        self.publish(&entry, event).await;
    }

    /// Apply the end of the session's current phase.
    ///
    /// With `rearm` the next phase starts counting down at `now`; otherwise
    /// it stays paused at its full length.
    fn advance(&self, session: &mut Session, now: Instant, rearm: bool) -> SessionEvent {
        let kind = session.complete_phase();
        if rearm && !session.is_terminated() {
            let deadline = now + session.phase_duration();
            let timer = self.schedule(session.user_id(), session.id(), deadline);
            session.arm(deadline, timer);
        }
        SessionEvent::new(kind, session.snapshot(now))
    }

    /// Drop a completed session from the store, then hand the event on.
    ///
    /// Must be called without the session lock held.
    async fn publish(&self, entry: &SessionEntry, event: SessionEvent) {
        if event.snapshot.terminated {
            self.repository.remove(&entry.user_id, entry.id).await;
        }
        tracing::info!("Session {} of '{}': {:?}", entry.id, entry.user_id, event.kind);
        self.listener.on_session_event(event).await;
    }
}

/// Serially apply timer expiries until the engine is dropped or shut down.
async fn drive(engine: Weak<EngineInner>, mut expiry_rx: mpsc::UnboundedReceiver<PhaseExpired>) {
    while let Some(expired) = expiry_rx.recv().await {
        let Some(engine) = engine.upgrade() else {
            break;
        };
        engine.handle_expiry(expired).await;
    }
    tracing::debug!("Timer engine driver finished");
}

/// Terminate the entry's session, returning whether it was still live.
async fn terminate(entry: &SessionEntry) -> bool {
    let mut session = entry.session.lock().await;
    let was_live = !session.is_terminated();
    session.terminate();
    was_live
}
