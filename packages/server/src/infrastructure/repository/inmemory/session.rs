//! InMemory Session Repository 実装
//!
//! ドメイン層が定義する SessionRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! マップのロックは検索・挿入・削除の間だけ保持し、セッション本体のロックは
//! 取りません。セッションのロックを保持したままこのリポジトリを呼んでも
//! デッドロックしません。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{RepositoryError, ScopeId, SessionEntry, SessionId, SessionRepository, UserId};

/// インメモリ Session Repository 実装
#[derive(Default)]
pub struct InMemorySessionRepository {
    /// Key: user_id, Value: live session
    sessions: Arc<Mutex<HashMap<UserId, SessionEntry>>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert_if_absent(&self, entry: SessionEntry) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&entry.user_id) {
            return Err(RepositoryError::AlreadyExists(entry.user_id.into_string()));
        }
        sessions.insert(entry.user_id.clone(), entry);
        Ok(())
    }

    async fn get(&self, user_id: &UserId) -> Option<SessionEntry> {
        let sessions = self.sessions.lock().await;
        sessions.get(user_id).cloned()
    }

    async fn remove(&self, user_id: &UserId, id: SessionId) -> Option<SessionEntry> {
        let mut sessions = self.sessions.lock().await;
        if sessions.get(user_id).is_some_and(|entry| entry.id == id) {
            sessions.remove(user_id)
        } else {
            None
        }
    }

    async fn list(&self) -> Vec<SessionEntry> {
        let sessions = self.sessions.lock().await;
        let mut entries: Vec<SessionEntry> = sessions.values().cloned().collect();
        entries.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        entries
    }

    async fn list_notified_in_scope(&self, scope_id: &ScopeId) -> Vec<SessionEntry> {
        let sessions = self.sessions.lock().await;
        sessions
            .values()
            .filter(|entry| entry.notifications_enabled && &entry.scope_id == scope_id)
            .cloned()
            .collect()
    }

    async fn count(&self) -> usize {
        let sessions = self.sessions.lock().await;
        sessions.len()
    }

    async fn drain(&self) -> Vec<SessionEntry> {
        let mut sessions = self.sessions.lock().await;
        sessions.drain().map(|(_, entry)| entry).collect()
    }
}
