//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    PresetName, RepositoryError, ScopeId, Session, SessionConfig, SessionId, UserId,
};

/// A live session guarded by its own lock.
///
/// The lock covers phase, countdown and timer handle together, so pause,
/// resume, stop and expiry handling for one session are totally ordered.
pub type SharedSession = Arc<Mutex<Session>>;

/// Store entry for a live session.
///
/// The identity fields are copied out of the session so the store can filter
/// without taking session locks.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub id: SessionId,
    pub user_id: UserId,
    pub scope_id: ScopeId,
    pub notifications_enabled: bool,
    pub session: SharedSession,
}

/// Session Store: at most one live session per user
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert the entry unless the user already has one
    async fn insert_if_absent(&self, entry: SessionEntry) -> Result<(), RepositoryError>;

    async fn get(&self, user_id: &UserId) -> Option<SessionEntry>;

    /// Remove the user's entry only if it is the session `id`
    async fn remove(&self, user_id: &UserId, id: SessionId) -> Option<SessionEntry>;

    async fn list(&self) -> Vec<SessionEntry>;

    /// Sessions of `scope_id` that run with notifications enabled
    async fn list_notified_in_scope(&self, scope_id: &ScopeId) -> Vec<SessionEntry>;

    async fn count(&self) -> usize;

    /// Remove and return every entry
    async fn drain(&self) -> Vec<SessionEntry>;
}

/// Aggregate counters for one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    /// Finished work phases
    pub work_units: u32,
    /// Sessions that ran through every cycle
    pub completed_sessions: u32,
    /// Sum of finished work phase lengths
    pub focus_minutes: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn record_work_unit(&self, user_id: &UserId, minutes: u32);

    async fn record_completion(&self, user_id: &UserId);

    async fn get(&self, user_id: &UserId) -> UserStats;
}

/// Named session config saved by a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    pub name: PresetName,
    pub config: SessionConfig,
}

#[async_trait]
pub trait PresetRepository: Send + Sync {
    /// Save or overwrite a preset
    async fn save(&self, user_id: &UserId, preset: Preset);

    async fn find(&self, user_id: &UserId, name: &PresetName) -> Option<Preset>;

    /// The user's presets sorted by name
    async fn list(&self, user_id: &UserId) -> Vec<Preset>;
}
