//! InMemory Stats Repository 実装

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{StatsRepository, UserId, UserStats};

#[derive(Default)]
pub struct InMemoryStatsRepository {
    stats: Arc<Mutex<HashMap<UserId, UserStats>>>,
}

impl InMemoryStatsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatsRepository for InMemoryStatsRepository {
    async fn record_work_unit(&self, user_id: &UserId, minutes: u32) {
        let mut stats = self.stats.lock().await;
        let entry = stats.entry(user_id.clone()).or_default();
        entry.work_units += 1;
        entry.focus_minutes += u64::from(minutes);
    }

    async fn record_completion(&self, user_id: &UserId) {
        let mut stats = self.stats.lock().await;
        stats.entry(user_id.clone()).or_default().completed_sessions += 1;
    }

    async fn get(&self, user_id: &UserId) -> UserStats {
        let stats = self.stats.lock().await;
        stats.get(user_id).copied().unwrap_or_default()
    }
}
