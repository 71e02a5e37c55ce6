//! InMemory Preset Repository 実装

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Preset, PresetName, PresetRepository, UserId};

#[derive(Default)]
pub struct InMemoryPresetRepository {
    /// Key: user_id, Value: presets keyed by name
    presets: Arc<Mutex<HashMap<UserId, HashMap<PresetName, Preset>>>>,
}

impl InMemoryPresetRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PresetRepository for InMemoryPresetRepository {
    async fn save(&self, user_id: &UserId, preset: Preset) {
        let mut presets = self.presets.lock().await;
        presets
            .entry(user_id.clone())
            .or_default()
            .insert(preset.name.clone(), preset);
    }

    async fn find(&self, user_id: &UserId, name: &PresetName) -> Option<Preset> {
        let presets = self.presets.lock().await;
        presets.get(user_id)?.get(name).cloned()
    }

    async fn list(&self, user_id: &UserId) -> Vec<Preset> {
        let presets = self.presets.lock().await;
        let mut list: Vec<Preset> = presets
            .get(user_id)
            .map(|by_name| by_name.values().cloned().collect())
            .unwrap_or_default();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }
}
