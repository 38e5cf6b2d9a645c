// In-memory implementation of the settings store. Backs the lifecycle tests
// and stands in wherever no database file is wanted.

use crate::core::settings::{
    GuildCombinesSettings, ScheduledTeardown, SettingsError, SettingsStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemorySettingsStore {
    settings: DashMap<u64, GuildCombinesSettings>,
    teardowns: Mutex<Vec<ScheduledTeardown>>,
    next_id: AtomicI64,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn combines_settings(
        &self,
        guild_id: u64,
    ) -> Result<GuildCombinesSettings, SettingsError> {
        Ok(self
            .settings
            .get(&guild_id)
            .map(|s| s.clone())
            .unwrap_or_default())
    }

    async fn save_combines_settings(
        &self,
        guild_id: u64,
        settings: &GuildCombinesSettings,
    ) -> Result<(), SettingsError> {
        self.settings.insert(guild_id, settings.clone());
        Ok(())
    }

    async fn schedule_teardown(
        &self,
        guild_id: u64,
        lobby_id: i64,
        due: DateTime<Utc>,
    ) -> Result<(), SettingsError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.teardowns.lock().unwrap().push(ScheduledTeardown {
            id,
            guild_id,
            lobby_id,
            due,
        });
        Ok(())
    }

    async fn due_teardowns(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduledTeardown>, SettingsError> {
        let mut due: Vec<_> = self
            .teardowns
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.due <= now)
            .cloned()
            .collect();
        due.sort_by_key(|t| t.due);
        Ok(due)
    }

    async fn complete_teardown(&self, id: i64) -> Result<(), SettingsError> {
        self.teardowns.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }
}
