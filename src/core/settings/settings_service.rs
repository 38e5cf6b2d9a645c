// Per-guild configuration and the durable teardown queue.
//
// The original combines workflow tore rooms down from a detached sleep, which
// leaked channels whenever the process restarted mid-delay. Teardowns are
// persisted here instead and drained by a background worker, so a restart
// re-arms anything still pending.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

// ============================================================================
// MODELS
// ============================================================================

/// The combines configuration tuple for one guild.
///
/// Mutated only by explicit admin commands, read before every lifecycle
/// operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildCombinesSettings {
    /// Whether combines are currently running in this guild.
    pub active: bool,
    /// Base URL of the combines micro-service, if configured.
    pub api_url: Option<String>,
    /// Channel-category id that holds combines rooms, if configured.
    pub category_id: Option<u64>,
}

/// A pending room deletion, due after the post-game grace period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTeardown {
    pub id: i64,
    pub guild_id: u64,
    pub lobby_id: i64,
    pub due: DateTime<Utc>,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Storage error: {0}")]
    Storage(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for guild settings and scheduled teardowns.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Settings for a guild; defaults (inactive, nothing configured) if the
    /// guild has never been set up.
    async fn combines_settings(
        &self,
        guild_id: u64,
    ) -> Result<GuildCombinesSettings, SettingsError>;

    async fn save_combines_settings(
        &self,
        guild_id: u64,
        settings: &GuildCombinesSettings,
    ) -> Result<(), SettingsError>;

    /// Queue a room teardown. Duplicate schedules for the same lobby are
    /// allowed; deletion-by-name makes the second run a no-op.
    async fn schedule_teardown(
        &self,
        guild_id: u64,
        lobby_id: i64,
        due: DateTime<Utc>,
    ) -> Result<(), SettingsError>;

    /// All teardowns whose due time is at or before `now`.
    async fn due_teardowns(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduledTeardown>, SettingsError>;

    async fn complete_teardown(&self, id: i64) -> Result<(), SettingsError>;
}
