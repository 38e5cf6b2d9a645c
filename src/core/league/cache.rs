// Per-guild cache of league object names, with explicit invalidation.
// Replaces the ad hoc global dictionaries the old workflow scattered across
// command handlers.

use dashmap::DashMap;

#[derive(Debug, Default, Clone)]
struct GuildNames {
    franchises: Option<Vec<String>>,
    tiers: Option<Vec<String>>,
    teams: Option<Vec<String>>,
}

/// Name lists keyed by guild id. Each list is populated independently and
/// dropped together on invalidation.
#[derive(Debug, Default)]
pub struct NameCache {
    inner: DashMap<u64, GuildNames>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn franchises(&self, guild_id: u64) -> Option<Vec<String>> {
        self.inner.get(&guild_id).and_then(|g| g.franchises.clone())
    }

    pub fn tiers(&self, guild_id: u64) -> Option<Vec<String>> {
        self.inner.get(&guild_id).and_then(|g| g.tiers.clone())
    }

    pub fn set_franchises(&self, guild_id: u64, names: Vec<String>) {
        self.inner.entry(guild_id).or_default().franchises = Some(names);
    }

    pub fn set_tiers(&self, guild_id: u64, names: Vec<String>) {
        self.inner.entry(guild_id).or_default().tiers = Some(names);
    }

    pub fn teams(&self, guild_id: u64) -> Option<Vec<String>> {
        self.inner.get(&guild_id).and_then(|g| g.teams.clone())
    }

    pub fn set_teams(&self, guild_id: u64, names: Vec<String>) {
        self.inner.entry(guild_id).or_default().teams = Some(names);
    }

    /// Drop everything cached for one guild.
    pub fn invalidate(&self, guild_id: u64) {
        self.inner.remove(&guild_id);
    }
}
