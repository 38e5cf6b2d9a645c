// Read-only view of the remote league-management service. Roster legality,
// contract limits, and trade windows all live server-side; the bot only
// surfaces results, so this port never writes.

pub mod cache;

use async_trait::async_trait;
use cache::NameCache;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// A team-ownership unit: general manager, prefix, and tiered rosters.
#[derive(Debug, Clone, Deserialize)]
pub struct Franchise {
    pub id: i64,
    pub name: String,
    pub prefix: String,
    pub gm_name: String,
    #[serde(default)]
    pub teams: Vec<Team>,
}

/// One tiered roster belonging to a franchise.
#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub tier: String,
    #[serde(default)]
    pub franchise: Option<String>,
}

/// A skill-division grouping of teams.
#[derive(Debug, Clone, Deserialize)]
pub struct Tier {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// A league fixture between two teams.
#[derive(Debug, Clone, Deserialize)]
pub struct LeagueMatch {
    pub id: i64,
    pub home_team: String,
    pub away_team: String,
    pub tier: String,
    pub match_day: u32,
    #[serde(default)]
    pub scheduled: Option<DateTime<Utc>>,
    #[serde(default)]
    pub home_wins: u32,
    #[serde(default)]
    pub away_wins: u32,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum LeagueError {
    #[error("The league service is unreachable (bad gateway)")]
    BadGateway,

    #[error("The league service returned HTTP {0}")]
    Http(u16),

    #[error("`{0}` was not found")]
    NotFound(String),

    #[error("The league service returned an unexpected body: {0}")]
    InvalidResponse(String),

    #[error("Request to the league service failed: {0}")]
    Transport(String),
}

// ============================================================================
// PORT
// ============================================================================

/// Typed calls against the remote league REST API.
#[async_trait]
pub trait LeagueApi: Send + Sync {
    async fn franchises(&self, guild_id: u64) -> Result<Vec<Franchise>, LeagueError>;

    async fn franchise_by_name(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Franchise, LeagueError>;

    async fn tiers(&self, guild_id: u64) -> Result<Vec<Tier>, LeagueError>;

    async fn teams_for_tier(&self, guild_id: u64, tier: &str) -> Result<Vec<Team>, LeagueError>;

    async fn matches_for_team(
        &self,
        guild_id: u64,
        team: &str,
    ) -> Result<Vec<LeagueMatch>, LeagueError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// League lookups plus the per-guild name cache that backs slash-command
/// autocomplete.
pub struct LeagueService<A: LeagueApi> {
    api: A,
    names: NameCache,
}

impl<A: LeagueApi> LeagueService<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            names: NameCache::new(),
        }
    }

    pub async fn franchises(&self, guild_id: u64) -> Result<Vec<Franchise>, LeagueError> {
        let franchises = self.api.franchises(guild_id).await?;
        self.names
            .set_franchises(guild_id, franchises.iter().map(|f| f.name.clone()).collect());
        // Franchise records carry their rosters, so team names come for free.
        self.names.set_teams(
            guild_id,
            franchises
                .iter()
                .flat_map(|f| f.teams.iter().map(|t| t.name.clone()))
                .collect(),
        );
        Ok(franchises)
    }

    pub async fn franchise_by_name(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Franchise, LeagueError> {
        self.api.franchise_by_name(guild_id, name).await
    }

    pub async fn tiers(&self, guild_id: u64) -> Result<Vec<Tier>, LeagueError> {
        let tiers = self.api.tiers(guild_id).await?;
        self.names
            .set_tiers(guild_id, tiers.iter().map(|t| t.name.clone()).collect());
        Ok(tiers)
    }

    pub async fn teams_for_tier(
        &self,
        guild_id: u64,
        tier: &str,
    ) -> Result<Vec<Team>, LeagueError> {
        self.api.teams_for_tier(guild_id, tier).await
    }

    pub async fn matches_for_team(
        &self,
        guild_id: u64,
        team: &str,
    ) -> Result<Vec<LeagueMatch>, LeagueError> {
        self.api.matches_for_team(guild_id, team).await
    }

    /// The match with the earliest scheduled time still in the future.
    pub async fn next_match(
        &self,
        guild_id: u64,
        team: &str,
    ) -> Result<Option<LeagueMatch>, LeagueError> {
        let now = Utc::now();
        let mut matches: Vec<_> = self
            .matches_for_team(guild_id, team)
            .await?
            .into_iter()
            .filter(|m| m.scheduled.map(|t| t > now).unwrap_or(false))
            .collect();
        matches.sort_by_key(|m| m.scheduled);
        Ok(matches.into_iter().next())
    }

    /// Cached franchise names for autocomplete, fetched on first use.
    pub async fn franchise_names(&self, guild_id: u64) -> Vec<String> {
        if let Some(names) = self.names.franchises(guild_id) {
            return names;
        }
        match self.franchises(guild_id).await {
            Ok(franchises) => franchises.into_iter().map(|f| f.name).collect(),
            Err(e) => {
                tracing::warn!(guild_id, error = %e, "Failed to fetch franchise names");
                Vec::new()
            }
        }
    }

    /// Cached tier names for autocomplete, fetched on first use.
    pub async fn tier_names(&self, guild_id: u64) -> Vec<String> {
        if let Some(names) = self.names.tiers(guild_id) {
            return names;
        }
        match self.tiers(guild_id).await {
            Ok(tiers) => tiers.into_iter().map(|t| t.name).collect(),
            Err(e) => {
                tracing::warn!(guild_id, error = %e, "Failed to fetch tier names");
                Vec::new()
            }
        }
    }

    /// Cached team names for autocomplete, derived from franchise rosters.
    pub async fn team_names(&self, guild_id: u64) -> Vec<String> {
        if let Some(names) = self.names.teams(guild_id) {
            return names;
        }
        match self.franchises(guild_id).await {
            Ok(franchises) => franchises
                .into_iter()
                .flat_map(|f| f.teams.into_iter().map(|t| t.name))
                .collect(),
            Err(e) => {
                tracing::warn!(guild_id, error = %e, "Failed to fetch team names");
                Vec::new()
            }
        }
    }

    /// Drop cached names for a guild. Called after anything that renames,
    /// creates, or deletes league objects server-side.
    pub fn invalidate_names(&self, guild_id: u64) {
        self.names.invalidate(guild_id);
    }
}
