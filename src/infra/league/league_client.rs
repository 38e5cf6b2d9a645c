use crate::core::league::{Franchise, LeagueApi, LeagueError, LeagueMatch, Team, Tier};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

/// Minimal client for the league-management REST API. It deliberately
/// exposes only the read calls the command surface needs.
pub struct LeagueClient {
    client: Client,
    base_url: String,
}

impl LeagueClient {
    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self, LeagueError> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            headers.insert(
                "Authorization",
                HeaderValue::from_str(&format!("Api-Key {}", key))
                    .map_err(|e| LeagueError::Transport(e.to_string()))?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| LeagueError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, LeagueError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LeagueError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::BAD_GATEWAY => return Err(LeagueError::BadGateway),
            StatusCode::NOT_FOUND => return Err(LeagueError::NotFound(path.to_string())),
            status if !status.is_success() => return Err(LeagueError::Http(status.as_u16())),
            _ => {}
        }

        response
            .json()
            .await
            .map_err(|e| LeagueError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl LeagueApi for LeagueClient {
    async fn franchises(&self, guild_id: u64) -> Result<Vec<Franchise>, LeagueError> {
        self.get(&format!("/api/v1/franchises?guild={}", guild_id))
            .await
    }

    async fn franchise_by_name(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Franchise, LeagueError> {
        let franchises = self.franchises(guild_id).await?;
        franchises
            .into_iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| LeagueError::NotFound(name.to_string()))
    }

    async fn tiers(&self, guild_id: u64) -> Result<Vec<Tier>, LeagueError> {
        self.get(&format!("/api/v1/tiers?guild={}", guild_id)).await
    }

    async fn teams_for_tier(&self, guild_id: u64, tier: &str) -> Result<Vec<Team>, LeagueError> {
        self.get(&format!("/api/v1/teams?guild={}&tier={}", guild_id, tier))
            .await
    }

    async fn matches_for_team(
        &self,
        guild_id: u64,
        team: &str,
    ) -> Result<Vec<LeagueMatch>, LeagueError> {
        self.get(&format!("/api/v1/matches?guild={}&team={}", guild_id, team))
            .await
    }
}
