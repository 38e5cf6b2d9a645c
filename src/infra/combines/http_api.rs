use crate::core::combines::api::{
    classify_status, validate_lobby_query, CombinesApi, CombinesApiError, LobbyInfo,
};
use crate::core::combines::models::{CombinesLobby, LobbyStatus};
use async_trait::async_trait;
use reqwest::Client;

/// reqwest implementation of the combines micro-service port. All four
/// operations are GETs against the guild's configured base URL.
pub struct HttpCombinesApi {
    client: Client,
}

impl HttpCombinesApi {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value, CombinesApiError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CombinesApiError::Transport(e.to_string()))?;

        if let Some(err) = classify_status(response.status().as_u16()) {
            return Err(err);
        }

        let body = response
            .text()
            .await
            .map_err(|e| CombinesApiError::Transport(e.to_string()))?;

        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| CombinesApiError::InvalidResponse(e.to_string()))
    }
}

impl Default for HttpCombinesApi {
    fn default() -> Self {
        Self::new()
    }
}

fn active_url(base_url: &str, player: Option<u64>) -> String {
    let base = base_url.trim_end_matches('/');
    match player {
        Some(id) => format!("{}/active?discord_id={}", base, id),
        None => format!("{}/active", base),
    }
}

fn lobby_url(base_url: &str, player: Option<u64>, lobby_id: Option<i64>) -> String {
    let base = base_url.trim_end_matches('/');
    match (player, lobby_id) {
        (Some(id), _) => format!("{}/lobby/?discord_id={}", base, id),
        (_, Some(id)) => format!("{}/lobby/{}", base, id),
        // Unreachable after validate_lobby_query.
        (None, None) => format!("{}/lobby/", base),
    }
}

/// A null, empty, or otherwise falsy listing body means "no lobbies", not an
/// error.
fn is_falsy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(a) => a.is_empty(),
        serde_json::Value::Object(o) => o.is_empty(),
        serde_json::Value::Number(_) => false,
    }
}

#[async_trait]
impl CombinesApi for HttpCombinesApi {
    async fn list_active(
        &self,
        base_url: &str,
        player: Option<u64>,
    ) -> Result<Vec<CombinesLobby>, CombinesApiError> {
        let value = self.get_json(&active_url(base_url, player)).await?;
        if is_falsy(&value) {
            return Ok(Vec::new());
        }
        serde_json::from_value(value).map_err(|e| CombinesApiError::InvalidResponse(e.to_string()))
    }

    async fn get_lobby(
        &self,
        base_url: &str,
        player: Option<u64>,
        lobby_id: Option<i64>,
    ) -> Result<LobbyInfo, CombinesApiError> {
        // Rejected before any network I/O.
        validate_lobby_query(player, lobby_id)?;

        let value = self.get_json(&lobby_url(base_url, player, lobby_id)).await?;
        LobbyInfo::from_value(value)
    }

    async fn check_in(
        &self,
        base_url: &str,
        player: u64,
    ) -> Result<LobbyStatus, CombinesApiError> {
        let base = base_url.trim_end_matches('/');
        let url = format!("{}/check_in?discord_id={}", base, player);
        let value = self.get_json(&url).await?;
        serde_json::from_value(value).map_err(|e| CombinesApiError::InvalidResponse(e.to_string()))
    }

    async fn check_out(
        &self,
        base_url: &str,
        player: u64,
    ) -> Result<LobbyStatus, CombinesApiError> {
        let base = base_url.trim_end_matches('/');
        let url = format!("{}/check_out?discord_id={}", base, player);
        let value = self.get_json(&url).await?;
        serde_json::from_value(value).map_err(|e| CombinesApiError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_url_carries_optional_player_filter() {
        assert_eq!(
            active_url("http://c.local/", None),
            "http://c.local/active"
        );
        assert_eq!(
            active_url("http://c.local", Some(5)),
            "http://c.local/active?discord_id=5"
        );
    }

    #[test]
    fn lobby_url_prefers_player_query() {
        assert_eq!(
            lobby_url("http://c.local", Some(5), None),
            "http://c.local/lobby/?discord_id=5"
        );
        assert_eq!(
            lobby_url("http://c.local", None, Some(42)),
            "http://c.local/lobby/42"
        );
    }

    #[test]
    fn falsy_listing_bodies_mean_no_lobbies() {
        assert!(is_falsy(&serde_json::Value::Null));
        assert!(is_falsy(&serde_json::json!([])));
        assert!(is_falsy(&serde_json::json!("")));
        assert!(is_falsy(&serde_json::json!({})));
        assert!(!is_falsy(&serde_json::json!([{"id": 1}])));
    }

    #[tokio::test]
    async fn get_lobby_rejects_bad_queries_before_any_request() {
        // The base URL is not routable; an attempted request would surface
        // as a Transport error rather than InvalidQuery.
        let api = HttpCombinesApi::new();
        let err = api
            .get_lobby("http://127.0.0.1:0", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CombinesApiError::InvalidQuery));

        let err = api
            .get_lobby("http://127.0.0.1:0", Some(1), Some(2))
            .await
            .unwrap_err();
        assert!(matches!(err, CombinesApiError::InvalidQuery));
    }
}
