// Port for the combines micro-service. The core defines the four calls and
// the failure taxonomy; the infra layer provides the reqwest implementation.

use super::models::{CombinesLobby, LobbyStatus};
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================
// Callers react differently to these: `BadGateway` means try again later,
// `Http`/`InvalidResponse` mean the service or its configuration is wrong.

#[derive(Debug, Error)]
pub enum CombinesApiError {
    #[error("No combines API URL is configured for this guild")]
    Unconfigured,

    #[error("The combines service is unreachable (bad gateway)")]
    BadGateway,

    #[error("The combines service returned HTTP {0}")]
    Http(u16),

    #[error("The combines service returned an unexpected body: {0}")]
    InvalidResponse(String),

    #[error("Exactly one of player or lobby id must be supplied")]
    InvalidQuery,

    #[error("Request to the combines service failed: {0}")]
    Transport(String),
}

/// Map an HTTP status to the typed failure, or `None` for success codes.
///
/// 502 is distinguished from every other non-2xx status because it means the
/// service is down rather than misconfigured.
pub fn classify_status(status: u16) -> Option<CombinesApiError> {
    match status {
        200..=299 => None,
        502 => Some(CombinesApiError::BadGateway),
        other => Some(CombinesApiError::Http(other)),
    }
}

// ============================================================================
// RESPONSE SHAPES
// ============================================================================

/// A lobby lookup answers with either a full lobby record or a status
/// message (e.g. "you are not checked in").
#[derive(Debug)]
pub enum LobbyInfo {
    Lobby(Box<CombinesLobby>),
    Status(LobbyStatus),
}

impl LobbyInfo {
    /// Interpret a lookup response body. A body carrying both `status` and
    /// `message` keys is a status reply; anything else must be a lobby.
    pub fn from_value(value: serde_json::Value) -> Result<Self, CombinesApiError> {
        let is_status = value.get("status").is_some() && value.get("message").is_some();
        if is_status {
            let status = serde_json::from_value(value)
                .map_err(|e| CombinesApiError::InvalidResponse(e.to_string()))?;
            Ok(LobbyInfo::Status(status))
        } else {
            let lobby = serde_json::from_value(value)
                .map_err(|e| CombinesApiError::InvalidResponse(e.to_string()))?;
            Ok(LobbyInfo::Lobby(Box::new(lobby)))
        }
    }
}

// ============================================================================
// PORT
// ============================================================================

/// The four calls the bot makes against a guild's configured combines
/// service. All calls are GETs authenticated by Discord user id only; the
/// remote service trusts the caller's network position.
#[async_trait]
pub trait CombinesApi: Send + Sync {
    /// List lobbies that are not completed or cancelled, optionally filtered
    /// to the lobbies a player sits in. An empty body is an empty list, not
    /// an error.
    async fn list_active(
        &self,
        base_url: &str,
        player: Option<u64>,
    ) -> Result<Vec<CombinesLobby>, CombinesApiError>;

    /// Look up one lobby. Exactly one of `player` / `lobby_id` must be
    /// given; violations are rejected before any network I/O.
    async fn get_lobby(
        &self,
        base_url: &str,
        player: Option<u64>,
        lobby_id: Option<i64>,
    ) -> Result<LobbyInfo, CombinesApiError>;

    async fn check_in(&self, base_url: &str, player: u64)
        -> Result<LobbyStatus, CombinesApiError>;

    async fn check_out(
        &self,
        base_url: &str,
        player: u64,
    ) -> Result<LobbyStatus, CombinesApiError>;
}

/// Shared guard for [`CombinesApi::get_lobby`] implementations.
pub fn validate_lobby_query(
    player: Option<u64>,
    lobby_id: Option<i64>,
) -> Result<(), CombinesApiError> {
    match (player, lobby_id) {
        (Some(_), None) | (None, Some(_)) => Ok(()),
        _ => Err(CombinesApiError::InvalidQuery),
    }
}

// ============================================================================
// TESTS
// ============================================================================
