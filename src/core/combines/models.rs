// Data carried by the combines webhook payloads and the combines
// micro-service responses. Nothing here is persisted by the bot: a lobby
// exists for the duration of one handler invocation, and the remote service
// stays the source of truth.

use serde::Deserialize;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// Which bench a player sits on inside a lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

/// A participant reference inside a lobby payload.
///
/// Only used to resolve Discord members and populate announcements; the
/// external player id belongs to the combines service.
#[derive(Debug, Clone, Deserialize)]
pub struct CombinesPlayer {
    pub discord_id: u64,
    pub player_id: i64,
    pub lobby_id: i64,
    pub team: String,
    pub name: String,
}

/// One scheduled scrimmage instance, delivered by the combines service.
///
/// Invariant: `id` is unique per active lobby. A lobby with `completed` or
/// `cancelled` set is never eligible for room creation.
#[derive(Debug, Clone, Deserialize)]
pub struct CombinesLobby {
    pub id: i64,
    #[serde(default)]
    pub lobby_user: String,
    #[serde(default)]
    pub lobby_pass: String,
    #[serde(default)]
    pub home_wins: u32,
    #[serde(default)]
    pub away_wins: u32,
    #[serde(default)]
    pub reported_match_id: Option<i64>,
    #[serde(default)]
    pub confirmed_match_id: Option<i64>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub cancelled: bool,
    pub tier: String,
    pub guild_id: u64,
    #[serde(default)]
    pub home: Vec<CombinesPlayer>,
    #[serde(default)]
    pub away: Vec<CombinesPlayer>,
}

impl CombinesLobby {
    /// A finished or cancelled lobby must never get rooms created for it.
    pub fn is_active(&self) -> bool {
        !self.completed && !self.cancelled
    }

    pub fn player_count(&self) -> usize {
        self.home.len() + self.away.len()
    }
}

/// Lifecycle notification posted by the combines service.
#[derive(Debug, Clone, Deserialize)]
pub struct CombineEvent {
    #[serde(default)]
    pub nickname: String,
    pub discord_id: u64,
    #[serde(default)]
    pub status: String,
    pub message_type: EventKind,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub match_id: Option<i64>,
    pub guild_id: u64,
}

/// Event kinds the combines service emits. Only `Finished` triggers any
/// action; the rest are deliberately left to human moderators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum EventKind {
    InvalidScore,
    ScoreMismatch,
    Finished,
    ScoreReported,
    GameComplete,
    CheckIn,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::InvalidScore => "InvalidScore",
            EventKind::ScoreMismatch => "ScoreMismatch",
            EventKind::Finished => "Finished",
            EventKind::ScoreReported => "ScoreReported",
            EventKind::GameComplete => "GameComplete",
            EventKind::CheckIn => "CheckIn",
        }
    }
}

/// Status/message pair the combines service returns for check-in style calls.
#[derive(Debug, Clone, Deserialize)]
pub struct LobbyStatus {
    pub status: String,
    pub message: String,
}

// ============================================================================
// NAMING HELPERS
// ============================================================================
// Room names are the only correlation the bot keeps between a lobby and its
// Discord channels, so both creation and teardown share these helpers.

/// The `{tier}-{id}-home` / `{tier}-{id}-away` pair for a lobby.
pub fn room_names(tier: &str, lobby_id: i64) -> (String, String) {
    (
        format!("{}-{}-home", tier, lobby_id),
        format!("{}-{}-away", tier, lobby_id),
    )
}

/// Parse a channel name of the form `word-digits-(home|away)`.
///
/// Matching is segment-exact: lobby 42 does not match `diamond-142-home`.
pub fn parse_room_name(name: &str) -> Option<(&str, i64, Side)> {
    let (rest, side_str) = name.rsplit_once('-')?;
    let side = if side_str.eq_ignore_ascii_case("home") {
        Side::Home
    } else if side_str.eq_ignore_ascii_case("away") {
        Side::Away
    } else {
        return None;
    };

    let (tier, id_str) = rest.rsplit_once('-')?;
    if tier.is_empty() || id_str.is_empty() || !id_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let lobby_id = id_str.parse().ok()?;
    Some((tier, lobby_id, side))
}

/// Drop completed and cancelled lobbies from a listing.
pub fn filter_active(lobbies: &[CombinesLobby]) -> Vec<&CombinesLobby> {
    lobbies.iter().filter(|l| l.is_active()).collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby(id: i64, completed: bool, cancelled: bool) -> CombinesLobby {
        CombinesLobby {
            id,
            lobby_user: "rsc".into(),
            lobby_pass: "pass".into(),
            home_wins: 0,
            away_wins: 0,
            reported_match_id: None,
            confirmed_match_id: None,
            completed,
            cancelled,
            tier: "Diamond".into(),
            guild_id: 1,
            home: Vec::new(),
            away: Vec::new(),
        }
    }

    #[test]
    fn filter_active_excludes_completed_and_cancelled() {
        let lobbies = vec![
            lobby(1, false, false),
            lobby(2, true, false),
            lobby(3, false, true),
            lobby(4, true, true),
        ];

        let active = filter_active(&lobbies);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, 1);
    }

    #[test]
    fn filter_active_on_empty_list() {
        assert!(filter_active(&[]).is_empty());
    }

    #[test]
    fn room_names_follow_convention() {
        let (home, away) = room_names("Diamond", 42);
        assert_eq!(home, "Diamond-42-home");
        assert_eq!(away, "Diamond-42-away");
    }

    #[test]
    fn parse_room_name_round_trips() {
        assert_eq!(
            parse_room_name("Diamond-42-home"),
            Some(("Diamond", 42, Side::Home))
        );
        assert_eq!(
            parse_room_name("premier-7-away"),
            Some(("premier", 7, Side::Away))
        );
    }

    #[test]
    fn parse_room_name_is_segment_exact() {
        // A lobby id must match the whole digits segment.
        let (_, id, _) = parse_room_name("diamond-142-home").unwrap();
        assert_ne!(id, 42);
    }

    #[test]
    fn parse_room_name_rejects_non_rooms() {
        assert!(parse_room_name("combines-general").is_none());
        assert!(parse_room_name("how-to-play").is_none());
        assert!(parse_room_name("waiting-room-1").is_none());
        assert!(parse_room_name("42-home").is_none());
        assert!(parse_room_name("diamond-abc-home").is_none());
        assert!(parse_room_name("").is_none());
    }

    #[test]
    fn lobby_payload_deserializes_with_defaults() {
        let raw = r#"{
            "id": 42,
            "tier": "Diamond",
            "guild_id": 1234,
            "home": [
                {"discord_id": 1, "player_id": 10, "lobby_id": 42, "team": "home", "name": "a"}
            ]
        }"#;

        let lobby: CombinesLobby = serde_json::from_str(raw).unwrap();
        assert_eq!(lobby.id, 42);
        assert!(lobby.is_active());
        assert_eq!(lobby.player_count(), 1);
        assert!(lobby.away.is_empty());
    }

    #[test]
    fn event_kind_deserializes_from_service_spelling() {
        let raw = r#"{
            "nickname": "nick",
            "discord_id": 5,
            "status": "done",
            "message_type": "Finished",
            "message": "",
            "match_id": 42,
            "guild_id": 1234
        }"#;

        let event: CombineEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.message_type, EventKind::Finished);
        assert_eq!(event.match_id, Some(42));
    }
}
