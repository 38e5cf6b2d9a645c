// Combines: tryout/scrimmage lobbies formed from checked-in players.
// Models and naming rules, the micro-service API port, and the room
// lifecycle live here.

pub mod api;
pub mod lifecycle;
pub mod models;

pub use api::{CombinesApi, CombinesApiError, LobbyInfo};
pub use lifecycle::{
    CategoryInfo, CombinesError, CombinesService, Room, RoomGateway, ANNOUNCEMENTS_CHANNEL,
    ROOM_USER_LIMIT,
};
pub use models::{filter_active, parse_room_name, CombineEvent, CombinesLobby, CombinesPlayer};

#[cfg(test)]
pub(crate) mod test_support {
    use super::models::{CombinesLobby, CombinesPlayer};

    /// A three-a-side lobby with deterministic player ids.
    pub fn sample_lobby(id: i64, guild_id: u64, tier: &str) -> CombinesLobby {
        let player = |n: u64, team: &str| CombinesPlayer {
            discord_id: n,
            player_id: n as i64,
            lobby_id: id,
            team: team.to_string(),
            name: format!("player-{}", n),
        };

        CombinesLobby {
            id,
            lobby_user: format!("combine-{}", id),
            lobby_pass: "letmein".into(),
            home_wins: 0,
            away_wins: 0,
            reported_match_id: None,
            confirmed_match_id: None,
            completed: false,
            cancelled: false,
            tier: tier.to_string(),
            guild_id,
            home: (1..=3).map(|n| player(n, "home")).collect(),
            away: (4..=6).map(|n| player(n, "away")).collect(),
        }
    }
}
