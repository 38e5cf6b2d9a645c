// Serenity implementation of the RoomGateway port. This is the only place
// the combines lifecycle touches real Discord objects: categories, voice
// rooms, permission overwrites, and the announcement embed.

use crate::core::combines::{
    CategoryInfo, CombinesError, CombinesLobby, Room, RoomGateway, ANNOUNCEMENTS_CHANNEL,
    ROOM_USER_LIMIT,
};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::collections::HashMap;
use std::sync::Arc;

/// Role granted connect/speak in combine rooms.
const LEAGUE_ROLE: &str = "League";
/// Role muted in combine rooms, when the guild has one.
const MUTED_ROLE: &str = "Muted";

pub struct SerenityRoomGateway {
    http: Arc<serenity::Http>,
    cache: Arc<serenity::Cache>,
}

impl SerenityRoomGateway {
    pub fn new(http: Arc<serenity::Http>, cache: Arc<serenity::Cache>) -> Self {
        Self { http, cache }
    }

    async fn guild_channels(
        &self,
        guild_id: u64,
    ) -> Result<HashMap<serenity::ChannelId, serenity::GuildChannel>, CombinesError> {
        serenity::GuildId::new(guild_id)
            .channels(&self.http)
            .await
            .map_err(|e| CombinesError::Gateway(e.to_string()))
    }

    /// Overwrites for a combine room: the league role may connect and speak,
    /// @everyone may not connect, and a muted role (if present) may not
    /// speak.
    async fn room_overwrites(
        &self,
        guild_id: u64,
    ) -> Result<Vec<serenity::PermissionOverwrite>, CombinesError> {
        let roles = serenity::GuildId::new(guild_id)
            .roles(&self.http)
            .await
            .map_err(|e| CombinesError::Gateway(e.to_string()))?;

        // The @everyone role id equals the guild id.
        let mut overwrites = vec![serenity::PermissionOverwrite {
            allow: serenity::Permissions::empty(),
            deny: serenity::Permissions::CONNECT,
            kind: serenity::PermissionOverwriteType::Role(serenity::RoleId::new(guild_id)),
        }];

        if let Some(league) = roles.values().find(|r| r.name == LEAGUE_ROLE) {
            overwrites.push(serenity::PermissionOverwrite {
                allow: serenity::Permissions::VIEW_CHANNEL
                    | serenity::Permissions::CONNECT
                    | serenity::Permissions::SPEAK,
                deny: serenity::Permissions::empty(),
                kind: serenity::PermissionOverwriteType::Role(league.id),
            });
        }

        if let Some(muted) = roles.values().find(|r| r.name == MUTED_ROLE) {
            overwrites.push(serenity::PermissionOverwrite {
                allow: serenity::Permissions::empty(),
                deny: serenity::Permissions::SPEAK,
                kind: serenity::PermissionOverwriteType::Role(muted.id),
            });
        }

        Ok(overwrites)
    }
}

#[async_trait]
impl RoomGateway for SerenityRoomGateway {
    async fn is_guild_member(&self, guild_id: u64) -> bool {
        self.cache
            .guilds()
            .contains(&serenity::GuildId::new(guild_id))
    }

    async fn categories(&self, guild_id: u64) -> Result<Vec<CategoryInfo>, CombinesError> {
        let channels = self.guild_channels(guild_id).await?;

        let categories = channels
            .values()
            .filter(|c| c.kind == serenity::ChannelType::Category)
            .map(|category| CategoryInfo {
                id: category.id.get(),
                name: category.name.clone(),
                channel_count: channels
                    .values()
                    .filter(|c| c.parent_id == Some(category.id))
                    .count(),
            })
            .collect();

        Ok(categories)
    }

    async fn create_category(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<CategoryInfo, CombinesError> {
        let created = serenity::GuildId::new(guild_id)
            .create_channel(
                &self.http,
                serenity::CreateChannel::new(name).kind(serenity::ChannelType::Category),
            )
            .await
            .map_err(|e| CombinesError::Gateway(e.to_string()))?;

        Ok(CategoryInfo {
            id: created.id.get(),
            name: created.name.clone(),
            channel_count: 0,
        })
    }

    async fn room_exists(&self, guild_id: u64, name: &str) -> Result<bool, CombinesError> {
        let channels = self.guild_channels(guild_id).await?;
        Ok(channels.values().any(|c| c.name == name))
    }

    async fn create_room(
        &self,
        guild_id: u64,
        category_id: u64,
        name: &str,
    ) -> Result<Room, CombinesError> {
        let overwrites = self.room_overwrites(guild_id).await?;

        let created = serenity::GuildId::new(guild_id)
            .create_channel(
                &self.http,
                serenity::CreateChannel::new(name)
                    .kind(serenity::ChannelType::Voice)
                    .category(serenity::ChannelId::new(category_id))
                    .user_limit(ROOM_USER_LIMIT)
                    .permissions(overwrites),
            )
            .await
            .map_err(|e| CombinesError::Gateway(e.to_string()))?;

        let category_name = self
            .guild_channels(guild_id)
            .await?
            .get(&serenity::ChannelId::new(category_id))
            .map(|c| c.name.clone())
            .unwrap_or_default();

        Ok(Room {
            channel_id: created.id.get(),
            name: created.name.clone(),
            category_name,
        })
    }

    async fn categorized_channels(&self, guild_id: u64) -> Result<Vec<Room>, CombinesError> {
        let channels = self.guild_channels(guild_id).await?;

        let category_names: HashMap<serenity::ChannelId, String> = channels
            .values()
            .filter(|c| c.kind == serenity::ChannelType::Category)
            .map(|c| (c.id, c.name.clone()))
            .collect();

        Ok(channels
            .values()
            .filter_map(|channel| {
                let parent = channel.parent_id?;
                Some(Room {
                    channel_id: channel.id.get(),
                    name: channel.name.clone(),
                    category_name: category_names.get(&parent)?.clone(),
                })
            })
            .collect())
    }

    async fn delete_room(&self, _guild_id: u64, channel_id: u64) -> Result<(), CombinesError> {
        serenity::ChannelId::new(channel_id)
            .delete(&self.http)
            .await
            .map_err(|e| CombinesError::Gateway(e.to_string()))?;
        Ok(())
    }

    async fn announce_lobby(
        &self,
        lobby: &CombinesLobby,
        home: &Room,
        away: &Room,
    ) -> Result<(), CombinesError> {
        let channels = self.guild_channels(lobby.guild_id).await?;
        let announcements = channels
            .values()
            .find(|c| c.kind == serenity::ChannelType::Text && c.name == ANNOUNCEMENTS_CHANNEL)
            .ok_or(CombinesError::MissingAnnouncementChannel(lobby.guild_id))?;

        let embed = build_lobby_embed(lobby, home, away);
        announcements
            .id
            .send_message(&self.http, serenity::CreateMessage::new().embed(embed))
            .await
            .map_err(|e| CombinesError::Gateway(e.to_string()))?;

        Ok(())
    }
}

/// The announcement: credentials, both voice rooms, both rosters, with the
/// first home player marked as the one who creates the in-game lobby.
fn build_lobby_embed(
    lobby: &CombinesLobby,
    home: &Room,
    away: &Room,
) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(format!("{} Combine Lobby {}", lobby.tier, lobby.id))
        .color(0x0080ff)
        .field("Lobby Username", format!("`{}`", lobby.lobby_user), true)
        .field("Lobby Password", format!("`{}`", lobby.lobby_pass), true)
        .field(
            "Voice Channels",
            format!("<#{}>\n<#{}>", home.channel_id, away.channel_id),
            false,
        )
        .field("Home", roster_lines(lobby, true), true)
        .field("Away", roster_lines(lobby, false), true)
}

fn roster_lines(lobby: &CombinesLobby, home: bool) -> String {
    let players = if home { &lobby.home } else { &lobby.away };
    let mut lines: Vec<String> = players
        .iter()
        .map(|p| format!("<@{}>", p.discord_id))
        .collect();

    if home {
        if let Some(first) = lines.first_mut() {
            first.push_str(" (creates the lobby)");
        }
    }

    if lines.is_empty() {
        "*nobody*".to_string()
    } else {
        lines.join("\n")
    }
}
