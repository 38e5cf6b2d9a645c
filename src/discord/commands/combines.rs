// Player-facing combines commands. Thin layer: read the guild's combines
// configuration, call the micro-service port, format the reply.

use super::{error_embed, success_embed, Context, Error};
use crate::core::combines::{filter_active, CombinesApi, CombinesApiError, LobbyInfo};
use crate::core::combines::models::CombinesLobby;
use crate::core::settings::SettingsStore;
use poise::serenity_prelude as serenity;

/// Combine check-in, check-out, and lobby lookups.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("checkin", "checkout", "lobby", "active")
)]
pub async fn combines(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Check in for combines.
#[poise::command(slash_command, guild_only)]
pub async fn checkin(ctx: Context<'_>) -> Result<(), Error> {
    let Some(base_url) = configured_api_url(&ctx).await? else {
        return reply_unconfigured(ctx).await;
    };

    ctx.defer_ephemeral().await?;

    match ctx
        .data()
        .combines_api
        .check_in(&base_url, ctx.author().id.get())
        .await
    {
        Ok(status) => {
            let embed = success_embed("Checked in", status.message);
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e) => reply_api_error(ctx, e).await?,
    }

    Ok(())
}

/// Check out of combines.
#[poise::command(slash_command, guild_only)]
pub async fn checkout(ctx: Context<'_>) -> Result<(), Error> {
    let Some(base_url) = configured_api_url(&ctx).await? else {
        return reply_unconfigured(ctx).await;
    };

    ctx.defer_ephemeral().await?;

    match ctx
        .data()
        .combines_api
        .check_out(&base_url, ctx.author().id.get())
        .await
    {
        Ok(status) => {
            let embed = success_embed("Checked out", status.message);
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e) => reply_api_error(ctx, e).await?,
    }

    Ok(())
}

/// Look up a combine lobby by player or by lobby id.
#[poise::command(slash_command, guild_only)]
pub async fn lobby(
    ctx: Context<'_>,
    #[description = "Player to look up (defaults to you)"] player: Option<serenity::User>,
    #[description = "Lobby id to look up"] lobby_id: Option<i64>,
) -> Result<(), Error> {
    let Some(base_url) = configured_api_url(&ctx).await? else {
        return reply_unconfigured(ctx).await;
    };

    ctx.defer_ephemeral().await?;

    let player_id = lobby_selector(
        ctx.author().id.get(),
        player.as_ref().map(|u| u.id.get()),
        lobby_id,
    );

    match ctx
        .data()
        .combines_api
        .get_lobby(&base_url, player_id, lobby_id)
        .await
    {
        Ok(LobbyInfo::Lobby(lobby)) => {
            let embed = lobby_embed(&lobby);
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Ok(LobbyInfo::Status(status)) => {
            let embed = error_embed("No lobby", status.message);
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e) => reply_api_error(ctx, e).await?,
    }

    Ok(())
}

/// List active combine lobbies.
#[poise::command(slash_command, guild_only)]
pub async fn active(
    ctx: Context<'_>,
    #[description = "Only lobbies this player sits in"] player: Option<serenity::User>,
) -> Result<(), Error> {
    let Some(base_url) = configured_api_url(&ctx).await? else {
        return reply_unconfigured(ctx).await;
    };

    ctx.defer().await?;

    match ctx
        .data()
        .combines_api
        .list_active(&base_url, player.map(|u| u.id.get()))
        .await
    {
        Ok(lobbies) => {
            let active = filter_active(&lobbies);
            if active.is_empty() {
                let embed = success_embed("Active lobbies", "No active combine lobbies.");
                ctx.send(poise::CreateReply::default().embed(embed)).await?;
                return Ok(());
            }

            let lines: Vec<String> = active
                .iter()
                .map(|l| {
                    format!(
                        "**{}** lobby `{}` — {} players",
                        l.tier,
                        l.id,
                        l.player_count()
                    )
                })
                .collect();
            let embed = success_embed("Active lobbies", lines.join("\n"));
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e) => reply_api_error(ctx, e).await?,
    }

    Ok(())
}

/// The combines API URL for the invoking guild, if one is configured.
async fn configured_api_url(ctx: &Context<'_>) -> Result<Option<String>, Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let settings = ctx.data().settings.combines_settings(guild_id).await?;
    Ok(settings.api_url)
}

async fn reply_unconfigured(ctx: Context<'_>) -> Result<(), Error> {
    reply_api_error(ctx, CombinesApiError::Unconfigured).await
}

async fn reply_api_error(ctx: Context<'_>, error: CombinesApiError) -> Result<(), Error> {
    let embed = api_error_embed(&error);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Translate a typed API failure into a user-facing embed. Bad gateway gets
/// its own wording so players know to retry rather than ping an admin.
fn api_error_embed(error: &CombinesApiError) -> serenity::CreateEmbed {
    match error {
        CombinesApiError::Unconfigured => error_embed(
            "Combines not configured",
            "No combines API is configured for this server. An admin can set one with `/combinesadmin api`.",
        ),
        CombinesApiError::BadGateway => error_embed(
            "Combines service unavailable",
            "The combines service is not responding right now. Try again in a minute.",
        ),
        CombinesApiError::InvalidQuery => error_embed(
            "Bad lookup",
            "Give either a player or a lobby id, not both.",
        ),
        other => {
            tracing::warn!(error = %other, "Combines API call failed");
            error_embed("Combines error", other.to_string())
        }
    }
}

/// Default to the caller when no selector was given; the port rejects
/// player + lobby id together.
fn lobby_selector(author: u64, player: Option<u64>, lobby_id: Option<i64>) -> Option<u64> {
    match (player, lobby_id) {
        (None, None) => Some(author),
        (Some(id), _) => Some(id),
        (None, Some(_)) => None,
    }
}

fn lobby_embed(lobby: &CombinesLobby) -> serenity::CreateEmbed {
    let roster = |players: &[crate::core::combines::CombinesPlayer]| {
        if players.is_empty() {
            "*nobody*".to_string()
        } else {
            players
                .iter()
                .map(|p| format!("<@{}>", p.discord_id))
                .collect::<Vec<_>>()
                .join("\n")
        }
    };

    serenity::CreateEmbed::new()
        .title(format!("{} Combine Lobby {}", lobby.tier, lobby.id))
        .color(0x0080ff)
        .field("Lobby Username", format!("`{}`", lobby.lobby_user), true)
        .field("Lobby Password", format!("`{}`", lobby.lobby_pass), true)
        .field(
            "Score",
            format!("Home {} — {} Away", lobby.home_wins, lobby.away_wins),
            false,
        )
        .field("Home", roster(&lobby.home), true)
        .field("Away", roster(&lobby.away), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lobby_selector_defaults_to_the_caller() {
        assert_eq!(lobby_selector(7, None, None), Some(7));
        assert_eq!(lobby_selector(7, Some(5), None), Some(5));
        assert_eq!(lobby_selector(7, None, Some(42)), None);
        // Both given: passed through so the port rejects the query.
        assert_eq!(lobby_selector(7, Some(5), Some(42)), Some(5));
    }

    #[test]
    fn unconfigured_error_points_at_the_admin_command() {
        let embed = api_error_embed(&CombinesApiError::Unconfigured);
        let value = serde_json::to_value(embed).unwrap();
        assert_eq!(value["title"].as_str().unwrap(), "❌ Combines not configured");
        assert!(value["description"]
            .as_str()
            .unwrap()
            .contains("/combinesadmin api"));
    }

    #[test]
    fn bad_gateway_gets_retry_wording() {
        let embed = api_error_embed(&CombinesApiError::BadGateway);
        let value = serde_json::to_value(embed).unwrap();
        assert!(value["description"].as_str().unwrap().contains("Try again"));
    }
}
