// Franchise lookups backed by the league API, with name autocomplete served
// from the per-guild name cache.

use super::{error_embed, success_embed, Context, Error};
use crate::core::league::{Franchise, LeagueError};
use poise::serenity_prelude as serenity;

/// Franchise information.
#[poise::command(slash_command, guild_only, subcommands("list", "info", "refresh"))]
pub async fn franchise(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Drop the cached franchise and tier names for this server.
///
/// Run after renaming or adding league objects so autocomplete picks the
/// changes up immediately instead of serving stale names.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn refresh(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    ctx.data().league.invalidate_names(guild_id);

    let embed = success_embed(
        "Cache refreshed",
        "Franchise and tier names will be re-fetched on next use.",
    );
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// List every franchise with its prefix and general manager.
#[poise::command(slash_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    ctx.defer().await?;

    match ctx.data().league.franchises(guild_id).await {
        Ok(franchises) => {
            if franchises.is_empty() {
                let embed = error_embed("Franchises", "No franchises are registered.");
                ctx.send(poise::CreateReply::default().embed(embed)).await?;
                return Ok(());
            }

            let lines: Vec<String> = franchises
                .iter()
                .map(|f| format!("`{}` **{}** — GM: {}", f.prefix, f.name, f.gm_name))
                .collect();
            let embed = serenity::CreateEmbed::new()
                .title("Franchises")
                .description(lines.join("\n"))
                .color(0x0080ff);
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e) => reply_league_error(ctx, e).await?,
    }

    Ok(())
}

/// Show one franchise and its tiered rosters.
#[poise::command(slash_command, guild_only)]
pub async fn info(
    ctx: Context<'_>,
    #[description = "Franchise name"]
    #[autocomplete = "autocomplete_franchise"]
    name: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    ctx.defer().await?;

    match ctx.data().league.franchise_by_name(guild_id, &name).await {
        Ok(franchise) => {
            let embed = franchise_embed(&franchise);
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e) => reply_league_error(ctx, e).await?,
    }

    Ok(())
}

async fn autocomplete_franchise<'a>(
    ctx: Context<'a>,
    partial: &'a str,
) -> impl poise::futures_util::Stream<Item = String> + 'a {
    let names = match ctx.guild_id() {
        Some(guild_id) => ctx.data().league.franchise_names(guild_id.get()).await,
        None => Vec::new(),
    };
    let needle = partial.to_lowercase();
    poise::futures_util::stream::iter(
        names
            .into_iter()
            .filter(move |n| n.to_lowercase().starts_with(&needle))
            .take(25),
    )
}

fn franchise_embed(franchise: &Franchise) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(format!("{} ({})", franchise.name, franchise.prefix))
        .color(0x0080ff)
        .field("General Manager", franchise.gm_name.clone(), false);

    for team in &franchise.teams {
        embed = embed.field(team.tier.clone(), team.name.clone(), true);
    }

    embed
}

pub(super) async fn reply_league_error(ctx: Context<'_>, error: LeagueError) -> Result<(), Error> {
    let embed = match error {
        LeagueError::BadGateway => error_embed(
            "League service unavailable",
            "The league service is not responding right now. Try again in a minute.",
        ),
        LeagueError::NotFound(what) => {
            error_embed("Not found", format!("`{}` was not found.", what))
        }
        other => {
            tracing::warn!(error = %other, "League API call failed");
            error_embed("League error", other.to_string())
        }
    };
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
