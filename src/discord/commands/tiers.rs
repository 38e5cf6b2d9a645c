// Tier lookups: the skill divisions and the teams inside them.

use super::{error_embed, Context, Error};
use super::franchise::reply_league_error;
use poise::serenity_prelude as serenity;

/// Tier information.
#[poise::command(slash_command, guild_only, subcommands("list", "teams"))]
pub async fn tiers(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// List the league's tiers.
#[poise::command(slash_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    ctx.defer().await?;

    match ctx.data().league.tiers(guild_id).await {
        Ok(tiers) => {
            if tiers.is_empty() {
                let embed = error_embed("Tiers", "No tiers are registered.");
                ctx.send(poise::CreateReply::default().embed(embed)).await?;
                return Ok(());
            }

            let lines: Vec<String> = tiers.iter().map(|t| format!("• {}", t.name)).collect();
            let embed = serenity::CreateEmbed::new()
                .title("Tiers")
                .description(lines.join("\n"))
                .color(0x0080ff);
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e) => reply_league_error(ctx, e).await?,
    }

    Ok(())
}

/// List the teams in one tier.
#[poise::command(slash_command, guild_only)]
pub async fn teams(
    ctx: Context<'_>,
    #[description = "Tier name"]
    #[autocomplete = "autocomplete_tier"]
    tier: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    ctx.defer().await?;

    match ctx.data().league.teams_for_tier(guild_id, &tier).await {
        Ok(teams) => {
            if teams.is_empty() {
                let embed = error_embed("Teams", format!("No teams found in `{}`.", tier));
                ctx.send(poise::CreateReply::default().embed(embed)).await?;
                return Ok(());
            }

            let lines: Vec<String> = teams
                .iter()
                .map(|t| match &t.franchise {
                    Some(franchise) => format!("**{}** ({})", t.name, franchise),
                    None => format!("**{}**", t.name),
                })
                .collect();
            let embed = serenity::CreateEmbed::new()
                .title(format!("{} Teams", tier))
                .description(lines.join("\n"))
                .color(0x0080ff);
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e) => reply_league_error(ctx, e).await?,
    }

    Ok(())
}

pub(super) async fn autocomplete_tier<'a>(
    ctx: Context<'a>,
    partial: &'a str,
) -> impl poise::futures_util::Stream<Item = String> + 'a {
    let names = match ctx.guild_id() {
        Some(guild_id) => ctx.data().league.tier_names(guild_id.get()).await,
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
