// Match schedule lookups for a team.

use super::{error_embed, Context, Error};
use super::franchise::reply_league_error;
use crate::core::league::LeagueMatch;
use poise::serenity_prelude as serenity;

/// Match schedules and results.
#[poise::command(slash_command, guild_only, subcommands("next", "schedule"))]
pub async fn matches(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Show a team's next scheduled match.
#[poise::command(slash_command, guild_only)]
pub async fn next(
    ctx: Context<'_>,
    #[description = "Team name"]
    #[autocomplete = "autocomplete_team"]
    team: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    ctx.defer().await?;

    match ctx.data().league.next_match(guild_id, &team).await {
        Ok(Some(m)) => {
            let embed = match_embed(&m);
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Ok(None) => {
            let embed = error_embed(
                "No upcoming match",
                format!("`{}` has no scheduled match.", team),
            );
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e) => reply_league_error(ctx, e).await?,
    }

    Ok(())
}

/// Show a team's full schedule for the season.
#[poise::command(slash_command, guild_only)]
pub async fn schedule(
    ctx: Context<'_>,
    #[description = "Team name"]
    #[autocomplete = "autocomplete_team"]
    team: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    ctx.defer().await?;

    match ctx.data().league.matches_for_team(guild_id, &team).await {
        Ok(matches) => {
            if matches.is_empty() {
                let embed = error_embed(
                    "No matches",
                    format!("`{}` has no matches this season.", team),
                );
                ctx.send(poise::CreateReply::default().embed(embed)).await?;
                return Ok(());
            }

            let lines: Vec<String> = matches.iter().map(match_line).collect();
            let embed = serenity::CreateEmbed::new()
                .title(format!("{} Schedule", team))
                .description(lines.join("\n"))
                .color(0x0080ff);
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e) => reply_league_error(ctx, e).await?,
    }

    Ok(())
}

async fn autocomplete_team<'a>(
    ctx: Context<'a>,
    partial: &'a str,
) -> impl poise::futures_util::Stream<Item = String> + 'a {
    let names = match ctx.guild_id() {
        Some(guild_id) => ctx.data().league.team_names(guild_id.get()).await,
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

fn match_line(m: &LeagueMatch) -> String {
    let when = m
        .scheduled
        .map(|t| format!("<t:{}:f>", t.timestamp()))
        .unwrap_or_else(|| "unscheduled".to_string());
    format!(
        "MD{} — **{}** vs **{}** ({})",
        m.match_day, m.home_team, m.away_team, when
    )
}

fn match_embed(m: &LeagueMatch) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(format!("Match Day {} — {}", m.match_day, m.tier))
        .color(0x0080ff)
        .field("Home", m.home_team.clone(), true)
        .field("Away", m.away_team.clone(), true)
        .field(
            "Scheduled",
            m.scheduled
                .map(|t| format!("<t:{}:F>", t.timestamp()))
                .unwrap_or_else(|| "Not scheduled yet".to_string()),
            false,
        )
}
