// Admin commands for the combines category skeleton and the per-guild
// combines configuration.

use super::{error_embed, success_embed, Context, Error};
use crate::core::combines::parse_room_name;
use crate::core::settings::SettingsStore;
use poise::serenity_prelude as serenity;

/// Text channels created alongside the category, in order.
const SKELETON_TEXT_CHANNELS: [&str; 4] = [
    "how-to-play",
    "combines-announcements",
    "combines-help",
    "combines-general",
];
/// Waiting rooms players idle in before lobbies are formed.
const SKELETON_VOICE_CHANNELS: [&str; 2] = ["Waiting Room 1", "Waiting Room 2"];

/// Combines administration: category skeleton, API wiring, start/stop.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands("setup", "teardown", "deleterooms", "api", "start", "stop")
)]
pub async fn combinesadmin(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Create the combines category and its standing channels.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn setup(
    ctx: Context<'_>,
    #[description = "Category name (defaults to \"combines\")"] name: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?;
    let name = name.unwrap_or_else(|| "combines".to_string());

    ctx.defer().await?;

    let mut settings = ctx.data().settings.combines_settings(guild_id.get()).await?;
    if settings.category_id.is_some() {
        let embed = error_embed(
            "Already set up",
            "A combines category is already configured. Run `/combinesadmin teardown` first to rebuild it.",
        );
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        return Ok(());
    }

    let category = guild_id
        .create_channel(
            &ctx,
            serenity::CreateChannel::new(&name).kind(serenity::ChannelType::Category),
        )
        .await?;

    for channel in SKELETON_TEXT_CHANNELS {
        guild_id
            .create_channel(
                &ctx,
                serenity::CreateChannel::new(channel)
                    .kind(serenity::ChannelType::Text)
                    .category(category.id),
            )
            .await?;
    }
    for channel in SKELETON_VOICE_CHANNELS {
        guild_id
            .create_channel(
                &ctx,
                serenity::CreateChannel::new(channel)
                    .kind(serenity::ChannelType::Voice)
                    .category(category.id),
            )
            .await?;
    }

    settings.category_id = Some(category.id.get());
    ctx.data()
        .settings
        .save_combines_settings(guild_id.get(), &settings)
        .await?;

    let embed = success_embed(
        "Combines set up",
        format!("Created the `{}` category and its channels.", name),
    );
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Delete the whole combines category tree, overflow categories included.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn teardown(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?;

    ctx.defer().await?;

    let mut settings = ctx.data().settings.combines_settings(guild_id.get()).await?;
    let Some(category_id) = settings.category_id else {
        let embed = error_embed("Nothing to tear down", "No combines category is configured.");
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        return Ok(());
    };

    let channels = guild_id.channels(&ctx).await?;
    let Some(primary) = channels.get(&serenity::ChannelId::new(category_id)) else {
        // The category is already gone; just clear the stale configuration.
        settings.category_id = None;
        settings.active = false;
        ctx.data()
            .settings
            .save_combines_settings(guild_id.get(), &settings)
            .await?;
        let embed = success_embed("Combines torn down", "The category was already deleted.");
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        return Ok(());
    };

    // Primary plus overflow categories share the configured name as prefix.
    let prefix = primary.name.clone();
    let category_ids: Vec<serenity::ChannelId> = channels
        .values()
        .filter(|c| c.kind == serenity::ChannelType::Category)
        .filter(|c| is_combines_category(&c.name, &prefix))
        .map(|c| c.id)
        .collect();

    let mut deleted = 0;
    for channel in channels.values() {
        if let Some(parent) = channel.parent_id {
            if category_ids.contains(&parent) {
                channel.id.delete(&ctx.http()).await?;
                deleted += 1;
            }
        }
    }
    for id in &category_ids {
        id.delete(&ctx.http()).await?;
    }

    settings.category_id = None;
    settings.active = false;
    ctx.data()
        .settings
        .save_combines_settings(guild_id.get(), &settings)
        .await?;

    let embed = success_embed(
        "Combines torn down",
        format!(
            "Deleted {} channels across {} categories.",
            deleted,
            category_ids.len()
        ),
    );
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Delete only game lobby rooms, keeping the standing channels.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn deleterooms(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?;

    ctx.defer().await?;

    let channels = guild_id.channels(&ctx).await?;
    let combines_categories: Vec<serenity::ChannelId> = channels
        .values()
        .filter(|c| c.kind == serenity::ChannelType::Category)
        .filter(|c| c.name.to_ascii_lowercase().starts_with("combines"))
        .map(|c| c.id)
        .collect();

    let mut deleted = 0;
    for channel in channels.values() {
        let in_combines = channel
            .parent_id
            .map(|p| combines_categories.contains(&p))
            .unwrap_or(false);
        if in_combines && parse_room_name(&channel.name).is_some() {
            channel.id.delete(&ctx.http()).await?;
            deleted += 1;
        }
    }

    let embed = success_embed("Rooms deleted", format!("Deleted {} lobby rooms.", deleted));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Show or set the combines API URL for this guild.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn api(
    ctx: Context<'_>,
    #[description = "New base URL (leave empty to show the current one)"] url: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let mut settings = ctx.data().settings.combines_settings(guild_id).await?;

    let embed = match url {
        Some(url) => {
            settings.api_url = Some(url.clone());
            ctx.data()
                .settings
                .save_combines_settings(guild_id, &settings)
                .await?;
            success_embed("Combines API set", format!("Now using `{}`.", url))
        }
        None => match &settings.api_url {
            Some(url) => success_embed("Combines API", format!("Currently `{}`.", url)),
            None => error_embed("Combines API", "No API URL is configured."),
        },
    };
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}

/// Mark combines active: the webhook will start creating rooms.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn start(ctx: Context<'_>) -> Result<(), Error> {
    set_active(ctx, true).await
}

/// Mark combines inactive: lobby payloads for this guild are rejected.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
    set_active(ctx, false).await
}

async fn set_active(ctx: Context<'_>, active: bool) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let mut settings = ctx.data().settings.combines_settings(guild_id).await?;

    if active && (settings.category_id.is_none() || settings.api_url.is_none()) {
        let embed = error_embed(
            "Not configured",
            "Configure a category (`/combinesadmin setup`) and an API URL (`/combinesadmin api`) before starting combines.",
        );
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        return Ok(());
    }

    settings.active = active;
    ctx.data()
        .settings
        .save_combines_settings(guild_id, &settings)
        .await?;

    let embed = if active {
        success_embed("Combines started", "Lobby rooms will now be created.")
    } else {
        success_embed("Combines stopped", "Lobby payloads will be rejected.")
    };
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// The primary category or one of its `-2`..`-4` overflow siblings.
fn is_combines_category(name: &str, prefix: &str) -> bool {
    if name.eq_ignore_ascii_case(prefix) {
        return true;
    }
    // Category names are arbitrary user text; `get` keeps a multi-byte
    // character straddling the prefix length from panicking the slice.
    let Some(head) = name.get(..prefix.len()) else {
        return false;
    };
    head.eq_ignore_ascii_case(prefix)
        && name[prefix.len()..]
            .strip_prefix('-')
            .map(|suffix| !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_categories_match_their_prefix() {
        assert!(is_combines_category("combines", "combines"));
        assert!(is_combines_category("Combines-2", "combines"));
        assert!(is_combines_category("combines-4", "combines"));

        assert!(!is_combines_category("combines-extra", "combines"));
        assert!(!is_combines_category("combines-", "combines"));
        assert!(!is_combines_category("general", "combines"));
        assert!(!is_combines_category("comb", "combines"));
    }

    #[test]
    fn multibyte_category_names_do_not_match_or_panic() {
        // 'é' sits across the prefix-length byte boundary here.
        assert!(!is_combines_category("combineé-2", "combines"));
        assert!(!is_combines_category("combinés", "combines"));
        assert!(!is_combines_category("é", "combines"));
    }
}
