// Discord commands module.
// Each feature gets its own command file.

pub mod combines;
pub mod combines_admin;
pub mod franchise;
pub mod matches;
pub mod tiers;

use crate::core::combines::CombinesService;
use crate::core::league::LeagueService;
use crate::discord::rooms::SerenityRoomGateway;
use crate::infra::combines::HttpCombinesApi;
use crate::infra::league::LeagueClient;
use crate::infra::settings::SqliteSettingsStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Shared state injected into every command through the poise context.
pub struct Data {
    pub combines: Arc<CombinesService<SerenityRoomGateway, SqliteSettingsStore>>,
    pub combines_api: Arc<HttpCombinesApi>,
    pub league: Arc<LeagueService<LeagueClient>>,
    pub settings: SqliteSettingsStore,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Uniform success embed. Every command resolves to either this or
/// [`error_embed`]; no operation silently does nothing from the user's side.
pub fn success_embed(title: &str, description: impl Into<String>) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(format!("✅ {}", title))
        .description(description.into())
        .color(0x00ff00)
}

pub fn error_embed(title: &str, description: impl Into<String>) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(format!("❌ {}", title))
        .description(description.into())
        .color(0xff0000)
}
